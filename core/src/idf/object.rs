use super::VersionNumber;
use crate::CalendarDate;
use derive_more::{
    Deref,
    DerefMut,
};
use std::fmt::Write as _;

/// Separator placed before objects that did not come from the source text.
const SYNTHESIZED_LEADING: &str = "\n\n";
const FIELD_INDENT: &str = "    ";
const COMMENT_COLUMN: usize = 26;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub value: String,
    /// Trailing `!-` annotation on the field's line.
    pub comment: Option<String>,
}

impl Field {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            comment: None,
        }
    }

    pub fn annotated(value: impl Into<String>, comment: impl AsRef<str>) -> Self {
        Self {
            value: value.into(),
            comment: Some(format!("!- {}", comment.as_ref())),
        }
    }
}

/// A model object as a class name plus positional fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawObject {
    class: String,
    fields: Vec<Field>,
    /// Whitespace and comments between the previous object and this one.
    leading: String,
    /// Original text from the class name through the terminating `;`. Dropped once the object is edited.
    source: Option<String>,
    line: usize,
}

impl RawObject {
    pub fn new(class: impl Into<String>, fields: Vec<Field>) -> Self {
        Self {
            class: class.into(),
            fields,
            leading: SYNTHESIZED_LEADING.to_string(),
            source: None,
            line: 0,
        }
    }

    pub(super) fn parsed(class: String, fields: Vec<Field>, leading: String, source: String, line: usize) -> Self {
        Self {
            class,
            fields,
            leading,
            source: Some(source),
            line,
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn is_class(&self, class: &str) -> bool {
        self.class.eq_ignore_ascii_case(class)
    }

    /// 1-based line of the class name in the source text, 0 for synthesized objects.
    pub fn line(&self) -> usize {
        self.line
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, idx: usize) -> Option<&str> {
        self.fields.get(idx).map(|field| field.value.as_str())
    }

    /// The first field, which names the object for most classes.
    pub fn name(&self) -> Option<&str> {
        self.field(0).filter(|name| !name.is_empty())
    }

    /// Sets field `idx`, padding with empty fields as needed.
    pub fn set_field(&mut self, idx: usize, value: impl Into<String>) {
        if self.fields.len() <= idx {
            self.fields.resize(idx + 1, Field::new(""));
        }
        self.fields[idx].value = value.into();
        self.source = None;
    }

    pub fn is_edited(&self) -> bool {
        self.source.is_none()
    }

    /// Whether any field holds `name`, compared case-insensitively.
    pub fn references(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field.value.eq_ignore_ascii_case(name))
    }

    pub(super) fn render_into(&self, out: &mut String) {
        out.push_str(&self.leading);
        match &self.source {
            Some(source) => out.push_str(source),
            None => self.format_body(out),
        }
    }

    fn format_body(&self, out: &mut String) {
        out.push_str(&self.class);
        if self.fields.is_empty() {
            out.push(';');
            return;
        }
        out.push(',');
        let last = self.fields.len() - 1;
        for (idx, field) in self.fields.iter().enumerate() {
            let terminator = if idx == last { ';' } else { ',' };
            let value = format!("{}{terminator}", field.value);
            out.push('\n');
            out.push_str(FIELD_INDENT);
            match &field.comment {
                Some(comment) => {
                    let _ = write!(out, "{value:<width$} {comment}", width = COMMENT_COLUMN - 2);
                }
                None => out.push_str(&value),
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, strum::Display, strum::EnumIter)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Channel {
    Heating,
    Cooling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdealLoadsFlavor {
    /// `ZoneHVAC:IdealLoadsAirSystem`
    ZoneHvac,
    /// `HVACTemplate:Zone:IdealLoadsAirSystem`
    Template,
}

impl IdealLoadsFlavor {
    pub fn class_name(self) -> &'static str {
        match self {
            IdealLoadsFlavor::ZoneHvac => "ZoneHVAC:IdealLoadsAirSystem",
            IdealLoadsFlavor::Template => "HVACTemplate:Zone:IdealLoadsAirSystem",
        }
    }

    fn from_class(class: &str) -> Option<Self> {
        [IdealLoadsFlavor::Template, IdealLoadsFlavor::ZoneHvac]
            .into_iter()
            .find(|flavor| flavor.class_name().eq_ignore_ascii_case(class))
    }

    /// Position of the schedule gating the whole system.
    pub fn system_availability_field(self) -> usize {
        match self {
            IdealLoadsFlavor::ZoneHvac => 1,
            IdealLoadsFlavor::Template => 2,
        }
    }

    /// Position of the heating/cooling availability schedule among the object's fields.
    pub fn availability_field(self, channel: Channel) -> usize {
        match (self, channel) {
            (IdealLoadsFlavor::ZoneHvac, Channel::Heating) => 15,
            (IdealLoadsFlavor::ZoneHvac, Channel::Cooling) => 16,
            (IdealLoadsFlavor::Template, Channel::Heating) => 13,
            (IdealLoadsFlavor::Template, Channel::Cooling) => 14,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deref, DerefMut)]
pub struct Version(RawObject);

impl Version {
    pub fn identifier(&self) -> Option<&str> {
        self.0.field(0)
    }

    pub fn number(&self) -> Result<VersionNumber, String> {
        self.identifier().unwrap_or_default().parse()
    }

    pub fn set_number(&mut self, version: VersionNumber) {
        self.0.set_field(0, version.to_string());
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deref, DerefMut)]
pub struct ScheduleTypeLimits(RawObject);

impl ScheduleTypeLimits {
    pub const FRACTION: &'static str = "Fraction";

    /// Continuous 0..1 limits.
    pub fn fraction() -> Self {
        Self(RawObject::new(
            "ScheduleTypeLimits",
            vec![
                Field::annotated(Self::FRACTION, "Name"),
                Field::annotated("0", "Lower Limit Value"),
                Field::annotated("1", "Upper Limit Value"),
                Field::annotated("Continuous", "Numeric Type"),
            ],
        ))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deref, DerefMut)]
pub struct ScheduleCompact(RawObject);

impl ScheduleCompact {
    pub fn new(name: &str, type_limits: &str, data: Vec<String>) -> Self {
        let mut fields = vec![
            Field::annotated(name, "Name"),
            Field::annotated(type_limits, "Schedule Type Limits Name"),
        ];
        fields.extend(
            data.into_iter()
                .enumerate()
                .map(|(idx, value)| Field::annotated(value, format!("Field {}", idx + 1))),
        );
        Self(RawObject::new("Schedule:Compact", fields))
    }

    pub fn type_limits(&self) -> Option<&str> {
        self.0.field(1).filter(|limits| !limits.is_empty())
    }

    /// Value of the first day-type rule of the `Through:` block covering `date`.
    pub fn value_on(&self, date: CalendarDate) -> Option<f64> {
        let mut covering = false;
        for field in self.0.fields().iter().skip(2) {
            let value = field.value.trim();
            if let Some(through) = strip_keyword(value, "through:") {
                if covering {
                    return None;
                }
                covering = through.parse::<CalendarDate>().is_ok_and(|end| date <= end);
            } else if strip_keyword(value, "for:").is_some()
                || strip_keyword(value, "until:").is_some()
                || strip_keyword(value, "interpolate:").is_some()
            {
                continue;
            } else if covering {
                return value.parse().ok();
            }
        }
        None
    }
}

fn strip_keyword<'a>(value: &'a str, keyword: &str) -> Option<&'a str> {
    let head = value.get(..keyword.len())?;
    head.eq_ignore_ascii_case(keyword)
        .then(|| value[keyword.len()..].trim())
}

#[derive(Debug, Clone, PartialEq, Eq, Deref, DerefMut)]
pub struct IdealLoadsSystem {
    #[deref]
    #[deref_mut]
    raw: RawObject,
    flavor: IdealLoadsFlavor,
}

impl IdealLoadsSystem {
    pub fn flavor(&self) -> IdealLoadsFlavor {
        self.flavor
    }

    /// Name of the schedule gating `channel`, `None` when the field is blank or absent.
    pub fn availability_schedule(&self, channel: Channel) -> Option<&str> {
        self.schedule_at(self.flavor.availability_field(channel))
    }

    pub fn system_availability_schedule(&self) -> Option<&str> {
        self.schedule_at(self.flavor.system_availability_field())
    }

    fn schedule_at(&self, idx: usize) -> Option<&str> {
        self.raw.field(idx).map(str::trim).filter(|name| !name.is_empty())
    }

    /// Points `channel` at `schedule`; an empty name clears the field. Returns whether anything changed.
    pub fn set_availability_schedule(&mut self, channel: Channel, schedule: &str) -> bool {
        let current = self.availability_schedule(channel).unwrap_or_default();
        if current.eq_ignore_ascii_case(schedule) {
            return false;
        }
        self.raw.set_field(self.flavor.availability_field(channel), schedule);
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deref, DerefMut)]
pub struct OutputVariable(RawObject);

impl OutputVariable {
    pub const ZONE_MEAN_AIR_TEMPERATURE: &'static str = "Zone Mean Air Temperature";

    /// Hourly zone mean air temperature for every zone.
    pub fn zone_mean_air_temperature() -> Self {
        Self(RawObject::new(
            "Output:Variable",
            vec![
                Field::annotated("*", "Key Value"),
                Field::annotated(Self::ZONE_MEAN_AIR_TEMPERATURE, "Variable Name"),
                Field::annotated("Hourly", "Reporting Frequency"),
            ],
        ))
    }

    pub fn key_value(&self) -> Option<&str> {
        self.0.field(0)
    }

    pub fn variable_name(&self) -> Option<&str> {
        self.0.field(1)
    }

    pub fn reporting_frequency(&self) -> Option<&str> {
        self.0.field(2)
    }
}

/// A model object, typed for the classes the outage workflow reads or writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelObject {
    Version(Version),
    ScheduleCompact(ScheduleCompact),
    ScheduleTypeLimits(ScheduleTypeLimits),
    IdealLoads(IdealLoadsSystem),
    OutputVariable(OutputVariable),
    Other(RawObject),
}

impl ModelObject {
    pub fn from_raw(raw: RawObject) -> Self {
        if let Some(flavor) = IdealLoadsFlavor::from_class(raw.class()) {
            return ModelObject::IdealLoads(IdealLoadsSystem { raw, flavor });
        }
        match raw.class().to_ascii_lowercase().as_str() {
            "version" => ModelObject::Version(Version(raw)),
            "schedule:compact" => ModelObject::ScheduleCompact(ScheduleCompact(raw)),
            "scheduletypelimits" => ModelObject::ScheduleTypeLimits(ScheduleTypeLimits(raw)),
            "output:variable" => ModelObject::OutputVariable(OutputVariable(raw)),
            _ => ModelObject::Other(raw),
        }
    }

    pub fn raw(&self) -> &RawObject {
        match self {
            ModelObject::Version(object) => &object.0,
            ModelObject::ScheduleCompact(object) => &object.0,
            ModelObject::ScheduleTypeLimits(object) => &object.0,
            ModelObject::IdealLoads(object) => &object.raw,
            ModelObject::OutputVariable(object) => &object.0,
            ModelObject::Other(object) => object,
        }
    }

    pub fn raw_mut(&mut self) -> &mut RawObject {
        match self {
            ModelObject::Version(object) => &mut object.0,
            ModelObject::ScheduleCompact(object) => &mut object.0,
            ModelObject::ScheduleTypeLimits(object) => &mut object.0,
            ModelObject::IdealLoads(object) => &mut object.raw,
            ModelObject::OutputVariable(object) => &mut object.0,
            ModelObject::Other(object) => object,
        }
    }

    /// Whether this is a schedule (any `Schedule:*` class) called `name`.
    pub fn is_schedule_named(&self, name: &str) -> bool {
        let raw = self.raw();
        let is_schedule = raw
            .class()
            .get(..9)
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case("schedule:"));
        is_schedule && raw.name().is_some_and(|own| own.eq_ignore_ascii_case(name))
    }
}

impl From<ScheduleCompact> for ModelObject {
    fn from(object: ScheduleCompact) -> Self {
        ModelObject::ScheduleCompact(object)
    }
}

impl From<ScheduleTypeLimits> for ModelObject {
    fn from(object: ScheduleTypeLimits) -> Self {
        ModelObject::ScheduleTypeLimits(object)
    }
}

impl From<OutputVariable> for ModelObject {
    fn from(object: OutputVariable) -> Self {
        ModelObject::OutputVariable(object)
    }
}

impl From<IdealLoadsSystem> for ModelObject {
    fn from(object: IdealLoadsSystem) -> Self {
        ModelObject::IdealLoads(object)
    }
}

impl From<Version> for ModelObject {
    fn from(object: Version) -> Self {
        ModelObject::Version(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rendered(raw: &RawObject) -> String {
        let mut out = String::new();
        raw.render_into(&mut out);
        out
    }

    #[test]
    fn renders_synthesized_objects_one_field_per_line() {
        let object = OutputVariable::zone_mean_air_temperature();
        let expected = [
            "".to_string(),
            "".to_string(),
            "Output:Variable,".to_string(),
            format!("    *,{}!- Key Value", " ".repeat(23)),
            "    Zone Mean Air Temperature, !- Variable Name".to_string(),
            format!("    Hourly;{}!- Reporting Frequency", " ".repeat(18)),
        ]
        .join("\n");
        assert_eq!(rendered(&object), expected);
    }

    #[test]
    fn pads_missing_fields_when_setting_availability() {
        let raw = RawObject::new("ZoneHVAC:IdealLoadsAirSystem", vec![Field::new("Zone1 Ideal Loads")]);
        let ModelObject::IdealLoads(mut system) = ModelObject::from_raw(raw) else {
            panic!("expected an ideal loads system");
        };
        assert_eq!(system.availability_schedule(Channel::Cooling), None);
        assert!(system.set_availability_schedule(Channel::Cooling, "Cooling_Outage_Schedule"));
        assert!(!system.set_availability_schedule(Channel::Cooling, "cooling_outage_schedule"));
        assert_eq!(system.fields().len(), 17);
        assert_eq!(system.availability_schedule(Channel::Cooling), Some("Cooling_Outage_Schedule"));
        assert_eq!(system.availability_schedule(Channel::Heating), None);
    }

    #[test]
    fn classifies_case_insensitively() {
        let raw = RawObject::new("hvactemplate:zone:idealloadsairsystem", vec![Field::new("Zone1")]);
        match ModelObject::from_raw(raw) {
            ModelObject::IdealLoads(system) => assert_eq!(system.flavor(), IdealLoadsFlavor::Template),
            other => panic!("unexpected object: {other:?}"),
        }
        assert!(matches!(
            ModelObject::from_raw(RawObject::new("SCHEDULE:COMPACT", vec![])),
            ModelObject::ScheduleCompact(_)
        ));
    }

    #[test]
    fn evaluates_compact_schedules_by_day() {
        let schedule = ScheduleCompact::new(
            "Outage",
            "Fraction",
            [
                "Through: 07/14", "For: AllDays", "Until: 24:00", "1",
                "Through: 07/16", "For: AllDays", "Until: 24:00", "0",
                "Through: 12/31", "For: AllDays", "Until: 24:00", "1",
            ]
            .map(String::from)
            .to_vec(),
        );
        let date = |month, day| CalendarDate::new(month, day).unwrap();
        assert_eq!(schedule.value_on(date(7, 14)), Some(1.0));
        assert_eq!(schedule.value_on(date(7, 15)), Some(0.0));
        assert_eq!(schedule.value_on(date(7, 16)), Some(0.0));
        assert_eq!(schedule.value_on(date(7, 17)), Some(1.0));
        assert!(ModelObject::from(schedule).is_schedule_named("outage"));
    }
}
