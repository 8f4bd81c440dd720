use super::{
    IdfDocument,
    IdfError,
    RawObject,
    VersionNumber,
};
use std::{
    collections::HashMap,
    path::Path,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Alpha,
    Numeric,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub kind: FieldKind,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDef {
    pub name: String,
    pub fields: Vec<FieldDef>,
    /// Size of the trailing field group that may repeat indefinitely.
    pub extensible: Option<usize>,
    pub min_fields: usize,
}

impl ClassDef {
    fn new(name: String) -> Self {
        Self {
            name,
            fields: Vec::new(),
            extensible: None,
            min_fields: 0,
        }
    }

    /// Definition governing field `idx`, following the extensible group past the declared fields.
    pub fn field(&self, idx: usize) -> Option<&FieldDef> {
        if let Some(field) = self.fields.get(idx) {
            return Some(field);
        }
        let group = self.extensible.filter(|group| *group > 0 && *group <= self.fields.len())?;
        let start = self.fields.len() - group;
        self.fields.get(start + (idx - start) % group)
    }
}

/// Object classes and field layouts of one engine version, read from its data dictionary (`Energy+.idd`).
#[derive(Debug, Clone, Default)]
pub struct Schema {
    version: Option<VersionNumber>,
    classes: HashMap<String, ClassDef>,
}

impl Schema {
    pub fn from_path(path: &Path) -> Result<Self, IdfError> {
        let text = std::fs::read_to_string(path).map_err(|source| IdfError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let schema = Self::parse(&text)?;
        debug!("Loaded {} object classes from {}", schema.classes.len(), path.display());
        Ok(schema)
    }

    pub fn parse(text: &str) -> Result<Self, IdfError> {
        let mut schema = Schema::default();
        let mut current: Option<ClassDef> = None;

        for (idx, line) in text.lines().enumerate() {
            let line_no = idx + 1;
            let trimmed = line.trim();
            if let Some(version) = trimmed.strip_prefix("!IDD_Version") {
                schema.version = version.trim().parse().ok();
                continue;
            }
            let content = trimmed.split('!').next().unwrap_or_default().trim();
            let mut rest = content;

            while !rest.is_empty() {
                if let Some(property) = rest.strip_prefix('\\') {
                    apply_property(current.as_mut(), property);
                    break;
                }
                if let Some((kind, after)) = field_token(rest) {
                    let class = current.as_mut().ok_or_else(|| IdfError::SchemaParse {
                        line: line_no,
                        reason: "field definition outside of an object class".to_string(),
                    })?;
                    class.fields.push(FieldDef { kind, name: None });
                    rest = after;
                    continue;
                }
                let split = rest.find([',', ';']).ok_or_else(|| IdfError::SchemaParse {
                    line: line_no,
                    reason: format!("expected a class name terminated by ',' or ';', found {rest:?}"),
                })?;
                if let Some(done) = current.take() {
                    schema.insert(done);
                }
                current = Some(ClassDef::new(rest[..split].trim().to_string()));
                rest = rest[split + 1..].trim_start();
            }
        }
        if let Some(done) = current.take() {
            schema.insert(done);
        }
        Ok(schema)
    }

    fn insert(&mut self, class: ClassDef) {
        self.classes.insert(class.name.to_ascii_lowercase(), class);
    }

    pub fn version(&self) -> Option<VersionNumber> {
        self.version
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn class(&self, name: &str) -> Option<&ClassDef> {
        self.classes.get(&name.to_ascii_lowercase())
    }

    pub fn validate(&self, document: &IdfDocument) -> Result<(), IdfError> {
        document
            .objects()
            .iter()
            .try_for_each(|object| self.validate_object(object.raw()))
    }

    /// Checks that the object's class exists, that it has no more fields than the class allows and that
    /// numeric fields hold numbers.
    pub fn validate_object(&self, object: &RawObject) -> Result<(), IdfError> {
        let mismatch = |reason: String| IdfError::SchemaMismatch {
            line: object.line(),
            class: object.class().to_string(),
            reason,
        };
        let class = self
            .class(object.class())
            .ok_or_else(|| mismatch("unknown object class".to_string()))?;

        for (idx, field) in object.fields().iter().enumerate() {
            let def = class.field(idx).ok_or_else(|| {
                mismatch(format!(
                    "{} fields given, the class defines {}",
                    object.fields().len(),
                    class.fields.len()
                ))
            })?;
            if def.kind == FieldKind::Numeric && !is_numeric(&field.value) {
                let name = def.name.as_deref().unwrap_or("unnamed");
                return Err(mismatch(format!(
                    "field {} ({name}) expects a number, found {:?}",
                    idx + 1,
                    field.value
                )));
            }
        }
        Ok(())
    }
}

fn apply_property(class: Option<&mut ClassDef>, property: &str) {
    let Some(class) = class else {
        return;
    };
    if let Some(name) = property.strip_prefix("field") {
        if let Some(field) = class.fields.last_mut() {
            field.name.get_or_insert_with(|| name.trim().to_string());
        }
    } else if let Some(group) = property.strip_prefix("extensible:") {
        let digits: String = group.chars().take_while(char::is_ascii_digit).collect();
        class.extensible = digits.parse().ok();
    } else if let Some(count) = property.strip_prefix("min-fields") {
        class.min_fields = count.trim().parse().unwrap_or_default();
    }
}

/// `A1 ,` or `N12;` at the start of `input`, returning the kind and the text after the terminator.
fn field_token(input: &str) -> Option<(FieldKind, &str)> {
    let kind = match input.as_bytes().first()? {
        b'A' => FieldKind::Alpha,
        b'N' => FieldKind::Numeric,
        _ => return None,
    };
    let digits = input[1..].bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let after_digits = input[1 + digits..].trim_start();
    match after_digits.as_bytes().first()? {
        b',' | b';' => Some((kind, after_digits[1..].trim_start())),
        _ => None,
    }
}

fn is_numeric(value: &str) -> bool {
    let value = value.trim();
    value.is_empty()
        || value.eq_ignore_ascii_case("autosize")
        || value.eq_ignore_ascii_case("autocalculate")
        || value.parse::<f64>().is_ok()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::idf::document::tests::SMALL_MODEL;
    use pretty_assertions::assert_eq;

    /// Trimmed-down data dictionary covering the classes the tests use.
    pub(crate) const SMALL_IDD: &str = r"!IDD_Version 25.1.0
\group Simulation Parameters

Version,
      \unique-object
  A1 ; \field Version Identifier
      \default 25.1

Lead Input;

Zone,
  A1 , \field Name
  N1 , \field Direction of Relative North
  N2 , \field X Origin
  N3 , \field Y Origin
  N4 ; \field Z Origin

ScheduleTypeLimits,
  A1 , \field Name
  N1 , \field Lower Limit Value
  N2 , \field Upper Limit Value
  A2 , \field Numeric Type
  A3 ; \field Unit Type

Schedule:Compact,
      \extensible:1 - repeat last field, remembering to remove ; from inner fields.
      \min-fields 5
  A1 , \field Name
  A2 , \field Schedule Type Limits Name
  A3 , \field Field 1
  A4 ; \field Field 2

Schedule:Constant,
  A1 , \field Name
  A2 , \field Schedule Type Limits Name
  N1 ; \field Hourly Value

ZoneHVAC:IdealLoadsAirSystem,
  A1 , \field Name
  A2 , \field Availability Schedule Name
  A3 , \field Zone Supply Air Node Name
  A4 , \field Zone Exhaust Air Node Name
  A5 , \field System Inlet Air Node Name
  N1 , \field Maximum Heating Supply Air Temperature
  N2 , \field Minimum Cooling Supply Air Temperature
  N3 , \field Maximum Heating Supply Air Humidity Ratio
  N4 , \field Minimum Cooling Supply Air Humidity Ratio
  A6 , \field Heating Limit
  N5 , \field Maximum Heating Air Flow Rate
  N6 , \field Maximum Sensible Heating Capacity
  A7 , \field Cooling Limit
  N7 , \field Maximum Cooling Air Flow Rate
  N8 , \field Maximum Total Cooling Capacity
  A8 , \field Heating Availability Schedule Name
  A9 , \field Cooling Availability Schedule Name
  A10; \field Dehumidification Control Type

HVACTemplate:Zone:IdealLoadsAirSystem,
  A1 , \field Zone Name
  A2 , \field Template Thermostat Name
  A3 , \field System Availability Schedule Name
  N1 , \field Maximum Heating Supply Air Temperature
  N2 , \field Minimum Cooling Supply Air Temperature
  N3 , \field Maximum Heating Supply Air Humidity Ratio
  N4 , \field Minimum Cooling Supply Air Humidity Ratio
  A4 , \field Heating Limit
  N5 , \field Maximum Heating Air Flow Rate
  N6 , \field Maximum Sensible Heating Capacity
  A5 , \field Cooling Limit
  N7 , \field Maximum Cooling Air Flow Rate
  N8 , \field Maximum Total Cooling Capacity
  A6 , \field Heating Availability Schedule Name
  A7 ; \field Cooling Availability Schedule Name

Output:Variable,
  A1 , \field Key Value
  A2 , \field Variable Name
  A3 , \field Reporting Frequency
  A4 ; \field Schedule Name
";

    #[test]
    fn parses_classes_fields_and_properties() {
        let schema = Schema::parse(SMALL_IDD).unwrap();
        assert_eq!(schema.version(), Some(VersionNumber::new(25, 1, 0)));
        assert_eq!(schema.len(), 9);

        let lead = schema.class("lead input").unwrap();
        assert!(lead.fields.is_empty());

        let compact = schema.class("SCHEDULE:COMPACT").unwrap();
        assert_eq!(compact.extensible, Some(1));
        assert_eq!(compact.min_fields, 5);
        assert_eq!(compact.fields.len(), 4);
        assert_eq!(compact.fields[2].name.as_deref(), Some("Field 1"));
        assert_eq!(compact.field(40).map(|field| field.kind), Some(FieldKind::Alpha));

        let zone = schema.class("Zone").unwrap();
        assert_eq!(zone.fields[1].kind, FieldKind::Numeric);
        assert_eq!(zone.field(5), None);
    }

    #[test]
    fn validates_documents() {
        let schema = Schema::parse(SMALL_IDD).unwrap();
        let document = IdfDocument::parse(SMALL_MODEL).unwrap();
        schema.validate(&document).unwrap();
    }

    #[test]
    fn rejects_unknown_classes_extra_fields_and_non_numeric_values() {
        let schema = Schema::parse(SMALL_IDD).unwrap();

        let unknown = IdfDocument::parse("Version,25.1;\nBuilding,Office;\n").unwrap();
        match schema.validate(&unknown) {
            Err(IdfError::SchemaMismatch { line, class, .. }) => {
                assert_eq!(line, 2);
                assert_eq!(class, "Building");
            }
            other => panic!("unexpected result: {other:?}"),
        }

        let extra = IdfDocument::parse("Zone,Zone1,0,0,0,0,7;\n").unwrap();
        assert!(matches!(schema.validate(&extra), Err(IdfError::SchemaMismatch { .. })));

        let text = IdfDocument::parse("Zone,Zone1,north,0,0,0;\n").unwrap();
        match schema.validate(&text) {
            Err(IdfError::SchemaMismatch { reason, .. }) => assert!(reason.contains("Direction"), "{reason}"),
            other => panic!("unexpected result: {other:?}"),
        }

        let autosized = IdfDocument::parse("Schedule:Constant,On,,Autosize;\nZone,Zone1,,0,0,0;\n").unwrap();
        schema.validate(&autosized).unwrap();
    }

    #[test]
    fn rejects_fields_before_any_class() {
        assert!(matches!(
            Schema::parse("  A1 ; \\field Orphan\n"),
            Err(IdfError::SchemaParse { line: 1, .. })
        ));
    }
}
