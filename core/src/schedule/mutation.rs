use super::{
    outage_schedule,
    OutageAction,
    OutagePeriod,
    ScheduleError,
};
use crate::{
    idf::{
        Channel,
        Field,
        IdfDocument,
        IdfError,
        ModelObject,
        OutputVariable,
        RawObject,
        ScheduleTypeLimits,
        VersionNumber,
    },
    CalendarDate,
};
use serde::Serialize;
use std::{
    collections::HashMap,
    path::PathBuf,
};
use strum::IntoEnumIterator;

pub const DEFAULT_TARGET_VERSION: VersionNumber = VersionNumber::new(25, 1, 0);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationOptions {
    /// Overrides the action's default outage schedule name.
    pub schedule_name: Option<String>,
    /// Version written into models older than `minimum_version`.
    pub target_version: VersionNumber,
    pub minimum_version: VersionNumber,
    pub add_zone_temperature_output: bool,
}

impl Default for MutationOptions {
    fn default() -> Self {
        Self {
            schedule_name: None,
            target_version: DEFAULT_TARGET_VERSION,
            minimum_version: DEFAULT_TARGET_VERSION,
            add_zone_temperature_output: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionChange {
    pub from: String,
    pub to: VersionNumber,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MutationSummary {
    pub source: Option<PathBuf>,
    pub destination: Option<PathBuf>,
    pub action: OutageAction,
    pub start: CalendarDate,
    pub end: CalendarDate,
    /// Outage schedule attached to the systems; `None` when restoring availability.
    pub schedule_name: Option<String>,
    /// Systems whose availability fields were changed by this run.
    pub systems_modified: usize,
    pub schedules_removed: Vec<String>,
    pub version_rewritten: Option<VersionChange>,
    pub output_variable_added: bool,
}

#[derive(Debug)]
enum Edit {
    Replace { index: usize, object: ModelObject },
    InsertBefore { index: usize, object: ModelObject },
    InsertAfter { index: usize, object: ModelObject },
    Append { object: ModelObject },
    Remove { index: usize },
}

/// The set of edits that applies one outage period to one model.
///
/// Planning only reads the document; applying consumes it and never fails, so a model is either fully
/// rewritten or left untouched.
#[derive(Debug)]
pub struct ScheduleMutation {
    edits: Vec<Edit>,
    summary: MutationSummary,
}

impl ScheduleMutation {
    pub fn plan(
        document: &IdfDocument,
        period: &OutagePeriod,
        options: &MutationOptions,
    ) -> Result<Self, ScheduleError> {
        let systems: Vec<_> = document.ideal_loads_systems().collect();
        if systems.is_empty() {
            return Err(ScheduleError::ScheduleNotFound {
                reason: "the model has no ZoneHVAC:IdealLoadsAirSystem or HVACTemplate:Zone:IdealLoadsAirSystem"
                    .to_string(),
            });
        }
        if let Some((_, system)) = systems.iter().find(|(_, system)| system.name().is_none()) {
            return Err(ScheduleError::ScheduleNotFound {
                reason: format!("{} at line {} has no name", system.class(), system.line()),
            });
        }

        let mut plan = Self {
            edits: Vec::new(),
            summary: MutationSummary {
                source: None,
                destination: None,
                action: period.action(),
                start: period.start(),
                end: period.end(),
                schedule_name: None,
                systems_modified: 0,
                schedules_removed: Vec::new(),
                version_rewritten: None,
                output_variable_added: false,
            },
        };

        plan.plan_version(document, options)?;
        if period.action().is_restore() {
            plan.plan_restore(document, options);
        } else {
            plan.plan_outage(document, period, options);
        }
        if options.add_zone_temperature_output {
            plan.plan_output_variable(document);
        }
        Ok(plan)
    }

    pub fn summary(&self) -> &MutationSummary {
        &self.summary
    }

    pub fn is_noop(&self) -> bool {
        self.edits.is_empty()
    }

    fn plan_version(&mut self, document: &IdfDocument, options: &MutationOptions) -> Result<(), ScheduleError> {
        let Some((index, version)) = document.version() else {
            return Ok(());
        };
        let current = version.number().map_err(|reason| IdfError::SchemaMismatch {
            line: version.line(),
            class: version.class().to_string(),
            reason,
        })?;
        if current >= options.minimum_version {
            return Ok(());
        }

        let mut updated = version.clone();
        updated.set_number(options.target_version);
        self.summary.version_rewritten = Some(VersionChange {
            from: version.identifier().unwrap_or_default().to_string(),
            to: options.target_version,
        });
        self.edits.push(Edit::Replace {
            index,
            object: updated.into(),
        });
        Ok(())
    }

    fn plan_outage(&mut self, document: &IdfDocument, period: &OutagePeriod, options: &MutationOptions) {
        let name = options
            .schedule_name
            .clone()
            .unwrap_or_else(|| period.action().default_schedule_name().to_string());

        let mut last_system = 0;
        for (index, system) in document.ideal_loads_systems() {
            last_system = index;
            let mut updated = system.clone();
            let mut changed = false;
            for channel in period.action().channels() {
                changed |= updated.set_availability_schedule(*channel, &name);
            }
            if changed {
                self.summary.systems_modified += 1;
                self.edits.push(Edit::Replace {
                    index,
                    object: updated.into(),
                });
            }
        }

        let schedule = outage_schedule(&name, period);
        let needs_limits = document.find("ScheduleTypeLimits", ScheduleTypeLimits::FRACTION).is_none();
        match document.find_schedule(&name) {
            Some((index, existing)) => {
                if needs_limits {
                    self.edits.push(Edit::InsertBefore {
                        index,
                        object: ScheduleTypeLimits::fraction().into(),
                    });
                }
                let unchanged = match existing {
                    ModelObject::ScheduleCompact(current) => same_values(current.fields(), schedule.fields()),
                    _ => false,
                };
                if !unchanged {
                    self.edits.push(Edit::Replace {
                        index,
                        object: schedule.into(),
                    });
                }
            }
            None => {
                if needs_limits {
                    self.edits.push(Edit::InsertAfter {
                        index: last_system,
                        object: ScheduleTypeLimits::fraction().into(),
                    });
                }
                self.edits.push(Edit::InsertAfter {
                    index: last_system,
                    object: schedule.into(),
                });
            }
        }
        self.summary.schedule_name = Some(name);
    }

    fn plan_restore(&mut self, document: &IdfDocument, options: &MutationOptions) {
        let mut outage_names: Vec<String> = OutageAction::iter()
            .filter(|action| !action.is_restore())
            .map(|action| action.default_schedule_name().to_string())
            .collect();
        outage_names.extend(options.schedule_name.clone());
        let is_outage = |name: &str| outage_names.iter().any(|outage| outage.eq_ignore_ascii_case(name));

        let mut updated_systems = HashMap::new();
        for (index, system) in document.ideal_loads_systems() {
            let mut updated = system.clone();
            let mut changed = false;
            for channel in Channel::iter() {
                if system.availability_schedule(channel).is_some_and(is_outage) {
                    changed |= updated.set_availability_schedule(channel, "");
                }
            }
            if changed {
                self.summary.systems_modified += 1;
                updated_systems.insert(index, updated);
            }
        }

        // Outage schedules nothing refers to any more are dropped.
        for (index, object) in document.objects().iter().enumerate() {
            let Some(name) = object.raw().name().filter(|name| is_outage(name)) else {
                continue;
            };
            if !object.is_schedule_named(name) {
                continue;
            }
            let referenced = document.objects().iter().enumerate().any(|(other, candidate)| {
                if other == index {
                    return false;
                }
                let candidate: &RawObject = match updated_systems.get(&other) {
                    Some(system) => &**system,
                    None => candidate.raw(),
                };
                candidate.references(name)
            });
            if !referenced {
                self.summary.schedules_removed.push(name.to_string());
                self.edits.push(Edit::Remove { index });
            }
        }

        let mut systems: Vec<_> = updated_systems.into_iter().collect();
        systems.sort_by_key(|(index, _)| *index);
        for (index, system) in systems {
            self.edits.push(Edit::Replace {
                index,
                object: system.into(),
            });
        }
    }

    fn plan_output_variable(&mut self, document: &IdfDocument) {
        let present = document.objects().iter().any(|object| match object {
            ModelObject::OutputVariable(variable) => variable
                .variable_name()
                .is_some_and(|name| name.eq_ignore_ascii_case(OutputVariable::ZONE_MEAN_AIR_TEMPERATURE)),
            _ => false,
        });
        if present {
            return;
        }
        let object = OutputVariable::zone_mean_air_temperature().into();
        self.edits.push(match document.last_index_of("Output:Variable") {
            Some(index) => Edit::InsertAfter { index, object },
            None => Edit::Append { object },
        });
        self.summary.output_variable_added = true;
    }

    /// Applies the planned edits. Indices refer to the document the plan was made from.
    pub fn apply(self, document: IdfDocument) -> (IdfDocument, MutationSummary) {
        let mut replacements = HashMap::new();
        let mut leading: HashMap<usize, Vec<ModelObject>> = HashMap::new();
        let mut insertions: HashMap<usize, Vec<ModelObject>> = HashMap::new();
        let mut removals = Vec::new();
        let mut appended = Vec::new();
        for edit in self.edits {
            match edit {
                Edit::Replace { index, object } => {
                    replacements.insert(index, object);
                }
                Edit::InsertBefore { index, object } => leading.entry(index).or_default().push(object),
                Edit::InsertAfter { index, object } => insertions.entry(index).or_default().push(object),
                Edit::Append { object } => appended.push(object),
                Edit::Remove { index } => removals.push(index),
            }
        }

        let (objects, trailer) = document.into_objects();
        let mut result = Vec::with_capacity(objects.len() + appended.len() + 2);
        for (index, object) in objects.into_iter().enumerate() {
            if let Some(inserted) = leading.remove(&index) {
                result.extend(inserted);
            }
            if !removals.contains(&index) {
                result.push(replacements.remove(&index).unwrap_or(object));
            }
            if let Some(inserted) = insertions.remove(&index) {
                result.extend(inserted);
            }
        }
        result.extend(appended);
        (IdfDocument::from_objects(result, trailer), self.summary)
    }
}

/// Field values equal, ignoring layout and comments.
fn same_values(left: &[Field], right: &[Field]) -> bool {
    left.len() == right.len() && left.iter().zip(right).all(|(a, b)| a.value == b.value)
}
