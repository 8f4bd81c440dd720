use super::OutagePeriod;
use crate::{
    idf::{
        Channel,
        IdealLoadsSystem,
        IdfDocument,
        ModelObject,
        ScheduleCompact,
        ScheduleTypeLimits,
    },
    CalendarDate,
};

/// A fraction schedule that is 0 on every day of `period` and 1 on all other days of the year.
pub fn outage_schedule(name: &str, period: &OutagePeriod) -> ScheduleCompact {
    let mut data = Vec::with_capacity(12);
    let mut block = |through: CalendarDate, value: &str| {
        data.extend([
            format!("Through: {through}"),
            "For: AllDays".to_string(),
            "Until: 24:00".to_string(),
            value.to_string(),
        ]);
    };

    if let Some(before) = period.start().pred() {
        block(before, "1");
    }
    block(period.end(), "0");
    if period.end() < CalendarDate::LAST {
        block(CalendarDate::LAST, "1");
    }
    ScheduleCompact::new(name, ScheduleTypeLimits::FRACTION, data)
}

/// Availability of `system` for `channel` on `date`: the lower of the system-wide and the channel schedule.
///
/// A blank schedule field means always available. `None` if a referenced schedule is missing or cannot be
/// evaluated by day.
pub fn effective_availability(
    document: &IdfDocument,
    system: &IdealLoadsSystem,
    channel: Channel,
    date: CalendarDate,
) -> Option<f64> {
    let system_wide = schedule_value(document, system.system_availability_schedule(), date)?;
    let channel_value = schedule_value(document, system.availability_schedule(channel), date)?;
    Some(system_wide.min(channel_value))
}

fn schedule_value(document: &IdfDocument, name: Option<&str>, date: CalendarDate) -> Option<f64> {
    let Some(name) = name else {
        return Some(1.0);
    };
    match document.find_schedule(name)?.1 {
        ModelObject::ScheduleCompact(schedule) => schedule.value_on(date),
        other if other.raw().is_class("Schedule:Constant") => other.raw().field(2)?.trim().parse().ok(),
        _ => None,
    }
}
