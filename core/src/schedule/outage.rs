use super::ScheduleError;
use crate::{
    idf::Channel,
    weather::HottestWindow,
    CalendarDate,
};
use serde::Serialize;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, serde::Deserialize, strum::Display, strum::EnumString, strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum OutageAction {
    #[strum(to_string = "disable_cooling", serialize = "disable-cooling")]
    DisableCooling,
    #[strum(to_string = "disable_heating", serialize = "disable-heating")]
    DisableHeating,
    #[strum(to_string = "disable_all", serialize = "disable-all")]
    DisableAll,
    #[strum(to_string = "enable_all", serialize = "enable-all")]
    EnableAll,
}

impl OutageAction {
    pub fn default_schedule_name(self) -> &'static str {
        match self {
            OutageAction::DisableCooling => "Cooling_Outage_Schedule",
            OutageAction::DisableHeating => "Heating_Outage_Schedule",
            OutageAction::DisableAll => "HVAC_Outage_Schedule",
            OutageAction::EnableAll => "HVAC_Enable_Schedule",
        }
    }

    /// Availability fields the action points at its outage schedule. Empty for [`OutageAction::EnableAll`].
    pub fn channels(self) -> &'static [Channel] {
        match self {
            OutageAction::DisableCooling => &[Channel::Cooling],
            OutageAction::DisableHeating => &[Channel::Heating],
            OutageAction::DisableAll => &[Channel::Heating, Channel::Cooling],
            OutageAction::EnableAll => &[],
        }
    }

    pub fn is_restore(self) -> bool {
        self == OutageAction::EnableAll
    }
}

/// Inclusive range of days during which the HVAC system is unavailable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutagePeriod {
    start: CalendarDate,
    end: CalendarDate,
    action: OutageAction,
}

impl OutagePeriod {
    pub fn new(start: CalendarDate, end: CalendarDate, action: OutageAction) -> Result<Self, ScheduleError> {
        if end < start {
            return Err(ScheduleError::InvalidDateRange { start, end });
        }
        Ok(Self { start, end, action })
    }

    pub fn until_year_end(start: CalendarDate, action: OutageAction) -> Self {
        Self {
            start,
            end: CalendarDate::LAST,
            action,
        }
    }

    /// An outage of `duration_days` starting on the first day of a detected heat window, clamped to 12/31.
    pub fn from_window(window: &HottestWindow, duration_days: u32, action: OutageAction) -> Result<Self, ScheduleError> {
        if duration_days == 0 {
            return Err(ScheduleError::InvalidDateRange {
                start: window.start,
                end: window.start,
            });
        }
        let end = window.start.saturating_add_days(duration_days - 1);
        Self::new(window.start, end, action)
    }

    pub fn start(&self) -> CalendarDate {
        self.start
    }

    pub fn end(&self) -> CalendarDate {
        self.end
    }

    pub fn action(&self) -> OutageAction {
        self.action
    }

    pub fn contains(&self, date: CalendarDate) -> bool {
        self.start <= date && date <= self.end
    }
}
