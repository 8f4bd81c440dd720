use chrono::{
    Datelike,
    NaiveDate,
};
use std::{
    fmt,
    str::FromStr,
};

/// Weather files and compact schedules address days without a year. Dates are laid out on a leap-year grid so
/// that 02/29 is representable; non-leap data simply never produces it.
const REFERENCE_YEAR: i32 = 2020;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid calendar date: {0}")]
pub struct InvalidDate(pub String);

/// A month/day pair, ordered by calendar position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CalendarDate {
    month: u8,
    day: u8,
}

impl CalendarDate {
    pub const FIRST: CalendarDate = CalendarDate { month: 1, day: 1 };
    pub const LAST: CalendarDate = CalendarDate { month: 12, day: 31 };

    pub fn new(month: u8, day: u8) -> Result<Self, InvalidDate> {
        match NaiveDate::from_ymd_opt(REFERENCE_YEAR, month.into(), day.into()) {
            Some(_) => Ok(Self { month, day }),
            None => Err(InvalidDate(format!("{month:02}/{day:02}"))),
        }
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    /// Day of year on the leap-year grid, 1-based.
    pub fn ordinal(&self) -> u32 {
        self.naive().ordinal()
    }

    pub fn succ(&self) -> Option<Self> {
        self.naive()
            .succ_opt()
            .filter(|next| next.year() == REFERENCE_YEAR)
            .map(Self::from_naive)
    }

    pub fn pred(&self) -> Option<Self> {
        self.naive()
            .pred_opt()
            .filter(|prev| prev.year() == REFERENCE_YEAR)
            .map(Self::from_naive)
    }

    /// Moves forward by `days`, stopping at 12/31.
    pub fn saturating_add_days(&self, days: u32) -> Self {
        let target = self.ordinal().saturating_add(days);
        NaiveDate::from_yo_opt(REFERENCE_YEAR, target)
            .map(Self::from_naive)
            .unwrap_or(Self::LAST)
    }

    /// Whether `self` is the calendar day right after `previous`. 02/28 -> 03/01 counts as consecutive so that
    /// non-leap data is accepted.
    pub fn follows(&self, previous: CalendarDate) -> bool {
        if previous.succ() == Some(*self) {
            return true;
        }
        previous == (CalendarDate { month: 2, day: 28 }) && *self == (CalendarDate { month: 3, day: 1 })
    }

    fn naive(&self) -> NaiveDate {
        // Construction guarantees the date exists on the reference grid.
        NaiveDate::from_ymd_opt(REFERENCE_YEAR, self.month.into(), self.day.into()).unwrap_or_default()
    }

    fn from_naive(date: NaiveDate) -> Self {
        Self {
            month: date.month() as u8,
            day: date.day() as u8,
        }
    }
}

impl fmt::Display for CalendarDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}/{:02}", self.month, self.day)
    }
}

impl FromStr for CalendarDate {
    type Err = InvalidDate;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let (month, day) = input
            .trim()
            .split_once('/')
            .ok_or_else(|| InvalidDate(format!("{input:?} is not in MM/DD form")))?;
        let month = month
            .trim()
            .parse::<u8>()
            .map_err(|_| InvalidDate(format!("{input:?} has a non-numeric month")))?;
        let day = day
            .trim()
            .parse::<u8>()
            .map_err(|_| InvalidDate(format!("{input:?} has a non-numeric day")))?;
        Self::new(month, day)
    }
}

impl serde::Serialize for CalendarDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for CalendarDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        String::deserialize(deserializer)?
            .parse()
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(month: u8, day: u8) -> CalendarDate {
        CalendarDate::new(month, day).unwrap()
    }

    #[test]
    fn parses_and_prints_month_day() {
        assert_eq!("7/15".parse::<CalendarDate>().unwrap(), date(7, 15));
        assert_eq!(date(7, 15).to_string(), "07/15");
        assert!("02/30".parse::<CalendarDate>().is_err());
        assert!("13/01".parse::<CalendarDate>().is_err());
        assert!("0715".parse::<CalendarDate>().is_err());
    }

    #[test]
    fn steps_within_the_year() {
        assert_eq!(date(2, 28).succ(), Some(date(2, 29)));
        assert_eq!(date(3, 1).pred(), Some(date(2, 29)));
        assert_eq!(CalendarDate::LAST.succ(), None);
        assert_eq!(CalendarDate::FIRST.pred(), None);
        assert_eq!(date(12, 30).saturating_add_days(5), CalendarDate::LAST);
        assert_eq!(date(7, 15).saturating_add_days(3), date(7, 18));
    }

    #[test]
    fn non_leap_february_is_consecutive() {
        assert!(date(3, 1).follows(date(2, 28)));
        assert!(date(3, 1).follows(date(2, 29)));
        assert!(!date(3, 2).follows(date(2, 28)));
        assert!(date(1, 2).follows(date(1, 1)));
    }
}
