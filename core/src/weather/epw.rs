use super::WeatherError;
use crate::CalendarDate;
use csv::StringRecord;
use std::{
    fs::File,
    io,
    path::Path,
    str::FromStr,
};

const HEADER_LINES: usize = 8;
const MIN_FIELDS: usize = 7;
const YEAR_COLUMN: usize = 0;
const MONTH_COLUMN: usize = 1;
const DAY_COLUMN: usize = 2;
const HOUR_COLUMN: usize = 3;
const DRY_BULB_COLUMN: usize = 6;
const RELATIVE_HUMIDITY_COLUMN: usize = 8;
const HOURS_PER_DAY: usize = 24;

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct WeatherRecord {
    pub year: i32,
    pub date: CalendarDate,
    /// 1..=24, the hour ending at this record.
    pub hour: u8,
    /// Dry-bulb temperature in degrees Celsius.
    pub dry_bulb: f64,
    pub relative_humidity: Option<f64>,
    /// 1-based line of the record in its source file.
    #[serde(skip)]
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DailyAggregate {
    pub date: CalendarDate,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub records: usize,
}

#[derive(Debug, Clone, Default)]
pub struct EpwFile {
    /// City name from the LOCATION header, when present.
    pub location: Option<String>,
    pub records: Vec<WeatherRecord>,
}

impl EpwFile {
    pub fn from_path(path: &Path) -> Result<Self, WeatherError> {
        let file = File::open(path).map_err(|source| WeatherError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(file)
    }

    /// Reads the header block and every hourly data row. Rows are plain CSV; header lines are only inspected
    /// for the location.
    pub fn parse<R: io::Read>(reader: R) -> Result<Self, WeatherError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);
        let mut epw = EpwFile::default();
        let mut last_line = 0;
        let mut row = StringRecord::new();

        loop {
            match reader.read_record(&mut row) {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) => {
                    let line = err.position().map_or(last_line + 1, |pos| pos.line() as usize);
                    return Err(WeatherError::WeatherParse {
                        line,
                        reason: err.to_string(),
                    });
                }
            }
            let line_no = row.position().map_or(last_line + 1, |pos| pos.line() as usize);
            last_line = line_no;

            if line_no == 1 {
                epw.location = parse_location(&row);
            }
            if line_no <= HEADER_LINES || row.iter().all(|field| field.is_empty()) {
                continue;
            }
            epw.records.push(parse_record(&row, line_no)?);
        }

        if epw.records.is_empty() {
            return Err(WeatherError::WeatherParse {
                line: last_line,
                reason: "no hourly data rows after the header".to_string(),
            });
        }
        debug!("Parsed {} hourly weather records", epw.records.len());
        Ok(epw)
    }

    /// Collapses the hourly records into one aggregate per calendar day.
    ///
    /// Every day must carry each of its 24 hours exactly once and days must follow each other without gaps.
    pub fn daily_aggregates(&self) -> Result<Vec<DailyAggregate>, WeatherError> {
        let mut days: Vec<DailyAggregate> = Vec::new();
        let mut group = DayGroup::default();

        for record in &self.records {
            match group.date {
                Some(date) if date == record.date => {}
                Some(date) => {
                    days.push(group.finish()?);
                    if !record.date.follows(date) {
                        return Err(WeatherError::WeatherParse {
                            line: record.line,
                            reason: format!("expected the day after {date}, found {}", record.date),
                        });
                    }
                    group = DayGroup::default();
                }
                None => {}
            }
            group.push(record)?;
        }
        if group.date.is_some() {
            days.push(group.finish()?);
        }
        Ok(days)
    }
}

#[derive(Default)]
struct DayGroup {
    date: Option<CalendarDate>,
    hours: [bool; HOURS_PER_DAY],
    sum: f64,
    min: f64,
    max: f64,
    records: usize,
    last_line: usize,
}

impl DayGroup {
    fn push(&mut self, record: &WeatherRecord) -> Result<(), WeatherError> {
        let seen = &mut self.hours[usize::from(record.hour) - 1];
        if *seen {
            return Err(WeatherError::WeatherParse {
                line: record.line,
                reason: format!("duplicate hour {} on {}", record.hour, record.date),
            });
        }
        *seen = true;
        if self.records == 0 {
            self.min = record.dry_bulb;
            self.max = record.dry_bulb;
        }
        self.date = Some(record.date);
        self.sum += record.dry_bulb;
        self.min = self.min.min(record.dry_bulb);
        self.max = self.max.max(record.dry_bulb);
        self.records += 1;
        self.last_line = record.line;
        Ok(())
    }

    fn finish(&self) -> Result<DailyAggregate, WeatherError> {
        let date = self.date.unwrap_or(CalendarDate::FIRST);
        if self.records != HOURS_PER_DAY {
            return Err(WeatherError::WeatherParse {
                line: self.last_line,
                reason: format!("day {date} has {} of {HOURS_PER_DAY} hours", self.records),
            });
        }
        Ok(DailyAggregate {
            date,
            mean: self.sum / self.records as f64,
            min: self.min,
            max: self.max,
            records: self.records,
        })
    }
}

fn parse_location(row: &StringRecord) -> Option<String> {
    match row.get(0) {
        Some(tag) if tag.eq_ignore_ascii_case("LOCATION") => row
            .get(1)
            .filter(|city| !city.is_empty())
            .map(str::to_string),
        _ => None,
    }
}

fn parse_record(row: &StringRecord, line_no: usize) -> Result<WeatherRecord, WeatherError> {
    if row.len() < MIN_FIELDS {
        return Err(WeatherError::WeatherParse {
            line: line_no,
            reason: format!("expected at least {MIN_FIELDS} fields, found {}", row.len()),
        });
    }

    let year = parse_field(row, YEAR_COLUMN, "year", line_no)?;
    let month = parse_field(row, MONTH_COLUMN, "month", line_no)?;
    let day = parse_field(row, DAY_COLUMN, "day", line_no)?;
    let hour: u8 = parse_field(row, HOUR_COLUMN, "hour", line_no)?;
    let dry_bulb = parse_field(row, DRY_BULB_COLUMN, "dry-bulb temperature", line_no)?;

    let date = CalendarDate::new(month, day).map_err(|err| WeatherError::WeatherParse {
        line: line_no,
        reason: err.to_string(),
    })?;
    if !(1..=HOURS_PER_DAY as u8).contains(&hour) {
        return Err(WeatherError::WeatherParse {
            line: line_no,
            reason: format!("hour {hour} is outside 1..=24"),
        });
    }

    let relative_humidity = row.get(RELATIVE_HUMIDITY_COLUMN).and_then(|value| value.parse().ok());

    Ok(WeatherRecord {
        year,
        date,
        hour,
        dry_bulb,
        relative_humidity,
        line: line_no,
    })
}

fn parse_field<T: FromStr>(row: &StringRecord, column: usize, name: &str, line: usize) -> Result<T, WeatherError> {
    let raw = row.get(column).unwrap_or_default();
    raw.parse().map_err(|_| WeatherError::WeatherParse {
        line,
        reason: format!("{name} {raw:?} is not a number"),
    })
}
