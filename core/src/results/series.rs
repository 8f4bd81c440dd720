use super::{
    ExtractOptions,
    ResultsError,
    SummaryStats,
};
use serde::Serialize;
use std::{
    fs::File,
    io,
    path::Path,
};

/// One output column, e.g. `ZONE ONE:Zone Mean Air Temperature [C](Hourly)`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneColumn {
    pub header: String,
    /// Part before the first `:`, usually the zone name.
    pub key: String,
    pub unit: Option<String>,
    #[serde(skip)]
    pub values: Vec<f64>,
}

impl ZoneColumn {
    fn from_header(header: &str) -> Self {
        let key = header.split_once(':').map_or(header, |(key, _)| key).trim();
        let unit = header
            .split_once('[')
            .and_then(|(_, rest)| rest.split_once(']'))
            .map(|(unit, _)| unit.trim().to_string());
        Self {
            header: header.to_string(),
            key: key.to_string(),
            unit,
            values: Vec::new(),
        }
    }
}

/// The columns of one output variable, row-aligned with their timestamps.
#[derive(Debug, Clone, PartialEq)]
pub struct VariableSeries {
    pub variable: String,
    pub timestamps: Vec<String>,
    pub columns: Vec<ZoneColumn>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ZoneSummary {
    pub key: String,
    pub unit: Option<String>,
    pub stats: Option<SummaryStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub variable: String,
    pub points: usize,
    pub zones: Vec<ZoneSummary>,
    /// Statistics of the per-timestamp mean across zones.
    pub zone_mean: Option<SummaryStats>,
}

impl VariableSeries {
    /// Reads the configured output CSV of the run in `run_dir`.
    pub fn from_run_dir(run_dir: &Path, options: &ExtractOptions) -> Result<Self, ResultsError> {
        let path = run_dir.join(&options.output_csv_name);
        let file = File::open(&path).map_err(|source| ResultsError::Io {
            path: path.clone(),
            source,
        })?;
        Self::from_reader(file, &options.variable, &path.display().to_string())
    }

    /// Parses engine CSV output: a timestamp column followed by one column per reported variable and key.
    ///
    /// Rows where none of the selected columns has a value come from other reporting frequencies and are
    /// skipped. A row with only some values is malformed.
    pub fn from_reader<R: io::Read>(reader: R, variable: &str, file: &str) -> Result<Self, ResultsError> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);
        let headers = reader.headers()?.clone();
        let needle = variable.to_ascii_lowercase();
        let selected: Vec<usize> = headers
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(_, header)| header.to_ascii_lowercase().contains(&needle))
            .map(|(idx, _)| idx)
            .collect();
        if selected.is_empty() {
            return Err(ResultsError::MissingVariable {
                variable: variable.to_string(),
                file: file.to_string(),
            });
        }

        let mut columns: Vec<ZoneColumn> = selected
            .iter()
            .map(|idx| ZoneColumn::from_header(&headers[*idx]))
            .collect();
        let mut timestamps = Vec::new();
        let mut row_values = Vec::with_capacity(columns.len());

        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            let row = idx + 2;
            let cells: Vec<&str> = selected.iter().map(|col| record.get(*col).unwrap_or_default()).collect();
            if cells.iter().all(|cell| cell.is_empty()) {
                continue;
            }

            row_values.clear();
            for (cell, column) in cells.iter().zip(&columns) {
                let value = cell.parse::<f64>().map_err(|_| ResultsError::Parse {
                    file: file.to_string(),
                    row,
                    reason: format!("{cell:?} in {} is not a number", column.header),
                })?;
                row_values.push(value);
            }
            timestamps.push(record.get(0).unwrap_or_default().to_string());
            for (column, value) in columns.iter_mut().zip(&row_values) {
                column.values.push(*value);
            }
        }

        debug!("Read {} rows of {} columns from {}", timestamps.len(), columns.len(), file);
        Ok(Self {
            variable: variable.to_string(),
            timestamps,
            columns,
        })
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Mean across columns at every timestamp.
    pub fn mean_series(&self) -> Vec<f64> {
        let width = self.columns.len() as f64;
        (0..self.len())
            .map(|row| self.columns.iter().map(|column| column.values[row]).sum::<f64>() / width)
            .collect()
    }

    pub fn summarize(&self) -> SeriesSummary {
        SeriesSummary {
            variable: self.variable.clone(),
            points: self.len(),
            zones: self
                .columns
                .iter()
                .map(|column| ZoneSummary {
                    key: column.key.clone(),
                    unit: column.unit.clone(),
                    stats: SummaryStats::from_values(&column.values),
                })
                .collect(),
            zone_mean: SummaryStats::from_values(&self.mean_series()),
        }
    }
}
