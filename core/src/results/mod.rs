//! Reading engine output, comparing runs and exporting the numbers.

mod comfort;
mod compare;
mod export;
mod matrix;
mod series;
mod stats;

pub use comfort::{
    analyze_comfort,
    building_label,
    default_thresholds,
    ComfortAnalysis,
    Threshold,
    ThresholdBreach,
};
pub use compare::{
    compare_directories,
    compare_runs,
    compare_series,
    BuildingComparison,
    Comparison,
    ComparisonRecord,
    ComparisonSummary,
    IncreaseStats,
};
pub use export::{
    write_building_table,
    write_comparison,
    write_hourly_csv,
};
pub use matrix::HourlyMatrix;
pub use series::{
    SeriesSummary,
    VariableSeries,
    ZoneColumn,
    ZoneSummary,
};
pub use stats::{
    median,
    SummaryStats,
};

use std::path::PathBuf;

pub const DEFAULT_OUTPUT_CSV: &str = "eplusout.csv";
pub const DEFAULT_VARIABLE: &str = "Zone Mean Air Temperature";

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("Failed to read {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed results in {file} at row {row}: {reason}")]
    Parse { file: String, row: usize, reason: String },

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("No column matching {variable:?} in {file}")]
    MissingVariable { variable: String, file: String },

    #[error("Baseline and modified results are misaligned for {building}: {reason}")]
    Alignment { building: String, reason: String },

    #[error("Failed to write {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Which output file of a run to read and which variable to pull from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractOptions {
    pub output_csv_name: String,
    /// Matched case-insensitively against column headers.
    pub variable: String,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            output_csv_name: DEFAULT_OUTPUT_CSV.to_string(),
            variable: DEFAULT_VARIABLE.to_string(),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::path::Path;

    /// Writes an `eplusout.csv` with two zones whose mean follows `means`, one row per hour of January 1st
    /// onward.
    pub(crate) fn write_run(dir: &Path, means: &[f64]) {
        std::fs::create_dir_all(dir).unwrap();
        let mut text = String::from(
            "Date/Time,Environment:Site Outdoor Air Drybulb Temperature [C](Hourly),ZONE ONE:Zone Mean Air \
             Temperature [C](Hourly),ZONE TWO:Zone Mean Air Temperature [C](Hourly)\n",
        );
        for (idx, mean) in means.iter().enumerate() {
            let timestamp = hour_label(idx);
            text.push_str(&format!("{timestamp},10.0,{},{}\n", mean - 1.0, mean + 1.0));
        }
        std::fs::write(dir.join("eplusout.csv"), text).unwrap();
    }

    pub(crate) fn hour_label(idx: usize) -> String {
        let day = idx / 24 + 1;
        let hour = idx % 24 + 1;
        format!(" 01/{day:02}  {hour:02}:00:00")
    }
}
