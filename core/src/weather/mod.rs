//! Hourly weather ingestion and hottest-window detection.

mod epw;
mod window;

pub use epw::{
    DailyAggregate,
    EpwFile,
    WeatherRecord,
};
pub use window::{
    hottest_window,
    HottestWindow,
    WindowDay,
};

use std::path::{
    Path,
    PathBuf,
};

#[derive(thiserror::Error, Debug)]
pub enum WeatherError {
    #[error("A window of {requested} days does not fit {available} days of weather data")]
    InvalidWindowSize { requested: usize, available: usize },

    #[error("Malformed weather data at line {line}: {reason}")]
    WeatherParse { line: usize, reason: String },

    #[error("Failed to read weather file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reads an EPW file and returns the hottest window of `length` consecutive days.
#[instrument(level = "debug")]
pub fn analyze_file(path: &Path, length: usize) -> Result<HottestWindow, WeatherError> {
    let file = EpwFile::from_path(path)?;
    let days = file.daily_aggregates()?;
    let window = hottest_window(&days, length)?;
    info!(
        "Hottest {} day window in {}: {} - {} ({:.2} C)",
        window.length,
        path.display(),
        window.start,
        window.end,
        window.mean_temperature
    );
    Ok(window)
}
