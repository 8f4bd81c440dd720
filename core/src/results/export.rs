use super::{
    BuildingComparison,
    Comparison,
    ComparisonSummary,
    ResultsError,
    VariableSeries,
};
use serde::Serialize;
use std::{
    fs::File,
    io::BufWriter,
    path::{
        Path,
        PathBuf,
    },
};

#[derive(Serialize)]
struct StatisticsReport<'a> {
    summary: &'a ComparisonSummary,
    buildings: &'a [BuildingComparison],
}

fn create_parent(path: &Path) -> Result<(), ResultsError> {
    match path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        Some(parent) => std::fs::create_dir_all(parent).map_err(|source| ResultsError::Write {
            path: parent.to_path_buf(),
            source,
        }),
        None => Ok(()),
    }
}

fn csv_writer(path: &Path) -> Result<csv::Writer<File>, ResultsError> {
    create_parent(path)?;
    let file = File::create(path).map_err(|source| ResultsError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(csv::Writer::from_writer(file))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Writes one row per compared point to `path` and the statistics next to it as `<stem>.summary.json`.
///
/// Returns the path of the statistics file.
pub fn write_comparison(comparison: &Comparison, path: &Path) -> Result<PathBuf, ResultsError> {
    let mut writer = csv_writer(path)?;
    if comparison.records.is_empty() {
        writer.write_record(["building", "timestamp", "baseline", "modified", "difference"])?;
    }
    for record in &comparison.records {
        writer.serialize(record)?;
    }
    writer.flush().map_err(|source| ResultsError::Write {
        path: path.to_path_buf(),
        source,
    })?;

    let summary_path = path.with_extension("summary.json");
    let file = File::create(&summary_path).map_err(|source| ResultsError::Write {
        path: summary_path.clone(),
        source,
    })?;
    serde_json::to_writer_pretty(BufWriter::new(file), &StatisticsReport {
        summary: &comparison.summary,
        buildings: &comparison.buildings,
    })?;
    info!("Wrote {} comparison rows to {}", comparison.records.len(), path.display());
    Ok(summary_path)
}

/// Writes the per-building annual means, rounded to two decimals.
pub fn write_building_table(comparison: &Comparison, path: &Path, unit: &str) -> Result<(), ResultsError> {
    let mut writer = csv_writer(path)?;
    writer.write_record([
        "Building".to_string(),
        format!("Baseline_Annual_Avg_Temp_{unit}"),
        format!("Modified_Annual_Avg_Temp_{unit}"),
        format!("Temperature_Increase_{unit}"),
    ])?;
    let cell = |value: Option<f64>| value.map(|value| round2(value).to_string()).unwrap_or_default();
    for building in &comparison.buildings {
        writer.write_record([
            building.building.clone(),
            cell(building.baseline_mean),
            cell(building.modified_mean),
            cell(building.increase),
        ])?;
    }
    writer.flush().map_err(|source| ResultsError::Write {
        path: path.to_path_buf(),
        source,
    })
}

/// Writes one row per timestamp of a single run: the timestamp, every zone column and their mean.
pub fn write_hourly_csv(series: &VariableSeries, path: &Path) -> Result<(), ResultsError> {
    let mut writer = csv_writer(path)?;
    let mut header = vec!["timestamp".to_string()];
    header.extend(series.columns.iter().map(|column| column.key.clone()));
    header.push("mean".to_string());
    writer.write_record(&header)?;

    let means = series.mean_series();
    for (row, timestamp) in series.timestamps.iter().enumerate() {
        let mut record = Vec::with_capacity(header.len());
        record.push(timestamp.clone());
        record.extend(series.columns.iter().map(|column| column.values[row].to_string()));
        record.push(means[row].to_string());
        writer.write_record(&record)?;
    }
    writer.flush().map_err(|source| ResultsError::Write {
        path: path.to_path_buf(),
        source,
    })?;
    debug!("Wrote {} hourly rows to {}", series.len(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{
        compare_directories,
        tests::write_run,
        ExtractOptions,
    };
    use pretty_assertions::assert_eq;
    use temp_dir::TempDir;

    fn comparison(dir: &Path) -> Comparison {
        write_run(&dir.join("baseline").join("city_0_001"), &[20.0, 21.0]);
        write_run(&dir.join("modified").join("city_0_001"), &[22.5, 23.0]);
        compare_directories(&dir.join("baseline"), &dir.join("modified"), &ExtractOptions::default()).unwrap()
    }

    #[test]
    fn comparison_csv_and_statistics() {
        let dir = TempDir::new().unwrap();
        let comparison = comparison(dir.path());
        let path = dir.path().join("out").join("temperature_comparison.csv");

        let summary_path = write_comparison(&comparison, &path).unwrap();

        assert_eq!(summary_path, dir.path().join("out").join("temperature_comparison.summary.json"));
        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, [
            "building,timestamp,baseline,modified,difference",
            "city_0_001,01/01  01:00:00,20.0,22.5,2.5",
            "city_0_001,01/01  02:00:00,21.0,23.0,2.0",
        ]);

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(summary_path).unwrap()).unwrap();
        assert_eq!(json["summary"]["points"], 2);
        assert_eq!(json["summary"]["mean_increase"], 2.25);
        assert_eq!(json["buildings"][0]["building"], "city_0_001");
    }

    #[test]
    fn building_table_rounds_to_two_decimals() {
        let dir = TempDir::new().unwrap();
        let mut comparison = comparison(dir.path());
        comparison.buildings[0].increase = Some(2.2549);
        comparison.buildings[0].modified_mean = None;
        let path = dir.path().join("buildings.csv");

        write_building_table(&comparison, &path, "C").unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, [
            "Building,Baseline_Annual_Avg_Temp_C,Modified_Annual_Avg_Temp_C,Temperature_Increase_C",
            "city_0_001,20.5,,2.25",
        ]);
    }

    #[test]
    fn hourly_csv_lists_zones_and_mean() {
        let dir = TempDir::new().unwrap();
        write_run(dir.path(), &[20.0, 21.5]);
        let series = VariableSeries::from_run_dir(dir.path(), &ExtractOptions::default()).unwrap();
        let path = dir.path().join("hourly.csv");

        write_hourly_csv(&series, &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, [
            "timestamp,ZONE ONE,ZONE TWO,mean",
            "01/01  01:00:00,19,21,20",
            "01/01  02:00:00,20.5,22.5,21.5",
        ]);
    }
}
