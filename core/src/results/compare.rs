use super::{
    median,
    ExtractOptions,
    ResultsError,
    SummaryStats,
    VariableSeries,
};
use crate::batch::discover_dirs;
use serde::Serialize;
use std::path::Path;

/// One aligned point of a baseline/modified comparison. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRecord {
    pub building: String,
    pub timestamp: String,
    pub baseline: f64,
    pub modified: f64,
    pub difference: f64,
}

/// Annual means of one building in both runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildingComparison {
    pub building: String,
    pub points: usize,
    pub baseline_mean: Option<f64>,
    pub modified_mean: Option<f64>,
    pub increase: Option<f64>,
}

/// Spread of the per-building mean increases.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct IncreaseStats {
    pub mean: f64,
    pub median: f64,
    pub std_dev: f64,
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonSummary {
    pub buildings: usize,
    pub points: usize,
    pub mean_increase: Option<f64>,
    pub max_increase: Option<f64>,
    pub min_increase: Option<f64>,
    /// Points where the modified value is above the baseline.
    pub points_increased: usize,
    pub building_increase: Option<IncreaseStats>,
    /// Buildings left out because one of their runs could not be read.
    pub skipped: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comparison {
    #[serde(skip)]
    pub records: Vec<ComparisonRecord>,
    pub buildings: Vec<BuildingComparison>,
    pub summary: ComparisonSummary,
}

impl Comparison {
    fn from_buildings(parts: Vec<(BuildingComparison, Vec<ComparisonRecord>)>, skipped: Vec<String>) -> Self {
        let mut buildings = Vec::with_capacity(parts.len());
        let mut records = Vec::new();
        for (building, building_records) in parts {
            buildings.push(building);
            records.extend(building_records);
        }

        let differences: Vec<f64> = records.iter().map(|record| record.difference).collect();
        let stats = SummaryStats::from_values(&differences);
        let increases: Vec<f64> = buildings.iter().filter_map(|building| building.increase).collect();
        let building_increase = SummaryStats::from_values(&increases).zip(median(&increases)).map(
            |(stats, median)| IncreaseStats {
                mean: stats.mean,
                median,
                std_dev: stats.std_dev,
                min: stats.min,
                max: stats.max,
            },
        );

        let summary = ComparisonSummary {
            buildings: buildings.len(),
            points: records.len(),
            mean_increase: stats.map(|stats| stats.mean),
            max_increase: stats.map(|stats| stats.max),
            min_increase: stats.map(|stats| stats.min),
            points_increased: differences.iter().filter(|difference| **difference > 0.0).count(),
            building_increase,
            skipped,
        };
        Self {
            records,
            buildings,
            summary,
        }
    }
}

/// Pairs the zone-mean series of two runs of `building` point by point.
///
/// Both runs must report the same zones and the same timestamps in the same order. Repeated timestamps (design
/// days followed by the run period) are paired by occurrence.
pub fn compare_series(
    building: &str,
    baseline: &VariableSeries,
    modified: &VariableSeries,
) -> Result<(BuildingComparison, Vec<ComparisonRecord>), ResultsError> {
    let misaligned = |reason: String| ResultsError::Alignment {
        building: building.to_string(),
        reason,
    };
    let baseline_zones = zone_keys(baseline);
    let modified_zones = zone_keys(modified);
    if baseline_zones != modified_zones {
        return Err(misaligned(format!(
            "baseline reports zones {baseline_zones:?}, modified reports {modified_zones:?}"
        )));
    }
    if baseline.len() != modified.len() {
        return Err(misaligned(format!(
            "baseline has {} points, modified has {}",
            baseline.len(),
            modified.len()
        )));
    }
    if let Some((idx, (expected, actual))) = baseline
        .timestamps
        .iter()
        .zip(&modified.timestamps)
        .enumerate()
        .find(|(_, (expected, actual))| expected != actual)
    {
        return Err(misaligned(format!(
            "point {} is {expected:?} in the baseline but {actual:?} in the modified run",
            idx + 1
        )));
    }

    let baseline_values = baseline.mean_series();
    let modified_values = modified.mean_series();
    let records: Vec<ComparisonRecord> = baseline
        .timestamps
        .iter()
        .zip(baseline_values.iter().zip(&modified_values))
        .map(|(timestamp, (baseline, modified))| ComparisonRecord {
            building: building.to_string(),
            timestamp: timestamp.clone(),
            baseline: *baseline,
            modified: *modified,
            difference: modified - baseline,
        })
        .collect();

    let baseline_mean = SummaryStats::from_values(&baseline_values).map(|stats| stats.mean);
    let modified_mean = SummaryStats::from_values(&modified_values).map(|stats| stats.mean);
    let comparison = BuildingComparison {
        building: building.to_string(),
        points: records.len(),
        baseline_mean,
        modified_mean,
        increase: baseline_mean.zip(modified_mean).map(|(baseline, modified)| modified - baseline),
    };
    Ok((comparison, records))
}

fn zone_keys(series: &VariableSeries) -> Vec<String> {
    let mut keys: Vec<String> = series.columns.iter().map(|column| column.key.to_uppercase()).collect();
    keys.sort();
    keys
}

/// Compares the baseline and modified runs of a single building.
pub fn compare_runs(
    building: &str,
    baseline_dir: &Path,
    modified_dir: &Path,
    options: &ExtractOptions,
) -> Result<Comparison, ResultsError> {
    let baseline = VariableSeries::from_run_dir(baseline_dir, options)?;
    let modified = VariableSeries::from_run_dir(modified_dir, options)?;
    let part = compare_series(building, &baseline, &modified)?;
    Ok(Comparison::from_buildings(vec![part], Vec::new()))
}

/// Compares every building run under `baseline_root` with its counterpart under `modified_root`.
///
/// Run directories are matched by name. A building present on one side only is an alignment error; a
/// building whose output cannot be read is skipped and listed in the summary.
#[instrument(level = "debug", skip(options))]
pub fn compare_directories(
    baseline_root: &Path,
    modified_root: &Path,
    options: &ExtractOptions,
) -> Result<Comparison, ResultsError> {
    let baseline_runs = run_names(baseline_root)?;
    let modified_runs = run_names(modified_root)?;
    if let Some(building) = baseline_runs.iter().find(|name| !modified_runs.contains(name)) {
        return Err(ResultsError::Alignment {
            building: building.clone(),
            reason: format!("no modified run under {}", modified_root.display()),
        });
    }
    if let Some(building) = modified_runs.iter().find(|name| !baseline_runs.contains(name)) {
        return Err(ResultsError::Alignment {
            building: building.clone(),
            reason: format!("no baseline run under {}", baseline_root.display()),
        });
    }

    let mut parts = Vec::with_capacity(baseline_runs.len());
    let mut skipped = Vec::new();
    for building in baseline_runs {
        let runs = VariableSeries::from_run_dir(&baseline_root.join(&building), options).and_then(|baseline| {
            VariableSeries::from_run_dir(&modified_root.join(&building), options).map(|modified| (baseline, modified))
        });
        match runs {
            Ok((baseline, modified)) => parts.push(compare_series(&building, &baseline, &modified)?),
            Err(err) => {
                warn!("Skipping {building}: {err}");
                skipped.push(building);
            }
        }
    }

    let comparison = Comparison::from_buildings(parts, skipped);
    info!(
        "Compared {} buildings over {} points, {} skipped",
        comparison.summary.buildings,
        comparison.summary.points,
        comparison.summary.skipped.len()
    );
    Ok(comparison)
}

fn run_names(root: &Path) -> Result<Vec<String>, ResultsError> {
    let dirs = discover_dirs(root).map_err(|source| ResultsError::Io {
        path: root.to_path_buf(),
        source,
    })?;
    Ok(dirs
        .iter()
        .filter_map(|dir| dir.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::tests::write_run;
    use pretty_assertions::assert_eq;
    use temp_dir::TempDir;

    fn uniform_run(base: f64, points: usize) -> Vec<f64> {
        (0..points).map(|idx| base + (idx % 8) as f64 * 0.5).collect()
    }

    #[test]
    fn uniform_warming_is_reported_exactly() {
        let dir = TempDir::new().unwrap();
        let baseline: Vec<f64> = uniform_run(20.0, 48);
        let modified: Vec<f64> = baseline.iter().map(|value| value + 2.0).collect();
        for building in ["city_0_001", "city_4_002"] {
            write_run(&dir.path().join("baseline").join(building), &baseline);
            write_run(&dir.path().join("modified").join(building), &modified);
        }

        let comparison = compare_directories(
            &dir.path().join("baseline"),
            &dir.path().join("modified"),
            &ExtractOptions::default(),
        )
        .unwrap();

        assert_eq!(comparison.summary.buildings, 2);
        assert_eq!(comparison.summary.points, 96);
        assert_eq!(comparison.summary.mean_increase, Some(2.0));
        assert_eq!(comparison.summary.max_increase, Some(2.0));
        assert_eq!(comparison.summary.points_increased, 96);
        assert!(comparison.summary.skipped.is_empty());
        assert_eq!(comparison.records[48].building, "city_4_002");
        let increase = comparison.summary.building_increase.unwrap();
        assert_eq!(increase.median, 2.0);
        assert_eq!(increase.std_dev, 0.0);
    }

    #[test]
    fn single_building_comparison() {
        let dir = TempDir::new().unwrap();
        write_run(&dir.path().join("a"), &[20.0, 21.0, 22.0, 23.0]);
        write_run(&dir.path().join("b"), &[20.0, 20.5, 23.0, 24.5]);

        let comparison =
            compare_runs("city_0_001", &dir.path().join("a"), &dir.path().join("b"), &ExtractOptions::default())
                .unwrap();

        let differences: Vec<f64> = comparison.records.iter().map(|record| record.difference).collect();
        assert_eq!(differences, [0.0, -0.5, 1.0, 1.5]);
        assert_eq!(comparison.summary.points_increased, 2);
        assert_eq!(comparison.buildings[0].baseline_mean, Some(21.5));
        assert_eq!(comparison.buildings[0].increase, Some(0.5));
    }

    #[test]
    fn mismatched_periods_are_alignment_errors() {
        let dir = TempDir::new().unwrap();
        write_run(&dir.path().join("baseline").join("city_0_001"), &uniform_run(20.0, 24));
        write_run(&dir.path().join("modified").join("city_0_001"), &uniform_run(20.0, 48));

        let result = compare_directories(
            &dir.path().join("baseline"),
            &dir.path().join("modified"),
            &ExtractOptions::default(),
        );
        assert!(matches!(result, Err(ResultsError::Alignment { building, .. }) if building == "city_0_001"));
    }

    #[test]
    fn differing_zone_sets_are_alignment_errors() {
        let variable = "Zone Mean Air Temperature";
        let baseline = VariableSeries::from_reader(
            "Date/Time,ZONE ONE:Zone Mean Air Temperature [C](Hourly),ZONE TWO:Zone Mean Air Temperature [C](Hourly)\n\
             01/01  01:00:00,20.0,22.0\n"
                .as_bytes(),
            variable,
            "baseline.csv",
        )
        .unwrap();
        let modified = VariableSeries::from_reader(
            "Date/Time,ZONE ONE:Zone Mean Air Temperature [C](Hourly)\n01/01  01:00:00,21.0\n".as_bytes(),
            variable,
            "modified.csv",
        )
        .unwrap();

        let result = compare_series("city_0_001", &baseline, &modified);
        match result {
            Err(ResultsError::Alignment { building, reason }) => {
                assert_eq!(building, "city_0_001");
                assert!(reason.contains("zones"), "{reason}");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn missing_counterpart_is_an_alignment_error() {
        let dir = TempDir::new().unwrap();
        write_run(&dir.path().join("baseline").join("city_0_001"), &[20.0]);
        write_run(&dir.path().join("baseline").join("city_0_002"), &[20.0]);
        write_run(&dir.path().join("modified").join("city_0_001"), &[20.0]);

        let result = compare_directories(
            &dir.path().join("baseline"),
            &dir.path().join("modified"),
            &ExtractOptions::default(),
        );
        assert!(matches!(result, Err(ResultsError::Alignment { building, .. }) if building == "city_0_002"));
    }

    #[test]
    fn unreadable_runs_are_skipped_and_empty_comparisons_are_valid() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("baseline").join("city_0_001")).unwrap();
        std::fs::create_dir_all(dir.path().join("modified").join("city_0_001")).unwrap();

        let comparison = compare_directories(
            &dir.path().join("baseline"),
            &dir.path().join("modified"),
            &ExtractOptions::default(),
        )
        .unwrap();

        assert_eq!(comparison.summary.points, 0);
        assert_eq!(comparison.summary.mean_increase, None);
        assert_eq!(comparison.summary.skipped, ["city_0_001"]);
    }
}
