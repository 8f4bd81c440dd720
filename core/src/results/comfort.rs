//! Thermal comfort impact of an outage over a heat event.

use super::{
    HourlyMatrix,
    ResultsError,
    SummaryStats,
};
use chrono::{
    NaiveDate,
    TimeDelta,
};
use serde::Serialize;
use std::{
    fmt,
    path::Path,
};

const BUILDING_TYPES: [&str; 8] = [
    "Lowrise_Domestic",
    "Midrise_Domestic",
    "Highrise_Domestic",
    "Commercial",
    "Office",
    "Industry",
    "Transport",
    "Administration",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Threshold {
    pub name: String,
    pub temperature: f64,
}

impl Threshold {
    pub fn new(name: impl Into<String>, temperature: f64) -> Self {
        Self {
            name: name.into(),
            temperature,
        }
    }
}

pub fn default_thresholds() -> Vec<Threshold> {
    vec![
        Threshold::new("comfort_limit", 26.0),
        Threshold::new("acceptable_limit", 28.0),
        Threshold::new("health_risk", 30.0),
        Threshold::new("severe_risk", 35.0),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThresholdBreach {
    pub name: String,
    pub threshold_temp: f64,
    /// Share of event hours above the threshold in percent, averaged over buildings.
    pub baseline_breach_ratio: f64,
    pub modified_breach_ratio: f64,
    /// In percentage points.
    pub increase: f64,
    /// First hour where more than half of the modified buildings are above the threshold.
    pub first_breach_time: Option<String>,
    pub first_breach_hour: Option<usize>,
    pub hours_after_event_start: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComfortAnalysis {
    pub event_name: String,
    pub buildings: usize,
    pub building_labels: Vec<String>,
    /// 1-based hour of the year the event starts at.
    pub start_hour: usize,
    pub event_hours: usize,
    pub baseline: Option<SummaryStats>,
    pub modified: Option<SummaryStats>,
    pub average_change: Option<f64>,
    pub peak_change: Option<f64>,
    pub thresholds: Vec<ThresholdBreach>,
}

/// Turns `city_<type>_<number>_...` column names into `<TypeName>_<number>`.
pub fn building_label(column: &str) -> String {
    let stem = column.rsplit(['/', '\\']).next().unwrap_or(column);
    let mut parts = stem.split('_');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(kind), Some(number)) => {
            let kind = kind
                .parse::<usize>()
                .ok()
                .and_then(|idx| BUILDING_TYPES.get(idx))
                .map_or_else(|| format!("Type{kind}"), |name| name.to_string());
            format!("{kind}_{number}")
        }
        _ => stem.to_string(),
    }
}

fn hour_timestamp(row: usize) -> Option<String> {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1)?.and_hms_opt(0, 0, 0)?;
    let time = start.checked_add_signed(TimeDelta::try_hours(i64::try_from(row).ok()?)?)?;
    Some(time.format("%Y-%m-%d %H:00").to_string())
}

fn breach_ratio(matrix: &HourlyMatrix, rows: std::ops::Range<usize>, threshold: f64) -> f64 {
    if rows.is_empty() || matrix.columns.is_empty() {
        return 0.0;
    }
    let hours = rows.len() as f64;
    let total: f64 = matrix
        .columns
        .iter()
        .map(|column| column[rows.clone()].iter().filter(|value| **value > threshold).count() as f64 / hours * 100.0)
        .sum();
    total / matrix.columns.len() as f64
}

/// Compares indoor temperatures of both runs from `start_hour` (1-based) to the end of the series.
#[instrument(level = "debug", skip(baseline, modified, thresholds))]
pub fn analyze_comfort(
    baseline: &HourlyMatrix,
    modified: &HourlyMatrix,
    start_hour: usize,
    thresholds: &[Threshold],
    event_name: &str,
) -> Result<ComfortAnalysis, ResultsError> {
    if baseline.buildings != modified.buildings {
        return Err(ResultsError::Alignment {
            building: "*".to_string(),
            reason: "baseline and modified matrices list different buildings".to_string(),
        });
    }
    if baseline.hours() != modified.hours() {
        return Err(ResultsError::Alignment {
            building: "*".to_string(),
            reason: format!("baseline has {} hours, modified has {}", baseline.hours(), modified.hours()),
        });
    }

    let first_row = start_hour.saturating_sub(1).min(baseline.hours());
    let rows = first_row..baseline.hours();
    let mean_of = |matrix: &HourlyMatrix| -> Vec<f64> { rows.clone().filter_map(|row| matrix.row_mean(row)).collect() };
    let baseline_stats = SummaryStats::from_values(&mean_of(baseline));
    let modified_stats = SummaryStats::from_values(&mean_of(modified));
    let majority = modified.columns.len() as f64 * 0.5;

    let thresholds = thresholds
        .iter()
        .map(|threshold| {
            let baseline_breach_ratio = breach_ratio(baseline, rows.clone(), threshold.temperature);
            let modified_breach_ratio = breach_ratio(modified, rows.clone(), threshold.temperature);
            let first_breach = rows.clone().find(|row| {
                let breaching = modified
                    .columns
                    .iter()
                    .filter(|column| column[*row] > threshold.temperature)
                    .count();
                breaching as f64 > majority
            });
            ThresholdBreach {
                name: threshold.name.clone(),
                threshold_temp: threshold.temperature,
                baseline_breach_ratio,
                modified_breach_ratio,
                increase: modified_breach_ratio - baseline_breach_ratio,
                first_breach_time: first_breach.and_then(hour_timestamp),
                first_breach_hour: first_breach.map(|row| row + 1),
                hours_after_event_start: first_breach.map(|row| row - first_row),
            }
        })
        .collect();

    Ok(ComfortAnalysis {
        event_name: event_name.to_string(),
        buildings: baseline.buildings.len(),
        building_labels: baseline.buildings.iter().map(|building| building_label(building)).collect(),
        start_hour,
        event_hours: rows.len(),
        average_change: baseline_stats
            .zip(modified_stats)
            .map(|(baseline, modified)| modified.mean - baseline.mean),
        peak_change: baseline_stats
            .zip(modified_stats)
            .map(|(baseline, modified)| modified.max - baseline.max),
        baseline: baseline_stats,
        modified: modified_stats,
        thresholds,
    })
}

impl fmt::Display for ComfortAnalysis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heavy = "=".repeat(80);
        let light = "-".repeat(80);

        writeln!(f, "{heavy}")?;
        writeln!(f, "Thermal Comfort Impact Assessment Report - {}", self.event_name)?;
        writeln!(f, "{heavy}\n")?;
        writeln!(f, "Analysis time: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "Number of buildings: {}", self.buildings)?;
        writeln!(f, "Event period: {} hours\n", self.event_hours)?;

        writeln!(f, "{light}\n1. Temperature Statistics\n{light}")?;
        for (label, stats) in [("Baseline", &self.baseline), ("Modified", &self.modified)] {
            writeln!(f, "  {label}:")?;
            match stats {
                Some(stats) => {
                    writeln!(f, "    Average: {:.2}°C", stats.mean)?;
                    writeln!(f, "    Range: {:.2}°C - {:.2}°C", stats.min, stats.max)?;
                    writeln!(f, "    Std Dev: {:.2}°C\n", stats.std_dev)?;
                }
                None => writeln!(f, "    No data\n")?,
            }
        }
        if let (Some(average), Some(peak)) = (self.average_change, self.peak_change) {
            writeln!(f, "  Changes:")?;
            writeln!(f, "    Average increase: {average:.2}°C")?;
            writeln!(f, "    Peak increase: {peak:.2}°C\n")?;
        }

        writeln!(f, "{light}\n2. Threshold Breach Analysis\n{light}")?;
        for breach in &self.thresholds {
            writeln!(f, "  {} ({}°C):", breach.name, breach.threshold_temp)?;
            writeln!(f, "    Baseline breach: {:.2}%", breach.baseline_breach_ratio)?;
            writeln!(f, "    Modified breach: {:.2}%", breach.modified_breach_ratio)?;
            writeln!(f, "    Increase: {:.2} percentage points", breach.increase)?;
            if let (Some(time), Some(after)) = (&breach.first_breach_time, breach.hours_after_event_start) {
                writeln!(f, "    First breach: {time}")?;
                writeln!(f, "    Time after event start: {after} hours")?;
            }
            writeln!(f)?;
        }

        write!(f, "{heavy}\nEnd of Report\n{heavy}")
    }
}

impl ComfortAnalysis {
    /// The plain-text report, stamped with the current local time.
    pub fn render_report(&self) -> String {
        self.to_string()
    }

    pub fn write_report(&self, path: &Path) -> Result<(), ResultsError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ResultsError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, self.render_report()).map_err(|source| ResultsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use temp_dir::TempDir;

    fn matrix(columns: Vec<Vec<f64>>) -> HourlyMatrix {
        let mut matrix = HourlyMatrix::default();
        for (idx, column) in columns.into_iter().enumerate() {
            matrix.push(format!("city_{idx}_00{idx}_heat.idf"), column).unwrap();
        }
        matrix
    }

    #[test]
    fn labels_buildings() {
        assert_eq!(building_label("city_4_012_model"), "Office_012");
        assert_eq!(building_label("runs/city_0_001"), "Lowrise_Domestic_001");
        assert_eq!(building_label("city_9_003"), "Type9_003");
        assert_eq!(building_label("baseline"), "baseline");
    }

    #[test]
    fn breaches_over_the_event_period() {
        let baseline = matrix(vec![vec![24.0, 25.0, 25.0, 25.0]; 3]);
        let modified = matrix(vec![
            vec![30.0, 25.0, 27.0, 29.0],
            vec![30.0, 27.0, 27.0, 29.0],
            vec![30.0, 25.0, 25.0, 29.0],
        ]);
        let thresholds = [Threshold::new("comfort_limit", 26.0), Threshold::new("severe_risk", 35.0)];

        let analysis = analyze_comfort(&baseline, &modified, 2, &thresholds, "July heat").unwrap();

        assert_eq!(analysis.event_hours, 3);
        assert_eq!(analysis.building_labels[1], "Midrise_Domestic_001");
        assert_eq!(analysis.baseline.unwrap().mean, 25.0);

        let comfort = &analysis.thresholds[0];
        assert_eq!(comfort.baseline_breach_ratio, 0.0);
        // Buildings breach 2, 3 and 1 of 3 event hours.
        assert!((comfort.modified_breach_ratio - 200.0 / 3.0).abs() < 1e-9);
        // Hour 2 has one of three buildings above 26, hour 3 has two.
        assert_eq!(comfort.first_breach_hour, Some(3));
        assert_eq!(comfort.hours_after_event_start, Some(1));
        assert_eq!(comfort.first_breach_time.as_deref(), Some("2020-01-01 02:00"));

        let severe = &analysis.thresholds[1];
        assert_eq!(severe.modified_breach_ratio, 0.0);
        assert_eq!(severe.first_breach_time, None);
    }

    #[test]
    fn empty_event_period_has_zero_ratios() {
        let baseline = matrix(vec![vec![30.0, 31.0]]);
        let modified = matrix(vec![vec![32.0, 33.0]]);
        let analysis = analyze_comfort(&baseline, &modified, 10, &default_thresholds(), "late").unwrap();
        assert_eq!(analysis.event_hours, 0);
        assert_eq!(analysis.baseline, None);
        assert!(analysis.thresholds.iter().all(|breach| breach.modified_breach_ratio == 0.0));
    }

    #[test]
    fn mismatched_matrices_are_rejected() {
        let baseline = matrix(vec![vec![30.0, 31.0]]);
        let modified = matrix(vec![vec![32.0, 33.0], vec![32.0, 33.0]]);
        assert!(matches!(
            analyze_comfort(&baseline, &modified, 1, &default_thresholds(), "x"),
            Err(ResultsError::Alignment { .. })
        ));
    }

    #[test]
    fn report_sections() {
        let dir = TempDir::new().unwrap();
        let baseline = matrix(vec![vec![25.0, 27.0]]);
        let modified = matrix(vec![vec![27.0, 31.0]]);
        let analysis = analyze_comfort(&baseline, &modified, 1, &default_thresholds(), "July heat").unwrap();
        let path = dir.path().join("reports").join("comfort.txt");

        analysis.write_report(&path).unwrap();

        let report = std::fs::read_to_string(&path).unwrap();
        assert!(report.starts_with(&"=".repeat(80)));
        assert!(report.contains("Thermal Comfort Impact Assessment Report - July heat"));
        assert!(report.contains("    Average increase: 3.00°C"));
        assert!(report.contains("  comfort_limit (26°C):"));
        assert!(report.contains("    First breach: 2020-01-01 00:00"));
        assert!(report.ends_with(&format!("End of Report\n{}", "=".repeat(80))));

        let rendered = format!("{analysis}");
        assert!(rendered.contains("  Modified:\n    Average: 29.00°C\n"), "{rendered}");
        assert!(rendered.contains("  severe_risk (35°C):\n    Baseline breach: 0.00%\n"), "{rendered}");
    }
}
