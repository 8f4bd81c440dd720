use super::{
    ExtractOptions,
    ResultsError,
    VariableSeries,
};
use crate::batch::discover_dirs;
use std::{
    fs::File,
    path::Path,
};

const HOUR_COLUMN: &str = "Hour";

/// Hourly zone-mean values of many buildings side by side, one column per building.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HourlyMatrix {
    pub buildings: Vec<String>,
    pub columns: Vec<Vec<f64>>,
}

impl HourlyMatrix {
    /// Collects the zone-mean series of every run directory under `root`.
    ///
    /// Runs that cannot be read are left out and returned by name. All remaining runs must have the same length.
    pub fn from_results_dir(root: &Path, options: &ExtractOptions) -> Result<(Self, Vec<String>), ResultsError> {
        let dirs = discover_dirs(root).map_err(|source| ResultsError::Io {
            path: root.to_path_buf(),
            source,
        })?;
        let mut matrix = Self::default();
        let mut skipped = Vec::new();
        for dir in dirs {
            let Some(building) = dir.file_name().map(|name| name.to_string_lossy().into_owned()) else {
                continue;
            };
            match VariableSeries::from_run_dir(&dir, options) {
                Ok(series) => matrix.push(building, series.mean_series())?,
                Err(err) => {
                    warn!("Skipping {building}: {err}");
                    skipped.push(building);
                }
            }
        }
        info!(
            "Collected {} hours for {} buildings from {}",
            matrix.hours(),
            matrix.buildings.len(),
            root.display()
        );
        Ok((matrix, skipped))
    }

    pub fn push(&mut self, building: String, values: Vec<f64>) -> Result<(), ResultsError> {
        if let Some(first) = self.columns.first() {
            if first.len() != values.len() {
                return Err(ResultsError::Alignment {
                    building,
                    reason: format!("{} hours where {} has {}", values.len(), self.buildings[0], first.len()),
                });
            }
        }
        self.buildings.push(building);
        self.columns.push(values);
        Ok(())
    }

    pub fn hours(&self) -> usize {
        self.columns.first().map_or(0, Vec::len)
    }

    /// Mean over buildings at row `row`, `None` without buildings.
    pub fn row_mean(&self, row: usize) -> Option<f64> {
        if self.columns.is_empty() {
            return None;
        }
        let sum: f64 = self.columns.iter().map(|column| column[row]).sum();
        Some(sum / self.columns.len() as f64)
    }

    /// Writes an `Hour` column counting from 1 followed by one column per building.
    pub fn write(&self, path: &Path) -> Result<(), ResultsError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ResultsError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        let file = File::create(path).map_err(|source| ResultsError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        let mut writer = csv::Writer::from_writer(file);
        let mut header = vec![HOUR_COLUMN.to_string()];
        header.extend(self.buildings.iter().cloned());
        writer.write_record(&header)?;
        for row in 0..self.hours() {
            let mut record = Vec::with_capacity(header.len());
            record.push((row + 1).to_string());
            record.extend(self.columns.iter().map(|column| column[row].to_string()));
            writer.write_record(&record)?;
        }
        writer.flush().map_err(|source| ResultsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn read(path: &Path) -> Result<Self, ResultsError> {
        let file = File::open(path).map_err(|source| ResultsError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path.display().to_string();
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(file);
        let headers = reader.headers()?.clone();
        if !headers.get(0).is_some_and(|first| first.eq_ignore_ascii_case(HOUR_COLUMN)) {
            return Err(ResultsError::Parse {
                file: name,
                row: 1,
                reason: format!("first column must be {HOUR_COLUMN:?}"),
            });
        }

        let buildings: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
        let mut columns = vec![Vec::new(); buildings.len()];
        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            for (column, cell) in columns.iter_mut().zip(record.iter().skip(1)) {
                let value = cell.parse::<f64>().map_err(|_| ResultsError::Parse {
                    file: name.clone(),
                    row: idx + 2,
                    reason: format!("{cell:?} is not a number"),
                })?;
                column.push(value);
            }
        }
        Ok(Self { buildings, columns })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::tests::write_run;
    use pretty_assertions::assert_eq;
    use temp_dir::TempDir;

    #[test]
    fn collects_buildings_and_round_trips() {
        let dir = TempDir::new().unwrap();
        write_run(&dir.path().join("runs").join("city_0_001"), &[20.0, 21.0, 22.0]);
        write_run(&dir.path().join("runs").join("city_3_002"), &[24.0, 25.0, 26.0]);
        std::fs::create_dir_all(dir.path().join("runs").join("city_4_003")).unwrap();

        let (matrix, skipped) = HourlyMatrix::from_results_dir(&dir.path().join("runs"), &ExtractOptions::default())
            .unwrap();

        assert_eq!(matrix.buildings, ["city_0_001", "city_3_002"]);
        assert_eq!(skipped, ["city_4_003"]);
        assert_eq!(matrix.hours(), 3);
        assert_eq!(matrix.row_mean(1), Some(23.0));

        let path = dir.path().join("hourly_temperatures_baseline.csv");
        matrix.write(&path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().next(), Some("Hour,city_0_001,city_3_002"));
        assert_eq!(text.lines().nth(3), Some("3,22,26"));
        assert_eq!(HourlyMatrix::read(&path).unwrap(), matrix);
    }

    #[test]
    fn rejects_runs_of_different_lengths() {
        let mut matrix = HourlyMatrix::default();
        matrix.push("a".to_string(), vec![20.0, 21.0]).unwrap();
        assert!(matches!(
            matrix.push("b".to_string(), vec![20.0]),
            Err(ResultsError::Alignment { building, .. }) if building == "b"
        ));
        assert_eq!(HourlyMatrix::default().row_mean(0), None);
    }

    #[test]
    fn read_requires_hour_column() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("matrix.csv");
        std::fs::write(&path, "Time,a\n1,20.0\n").unwrap();
        assert!(matches!(HourlyMatrix::read(&path), Err(ResultsError::Parse { row: 1, .. })));
    }
}
