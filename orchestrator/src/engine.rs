use std::{
    path::PathBuf,
    time::Duration,
};
use ubem_config::{
    Config,
    ConfigError,
};
use ubem_core::batch::default_parallelism;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Everything the orchestrator needs to know about the simulation engine and how hard to drive it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub energyplus_exe: PathBuf,
    /// Runs ExpandObjects before the engine when set and present on disk.
    pub expand_objects_exe: Option<PathBuf>,
    /// Passed to the engine with `-i`.
    pub schema_file: Option<PathBuf>,
    pub timeout: Duration,
    /// Files that must exist in the output directory after a successful run.
    pub expected_artifacts: Vec<String>,
    pub max_parallel: usize,
    /// Only the first `max_runs` models of a batch are simulated.
    pub max_runs: Option<usize>,
}

impl EngineConfig {
    pub fn new(energyplus_exe: impl Into<PathBuf>) -> Self {
        Self {
            energyplus_exe: energyplus_exe.into(),
            expand_objects_exe: None,
            schema_file: None,
            timeout: DEFAULT_TIMEOUT,
            expected_artifacts: vec![ubem_core::results::DEFAULT_OUTPUT_CSV.to_string()],
            max_parallel: default_parallelism(),
            max_runs: None,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let install = config.energyplus();
        Ok(Self {
            energyplus_exe: install.energyplus_exe(),
            expand_objects_exe: config.simulation.expand_objects.then(|| install.expand_objects_exe()),
            schema_file: Some(install.idd_file()),
            timeout: config.timeout()?,
            expected_artifacts: config.simulation.expected_artifacts.clone(),
            max_parallel: config.max_parallel(),
            max_runs: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn defaults_expect_the_csv_output() {
        let config = EngineConfig::new("/opt/eplus/energyplus");
        assert_eq!(config.expected_artifacts, ["eplusout.csv"]);
        assert_eq!(config.timeout, Duration::from_secs(600));
        assert!(config.max_parallel >= 1);
        assert_eq!(config.expand_objects_exe, None);
    }
}
