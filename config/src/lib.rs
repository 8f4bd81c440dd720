#[macro_use]
extern crate tracing;

mod app_config;
mod args;
mod energyplus;

use app_config::AppConfig;
pub use app_config::{
    get_config_dir,
    get_data_dir,
};
pub use args::Args;
use color_eyre::Result;
pub use energyplus::{
    Detection,
    EnergyPlusInstall,
};
use eyre::Context as _;
use serde::{
    Deserialize,
    Serialize,
};
use std::{
    path::{
        Path,
        PathBuf,
    },
    time::Duration,
};

const DEFAULT_CONFIG: &str = include_str!("default-config.yaml");
const USER_CONFIG_FILE: &str = "config.yaml";
const PROJECT_CONFIG_FILE: &str = "ubem.yaml";

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("Invalid simulation timeout {value:?}")]
    InvalidTimeout {
        value: String,
        #[source]
        source: humantime::DurationError,
    },

    #[error("Missing required files: {}", display_paths(.0))]
    MissingPaths(Vec<PathBuf>),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Humantime duration, e.g. `10m`.
    pub timeout: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_parallel: Option<usize>,
    pub expand_objects: bool,
    pub expected_artifacts: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    pub target_version: String,
    pub minimum_version: String,
    pub add_zone_temperature_output: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResultsConfig {
    pub output_csv_name: String,
    pub variable: String,
    pub temperature_unit: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    #[serde(flatten, skip_serializing)]
    pub app_config: AppConfig,
    pub project_root: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub energyplus_root: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather_file: Option<PathBuf>,
    pub simulation: SimulationConfig,
    pub schedule: ScheduleConfig,
    pub results: ResultsConfig,
}

impl Config {
    /// Layers the built-in defaults, the user's `config.yaml`, the project's `ubem.yaml`, `UBEM__*` environment
    /// variables and `args`, later sources taking precedence.
    pub fn new(args: Args) -> Result<Self, ConfigError> {
        Self::load(&get_config_dir(), &get_data_dir(), args)
    }

    fn load(config_dir: &Path, data_dir: &Path, args: Args) -> Result<Self, ConfigError> {
        let project_root = args.project_root.clone().unwrap_or_else(|| PathBuf::from("."));
        let mut builder = config::Config::builder()
            .set_default("data_dir", data_dir.display().to_string())?
            .set_default("config_dir", config_dir.display().to_string())?
            .add_source(config::File::from_str(DEFAULT_CONFIG, config::FileFormat::Yaml));

        let config_files = [
            config_dir.join(USER_CONFIG_FILE),
            project_root.join(PROJECT_CONFIG_FILE),
        ];
        for file in config_files {
            debug!("Reading configuration from {} if present", file.display());
            let source = config::File::from(file)
                .format(config::FileFormat::Yaml)
                .required(false);
            builder = builder.add_source(source);
        }

        builder = builder
            .add_source(
                config::Environment::with_prefix("UBEM")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .add_source(args);

        let cfg: Self = builder.build()?.try_deserialize()?;
        Ok(cfg)
    }

    pub fn data_dir(&self) -> &Path {
        &self.app_config.data_dir
    }

    pub fn config_dir(&self) -> &Path {
        &self.app_config.config_dir
    }

    pub fn energyplus(&self) -> EnergyPlusInstall {
        EnergyPlusInstall::detect(self.energyplus_root.as_deref())
    }

    pub fn timeout(&self) -> Result<Duration, ConfigError> {
        humantime::parse_duration(&self.simulation.timeout).map_err(|source| ConfigError::InvalidTimeout {
            value: self.simulation.timeout.clone(),
            source,
        })
    }

    pub fn max_parallel(&self) -> usize {
        self.simulation.max_parallel.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        })
    }

    pub fn baseline_models_dir(&self) -> PathBuf {
        self.project_root.join("baseline_models")
    }

    pub fn modified_models_dir(&self) -> PathBuf {
        self.project_root.join("modified_models")
    }

    pub fn weather_dir(&self) -> PathBuf {
        self.project_root.join("weather")
    }

    pub fn baseline_results_dir(&self) -> PathBuf {
        self.project_root.join("simulation_results_baseline")
    }

    pub fn modified_results_dir(&self) -> PathBuf {
        self.project_root.join("simulation_results_modified")
    }

    pub fn comparison_csv(&self) -> PathBuf {
        self.project_root.join("temperature_comparison.csv")
    }

    pub fn hourly_baseline_csv(&self) -> PathBuf {
        self.project_root.join("hourly_temperatures_baseline.csv")
    }

    pub fn hourly_modified_csv(&self) -> PathBuf {
        self.project_root.join("hourly_temperatures_modified.csv")
    }

    /// The configured weather file, or else the first `*.epw` file in the project's weather directory.
    pub fn weather_file(&self) -> Option<PathBuf> {
        if let Some(file) = &self.weather_file {
            return Some(self.project_root.join(file));
        }
        let mut candidates: Vec<PathBuf> = std::fs::read_dir(self.weather_dir())
            .ok()?
            .filter_map(|entry| entry.ok().map(|entry| entry.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("epw"))
            })
            .collect();
        candidates.sort();
        candidates.into_iter().next()
    }

    /// Checks everything a simulation needs and reports all missing files at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.timeout()?;
        let install = self.energyplus();
        let mut missing: Vec<PathBuf> = [install.idd_file(), install.energyplus_exe()]
            .into_iter()
            .filter(|path| !path.exists())
            .collect();
        if let Some(weather_file) = self.weather_file().filter(|file| !file.exists()) {
            missing.push(weather_file);
        }
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingPaths(missing))
        }
    }

    /// Writes the effective configuration to the user configuration directory.
    pub fn save(&self) -> Result<PathBuf> {
        std::fs::create_dir_all(self.config_dir()).context("Failed to create config directory")?;
        let path = self.config_dir().join(USER_CONFIG_FILE);
        let content = serde_yml::to_string(self).context("Failed to serialize config")?;
        std::fs::write(&path, content).wrap_err_with(|| format!("Failed to write config to {:?}", path))?;
        info!("Saved configuration to {}", path.display());
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use temp_dir::TempDir;

    fn load(dir: &TempDir, args: Args) -> Config {
        let args = Args {
            project_root: Some(dir.path().join("project")),
            ..args
        };
        Config::load(&dir.path().join("config"), &dir.path().join("data"), args).unwrap()
    }

    #[test]
    fn built_in_defaults() {
        let dir = TempDir::new().unwrap();
        let cfg = load(&dir, Args::default());

        assert_eq!(cfg.simulation.timeout, "10m");
        assert_eq!(cfg.timeout().unwrap(), Duration::from_secs(600));
        assert!(cfg.simulation.expand_objects);
        assert_eq!(cfg.simulation.expected_artifacts, ["eplusout.csv"]);
        assert_eq!(cfg.schedule.target_version, "25.1.0");
        assert_eq!(cfg.results.variable, "Zone Mean Air Temperature");
        assert_eq!(cfg.data_dir(), dir.path().join("data"));
        assert_eq!(
            cfg.baseline_results_dir(),
            dir.path().join("project").join("simulation_results_baseline")
        );
    }

    #[test]
    fn later_layers_override_earlier_ones() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("config")).unwrap();
        std::fs::create_dir_all(dir.path().join("project")).unwrap();
        std::fs::write(
            dir.path().join("config").join("config.yaml"),
            "simulation:\n  timeout: 5m\n  max_parallel: 2\nresults:\n  temperature_unit: K\n",
        )
        .unwrap();
        std::fs::write(
            dir.path().join("project").join("ubem.yaml"),
            "results:\n  temperature_unit: F\n",
        )
        .unwrap();

        let cfg = load(&dir, Args {
            max_parallel: Some(6),
            ..Args::default()
        });

        assert_eq!(cfg.timeout().unwrap(), Duration::from_secs(300));
        assert_eq!(cfg.max_parallel(), 6);
        assert_eq!(cfg.results.temperature_unit, "F");
        assert_eq!(cfg.results.output_csv_name, "eplusout.csv");
    }

    #[test]
    fn weather_file_falls_back_to_weather_directory() {
        let dir = TempDir::new().unwrap();
        let weather_dir = dir.path().join("project").join("weather");
        std::fs::create_dir_all(&weather_dir).unwrap();
        std::fs::write(weather_dir.join("b.epw"), "").unwrap();
        std::fs::write(weather_dir.join("a.EPW"), "").unwrap();
        std::fs::write(weather_dir.join("notes.txt"), "").unwrap();

        let cfg = load(&dir, Args::default());
        assert_eq!(cfg.weather_file(), Some(weather_dir.join("a.EPW")));

        let cfg = load(&dir, Args {
            weather_file: Some(PathBuf::from("weather/b.epw")),
            ..Args::default()
        });
        assert_eq!(cfg.weather_file(), Some(dir.path().join("project").join("weather/b.epw")));
    }

    #[test]
    fn validation_lists_every_missing_file() {
        let dir = TempDir::new().unwrap();
        let cfg = load(&dir, Args {
            energyplus_root: Some(dir.path().join("eplus")),
            weather_file: Some(PathBuf::from("missing.epw")),
            ..Args::default()
        });

        match cfg.validate() {
            Err(ConfigError::MissingPaths(paths)) => assert_eq!(paths.len(), 3),
            other => panic!("unexpected validation result: {other:?}"),
        }

        let cfg = load(&dir, Args {
            timeout: Some("soon".to_string()),
            ..Args::default()
        });
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidTimeout { .. })));
    }

    #[test]
    fn saves_effective_configuration() {
        let dir = TempDir::new().unwrap();
        let cfg = load(&dir, Args::default());

        let path = cfg.save().unwrap();

        let saved = std::fs::read_to_string(path).unwrap();
        assert!(!saved.contains("data_dir"));
        let reloaded: Config = serde_yml::from_str(&saved).unwrap();
        assert_eq!(reloaded.simulation.timeout, "10m");
        assert_eq!(reloaded.simulation, cfg.simulation);
        assert_eq!(reloaded.results, cfg.results);
    }
}
