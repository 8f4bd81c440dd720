use std::path::PathBuf;

/// Settings that can be given on the command line of every subcommand.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct Args {
    /// Project directory holding models, weather files and simulation results.
    #[clap(long, global = true, env = "UBEM_PROJECT_ROOT", value_name = "DIR")]
    pub project_root: Option<PathBuf>,

    /// EnergyPlus installation directory.
    #[clap(long, global = true, env = "ENERGYPLUS_ROOT", value_name = "DIR")]
    pub energyplus_root: Option<PathBuf>,

    /// Weather file used for simulations.
    #[clap(long, global = true, value_name = "FILE")]
    pub weather_file: Option<PathBuf>,

    /// Per-run simulation timeout, e.g. `10m` or `1h 30m`.
    #[clap(long, global = true, value_name = "DURATION")]
    pub timeout: Option<String>,

    /// Maximum number of models processed at the same time.
    #[clap(long, global = true, value_name = "N")]
    pub max_parallel: Option<usize>,

    /// Log at debug level.
    #[clap(long, short, global = true, action)]
    pub verbose: bool,
}

mod config_ext {
    use super::*;
    use config::{
        Map,
        Source,
        Value,
    };
    use std::collections::HashMap;

    impl Source for Args {
        fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
            Box::new((*self).clone())
        }

        fn collect(&self) -> Result<Map<String, Value>, config::ConfigError> {
            let mut cache = HashMap::<String, Value>::new();
            if let Some(project_root) = &self.project_root {
                cache.insert("project_root".to_string(), project_root.display().to_string().into());
            }
            if let Some(energyplus_root) = &self.energyplus_root {
                cache.insert("energyplus_root".to_string(), energyplus_root.display().to_string().into());
            }
            if let Some(weather_file) = &self.weather_file {
                cache.insert("weather_file".to_string(), weather_file.display().to_string().into());
            }
            if let Some(timeout) = &self.timeout {
                cache.insert("simulation.timeout".to_string(), timeout.clone().into());
            }
            if let Some(max_parallel) = self.max_parallel {
                cache.insert("simulation.max_parallel".to_string(), (max_parallel as u64).into());
            }
            Ok(cache)
        }
    }
}
