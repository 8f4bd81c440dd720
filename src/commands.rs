use crate::cli::{
    Cli,
    Command,
    OutageArgs,
    Variant,
};
use color_eyre::Result;
use eyre::{
    bail,
    eyre,
    Context as _,
};
use serde::Serialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use ubem_config::Config;
use ubem_core::{
    idf::VersionNumber,
    results::{
        analyze_comfort,
        compare_directories,
        default_thresholds,
        write_building_table,
        write_comparison,
        write_hourly_csv,
        ExtractOptions,
        HourlyMatrix,
        VariableSeries,
    },
    schedule::{
        BatchScheduleMutator,
        MutationOptions,
        OutagePeriod,
        ScheduleMutator,
    },
    weather,
    CalendarDate,
};
use ubem_orchestrator::{
    EngineConfig,
    SimulationOrchestrator,
    SimulationRequest,
};

pub async fn run(cli: Cli) -> Result<()> {
    let Cli { args, command } = cli;
    let config = Config::new(args).wrap_err("Failed to load configuration")?;
    debug!("Project root {}", config.project_root.display());

    match command {
        Command::HottestWindow { weather, days } => {
            let path = weather_file(&config, weather)?;
            let window = weather::analyze_file(&path, days)?;
            print_json(&window)
        }
        Command::Mutate {
            source,
            destination,
            outage,
        } => {
            let period = outage_period(&config, &outage)?;
            let mutator = schedule_mutator(&config, &outage)?;
            let summary = mutator.mutate_file(&source, &destination, &period)?;
            print_json(&summary)
        }
        Command::BatchMutate {
            source_dir,
            destination_dir,
            max_files,
            outage,
        } => {
            let period = outage_period(&config, &outage)?;
            let batch = BatchScheduleMutator::new(schedule_mutator(&config, &outage)?)
                .with_max_parallel(config.max_parallel())
                .with_max_files(max_files);
            let source_dir = source_dir.unwrap_or_else(|| config.baseline_models_dir());
            let destination_dir = destination_dir.unwrap_or_else(|| config.modified_models_dir());
            let cancel = cancel_on_ctrl_c();
            let report = batch
                .run(&source_dir, &destination_dir, &period, Some(&cancel))
                .await?;
            print_json(&report)
        }
        Command::Simulate { model, output_root } => {
            config.validate()?;
            let weather = weather_file(&config, None)?;
            let output_root = output_root.unwrap_or_else(|| config.baseline_results_dir());
            let orchestrator = SimulationOrchestrator::new(EngineConfig::from_config(&config)?);
            let run = orchestrator
                .run(&SimulationRequest::for_model(&model, &weather, &output_root))
                .await;
            print_json(&run)?;
            if !run.is_success() {
                bail!("Simulation of {} failed: {}", run.building_id, run.status);
            }
            Ok(())
        }
        Command::BatchSimulate {
            variant,
            models_dir,
            output_root,
            max_runs,
        } => {
            config.validate()?;
            let weather = weather_file(&config, None)?;
            let (default_models, default_output) = match variant {
                Variant::Baseline => (config.baseline_models_dir(), config.baseline_results_dir()),
                Variant::Modified => (config.modified_models_dir(), config.modified_results_dir()),
            };
            let engine = EngineConfig {
                max_runs,
                ..EngineConfig::from_config(&config)?
            };
            let orchestrator = SimulationOrchestrator::new(engine);
            let cancel = cancel_on_ctrl_c();
            let report = orchestrator
                .run_batch(
                    &models_dir.unwrap_or(default_models),
                    &weather,
                    &output_root.unwrap_or(default_output),
                    Some(&cancel),
                )
                .await?;
            print_json(&report)
        }
        Command::Summarize { run_dir } => {
            let series = VariableSeries::from_run_dir(&run_dir, &extract_options(&config))?;
            print_json(&series.summarize())
        }
        Command::Compare {
            baseline,
            modified,
            output,
            building_table,
        } => {
            let comparison = compare_directories(
                &baseline.unwrap_or_else(|| config.baseline_results_dir()),
                &modified.unwrap_or_else(|| config.modified_results_dir()),
                &extract_options(&config),
            )?;
            let output = output.unwrap_or_else(|| config.comparison_csv());
            let summary_path = write_comparison(&comparison, &output)?;
            info!("Statistics written to {}", summary_path.display());
            if let Some(path) = building_table {
                write_building_table(&comparison, &path, &config.results.temperature_unit)?;
            }
            print_json(&comparison)
        }
        Command::HourlyCsv { run_dir, output } => {
            let series = VariableSeries::from_run_dir(&run_dir, &extract_options(&config))?;
            write_hourly_csv(&series, &output)?;
            print_json(&serde_json::json!({
                "output": output,
                "points": series.len(),
                "zones": series.columns,
            }))
        }
        Command::HourlyMatrix {
            variant,
            results_dir,
            output,
        } => {
            let (default_results, default_output) = match variant {
                Variant::Baseline => (config.baseline_results_dir(), config.hourly_baseline_csv()),
                Variant::Modified => (config.modified_results_dir(), config.hourly_modified_csv()),
            };
            let output = output.unwrap_or(default_output);
            let (matrix, skipped) =
                HourlyMatrix::from_results_dir(&results_dir.unwrap_or(default_results), &extract_options(&config))?;
            matrix.write(&output)?;
            print_json(&serde_json::json!({
                "output": output,
                "buildings": matrix.buildings,
                "hours": matrix.hours(),
                "skipped": skipped,
            }))
        }
        Command::Comfort {
            start_hour,
            event_name,
            baseline,
            modified,
            report,
        } => {
            let baseline = HourlyMatrix::read(&baseline.unwrap_or_else(|| config.hourly_baseline_csv()))?;
            let modified = HourlyMatrix::read(&modified.unwrap_or_else(|| config.hourly_modified_csv()))?;
            let analysis = analyze_comfort(&baseline, &modified, start_hour, &default_thresholds(), &event_name)?;
            if let Some(path) = report {
                analysis.write_report(&path)?;
                info!("Report written to {}", path.display());
            }
            print_json(&analysis)
        }
        Command::Config { save } => {
            if save {
                config.save()?;
            }
            let install = config.energyplus();
            print!("{}", serde_yml::to_string(&config).wrap_err("Failed to serialize config")?);
            print_json(&serde_json::json!({
                "config_dir": config.config_dir(),
                "data_dir": config.data_dir(),
                "energyplus": install,
                "idd_file": install.idd_file(),
                "weather_file": config.weather_file(),
            }))
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Stops dispatching new batch units on Ctrl-C. Units already running are left to finish.
fn cancel_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let child = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, waiting for running units to finish");
            child.cancel();
        }
    });
    token
}

fn weather_file(config: &Config, explicit: Option<PathBuf>) -> Result<PathBuf> {
    explicit.or_else(|| config.weather_file()).ok_or_else(|| {
        eyre!(
            "No weather file configured and no *.epw file in {}",
            config.weather_dir().display()
        )
    })
}

fn extract_options(config: &Config) -> ExtractOptions {
    ExtractOptions {
        output_csv_name: config.results.output_csv_name.clone(),
        variable: config.results.variable.clone(),
    }
}

fn schedule_mutator(config: &Config, outage: &OutageArgs) -> Result<ScheduleMutator> {
    let parse_version = |value: &str| -> Result<VersionNumber> {
        value
            .parse()
            .map_err(|err| eyre!("Invalid EnergyPlus version {value:?}: {err}"))
    };
    let options = MutationOptions {
        schedule_name: outage.schedule_name.clone(),
        target_version: parse_version(&config.schedule.target_version)?,
        minimum_version: parse_version(&config.schedule.minimum_version)?,
        add_zone_temperature_output: config.schedule.add_zone_temperature_output,
    };
    let idd_file = config.energyplus().idd_file();
    debug!("Loading data dictionary {}", idd_file.display());
    ScheduleMutator::from_schema_file(&idd_file, options)
        .wrap_err_with(|| format!("Failed to load data dictionary {idd_file:?}"))
}

/// An explicit start date wins; otherwise the outage starts on the hottest window of the weather file.
fn outage_period(config: &Config, outage: &OutageArgs) -> Result<OutagePeriod> {
    let start = match outage.start {
        Some(start) => start,
        None => {
            let path = weather_file(config, None)?;
            let window = weather::analyze_file(&path, outage.window_days)?;
            info!(
                "Hottest {}-day window of {} starts {}",
                window.length,
                path.display(),
                window.start
            );
            window.start
        }
    };
    period_from(start, outage)
}

fn period_from(start: CalendarDate, outage: &OutageArgs) -> Result<OutagePeriod> {
    let period = match (outage.end, outage.duration_days) {
        (Some(end), _) => OutagePeriod::new(start, end, outage.action)?,
        (None, Some(0)) => bail!("An outage lasts at least one day"),
        (None, Some(days)) => OutagePeriod::new(start, start.saturating_add_days(days - 1), outage.action)?,
        (None, None) => OutagePeriod::until_year_end(start, outage.action),
    };
    Ok(period)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use ubem_core::schedule::OutageAction;

    fn outage(end: Option<CalendarDate>, duration_days: Option<u32>) -> OutageArgs {
        OutageArgs {
            action: OutageAction::DisableCooling,
            start: None,
            end,
            window_days: 3,
            duration_days,
            schedule_name: None,
        }
    }

    #[test]
    fn periods_from_arguments() {
        let start = CalendarDate::new(7, 15).unwrap();

        let period = period_from(start, &outage(None, Some(4))).unwrap();
        assert_eq!(period.end(), CalendarDate::new(7, 18).unwrap());

        let period = period_from(start, &outage(Some(CalendarDate::new(8, 1).unwrap()), None)).unwrap();
        assert_eq!(period.end(), CalendarDate::new(8, 1).unwrap());

        let period = period_from(start, &outage(None, None)).unwrap();
        assert_eq!(period.end(), CalendarDate::LAST);

        assert!(period_from(start, &outage(None, Some(0))).is_err());
        assert!(period_from(start, &outage(Some(CalendarDate::new(7, 1).unwrap()), None)).is_err());
    }
}
