use clap::{
    Parser,
    Subcommand,
    ValueEnum,
};
use std::path::PathBuf;
use ubem_config::Args;
use ubem_core::{
    schedule::OutageAction,
    CalendarDate,
};

/// Heat-event outage studies for urban building energy models.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[clap(flatten)]
    pub args: Args,

    #[command(subcommand)]
    pub command: Command,
}

/// Which side of the study a command works on.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Variant {
    #[default]
    Baseline,
    Modified,
}

#[derive(clap::Args, Debug, Clone)]
pub struct OutageArgs {
    /// What to do with the HVAC systems during the outage.
    #[arg(long, default_value = "disable_cooling")]
    pub action: OutageAction,

    /// First outage day as `M/D`. Defaults to the start of the hottest window of the weather file.
    #[arg(long)]
    pub start: Option<CalendarDate>,

    /// Last outage day as `M/D`, inclusive. Defaults to December 31st.
    #[arg(long, conflicts_with = "duration_days")]
    pub end: Option<CalendarDate>,

    /// Length of the hottest window searched for when no start is given.
    #[arg(long, default_value_t = 3)]
    pub window_days: usize,

    /// Outage length in days, counted from the start.
    #[arg(long)]
    pub duration_days: Option<u32>,

    /// Name of the outage schedule written into the models.
    #[arg(long)]
    pub schedule_name: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Find the hottest run of consecutive days in a weather file.
    HottestWindow {
        /// Defaults to the configured weather file.
        #[arg(long)]
        weather: Option<PathBuf>,

        #[arg(long, default_value_t = 3)]
        days: usize,
    },

    /// Apply an outage to one model.
    Mutate {
        source: PathBuf,
        destination: PathBuf,

        #[clap(flatten)]
        outage: OutageArgs,
    },

    /// Apply an outage to every model of a directory.
    BatchMutate {
        /// Defaults to the project's baseline models.
        #[arg(long)]
        source_dir: Option<PathBuf>,

        /// Defaults to the project's modified models.
        #[arg(long)]
        destination_dir: Option<PathBuf>,

        /// Only process the first N models.
        #[arg(long)]
        max_files: Option<usize>,

        #[clap(flatten)]
        outage: OutageArgs,
    },

    /// Simulate one model.
    Simulate {
        model: PathBuf,

        /// Directory receiving `<model stem>/`. Defaults to the project's baseline results.
        #[arg(long)]
        output_root: Option<PathBuf>,
    },

    /// Simulate every model of the baseline or modified set.
    BatchSimulate {
        #[arg(long, value_enum, default_value_t)]
        variant: Variant,

        #[arg(long)]
        models_dir: Option<PathBuf>,

        #[arg(long)]
        output_root: Option<PathBuf>,

        /// Only simulate the first N models.
        #[arg(long)]
        max_runs: Option<usize>,
    },

    /// Statistics of the configured output variable of one run.
    Summarize { run_dir: PathBuf },

    /// Compare baseline and modified runs building by building.
    Compare {
        #[arg(long)]
        baseline: Option<PathBuf>,

        #[arg(long)]
        modified: Option<PathBuf>,

        /// Comparison CSV. Statistics are written next to it.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Also write per-building annual means to this CSV.
        #[arg(long)]
        building_table: Option<PathBuf>,
    },

    /// Write the hourly values of one run as CSV.
    HourlyCsv { run_dir: PathBuf, output: PathBuf },

    /// Collect the hourly zone means of all runs of one set into a single CSV.
    HourlyMatrix {
        #[arg(long, value_enum, default_value_t)]
        variant: Variant,

        #[arg(long)]
        results_dir: Option<PathBuf>,

        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Thermal comfort impact of the outage from the two hourly matrices.
    Comfort {
        /// 1-based hour of the year the heat event starts at.
        #[arg(long)]
        start_hour: usize,

        #[arg(long, default_value = "Heat event")]
        event_name: String,

        #[arg(long)]
        baseline: Option<PathBuf>,

        #[arg(long)]
        modified: Option<PathBuf>,

        /// Write a plain-text report to this file.
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Show the effective configuration.
    Config {
        /// Store it as the user configuration.
        #[arg(long, action)]
        save: bool,
    },
}
