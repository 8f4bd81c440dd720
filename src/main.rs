use clap::Parser;
use color_eyre::Result;
use ubem_resilience::{
    commands,
    init_errors,
    init_logging,
    Cli,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_errors()?;
    let cli = Cli::parse();
    init_logging(cli.args.verbose)?;
    commands::run(cli).await
}
