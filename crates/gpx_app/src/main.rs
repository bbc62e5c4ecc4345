use std::process::ExitCode;

use clap::Parser;
use gpx_app::{run, Cli};

fn main() -> anyhow::Result<ExitCode> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    gpx_logging::initialize(
        &cli.log_destination(),
        gpx_logging::level_for_verbosity(cli.verbose),
    );

    let config = cli.into_config();
    let report = run(&config)?;
    Ok(ExitCode::from(report.outcome.exit_code()))
}
