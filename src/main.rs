//! Audiolab CLI
//!
//! Command-line interface for the audiolab effect pipeline.

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use audiolab::cli::{commands, Cli, Commands};
use audiolab::{LabConfig, LabError, Pipeline};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    info!("Audiolab v{}", env!("CARGO_PKG_VERSION"));

    let config =
        LabConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    let pipeline = Pipeline::from_config(config).context("failed to build pipeline")?;

    let Some(command) = cli.command else {
        println!("Audiolab v{}", env!("CARGO_PKG_VERSION"));
        println!("Use --help for available commands");
        return Ok(());
    };

    if let Err(e) = handle_command(&pipeline, command) {
        report(&e);
        return Err(e.into());
    }
    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn handle_command(pipeline: &Pipeline, cmd: Commands) -> audiolab::Result<()> {
    match cmd {
        Commands::Info { file } => commands::info(pipeline, &file),
        Commands::Process {
            file,
            effect,
            params,
            output,
        } => commands::process(pipeline, &file, &effect, &params, &output),
        Commands::Visualize { file, out_dir } => commands::visualize(pipeline, &file, &out_dir),
        Commands::Effects => commands::effects(),
    }
}

fn report(error: &LabError) {
    eprintln!("error [{}]: {}", error.error_code(), error);
    for suggestion in error.recovery_suggestions() {
        eprintln!("  hint: {}", suggestion);
    }
}
