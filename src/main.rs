//! ALE - Application Level Events middleware
//!
//! Main entry point: loads the configuration, starts the simulated readers,
//! triggers and every configured reporting cycle.

mod cli;
mod compose;
mod logging;

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::{error, info, warn};

use ale_config::{ConfigLoader, ConfigValidator};

use crate::cli::{Cli, Commands};
use crate::compose::Deployment;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run { duration: None }) {
        Commands::Run { duration } => run(&cli.config, duration.map(Duration::from_secs)),
        Commands::Validate => validate(&cli.config),
    }
}

/// Run every configured cycle until Ctrl-C or the time limit.
fn run(path: &Path, limit: Option<Duration>) -> anyhow::Result<()> {
    let (config, validation) = ConfigLoader::load_validated(path)
        .with_context(|| format!("loading configuration {}", path.display()))?;
    logging::init_tracing(&config.logging)?;
    for warning in &validation.warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }

    info!("Starting ALE v{}", env!("CARGO_PKG_VERSION"));
    info!("Configuration: {}", path.display());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("ale-runtime")
        .build()
        .context("building tokio runtime")?;

    let mut deployment = Deployment::start(&config, runtime.handle())?;
    info!(
        readers = deployment.reader_count(),
        cycles = deployment.cycle_count(),
        "ALE running, press Ctrl-C to stop"
    );

    runtime.block_on(wait_for_shutdown(limit));

    deployment.shutdown();
    runtime.shutdown_timeout(Duration::from_secs(2));
    info!("ALE stopped");
    Ok(())
}

async fn wait_for_shutdown(limit: Option<Duration>) {
    let deadline = async {
        match limit {
            Some(limit) => tokio::time::sleep(limit).await,
            None => std::future::pending::<()>().await,
        }
    };
    tokio::select! {
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => info!("Ctrl-C received, shutting down"),
            Err(err) => error!(error = %err, "Failed to listen for Ctrl-C, shutting down"),
        },
        _ = deadline => info!("Time limit reached, shutting down"),
    }
}

/// Print every validation error and warning.
fn validate(path: &Path) -> anyhow::Result<()> {
    let config = ConfigLoader::load(path).with_context(|| format!("loading configuration {}", path.display()))?;
    let result = ConfigValidator::validate(&config)?;

    for warning in &result.warnings {
        println!("warning: {}: {}", warning.path, warning.message);
    }
    for error in &result.errors {
        println!("error: {}: {}", error.path, error.message);
    }
    if !result.is_valid() {
        bail!("{} error(s) in {}", result.errors.len(), path.display());
    }
    println!(
        "{}: {} reader(s), {} trigger(s), {} cycle(s) OK",
        path.display(),
        config.readers.len(),
        config.triggers.len(),
        config.cycle_names().len()
    );
    Ok(())
}
