//! Tracing setup.

use std::sync::OnceLock;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

use ale_config::{ConfigLoader, LoggingConfig};

// Flushes the file writer when the process exits.
static GUARD: OnceLock<WorkerGuard> = OnceLock::new();

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Initialize tracing with console output and, when a directory is
/// configured, daily rolling files.
pub(crate) fn init_tracing(config: &LoggingConfig) -> anyhow::Result<()> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    layers.push(if config.json {
        fmt::layer().json().with_target(true).boxed()
    } else {
        fmt::layer().with_target(true).with_ansi(true).boxed()
    });

    if let Some(directory) = &config.directory {
        let directory = ConfigLoader::expand_path(&directory.to_string_lossy());
        std::fs::create_dir_all(&directory)
            .with_context(|| format!("creating log directory {}", directory))?;
        let file_appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(&config.file_prefix)
            .filename_suffix("log")
            .max_log_files(config.max_log_files)
            .build(&directory)
            .context("creating log file appender")?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let _ = GUARD.set(guard);

        layers.push(if config.json {
            fmt::layer().json().with_writer(non_blocking).boxed()
        } else {
            fmt::layer().with_writer(non_blocking).with_ansi(false).boxed()
        });
    }

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(layers)
        .with(env_filter)
        .try_init()
        .context("installing tracing subscriber")?;

    Ok(())
}
