//! Tracing setup shared by the CLI render commands and the stdio MCP server.
//!
//! Stdout carries protocol messages or rendered prompts, so logs never go there:
//!
//! - **LOG_FILE** (or [`TracingOptions::log_file`]): append plain-text logs to that file through a
//!   non-blocking writer.
//! - otherwise, with `verbose`: write to stderr.
//! - otherwise: drop everything.
//!
//! **RUST_LOG** sets the filter; default `info` (`debug` when verbose).

use std::path::PathBuf;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::LoadError;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

#[derive(Clone, Debug, Default)]
pub struct TracingOptions {
    pub verbose: bool,
    /// Takes precedence over `LOG_FILE`.
    pub log_file: Option<PathBuf>,
}

/// Keeps the non-blocking file writer alive. Hold it until `main` returns so buffered lines are flushed.
#[must_use = "dropping the guard stops the log writer"]
pub struct LogGuard {
    worker: Option<tracing_appender::non_blocking::WorkerGuard>,
}

impl LogGuard {
    /// True when logs are written to a file.
    pub fn is_file(&self) -> bool {
        self.worker.is_some()
    }
}

/// Installs the global subscriber. Fails if the log file cannot be opened or a subscriber is
/// already installed.
pub fn init_tracing(opts: &TracingOptions) -> Result<LogGuard, LoadError> {
    let default_directive = if opts.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let log_file = opts.log_file.clone().or_else(|| crate::env_path("LOG_FILE"));
    let (layer, worker): (BoxedLayer, _) = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|source| LoadError::LogFile {
                    path: path.display().to_string(),
                    source,
                })?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|source| LoadError::LogFile {
                    path: path.display().to_string(),
                    source,
                })?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter)
                .boxed();
            (layer, Some(guard))
        }
        None if opts.verbose => {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(filter)
                .boxed();
            (layer, None)
        }
        None => {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(std::io::sink)
                .with_filter(filter)
                .boxed();
            (layer, None)
        }
    };

    tracing_subscriber::registry()
        .with(layer)
        .try_init()
        .map_err(|e| LoadError::Subscriber(e.to_string()))?;

    let guard = LogGuard { worker };
    if guard.is_file() {
        tracing::debug!("tracing initialized with file writer");
    }
    Ok(guard)
}
