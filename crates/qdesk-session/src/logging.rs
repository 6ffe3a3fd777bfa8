//! Tracing subscriber setup
//!
//! Every qdesk crate logs through `tracing`. The embedding application calls
//! [`init`] once, usually with a config built from the `logging` section of
//! [`SessionSettings`](crate::SessionSettings).

use anyhow::Context;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer, Registry,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

use crate::settings::{self, LoggingSettings};

const LOG_FILE_PREFIX: &str = "qdesk.log";

/// Resolved subscriber configuration
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Human readable output on stderr
    pub console: bool,
    /// Daily rolling JSON file under `log_dir`, for bug reports
    pub json_file: bool,
    pub log_dir: PathBuf,
    /// Emit an event when an instrumented span opens and closes
    pub span_events: bool,
}

impl LoggingConfig {
    /// Resolve settings, placing logs in the data dir when no directory is set
    pub fn from_settings(logging: &LoggingSettings) -> anyhow::Result<Self> {
        let log_dir = match &logging.log_dir {
            Some(dir) => dir.clone(),
            None => settings::data_dir()?.join("logs"),
        };
        Ok(Self {
            filter: logging.filter.clone(),
            console: logging.console,
            json_file: logging.json_file,
            log_dir,
            span_events: logging.span_events,
        })
    }

    /// Console only, everything at debug
    pub fn testing() -> Self {
        Self {
            filter: "debug".to_string(),
            console: true,
            json_file: false,
            log_dir: std::env::temp_dir().join("qdesk-tests"),
            span_events: true,
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.filter))
    }
}

/// Install the global subscriber
///
/// When the JSON file layer is on, the returned guard flushes it on drop and
/// must be held for as long as logs should reach the file. Fails if a global
/// subscriber is already installed.
pub fn init(config: &LoggingConfig) -> anyhow::Result<Option<WorkerGuard>> {
    // NEW fires once per span; ENTER would fire on every poll
    let span_events = if config.span_events {
        FmtSpan::NEW | FmtSpan::CLOSE
    } else {
        FmtSpan::NONE
    };

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let mut guard = None;

    if config.console {
        layers.push(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_span_events(span_events.clone())
                .with_filter(config.env_filter())
                .boxed(),
        );
    }

    if config.json_file {
        std::fs::create_dir_all(&config.log_dir)
            .with_context(|| format!("Failed to create log directory {:?}", config.log_dir))?;
        let appender = tracing_appender::rolling::daily(&config.log_dir, LOG_FILE_PREFIX);
        let (writer, file_guard) = tracing_appender::non_blocking(appender);
        guard = Some(file_guard);

        layers.push(
            fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .with_ansi(false)
                .with_span_events(span_events)
                .with_writer(writer)
                .with_filter(config.env_filter())
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    tracing::debug!(
        filter = %config.filter,
        console = config.console,
        json_file = config.json_file,
        log_dir = %config.log_dir.display(),
        "logging initialized"
    );
    Ok(guard)
}
