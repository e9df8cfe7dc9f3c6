//! `tracing` subscriber setup: a console layer plus an optional rolling file.

use crate::config::LogSettings;
use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::{DefaultFields, Format};
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::{prelude::*, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to install tracing subscriber: {0}")]
    Install(#[from] tracing_subscriber::util::TryInitError),
}

/// Dropping this flushes the log file and stops file output.
pub struct LoggingGuard(Option<WorkerGuard>);

fn rotation(name: &str) -> Rotation {
    match name.to_lowercase().as_str() {
        "minutely" => Rotation::MINUTELY,
        "hourly" => Rotation::HOURLY,
        "never" => Rotation::NEVER,
        _ => Rotation::DAILY,
    }
}

/// The configured directive, or plain `info` when it does not parse.
fn directive_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Event format shared by the console and the file.
fn styled<S, W>(
    settings: &LogSettings,
    writer: W,
    ansi: bool,
) -> fmt::Layer<S, DefaultFields, Format, W>
where
    W: for<'w> MakeWriter<'w> + 'static,
{
    fmt::layer()
        .with_writer(writer)
        .with_ansi(ansi)
        .with_target(settings.show_target)
        .with_thread_ids(settings.show_thread_ids)
        .with_file(settings.show_file_line)
        .with_line_number(settings.show_file_line)
}

fn file_writer(settings: &LogSettings) -> (NonBlocking, WorkerGuard) {
    let appender = RollingFileAppender::new(
        rotation(&settings.rotation),
        &settings.log_dir,
        &settings.file_name_prefix,
    );
    tracing_appender::non_blocking(appender)
}

/// Installs the global subscriber. `RUST_LOG` overrides `settings.level`.
pub fn init_logging(settings: &LogSettings) -> Result<LoggingGuard, LoggingError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| directive_filter(&settings.level));

    let (file_layer, guard) = match settings
        .file_logging_enabled
        .then(|| file_writer(settings))
    {
        Some((writer, guard)) => (Some(styled(settings, writer, false)), Some(guard)),
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(styled(settings, std::io::stdout, settings.ansi_colors))
        .with(file_layer)
        .try_init()?;

    tracing::info!(
        "Logging initialized at {} (file output {})",
        settings.level,
        if guard.is_some() { "on" } else { "off" }
    );
    Ok(LoggingGuard(guard))
}
