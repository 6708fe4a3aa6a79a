//! Utilities for logging.

use groupset_error::{Result, ResultExt};
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoggingFormat {
    #[default]
    Pretty,
    Json,
}

fn env_filter(default_level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy()
}

/// Install a global subscriber.
///
/// `RUST_LOG` overrides `default_level` when set.
pub fn configure_global_logger(default_level: Level, format: LoggingFormat) -> Result<()> {
    let builder = FmtSubscriber::builder()
        .with_env_filter(env_filter(default_level))
        .with_file(true)
        .with_line_number(true);

    match format {
        LoggingFormat::Pretty => tracing::subscriber::set_global_default(builder.finish()),
        LoggingFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
    }
    .context("Failed to set global logger")
}

/// Install a subscriber writing through the test harness.
///
/// Safe to call from multiple tests, only the first call takes effect.
pub fn init_test() {
    let subscriber = FmtSubscriber::builder()
        .with_test_writer()
        .with_env_filter(env_filter(Level::DEBUG))
        .with_file(true)
        .with_line_number(true)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_test_twice() {
        init_test();
        init_test();
        tracing::debug!("logging from test");
    }

    #[test]
    fn global_logger_already_set() {
        init_test();
        configure_global_logger(Level::INFO, LoggingFormat::Json).unwrap_err();
    }
}
