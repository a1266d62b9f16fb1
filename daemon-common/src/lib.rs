//! Pieces shared by the service binaries: log level flags, tracing setup and
//! optional daemonization.

use clap::ValueEnum;
use tracing_subscriber::filter::LevelFilter;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Install the global `fmt` subscriber capped at `level`.
///
/// Fails when a subscriber is already installed, which happens in tests that
/// share a process.
pub fn try_init_tracing(level: LogLevel) -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::from(level))
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}

/// Detach the process into the background when `enable` is true.
///
/// Must run before any async runtime is started, since forking a process
/// with live runtime threads leaves the child without them.
pub fn maybe_daemonize(enable: bool) -> anyhow::Result<()> {
    if enable {
        daemonize::Daemonize::new()
            .start()
            .map_err(|e| anyhow::anyhow!(e))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_level_is_info() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn parses_level_names() {
        let level = LogLevel::from_str("warn", true).unwrap();
        assert_eq!(LevelFilter::from(level), LevelFilter::WARN);
    }

    #[test]
    fn second_init_fails() {
        let _ = try_init_tracing(LogLevel::Debug);
        assert!(try_init_tracing(LogLevel::Debug).is_err());
    }

    #[test]
    fn disabled_daemonize_is_noop() {
        maybe_daemonize(false).unwrap();
    }
}
