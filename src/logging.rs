// 📝 Logging - tracing subscriber setup shared by the binaries

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum LogError {
    #[error("invalid log level: {0}")]
    Filter(#[from] ParseError),

    #[error("failed to install tracing subscriber: {0}")]
    Install(Box<dyn std::error::Error + Send + Sync + 'static>),
}

/// Install the global subscriber. `RUST_LOG` wins over `default_level`.
///
/// Logs go to stderr so command output on stdout stays clean.
pub fn init(default_level: &str) -> Result<(), LogError> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(default_level))?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(LogError::Install)
}
