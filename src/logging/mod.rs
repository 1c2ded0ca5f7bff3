//! Structured logging setup.

pub mod redact;

use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

use crate::config::{LogFormat, LoggingConfig};

/// Logging error types
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("initialization error: {0}")]
    Init(String),
}

/// Initialize the global subscriber from config.
pub fn init(config: &LoggingConfig) -> Result<(), LoggingError> {
    let env_filter =
        EnvFilter::try_new(&config.level).map_err(|e| LoggingError::Init(e.to_string()))?;

    match config.format {
        LogFormat::Json => {
            let subscriber = Registry::default()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json());
            subscriber
                .try_init()
                .map_err(|e| LoggingError::Init(e.to_string()))?;
        }
        LogFormat::Text => {
            let subscriber = Registry::default()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer());
            subscriber
                .try_init()
                .map_err(|e| LoggingError::Init(e.to_string()))?;
        }
    }

    Ok(())
}
