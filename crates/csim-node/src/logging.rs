//! Global tracing subscriber, installed once by the binary.

use crate::config::LogsConfig;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter `{directive}`: {reason}")]
    Filter { directive: String, reason: String },

    #[error("cannot install subscriber: {0}")]
    Init(String),
}

/// `RUST_LOG` takes precedence over the configured level
pub fn env_filter(config: &LogsConfig) -> Result<EnvFilter, LoggingError> {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| LoggingError::Filter {
            directive: config.level.clone(),
            reason: e.to_string(),
        })
}

pub fn init_tracing(config: &LogsConfig) -> Result<(), LoggingError> {
    let filter = env_filter(config)?;

    if config.json {
        let json_layer = tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);
        tracing_subscriber::registry()
            .with(filter)
            .with(json_layer)
            .try_init()
            .map_err(|e| LoggingError::Init(e.to_string()))
    } else {
        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_ansi(true);
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .try_init()
            .map_err(|e| LoggingError::Init(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directives() {
        let config = LogsConfig {
            level: "info,csim_proxy=debug".into(),
            json: false,
        };
        assert!(env_filter(&config).is_ok());
    }
}
