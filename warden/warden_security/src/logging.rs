//! Logging initialisation.

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over the configuration. Records emitted
/// through the `log` facade are forwarded to the subscriber as well.
///
/// # Returns
///
/// * `Ok(true)` - If the subscriber was installed.
/// * `Ok(false)` - If a global subscriber was already installed.
/// * `Err` - If the configured filter directive is invalid.
pub fn init_logging(config: &LoggingConfig) -> Result<bool> {
    let directive = config
        .filter
        .clone()
        .unwrap_or_else(|| config.level.as_filter().to_string());

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&directive)
            .context(format!("Invalid log filter: {}", directive))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if config.json {
        builder.json().try_init().is_ok()
    } else {
        builder.try_init().is_ok()
    };

    Ok(installed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::utils::LogLevel;

    #[test]
    fn test_init_twice_is_not_an_error() {
        let config = LoggingConfig {
            level: LogLevel::Debug,
            json: false,
            filter: None,
        };
        init_logging(&config).unwrap();
        assert!(!init_logging(&config).unwrap());
    }

    #[test]
    fn test_invalid_filter() {
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig {
            filter: Some("warden=notalevel".to_string()),
            ..LoggingConfig::default()
        };
        assert!(init_logging(&config).is_err());
    }
}
