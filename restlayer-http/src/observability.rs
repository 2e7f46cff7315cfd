//! Tracing initialization

use tracing_subscriber::EnvFilter;

use crate::{
    config::{Config, LogFormat},
    error::ServiceError,
};

/// Installs the global tracing subscriber.
///
/// Falls back to the `info` level when `log_level` is not a valid filter directive.
pub fn init_tracing(config: &Config) -> Result<(), ServiceError> {
    let filter = EnvFilter::try_new(&config.service.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);

    let installed = match config.service.log_format {
        LogFormat::Json => subscriber.json().try_init(),
        LogFormat::Text => subscriber.try_init(),
    };
    installed.map_err(|e| ServiceError::Tracing(e.to_string()))?;

    tracing::info!(service = %config.service.name, "Tracing initialized");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_second_subscriber_is_refused() {
        let config = Config::default();

        let _ = init_tracing(&config);
        assert!(matches!(init_tracing(&config), Err(ServiceError::Tracing(_))));
    }
}
