use tracing_subscriber::EnvFilter;

use crate::config::{LogFormat, LoggingConfig};
use crate::errors::QuoteRequestError;

/// Installs the global subscriber. `RUST_LOG` wins over the configured
/// level when set.
pub fn init_logging(config: &LoggingConfig) -> Result<(), QuoteRequestError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);

    let installed = match config.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    installed.map_err(|error| QuoteRequestError::Configuration(error.to_string()))
}
