pub mod config;
mod filters;
mod formatter;
pub mod report;

pub use config::{LogFormat, LoggingConfig};
pub use report::log_error;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid logging config: {0}")]
    InvalidConfig(String),
    #[error("invalid log filter directive: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),
    #[error("global subscriber already set: {0}")]
    Init(#[from] tracing_subscriber::util::TryInitError),
}

/// Инициализация логирования с конфигурацией.
///
/// Повторный вызов в том же процессе возвращает `LoggingError::Init`.
pub fn init_logging(config: LoggingConfig) -> Result<(), LoggingError> {
    config.validate().map_err(LoggingError::InvalidConfig)?;

    let env_filter = filters::build_filter_from_config(&config)?;
    let formatter = formatter::build_formatter_from_config(&config);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(formatter)
        .try_init()?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        log_level = %config.level,
        log_format = %config.format,
        "Logging system initialized"
    );
    Ok(())
}
