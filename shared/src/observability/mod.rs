//! Observability utilities

pub mod logging;

pub use logging::*;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ObservabilityError {
    #[error("Failed to install log subscriber: {0}")]
    Logging(String),

    #[error("Unknown log level: {0}")]
    UnknownLevel(String),

    #[error("Unknown log format: {0}")]
    UnknownFormat(String),
}

pub type ObservabilityResult<T> = Result<T, ObservabilityError>;
