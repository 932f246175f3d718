//! Common error classification shared by the gateway services

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommonError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Authorization failed: {0}")]
    AuthorizationFailed(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External service error: {0}")]
    ExternalService(String),

    #[error("Cryptography error: {0}")]
    Crypto(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CommonError {
    /// Transient failures that may succeed if repeated
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            CommonError::Timeout(_)
                | CommonError::ExternalService(_)
                | CommonError::RateLimitExceeded(_)
        )
    }

    /// Short machine-readable label, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            CommonError::Configuration(_) => "configuration",
            CommonError::AuthenticationFailed(_) => "authentication",
            CommonError::AuthorizationFailed(_) => "authorization",
            CommonError::NotFound(_) => "not_found",
            CommonError::AlreadyExists(_) => "already_exists",
            CommonError::InvalidInput(_) => "invalid_input",
            CommonError::ExternalService(_) => "external_service",
            CommonError::Crypto(_) => "crypto",
            CommonError::RateLimitExceeded(_) => "rate_limited",
            CommonError::Timeout(_) => "timeout",
            CommonError::Internal(_) => "internal",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(CommonError::Timeout("test".to_string()).is_retryable());
        assert!(CommonError::ExternalService("test".to_string()).is_retryable());
        assert!(CommonError::RateLimitExceeded("test".to_string()).is_retryable());
        assert!(!CommonError::NotFound("test".to_string()).is_retryable());
        assert!(!CommonError::AlreadyExists("test".to_string()).is_retryable());
    }

    #[test]
    fn test_kind_labels() {
        assert_eq!(CommonError::NotFound("c".to_string()).kind(), "not_found");
        assert_eq!(CommonError::Timeout("c".to_string()).kind(), "timeout");
    }
}
