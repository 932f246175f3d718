use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use shared::types::CommonError;

use crate::models::MessageResponse;
use crate::storage::StorageError;

/// Handler failures.
///
/// Every variant renders as `500 {"message": ...}`; the cause is logged and
/// never sent to the caller.
#[derive(Debug)]
pub enum ApiError {
    /// A configuration value the route needs is not set
    MissingConfig {
        context: &'static str,
        variable: &'static str,
    },
    /// The storage call failed
    Storage {
        context: &'static str,
        source: StorageError,
    },
    /// The multipart body did not carry the expected file part
    MissingFile {
        context: &'static str,
        field: &'static str,
    },
    /// The request body could not be read or decoded
    InvalidUpload {
        context: &'static str,
        reason: String,
    },
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn storage(context: &'static str) -> impl FnOnce(StorageError) -> ApiError {
        move |source| ApiError::Storage { context, source }
    }

    /// The message returned to the caller
    pub fn public_message(&self) -> &'static str {
        match self {
            ApiError::MissingConfig { context, .. }
            | ApiError::Storage { context, .. }
            | ApiError::MissingFile { context, .. }
            | ApiError::InvalidUpload { context, .. } => *context,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match &self {
            ApiError::MissingConfig { context, variable } => {
                tracing::error!(variable = %variable, "{}: {} is not defined", context, variable);
            }
            ApiError::Storage { context, source } => {
                let class = CommonError::from(source);
                tracing::error!(
                    error_kind = class.kind(),
                    retryable = class.is_retryable(),
                    "{}: {}",
                    context,
                    source
                );
            }
            ApiError::MissingFile { context, field } => {
                tracing::error!(field = %field, "{}: no file attached", context);
            }
            ApiError::InvalidUpload { context, reason } => {
                tracing::error!("{}: {}", context, reason);
            }
        }

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(MessageResponse::new(self.public_message())),
        )
            .into_response()
    }
}

impl From<&StorageError> for CommonError {
    fn from(err: &StorageError) -> Self {
        let detail = err.to_string();
        match err {
            StorageError::InvalidConnectionString(_) => CommonError::Configuration(detail),
            StorageError::Signing(_) => CommonError::Crypto(detail),
            StorageError::InvalidName(_) | StorageError::InvalidHeader(_) => {
                CommonError::InvalidInput(detail)
            }
            StorageError::Request(e) if e.is_timeout() => CommonError::Timeout(detail),
            StorageError::Request(_) => CommonError::ExternalService(detail),
            StorageError::Service { status, .. } => match *status {
                400 => CommonError::InvalidInput(detail),
                401 => CommonError::AuthenticationFailed(detail),
                403 => CommonError::AuthorizationFailed(detail),
                404 => CommonError::NotFound(detail),
                409 => CommonError::AlreadyExists(detail),
                429 | 503 => CommonError::RateLimitExceeded(detail),
                _ => CommonError::ExternalService(detail),
            },
            StorageError::Xml(_) => CommonError::ExternalService(detail),
        }
    }
}
