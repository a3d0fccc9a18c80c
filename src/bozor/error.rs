use crate::{notify::DispatchError, session::SessionError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Error surface of the HTTP layer. An OTP mismatch is deliberately not
/// represented here: a code that does not match is a negative result the
/// handler reports itself, not a fault.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Malformed input the caller can correct (400).
    #[error("{0}")]
    Validation(String),
    /// Phone/email shape rejection (403, matching the upstream contract).
    #[error("{0}")]
    InvalidContact(String),
    /// No matching record (404).
    #[error("{0}")]
    NotFound(String),
    /// Missing, invalid, or expired credentials (401).
    #[error("{0}")]
    Auth(String),
    /// Role not in the allowed set (403).
    #[error("Access denied")]
    Forbidden,
    /// Notification channel failure (502), distinct from a code mismatch.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    /// Anything unexpected (500). Logged in full, generic to the client.
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        Self::Auth(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::InvalidContact(_) | Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Auth(_) => StatusCode::UNAUTHORIZED,
            Self::Dispatch(_) => StatusCode::BAD_GATEWAY,
            Self::Internal(err) => {
                error!("internal error: {err:?}");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::Validation("bad".to_string())
                .into_response()
                .status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Forbidden.into_response().status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("missing".to_string())
                .into_response()
                .status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Auth("expired".to_string())
                .into_response()
                .status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Dispatch(DispatchError::Timeout)
                .into_response()
                .status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_internal_error_is_opaque() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused to 10.0.0.3"));

        assert_eq!(err.to_string(), "Internal server error");
    }
}
