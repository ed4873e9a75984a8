//! Error handling for the voice command subsystem
//!
//! This module provides the error taxonomy using thiserror. Resolution misses
//! (unresolvable references, unparseable dates, unmatched selections) are not
//! errors: those functions return `None` and callers ask for clarification.

use thiserror::Error;
use uuid::Uuid;

/// Main error type for the voice command subsystem
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    #[error("Interpretation service returned status {status}")]
    Upstream {
        status: u16,
        body: serde_json::Value,
    },

    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Failures minting the service-account token
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("Token issuer rejected the service account ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Token issuer failed ({status}): {message}")]
    Issuer { status: u16, message: String },

    #[error("Token issuer unreachable: {0}")]
    Transport(String),

    #[error("Malformed token response: {0}")]
    Malformed(String),

    #[error("Service account not configured: {0}")]
    NotConfigured(String),
}

/// Command dispatch failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Navigation command {id} not found")]
    NotFound { id: Uuid },

    #[error("Navigation command {id} already claimed by {claimed_by}")]
    AlreadyClaimed { id: Uuid, claimed_by: String },

    #[error("Navigation command {id} already executed")]
    AlreadyExecuted { id: Uuid },

    #[error("Navigation to '{route}' failed: {message}")]
    Navigation { route: String, message: String },
}

/// Result type alias for convenience
pub type VoiceResult<T> = Result<T, VoiceError>;
pub type CredentialResult<T> = Result<T, CredentialError>;
pub type DispatchResult<T> = Result<T, DispatchError>;

#[cfg(feature = "server")]
mod response {
    use axum::{
        http::StatusCode,
        response::{IntoResponse, Response},
        Json,
    };
    use voice_ops_types::ErrorResponse;

    use super::{CredentialError, DispatchError, VoiceError};

    impl VoiceError {
        /// HTTP status this error maps to
        pub fn status_code(&self) -> StatusCode {
            match self {
                VoiceError::Validation(_) => StatusCode::BAD_REQUEST,
                VoiceError::Credential(CredentialError::Rejected { .. }) => {
                    StatusCode::UNAUTHORIZED
                }
                VoiceError::Credential(_) => StatusCode::INTERNAL_SERVER_ERROR,
                VoiceError::Upstream { status, .. } => StatusCode::from_u16(*status)
                    .unwrap_or(StatusCode::BAD_GATEWAY),
                VoiceError::Dispatch(DispatchError::NotFound { .. }) => StatusCode::NOT_FOUND,
                VoiceError::Dispatch(DispatchError::AlreadyClaimed { .. })
                | VoiceError::Dispatch(DispatchError::AlreadyExecuted { .. }) => {
                    StatusCode::CONFLICT
                }
                VoiceError::Dispatch(_) | VoiceError::Http(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            }
        }
    }

    impl IntoResponse for VoiceError {
        fn into_response(self) -> Response {
            let status = self.status_code();

            // Upstream bodies are relayed unmodified
            if let VoiceError::Upstream { body, .. } = self {
                return (status, Json(body)).into_response();
            }

            let body = match &self {
                VoiceError::Validation(message) => ErrorResponse::new(message.clone()),
                VoiceError::Credential(e) => ErrorResponse::with_details(
                    "Failed to acquire service account token",
                    serde_json::Value::String(e.to_string()),
                ),
                VoiceError::Dispatch(e) => ErrorResponse::new(e.to_string()),
                other => ErrorResponse::with_details(
                    "Internal server error",
                    serde_json::Value::String(other.to_string()),
                ),
            };

            if status.is_server_error() {
                tracing::error!("{}", self);
            } else {
                tracing::debug!("{}", self);
            }

            (status, Json(body)).into_response()
        }
    }
}
