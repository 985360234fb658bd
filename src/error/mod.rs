use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::feed::{FeedStoreError, ParseFeedFilterError};
use crate::notification::{DispatchError, InvalidEvent, ParseChannelError, ParsePriorityError};
use crate::preferences::{InvalidTimeOfDay, SettingsStoreError};
use crate::template::TemplateError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Serialize)]
struct ErrorBody {
    code: String,
    message: String,
}

/// Check if running in production mode (based on RUN_MODE env var)
fn is_production() -> bool {
    std::env::var("RUN_MODE")
        .map(|m| m == "production" || m == "prod")
        .unwrap_or(false)
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Config(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Storage(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, client_message, log_message) = match &self {
            AppError::Config(e) => {
                let log_msg = e.to_string();
                let client_msg = if is_production() {
                    "Configuration error".to_string()
                } else {
                    log_msg.clone()
                };
                ("CONFIG_ERROR", client_msg, log_msg)
            }
            AppError::Auth(msg) => ("UNAUTHORIZED", msg.clone(), msg.clone()),
            AppError::Validation(msg) => ("VALIDATION_ERROR", msg.clone(), msg.clone()),
            AppError::NotFound(msg) => ("NOT_FOUND", msg.clone(), msg.clone()),
            AppError::Conflict(msg) => ("CONFLICT", msg.clone(), msg.clone()),
            AppError::Storage(e) => {
                let log_msg = e.clone();
                let client_msg = if is_production() {
                    "Service temporarily unavailable".to_string()
                } else {
                    log_msg.clone()
                };
                ("STORAGE_ERROR", client_msg, log_msg)
            }
            AppError::Internal(e) => {
                let log_msg = e.clone();
                let client_msg = if is_production() {
                    "Internal server error".to_string()
                } else {
                    log_msg.clone()
                };
                ("INTERNAL_ERROR", client_msg, log_msg)
            }
        };

        // Client errors are expected traffic; only server side failures are errors
        if status.is_server_error() {
            tracing::error!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "API error"
            );
        } else {
            tracing::debug!(
                code = %code,
                status = %status.as_u16(),
                message = %log_message,
                "API request rejected"
            );
        }

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: client_message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<SettingsStoreError> for AppError {
    fn from(err: SettingsStoreError) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<FeedStoreError> for AppError {
    fn from(err: FeedStoreError) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<DispatchError> for AppError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::Settings(e) => e.into(),
        }
    }
}

impl From<TemplateError> for AppError {
    fn from(err: TemplateError) -> Self {
        match err {
            TemplateError::NotFound(id) => AppError::NotFound(format!("Template not found: {}", id)),
            TemplateError::AlreadyExists(id) => {
                AppError::Conflict(format!("Template already exists: {}", id))
            }
            TemplateError::Seed(msg) => AppError::Internal(msg),
            other => AppError::Validation(other.to_string()),
        }
    }
}

impl From<InvalidEvent> for AppError {
    fn from(err: InvalidEvent) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<ParsePriorityError> for AppError {
    fn from(err: ParsePriorityError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<ParseChannelError> for AppError {
    fn from(err: ParseChannelError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<InvalidTimeOfDay> for AppError {
    fn from(err: InvalidTimeOfDay) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<ParseFeedFilterError> for AppError {
    fn from(err: ParseFeedFilterError) -> Self {
        AppError::Validation(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::Validation("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::Storage("x".into()).status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(AppError::Auth("x".into()).status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn test_template_errors_map_to_http() {
        let not_found: AppError = TemplateError::NotFound("t".into()).into();
        assert!(matches!(not_found, AppError::NotFound(_)));

        let conflict: AppError = TemplateError::AlreadyExists("t".into()).into();
        assert_eq!(conflict.status(), StatusCode::CONFLICT);

        let invalid: AppError = TemplateError::InvalidId("bad".into()).into();
        assert!(matches!(invalid, AppError::Validation(_)));
    }

    #[test]
    fn test_dispatch_error_is_storage() {
        let err: AppError =
            DispatchError::Settings(SettingsStoreError::Unavailable("circuit open".into())).into();
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
