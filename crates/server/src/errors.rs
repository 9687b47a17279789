use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use models::errors::ModelError;
use service::auth::errors::AuthError;
use service::errors::ServiceError;

pub const UNAUTHORIZED_MESSAGE: &str = "Unauthorized: Need to be logged in to access this resource";
pub const FORBIDDEN_MESSAGE: &str = "Forbidden: access denied";

/// JSON error body: `{"error": <summary>, "details": <optional>}`.
#[derive(Debug, Serialize)]
pub struct JsonApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl JsonApiError {
    pub fn new(status: StatusCode, error: impl Into<String>, details: Option<String>) -> Self {
        Self { status, error: error.into(), details }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, msg, None)
    }

    pub fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, UNAUTHORIZED_MESSAGE, None)
    }

    pub fn forbidden() -> Self {
        Self::new(StatusCode::FORBIDDEN, FORBIDDEN_MESSAGE, None)
    }

    fn internal(summary: &str, details: String) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, summary, Some(details))
    }
}

impl IntoResponse for JsonApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            error!(status = %self.status, error = %self.error, details = ?self.details, "request failed");
        }
        (self.status, Json(self)).into_response()
    }
}

impl From<ServiceError> for JsonApiError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Validation(m) => Self::new(StatusCode::BAD_REQUEST, m, None),
            ServiceError::NotFound(m) => Self::new(StatusCode::NOT_FOUND, m, None),
            ServiceError::Conflict(m) => Self::new(StatusCode::CONFLICT, m, None),
            ServiceError::Forbidden(m) => Self::new(StatusCode::FORBIDDEN, FORBIDDEN_MESSAGE, Some(m)),
            ServiceError::Unauthorized(m) => Self::new(StatusCode::UNAUTHORIZED, m, None),
            ServiceError::Model(ModelError::Validation(m)) => Self::new(StatusCode::BAD_REQUEST, m, None),
            ServiceError::Model(ModelError::Duplicate(m)) => Self::new(StatusCode::CONFLICT, "already exists", Some(m)),
            ServiceError::Model(ModelError::Db(m)) | ServiceError::Db(m) => Self::internal("Database Error", m),
            ServiceError::Storage(m) => Self::internal("Storage Error", m),
            ServiceError::Internal(m) => Self::internal("Internal Server Error", m),
        }
    }
}

impl From<AuthError> for JsonApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Unauthorized => Self::new(StatusCode::UNAUTHORIZED, "invalid email or password", None),
            AuthError::Conflict => Self::new(StatusCode::CONFLICT, "email already registered", None),
            other => ServiceError::from(other).into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("runtime check failed: {0}")]
    Runtime(String),
    #[error(transparent)]
    Any(#[from] anyhow::Error),
}
