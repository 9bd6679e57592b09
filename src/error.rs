use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// ApiError
///
/// The error taxonomy every handler funnels through. Each variant maps to one
/// HTTP status, and the response body is always the same JSON envelope:
/// `{"error": "<message>"}`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No bearer credential was present on a route that requires one.
    #[error("Authorization header missing")]
    AuthMissing,

    /// The bearer credential was present but unusable: expired, malformed,
    /// signed with the wrong key, or the public anon key passed off as a
    /// user token.
    #[error("{0}")]
    AuthInvalid(String),

    /// The caller is authenticated but lacks the required role or ownership.
    #[error("Forbidden")]
    Forbidden,

    /// A request payload failed validation before any external call was made.
    #[error("{0}")]
    Validation(String),

    /// The referenced entity does not exist (or is inactive).
    #[error("{0}")]
    NotFound(String),

    /// The database or an external provider failed.
    #[error("{0}")]
    Upstream(String),

    /// A dependency this endpoint needs was not configured at startup.
    #[error("{0} not configured")]
    Unconfigured(&'static str),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::AuthMissing | ApiError::AuthInvalid(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Unconfigured(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ApiError::NotFound("Not found".to_string()),
            other => ApiError::Upstream(other.to_string()),
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::Upstream(err.to_string())
    }
}
