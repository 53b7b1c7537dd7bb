//! HTTP-facing error type.
//!
//! Models and jobs return `anyhow::Result`; handlers and actions return
//! `Result<T, ApiError>` so that every failure is rendered the same way.

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use super::validation::ValidationErrors;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication credentials were not provided.")]
    Unauthenticated,

    #[error("No active account found with the given credentials")]
    InvalidCredentials,

    #[error("{0}")]
    PermissionDenied(String),

    #[error("{0}")]
    NotFound(String),

    /// 404 rendered as `{"error": ...}` instead of `{"detail": ...}`
    #[error("{0}")]
    RecordNotFound(String),

    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    MalformedBody(String),

    #[error("{error}: {details}")]
    Gateway { error: String, details: String },

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn not_found() -> Self {
        ApiError::NotFound("Not found.".to_string())
    }

    pub fn forbidden() -> Self {
        ApiError::PermissionDenied("You do not have permission to perform this action.".to_string())
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) | ApiError::RecordNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Validation(_) | ApiError::BadRequest(_) | ApiError::MalformedBody(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Gateway { .. } => StatusCode::BAD_GATEWAY,
            ApiError::Database(e) => database_status(e),
            ApiError::Internal(e) => match e.downcast_ref::<sqlx::Error>() {
                Some(db) => database_status(db),
                None => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

fn database_status(e: &sqlx::Error) -> StatusCode {
    match e {
        sqlx::Error::RowNotFound => StatusCode::NOT_FOUND,
        sqlx::Error::Database(db) if db.is_unique_violation() => StatusCode::BAD_REQUEST,
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Client-facing text for a constraint the request itself violated.
fn constraint_message(e: &sqlx::Error) -> &'static str {
    match e {
        sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
            "A referenced record does not exist."
        }
        _ => "A record with these values already exists.",
    }
}

impl ApiError {
    fn sqlx_error(&self) -> Option<&sqlx::Error> {
        match self {
            ApiError::Database(e) => Some(e),
            ApiError::Internal(e) => e.downcast_ref::<sqlx::Error>(),
            _ => None,
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        ApiError::Validation(errors)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::MalformedBody(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(_: PathRejection) -> Self {
        ApiError::not_found()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let body = match &self {
            ApiError::Unauthenticated
            | ApiError::InvalidCredentials
            | ApiError::NotFound(_)
            | ApiError::MalformedBody(_) => json!({ "detail": self.to_string() }),
            ApiError::PermissionDenied(message)
            | ApiError::BadRequest(message)
            | ApiError::RecordNotFound(message) => {
                json!({ "error": message })
            }
            ApiError::Validation(errors) => json!(errors),
            ApiError::Gateway { error, details } => json!({ "error": error, "details": details }),
            ApiError::Database(_) | ApiError::Internal(_) => match status {
                StatusCode::NOT_FOUND => json!({ "detail": "Not found." }),
                StatusCode::BAD_REQUEST => json!({
                    "non_field_errors": [self.sqlx_error().map(constraint_message).unwrap_or_default()]
                }),
                _ => {
                    error!(error = %self, "request failed");
                    json!({ "detail": "Internal server error" })
                }
            },
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Unauthenticated.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::forbidden().status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::not_found().status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Validation(ValidationErrors::new()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Gateway {
                error: "x".into(),
                details: "y".into()
            }
            .status_code(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn test_row_not_found_maps_to_404() {
        assert_eq!(
            ApiError::Database(sqlx::Error::RowNotFound).status_code(),
            StatusCode::NOT_FOUND
        );

        let wrapped = ApiError::Internal(anyhow::Error::new(sqlx::Error::RowNotFound));
        assert_eq!(wrapped.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_internal_error_is_500() {
        let err = ApiError::Internal(anyhow::anyhow!("boom"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
