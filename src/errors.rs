use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

use crate::validation::FieldViolation;

/// Application-specific error types.
#[derive(Debug)]
pub enum AppError {
    /// The payload failed its stage schema. Carries every violated field.
    Validation(Vec<FieldViolation>),
    /// Malformed request body (not JSON, wrong content type).
    BadRequest(String),
    /// Resource not found error.
    NotFound(String),
    /// Duplicate identity, usually the loser of a concurrent create.
    Conflict(String),
    /// Backend is flagged down or the service has not finished starting.
    ServiceUnavailable(String),
    /// Database-related errors.
    DatabaseError(sqlx::Error),
    /// Internal server error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl AppError {
    /// The HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::DatabaseError(_) | AppError::InternalError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            AppError::WithContext { source, .. } => source.status(),
        }
    }
}

impl fmt::Display for AppError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(violations) => {
                write!(f, "Validation failed: ")?;
                for (i, v) in violations.iter().enumerate() {
                    if i > 0 {
                        write!(f, "; ")?;
                    }
                    write!(f, "{}", v)?;
                }
                Ok(())
            }
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::ServiceUnavailable(msg) => write!(f, "Service unavailable: {}", msg),
            AppError::DatabaseError(e) => write!(f, "Database error: {}", e),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    /// The client-facing body. Server-side failures get a fixed message.
    fn body(&self) -> serde_json::Value {
        match self {
            AppError::Validation(violations) => json!({
                "error": "Validation failed",
                "details": violations,
            }),
            AppError::BadRequest(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::ServiceUnavailable(msg) => json!({ "error": msg }),
            AppError::DatabaseError(_) => json!({ "error": "Database error" }),
            AppError::InternalError(_) => json!({ "error": "Internal server error" }),
            AppError::WithContext { source, .. } => source.body(),
        }
    }
}

impl IntoResponse for AppError {
    /// Converts the error into an HTTP response.
    ///
    /// Context wrappers take the status and body of their root cause.
    /// Server-side failures are logged once, with the full context chain, and
    /// replaced with a sanitized message.
    fn into_response(self) -> Response {
        match root_cause(&self) {
            AppError::ServiceUnavailable(_) => tracing::warn!("{}", self),
            AppError::DatabaseError(_) | AppError::InternalError(_) => {
                tracing::error!("{}", self)
            }
            _ => {}
        }

        (self.status(), Json(self.body())).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    /// Converts a `sqlx::Error` into an `AppError`.
    ///
    /// Unique-index violations become `Conflict`, lost connections become
    /// `ServiceUnavailable`; everything else stays a `DatabaseError`.
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                AppError::Conflict("Duplicate resource".to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                AppError::ServiceUnavailable("Service temporarily unavailable".to_string())
            }
            _ => AppError::DatabaseError(err),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InternalError(format!("Serialization error: {}", err))
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }
}

/// Extension for sqlx::Error to add context
impl<T> ResultExt<T> for Result<T, sqlx::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(AppError::from(e)),
            context: context.into(),
        })
    }
}

/// Strips `WithContext` wrappers to reach the underlying error.
pub fn root_cause(err: &AppError) -> &AppError {
    match err {
        AppError::WithContext { source, .. } => root_cause(source),
        other => other,
    }
}
