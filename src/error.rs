//! Error types for the library rental server

use std::collections::BTreeMap;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use sqlx::error::ErrorKind;
use thiserror::Error;

/// Machine-readable error codes returned alongside the HTTP status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthenticated = 2,
    Forbidden = 3,
    DbFailure = 4,
    NotFound = 5,
    BadValue = 6,
    Duplicate = 7,
    RuleViolation = 8,
}

/// Field-keyed validation messages, e.g. `{"email": ["..."]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

/// Key used for errors that are not bound to a single field
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

pub const DUPLICATE_BOOK: &str = "A book with the combination of this title+author+cover already exists.";
pub const DUPLICATE_EMAIL: &str = "User with this email already exists.";

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shortcut for a single failing field
    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    fn summary(&self) -> String {
        self.0
            .iter()
            .map(|(field, messages)| format!("{}: {}", field, messages.join(" ")))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = FieldErrors::new();
        for (field, errs) in errors.field_errors() {
            for err in errs.iter() {
                let message = err
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("Invalid value ({})", err.code));
                fields.add(&field, message);
            }
        }
        fields
    }
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Authorization failed: {0}")]
    Authorization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {}", .0.summary())]
    Validation(FieldErrors),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.into())
    }
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<FieldErrors>,
}

impl AppError {
    /// Status, code, message and optional field errors for this error
    fn parts(self) -> (StatusCode, ErrorCode, String, Option<FieldErrors>) {
        match self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthenticated, msg, None)
            }
            AppError::Authorization(msg) => (StatusCode::FORBIDDEN, ErrorCode::Forbidden, msg, None),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, ErrorCode::NotFound, msg, None),
            AppError::Validation(fields) => (
                StatusCode::BAD_REQUEST,
                ErrorCode::BadValue,
                fields.summary(),
                Some(fields),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorCode::BadValue, msg, None),
            AppError::BusinessRule(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::RuleViolation, msg, None)
            }
            AppError::Database(e) => database_error_parts(e),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                    None,
                )
            }
        }
    }
}

/// Constraint violations that slipped past application validation are
/// reported as bad requests; everything else is a masked 500.
fn database_error_parts(e: sqlx::Error) -> (StatusCode, ErrorCode, String, Option<FieldErrors>) {
    if let Some(db_err) = e.as_database_error() {
        let constraint = db_err.constraint().unwrap_or("unknown").to_string();
        match db_err.kind() {
            ErrorKind::UniqueViolation => {
                tracing::debug!("Unique constraint rejected write: {}", constraint);
                return match unique_violation_fields(&constraint) {
                    Some(fields) => (
                        StatusCode::BAD_REQUEST,
                        ErrorCode::Duplicate,
                        fields.summary(),
                        Some(fields),
                    ),
                    None => (
                        StatusCode::BAD_REQUEST,
                        ErrorCode::Duplicate,
                        format!("Duplicate value violates constraint {}", constraint),
                        None,
                    ),
                };
            }
            ErrorKind::CheckViolation | ErrorKind::ForeignKeyViolation | ErrorKind::NotNullViolation => {
                tracing::debug!("Constraint rejected write: {}", constraint);
                return (
                    StatusCode::BAD_REQUEST,
                    ErrorCode::BadValue,
                    format!("Value violates constraint {}", constraint),
                    None,
                );
            }
            _ => {}
        }
    }

    tracing::error!("Database error: {:?}", e);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        ErrorCode::DbFailure,
        "Database error".to_string(),
        None,
    )
}

/// Field errors for the unique constraints the API already checks up front,
/// so a write that loses the race gets the same body as one caught early
fn unique_violation_fields(constraint: &str) -> Option<FieldErrors> {
    match constraint {
        "book_title_author_cover_unique" => Some(FieldErrors::single(NON_FIELD_ERRORS, DUPLICATE_BOOK)),
        "users_email_unique" => Some(FieldErrors::single("email", DUPLICATE_EMAIL)),
        _ => None,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, fields) = self.parts();

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
            fields,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;
