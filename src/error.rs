// src/error.rs
use axum::extract::multipart::MultipartError;
use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use serde_json::json;
use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

pub type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("A user with this email already exists")]
    DuplicateEmail,

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Please authenticate.")]
    Unauthenticated,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    InvalidFileType(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("database error: {0}")]
    Persistence(#[from] sqlx::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn invalid_file_type(msg: impl Into<String>) -> Self {
        AppError::InvalidFileType(msg.into())
    }

    pub fn too_large(msg: impl Into<String>) -> Self {
        AppError::PayloadTooLarge(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }

    /// Stable machine-readable kind, sent as the `error` field.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::DuplicateEmail => "duplicate_email",
            AppError::InvalidCredentials => "invalid_credentials",
            AppError::Unauthenticated => "unauthenticated",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidFileType(_) => "invalid_file_type",
            AppError::PayloadTooLarge(_) => "payload_too_large",
            AppError::Storage(_) => "storage_error",
            AppError::Persistence(_) => "persistence_error",
            AppError::Internal(_) => "internal_error",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) | AppError::DuplicateEmail | AppError::InvalidFileType(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::InvalidCredentials | AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::Storage(_) | AppError::Persistence(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Storage(_) => {
                tracing::error!(error = %self, "file storage failure");
                "File storage error occurred".to_string()
            }
            AppError::Persistence(_) => {
                tracing::error!(error = %self, "database failure");
                "Database error occurred".to_string()
            }
            AppError::Internal(_) => {
                tracing::error!(error = %self, "internal failure");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": self.kind(),
            "message": message,
        }));

        (status, body).into_response()
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(first_message(&errors, "").unwrap_or_else(|| "Invalid input".to_string()))
    }
}

impl From<MultipartError> for AppError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            AppError::too_large("Upload exceeds the allowed request size")
        } else {
            AppError::validation(format!("Malformed multipart body: {}", err.body_text()))
        }
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        AppError::internal(format!("Password hashing failed: {err}"))
    }
}

impl From<jsonwebtoken::errors::Error> for AppError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        AppError::internal(format!("Token signing failed: {err}"))
    }
}

/// Walks nested validator output and returns the first field message, sorted by path.
fn first_message(errors: &ValidationErrors, prefix: &str) -> Option<String> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    fields.into_iter().find_map(|(field, kind)| {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(issues) => issues.first().map(|issue| {
                let text = issue
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| issue.code.to_string());
                format!("{path}: {text}")
            }),
            ValidationErrorsKind::Struct(inner) => first_message(inner, &path),
            ValidationErrorsKind::List(items) => items
                .iter()
                .find_map(|(index, inner)| first_message(inner, &format!("{path}[{index}]"))),
        }
    })
}
