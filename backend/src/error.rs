//! Error handling for the SikaGreen platform
//!
//! Provides consistent error responses in English and French

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::DomainError;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation {
        field: String,
        message: String,
        message_fr: String,
    },

    #[error("Resource not found: {0}")]
    NotFound(String),

    // Business logic errors
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

impl AppError {
    /// Validation failure on a single field
    pub fn validation(field: &str, message: &str, message_fr: &str) -> Self {
        AppError::Validation {
            field: field.to_string(),
            message: message.to_string(),
            message_fr: message_fr.to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidCredentials | AppError::Validation { .. } => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::TokenExpired | AppError::InvalidToken | AppError::Unauthenticated(_) => {
                StatusCode::UNAUTHORIZED
            }
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidState(_) => StatusCode::BAD_REQUEST,
            AppError::StorageError(_)
            | AppError::DatabaseError(_)
            | AppError::Internal(_)
            | AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Forbidden(msg) => AppError::Forbidden(msg.to_string()),
            DomainError::InvalidState(msg) => AppError::InvalidState(msg.to_string()),
            DomainError::Invalid { field, message } => AppError::Validation {
                field: field.to_string(),
                message: message.to_string(),
                message_fr: format!("Valeur invalide pour le champ {}", field),
            },
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let field_errors = errors.field_errors();
        let mut fields: Vec<_> = field_errors.keys().copied().collect();
        fields.sort_unstable();

        let Some(field) = fields.first().copied() else {
            return AppError::validation("input", "Invalid input", "Données invalides");
        };

        let message = field_errors
            .get(field)
            .and_then(|errs| errs.first())
            .and_then(|e| e.message.as_ref())
            .map(|m| m.to_string())
            .unwrap_or_else(|| format!("The {} field is invalid", field));

        AppError::Validation {
            field: field.to_string(),
            message,
            message_fr: format!("Valeur invalide pour le champ {}", field),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        let reason = rejection.body_text();
        tracing::debug!("Rejected JSON body: {}", reason);

        match rejection {
            JsonRejection::JsonDataError(_) => {
                let field = rejected_field(&reason).unwrap_or_else(|| "body".to_string());
                AppError::Validation {
                    message: format!("The {} field is missing or invalid.", field),
                    message_fr: format!("Le champ {} est manquant ou invalide.", field),
                    field,
                }
            }
            JsonRejection::MissingJsonContentType(_) => AppError::validation(
                "body",
                "Expected a JSON request body.",
                "Le corps de la requête doit être au format JSON.",
            ),
            _ => AppError::validation(
                "body",
                "The request body could not be read.",
                "Le corps de la requête est illisible.",
            ),
        }
    }
}

/// Field named by a serde data error, either "missing field `phone`" or a
/// "quantity: invalid type ..." path prefix
fn rejected_field(reason: &str) -> Option<String> {
    let detail = reason
        .split_once("target type: ")
        .map_or(reason, |(_, detail)| detail);

    if let Some(rest) = detail.strip_prefix("missing field `") {
        return rest.split('`').next().map(str::to_string);
    }

    let (path, _) = detail.split_once(": ")?;
    let named = path.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_')
        && path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    named.then(|| path.to_string())
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub message_fr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorResponse {
    pub fn new(code: &str, message: impl Into<String>, message_fr: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            message_fr: message_fr.into(),
            field: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::InvalidCredentials => ErrorResponse {
                field: Some("phone".to_string()),
                ..ErrorResponse::new(
                    "INVALID_CREDENTIALS",
                    "The provided credentials are incorrect.",
                    "Les identifiants fournis sont incorrects.",
                )
            },
            AppError::TokenExpired => {
                ErrorResponse::new("TOKEN_EXPIRED", "Token has expired", "Le jeton a expiré")
            }
            AppError::InvalidToken => {
                ErrorResponse::new("INVALID_TOKEN", "Invalid token", "Jeton invalide")
            }
            AppError::Unauthenticated(msg) => {
                ErrorResponse::new("UNAUTHENTICATED", msg.clone(), "Authentification requise")
            }
            AppError::Forbidden(msg) => {
                ErrorResponse::new("FORBIDDEN", msg.clone(), "Action non autorisée")
            }
            AppError::Validation {
                field,
                message,
                message_fr,
            } => ErrorResponse {
                field: Some(field.clone()),
                ..ErrorResponse::new("VALIDATION_ERROR", message.clone(), message_fr.clone())
            },
            AppError::NotFound(resource) => ErrorResponse::new(
                "NOT_FOUND",
                format!("{} not found", resource),
                format!("{} introuvable", resource),
            ),
            AppError::InvalidState(msg) => ErrorResponse::new(
                "INVALID_STATE",
                msg.clone(),
                format!("Action impossible : {}", msg),
            ),
            AppError::StorageError(_) => ErrorResponse::new(
                "STORAGE_ERROR",
                "The file could not be stored",
                "Le fichier n'a pas pu être enregistré",
            ),
            AppError::DatabaseError(_) => ErrorResponse::new(
                "DATABASE_ERROR",
                "A database error occurred",
                "Une erreur de base de données est survenue",
            ),
            AppError::Internal(_) | AppError::InternalError(_) => ErrorResponse::new(
                "INTERNAL_ERROR",
                "An internal server error occurred",
                "Une erreur interne est survenue",
            ),
        };

        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::debug!("Request rejected: {}", self);
        }

        (status, Json(body)).into_response()
    }
}

/// Whether a database error is a unique constraint violation
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_map_to_statuses() {
        let forbidden: AppError = DomainError::Forbidden("Not your collection").into();
        assert_eq!(forbidden.status(), StatusCode::FORBIDDEN);

        let invalid: AppError = DomainError::InvalidState("Collection is not pending").into();
        assert_eq!(invalid.status(), StatusCode::BAD_REQUEST);

        let validation: AppError = DomainError::Invalid {
            field: "rating",
            message: "Rating must be between 1 and 5",
        }
        .into();
        assert_eq!(validation.status(), StatusCode::UNPROCESSABLE_ENTITY);
        match validation {
            AppError::Validation { field, .. } => assert_eq!(field, "rating"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_rejected_field_names() {
        assert_eq!(
            rejected_field(
                "Failed to deserialize the JSON body into the target type: missing field `password` at line 1 column 21"
            )
            .as_deref(),
            Some("password")
        );
        assert_eq!(
            rejected_field(
                "Failed to deserialize the JSON body into the target type: quantity: invalid type: string \"ten\", expected i32 at line 1 column 17"
            )
            .as_deref(),
            Some("quantity")
        );
        assert_eq!(
            rejected_field(
                "Failed to deserialize the JSON body into the target type: invalid type: integer `3`, expected a map at line 1 column 1"
            ),
            None
        );
    }

    #[test]
    fn test_auth_statuses() {
        assert_eq!(AppError::InvalidToken.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::InvalidCredentials.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::NotFound("Conversation".into()).status(),
            StatusCode::NOT_FOUND
        );
    }
}
