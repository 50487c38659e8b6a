use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use diesel::result::DatabaseErrorKind;
use serde::{Deserialize, Serialize};

use crate::types::ApiErrorResponse;

/// Application error codes following the pattern E{area}{sequence}
///
/// Ranges:
/// - E0xxx: Shared/infrastructure errors
/// - E2xxx: Profile errors
/// - E3xxx: Matching errors
/// - E4xxx: Messaging errors
/// - E6xxx: Safety errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Shared (E0xxx)
    InternalError,
    ValidationError,
    NotFound,
    Unauthorized,
    Forbidden,
    Conflict,
    BadRequest,
    TokenExpired,
    TokenInvalid,

    // Profile (E2xxx)
    ProfileNotFound,

    // Matching (E3xxx)
    CannotSwipeSelf,
    MatchNotFound,
    NotMatchParticipant,

    // Messaging (E4xxx)
    EmptyMessage,
    MessageTooLong,

    // Safety (E6xxx)
    CannotBlockSelf,
    CannotReportSelf,
    EmptyReportReason,
}

impl ErrorCode {
    pub fn code(&self) -> &'static str {
        match self {
            // Shared
            Self::InternalError => "E0001",
            Self::ValidationError => "E0002",
            Self::NotFound => "E0003",
            Self::Unauthorized => "E0004",
            Self::Forbidden => "E0005",
            Self::Conflict => "E0006",
            Self::BadRequest => "E0007",
            Self::TokenExpired => "E0008",
            Self::TokenInvalid => "E0009",

            // Profile
            Self::ProfileNotFound => "E2001",

            // Matching
            Self::CannotSwipeSelf => "E3001",
            Self::MatchNotFound => "E3002",
            Self::NotMatchParticipant => "E3003",

            // Messaging
            Self::EmptyMessage => "E4001",
            Self::MessageTooLong => "E4002",

            // Safety
            Self::CannotBlockSelf => "E6001",
            Self::CannotReportSelf => "E6002",
            Self::EmptyReportReason => "E6003",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ValidationError | Self::BadRequest | Self::CannotSwipeSelf
            | Self::EmptyMessage | Self::MessageTooLong | Self::CannotBlockSelf
            | Self::CannotReportSelf | Self::EmptyReportReason => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::ProfileNotFound | Self::MatchNotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized | Self::TokenExpired | Self::TokenInvalid => StatusCode::UNAUTHORIZED,
            Self::Forbidden | Self::NotMatchParticipant => StatusCode::FORBIDDEN,
            Self::Conflict => StatusCode::CONFLICT,
        }
    }

    /// Retrying the whole operation may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Conflict)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{message}")]
    Known {
        code: ErrorCode,
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),

    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[error("validation error: {0}")]
    Validation(String),
}

impl AppError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(code: ErrorCode, message: impl Into<String>, details: serde_json::Value) -> Self {
        Self::Known {
            code,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::BadRequest, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Conflict, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// The error code a caller would see, if this error maps onto one.
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Known { code, .. } => *code,
            AppError::Internal(_) => ErrorCode::InternalError,
            AppError::Database(err) => match err {
                diesel::result::Error::NotFound => ErrorCode::NotFound,
                _ if is_conflict(err) => ErrorCode::Conflict,
                _ => ErrorCode::InternalError,
            },
            AppError::Validation(_) => ErrorCode::ValidationError,
        }
    }

    /// Serialization failures and racing unique inserts on pair-scoped writes.
    pub fn is_transient(&self) -> bool {
        self.code().is_transient()
    }
}

fn is_conflict(err: &diesel::result::Error) -> bool {
    matches!(
        err,
        diesel::result::Error::DatabaseError(
            DatabaseErrorKind::SerializationFailure | DatabaseErrorKind::UniqueViolation,
            _
        )
    )
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        match serde_json::to_value(errors.field_errors()) {
            Ok(details) => AppError::with_details(ErrorCode::ValidationError, errors.to_string(), details),
            Err(_) => AppError::Validation(errors.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_response) = match &self {
            AppError::Known { code, message, details } => {
                let status = code.status_code();
                let mut resp = ApiErrorResponse::new(code.code(), message);
                if let Some(d) = details {
                    resp = resp.with_details(d.clone());
                }
                (status, resp)
            }
            AppError::Internal(err) => {
                tracing::error!(error = %err, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorResponse::new("E0001", "internal server error"),
                )
            }
            AppError::Database(err) => {
                tracing::error!(error = %err, "database error");
                match err {
                    diesel::result::Error::NotFound => (
                        StatusCode::NOT_FOUND,
                        ApiErrorResponse::new("E0003", "resource not found"),
                    ),
                    _ if is_conflict(err) => (
                        StatusCode::CONFLICT,
                        ApiErrorResponse::new("E0006", "concurrent update, please retry"),
                    ),
                    _ => (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        ApiErrorResponse::new("E0001", "database error"),
                    ),
                }
            }
            AppError::Validation(msg) => (
                StatusCode::BAD_REQUEST,
                ApiErrorResponse::new("E0002", msg),
            ),
        };

        (status, Json(error_response)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_failure_is_transient() {
        let err = AppError::Database(diesel::result::Error::DatabaseError(
            DatabaseErrorKind::SerializationFailure,
            Box::new("could not serialize access".to_string()),
        ));
        assert!(err.is_transient());
        assert_eq!(err.code(), ErrorCode::Conflict);
    }

    #[test]
    fn known_errors_keep_their_code() {
        let err = AppError::new(ErrorCode::NotMatchParticipant, "nope");
        assert_eq!(err.code(), ErrorCode::NotMatchParticipant);
        assert_eq!(err.code().status_code(), StatusCode::FORBIDDEN);
        assert!(!err.is_transient());
    }

    #[test]
    fn missing_row_maps_to_not_found() {
        let err = AppError::Database(diesel::result::Error::NotFound);
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[test]
    fn response_carries_status_from_code() {
        let resp = AppError::new(ErrorCode::Conflict, "busy").into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let resp = AppError::Validation("age: out of range".into()).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn validation_errors_carry_field_details() {
        let mut errors = validator::ValidationErrors::new();
        errors.add("age", validator::ValidationError::new("range"));

        let err = AppError::from(errors);
        assert_eq!(err.code(), ErrorCode::ValidationError);
        match &err {
            AppError::Known { details: Some(details), .. } => {
                assert_eq!(details["age"][0]["code"], "range");
            }
            other => panic!("expected field details, got {other:?}"),
        }
        assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
    }
}
