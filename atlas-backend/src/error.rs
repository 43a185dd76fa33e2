//! API error taxonomy.
//!
//! Every failure a handler can report maps to exactly one variant. Bodies are
//! plain text; storage failures are logged here and reported generically.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::db::DbError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Missing or malformed input; the request was not executed
    #[error("{0}")]
    Validation(String),

    /// Caller identity missing or unreadable
    #[error("{0}")]
    Unauthorized(String),

    /// Caller is authenticated but lacks the role for this operation
    #[error("Forbidden")]
    Forbidden,

    #[error("{0} not found")]
    NotFound(&'static str),

    /// The target exists but its current state prevents the operation
    #[error("{0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(#[from] DbError),
}

impl ApiError {
    /// Text sent to the client. Storage details never leave the server.
    fn public_message(&self) -> String {
        match self {
            ApiError::Storage(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let ApiError::Storage(e) = self {
            log::error!("[API] Storage failure: {}", e);
        }
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(self.public_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ApiError::Validation("Name is required".to_string()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Forbidden.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(ApiError::NotFound("Object type").status_code(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::Conflict("Object type is in use".to_string()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn test_storage_error_is_not_leaked() {
        let err = ApiError::from(DbError::Corrupt("objects.aliases".to_string()));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(ApiError::NotFound("Object").to_string(), "Object not found");
    }
}
