use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;
use validator::ValidationErrors;

use crate::password::PasswordError;
use crate::repo::RepoError;

#[derive(Debug, Serialize)]
pub struct ApiErrorBody {
    pub error: String,
}

#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")] Validation(String),
    #[error("{0}")] Unauthorized(&'static str),
    #[error("Invalid username or password.")] InvalidCredentials,
    #[error("{0}")] InvalidOperation(&'static str),
    // Also covers "exists but not yours"; the two are never distinguished.
    #[error("not found")] NotFoundOrForbidden,
    #[error("not found")] NotFound,
    #[error("conflict")] Conflict,
    #[error("internal error")] Internal,
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::NotFound => ApiError::NotFound,
            RepoError::Conflict => ApiError::Conflict,
            RepoError::Internal(msg) => {
                tracing::error!("repository error: {msg}");
                ApiError::Internal
            }
        }
    }
}

impl From<PasswordError> for ApiError {
    fn from(e: PasswordError) -> Self {
        tracing::error!("{e}");
        ApiError::Internal
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(e: ValidationErrors) -> Self {
        let mut fields: Vec<_> = e.field_errors().keys().map(|k| k.to_string()).collect();
        fields.sort();
        ApiError::Validation(format!("invalid field(s): {}", fields.join(", ")))
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidOperation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::NotFoundOrForbidden | ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Conflict => StatusCode::CONFLICT,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ApiErrorBody { error: self.to_string() })
    }
}
