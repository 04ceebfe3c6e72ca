use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::utils::{error_codes, error_to_api_response};

/// Failures coming out of the persistence layer.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    /// Maps unique-constraint violations to `Conflict`.
    pub fn from_insert(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            _ => StoreError::Database(err),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid url for {field}: {value}")]
    InvalidUrl { field: &'static str, value: String },

    #[error("{0} is required")]
    Required(&'static str),

    #[error("usernames may only contain a-z, 0-9 and '-', up to 30 characters")]
    InvalidUsername,

    #[error("description exceeds {max} characters")]
    DescriptionTooLong { max: usize },

    #[error("favicon resolution still in progress")]
    ResolutionPending,

    #[error("at most {max} social links are allowed")]
    TooManySlots { max: usize },

    #[error("order does not match the current projects")]
    OrderMismatch,

    #[error("index {0} is out of range")]
    IndexOutOfRange(usize),

    #[error("project {0} not found")]
    UnknownProject(uuid::Uuid),
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User already exists")]
    UserExists,

    #[error("Missing session")]
    MissingSession,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Missing token")]
    MissingToken,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("not found")]
    NotFound,

    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            AppError::Validation(_) | AppError::Store(StoreError::Invalid(_)) => {
                (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR)
            }
            AppError::Auth(AuthError::UserExists) => (StatusCode::CONFLICT, error_codes::USER_EXISTS),
            AppError::Auth(_) => (StatusCode::UNAUTHORIZED, error_codes::AUTH_FAILED),
            AppError::Store(StoreError::NotFound) | AppError::NotFound => {
                (StatusCode::NOT_FOUND, error_codes::NOT_FOUND)
            }
            AppError::Store(StoreError::Conflict(_)) => (StatusCode::CONFLICT, error_codes::USER_EXISTS),
            AppError::Store(_) | AppError::Internal(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, error_codes::INTERNAL_ERROR)
            }
        };

        (status, error_to_api_response::<()>(code, self.to_string())).into_response()
    }
}
