use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::ValidationError;
use crate::utils::{error_codes, error_to_api_response, success_to_api_response};

/// Outcome of a mutating command against a working copy and its persisted rows.
#[derive(Debug, Clone, PartialEq)]
pub enum CommandResult<T> {
    /// The working copy was updated and the change persisted.
    Applied(T),
    /// Input was refused; nothing changed, locally or remotely.
    Rejected(ValidationError),
    /// Persisting failed. Each command documents what its working copy holds afterwards.
    Failed { reason: String },
}

impl<T> CommandResult<T> {
    pub fn failed(reason: impl std::fmt::Display) -> Self {
        CommandResult::Failed {
            reason: reason.to_string(),
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, CommandResult::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            CommandResult::Applied(value) => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CommandResult<U> {
        match self {
            CommandResult::Applied(value) => CommandResult::Applied(f(value)),
            CommandResult::Rejected(e) => CommandResult::Rejected(e),
            CommandResult::Failed { reason } => CommandResult::Failed { reason },
        }
    }
}

impl<T: Serialize> IntoResponse for CommandResult<T> {
    fn into_response(self) -> Response {
        match self {
            CommandResult::Applied(value) => {
                (StatusCode::OK, success_to_api_response(value)).into_response()
            }
            CommandResult::Rejected(e) => (
                StatusCode::BAD_REQUEST,
                error_to_api_response::<()>(error_codes::VALIDATION_ERROR, e.to_string()),
            )
                .into_response(),
            CommandResult::Failed { reason } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_to_api_response::<()>(error_codes::INTERNAL_ERROR, reason),
            )
                .into_response(),
        }
    }
}
