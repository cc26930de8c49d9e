use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use mongodb::error::{ErrorKind as MongoErrorKind, WriteFailure};
use thiserror::Error;
use uuid::Uuid;
use validator::ValidationErrors;

/// MongoDB duplicate key error code
const DUPLICATE_KEY: i32 = 11000;

#[derive(Debug, Error)]
pub enum PollError {
    #[error("{0}")]
    Validation(String),

    #[error("Poll not found: {0}")]
    NotFound(Uuid),

    #[error("Poll is closed")]
    Closed(Uuid),

    #[error("Poll is already closed")]
    AlreadyClosed(Uuid),

    #[error("Already voted: {option}")]
    AlreadyVoted { option: String },

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// Votes were removed but the poll record was not
    #[error(
        "Poll {poll_id} was only partially deleted: {votes_removed} votes removed, poll record kept ({reason})"
    )]
    PartialDelete {
        poll_id: Uuid,
        votes_removed: u64,
        reason: String,
    },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Broad class of a [`PollError`], deciding how callers should react
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input, fix the request
    Validation,
    NotFound,
    /// Valid request, illegal in the current state
    Conflict,
    /// Persistence unavailable, may succeed on retry
    Transient,
    Internal,
}

impl PollError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PollError::Validation(_) | PollError::InvalidOption(_) => ErrorKind::Validation,
            PollError::NotFound(_) => ErrorKind::NotFound,
            PollError::Closed(_) | PollError::AlreadyClosed(_) | PollError::AlreadyVoted { .. } => {
                ErrorKind::Conflict
            }
            PollError::Database(_) => ErrorKind::Transient,
            PollError::PartialDelete { .. } | PollError::Internal(_) => ErrorKind::Internal,
        }
    }
}

pub type PollResult<T> = Result<T, PollError>;

impl From<PollError> for AppError {
    fn from(err: PollError) -> Self {
        let message = err.to_string();
        match err {
            PollError::PartialDelete {
                poll_id,
                votes_removed,
                reason,
            } => AppError::PartialWrite {
                message,
                details: serde_json::json!({
                    "poll_id": poll_id,
                    "votes_removed": votes_removed,
                    "reason": reason,
                }),
            },
            other => match other.kind() {
                ErrorKind::Validation => AppError::BadRequest(message),
                ErrorKind::NotFound => AppError::NotFound(message),
                ErrorKind::Conflict => AppError::Conflict(message),
                ErrorKind::Transient => AppError::ServiceUnavailable(message),
                ErrorKind::Internal => AppError::InternalServerError(message),
            },
        }
    }
}

impl IntoResponse for PollError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

impl From<mongodb::error::Error> for PollError {
    fn from(err: mongodb::error::Error) -> Self {
        PollError::Database(err.to_string())
    }
}

/// Takes the first field message, fields visited in name order.
impl From<ValidationErrors> for PollError {
    fn from(errors: ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let message = fields
            .into_iter()
            .flat_map(|(_, errs)| errs.iter())
            .find_map(|err| err.message.as_ref().map(|m| m.to_string()))
            .unwrap_or_else(|| errors.to_string());

        PollError::Validation(message)
    }
}

pub(crate) fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    matches!(
        err.kind.as_ref(),
        MongoErrorKind::Write(WriteFailure::WriteError(write_error))
            if write_error.code == DUPLICATE_KEY
    )
}
