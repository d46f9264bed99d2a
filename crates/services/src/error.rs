//! Shared error types for the services crate.

use thiserror::Error;

use practice_core::model::{AnswerError, SessionError, UsageAction};
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by the practice session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError {
    #[error("account is not registered")]
    Unauthorized,
    #[error("daily limit of {limit} reached for {}", .action.as_str())]
    QuotaExceeded { action: UsageAction, limit: u32 },
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("requested {requested} questions but only {available} matched the filter")]
    InsufficientPool { requested: u32, available: u32 },
    #[error("session is already completed")]
    AlreadyCompleted,
    #[error("operation does not apply to this session kind")]
    WrongSessionKind,
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Answer(#[from] AnswerError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping the service stack.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PracticeServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
