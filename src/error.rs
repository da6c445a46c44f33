//! Error taxonomy shared by the store, ledger, services and HTTP layer.

use axum::http::StatusCode;
use rusqlite::ErrorCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VotingError {
    /// Malformed input, caught before storage is touched.
    #[error("Validation failed")]
    Validation(Vec<String>),

    #[error("Feature not found")]
    FeatureNotFound,

    #[error("User has already voted for this feature")]
    DuplicateVote,

    #[error("Vote not found")]
    VoteNotFound,

    /// Transient lock contention in storage. Safe to retry.
    #[error("Storage conflict: {0}")]
    StorageConflict(String),

    #[error("Storage error: {0}")]
    Storage(rusqlite::Error),
}

impl VotingError {
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::FeatureNotFound => "FEATURE_NOT_FOUND",
            Self::DuplicateVote => "DUPLICATE_VOTE",
            Self::VoteNotFound => "VOTE_NOT_FOUND",
            Self::StorageConflict(_) => "STORAGE_CONFLICT",
            Self::Storage(_) => "DATABASE_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::FeatureNotFound | Self::VoteNotFound => StatusCode::NOT_FOUND,
            Self::DuplicateVote => StatusCode::CONFLICT,
            Self::StorageConflict(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageConflict(_))
    }
}

impl From<rusqlite::Error> for VotingError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) => {
                Self::StorageConflict(err.to_string())
            }
            _ => Self::Storage(err),
        }
    }
}

/// True when `err` is a UNIQUE or PRIMARY KEY violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => matches!(
            e.extended_code,
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        ),
        _ => false,
    }
}

/// True when `err` is a FOREIGN KEY violation.
pub(crate) fn is_foreign_key_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
        }
        _ => false,
    }
}

pub type VotingResult<T> = Result<T, VotingError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn sqlite_failure(code: i32) -> rusqlite::Error {
        rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(code), None)
    }

    #[test]
    fn busy_and_locked_are_conflicts() {
        let busy: VotingError = sqlite_failure(rusqlite::ffi::SQLITE_BUSY).into();
        let locked: VotingError = sqlite_failure(rusqlite::ffi::SQLITE_LOCKED).into();
        assert!(busy.is_retryable());
        assert!(locked.is_retryable());
        assert_eq!(busy.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn other_failures_are_not_retryable() {
        let err: VotingError = sqlite_failure(rusqlite::ffi::SQLITE_CORRUPT).into();
        assert!(!err.is_retryable());
        assert_eq!(err.error_code(), "DATABASE_ERROR");
    }

    #[test]
    fn unique_violation_is_detected_by_extended_code() {
        assert!(is_unique_violation(&sqlite_failure(
            rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
        )));
        assert!(!is_unique_violation(&sqlite_failure(
            rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY
        )));
    }

    #[test]
    fn codes_are_stable() {
        assert_eq!(VotingError::DuplicateVote.error_code(), "DUPLICATE_VOTE");
        assert_eq!(VotingError::DuplicateVote.status(), StatusCode::CONFLICT);
        assert_eq!(VotingError::VoteNotFound.error_code(), "VOTE_NOT_FOUND");
        assert_eq!(VotingError::FeatureNotFound.status(), StatusCode::NOT_FOUND);
    }
}
