use std::io;
use thiserror::Error;

use crate::types::ItemNumber;

/// Errors surfaced by the lending system.
///
/// Every failure a caller can observe falls into one of four categories:
/// an unknown item number, a state-mismatched transition attempt, malformed
/// input, or an I/O failure talking to the backing store. Validation errors
/// are always raised before any write happens; `BackendUnavailable` can be
/// raised mid-sequence, in which case callers should re-read authoritative
/// state rather than assume either outcome.
#[derive(Error, Debug)]
pub enum LendingError {
    #[error("item {0} not found")]
    NotFound(ItemNumber),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl LendingError {
    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Wrap a backend failure (database, socket, filesystem) in the
    /// transient category.
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::BackendUnavailable(err.to_string())
    }
}

impl From<io::Error> for LendingError {
    fn from(err: io::Error) -> Self {
        Self::BackendUnavailable(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LendingError>;
