use thiserror::Error;

use tallyforge_core::DomainError;

use crate::sequence::SequenceKey;

pub type NumberingResult<T> = Result<T, NumberingError>;

/// Numbering failures. None of them are retried internally: a swallowed failure
/// could hand out the same number twice.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NumberingError {
    #[error("numbering sequence not found: {0}")]
    NotFound(SequenceKey),

    #[error("numbering sequence already exists: {0}")]
    AlreadyExists(SequenceKey),

    /// A previous holder of the sequence lock panicked mid-update.
    #[error("lock poisoned for numbering sequence {0}")]
    LockPoisoned(SequenceKey),

    #[error("numbering sequence {0} has no numbers left")]
    Exhausted(SequenceKey),

    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Domain(#[from] DomainError),
}
