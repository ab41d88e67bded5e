use crate::reader::ReadError;
use crate::types::Id;
use thiserror::Error;

/// Failures across correlation, canonicalization, pruning, and grouping.
///
/// Every variant is fatal to the compilation. A partially processed graph is
/// unsafe to persist, so there is no partial-success mode; the sole
/// recoverable condition (an unsupported vertex label) is handled inside the
/// correlator by tracking, not by an error.
#[derive(Debug, Error)]
pub enum CorrelateError {
    #[error("no metadata vertex at the start of the dump")]
    MissingMetadata,

    #[error("duplicate metadata vertex on line {line}")]
    DuplicateMetadata { line: usize },

    #[error(
        "malformed dump on line {line}: element {id} references {references}, \
         which is not a known {expected}"
    )]
    MalformedReference {
        line: usize,
        id: Id,
        references: Id,
        expected: &'static str,
    },

    #[error("failed to read dump")]
    Read(#[from] ReadError),

    #[error("path existence check failed")]
    Prune(#[from] std::io::Error),

    #[error("failed to encode identifier filter")]
    Filter(#[from] serde_json::Error),
}

pub type CorrelateResult<T> = Result<T, CorrelateError>;
