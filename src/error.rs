use crate::Index;
use thiserror::Error;

/// Errors surfaced by loader construction, data-file parsing, and shortlist
/// updates.
///
/// All failures here are caller or configuration defects; nothing is
/// transient, so nothing is ever retried.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid construction-time configuration: unknown mode strings, zero
    /// batch size, or a bad label-range restriction.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A shortlist candidate referenced a label outside the matrix.
    #[error("label index {index} out of range for {num_labels} labels")]
    LabelIndexOutOfRange { index: Index, num_labels: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Malformed header or row in a data file.
    #[error("invalid data: {0}")]
    Parse(String),

    #[error("checkpoint serialization failed: {0}")]
    Checkpoint(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
