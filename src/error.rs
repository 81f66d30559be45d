use thiserror::Error;

/// Errors surfaced by the mixture density network and its training loop.
#[derive(Debug, Error)]
pub enum MdnError {
    #[error("mixture must have at least one component, got {0}")]
    InvalidComponentCount(usize),

    #[error("invalid network spec: {0}")]
    InvalidSpec(String),

    #[error("invalid training config: {0}")]
    InvalidConfig(String),

    #[error("shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: String,
        actual: String,
    },

    #[error("batch contains no rows")]
    EmptyBatch,

    #[error("numerical degeneracy at row {row}: {reason}")]
    NumericalDegeneracy { row: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MdnError>;

impl MdnError {
    pub(crate) fn shape(
        context: &'static str,
        expected: impl ToString,
        actual: impl ToString,
    ) -> MdnError {
        MdnError::ShapeMismatch {
            context,
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    pub(crate) fn degenerate(row: usize, reason: impl Into<String>) -> MdnError {
        MdnError::NumericalDegeneracy { row, reason: reason.into() }
    }
}
