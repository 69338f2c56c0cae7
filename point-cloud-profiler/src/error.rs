/// Error types surfaced by the analysis engines
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProfilerError {
    /// Caller supplied a value that violates an entry-point precondition.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// A spatial index was requested over an empty point set.
    #[error("cannot build a spatial index over zero points")]
    IndexBuild,

    /// An attribute column does not line up with its point set.
    #[error("attribute column `{name}` has {actual} values, point set has {expected}")]
    AttributeLength {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl ProfilerError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ProfilerError>;
