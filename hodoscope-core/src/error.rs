//! Error types for hodoscope-core.

use thiserror::Error;

/// Result type alias for hodoscope operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration errors.
///
/// These are raised while building the run configuration. Per-event
/// data-quality conditions never produce an error; they are reported
/// through sentinel values and [`EventStatus`](crate::EventStatus).
#[derive(Error, Debug)]
pub enum Error {
    /// A required parameter is absent from the parameter store.
    #[error("missing parameter: {0}")]
    MissingParameter(String),

    /// A parameter exists but has the wrong shape or value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Plane names and plane count disagree.
    #[error("plane mismatch: expected {expected} planes, found {found}")]
    PlaneMismatch { expected: usize, found: usize },

    /// Parameter file could not be parsed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Parameter file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn invalid(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }
}
