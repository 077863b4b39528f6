use thiserror::Error;

/// Error type returned by the reader and by the exact search.
#[derive(Error, Debug)]
pub enum TreewidthError {
    /// Malformed graph or decomposition text
    #[error("line {line}: {message}")]
    Format { line: usize, message: String },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// An invariant of the search or of a decomposition was violated
    #[error("internal consistency violated: {0}")]
    InternalConsistency(String),
    /// The configured candidate limit was reached while deciding a width
    #[error("gave up at width {width} after {candidates} candidates")]
    ResourceExhausted { width: usize, candidates: usize },
}

impl TreewidthError {
    pub(crate) fn format(line: usize, message: impl Into<String>) -> Self {
        Self::Format {
            line,
            message: message.into(),
        }
    }

    pub(crate) fn inconsistent(message: impl Into<String>) -> Self {
        Self::InternalConsistency(message.into())
    }
}

pub type Result<T> = std::result::Result<T, TreewidthError>;
