//! Error types for the protonet library.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::text::ParseError;

/// Main error type for network operations.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Error reading a network file.
    #[error("IO error for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The text could not be loaded, or a projected network is unsound.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A data-source change would delete or replace layers.
    #[error("Requires force: {0}")]
    RequiresForce(ForceReason),

    /// An operation was attempted before a network was loaded.
    #[error("network not loaded")]
    NotLoaded,

    /// `load_text` or `load_file` was called on an already loaded network.
    #[error("network already loaded")]
    AlreadyLoaded,

    /// Argument outside the domain accepted by the operation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl NetworkError {
    /// Returns true for precondition violations (programming errors) as
    /// opposed to problems with the network data itself.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            NetworkError::NotLoaded | NetworkError::AlreadyLoaded | NetworkError::InvalidArgument(_)
        )
    }
}

impl From<ParseError> for NetworkError {
    fn from(err: ParseError) -> Self {
        NetworkError::Validation(err.to_string())
    }
}

/// Why a data-source change needs `force`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ForceReason {
    /// The only candidate is a data layer of another type (e.g. `ImageData`).
    LayerType { found: String },
    /// The candidate produces a different number of tops.
    TopCount { expected: usize, found: usize },
    /// The candidate's tops differ at `index`.
    TopName {
        index: usize,
        expected: String,
        found: String,
    },
    /// Several candidate layers exist for the phase.
    LayerCount { count: usize },
}

impl fmt::Display for ForceReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ForceReason::LayerType { found } => {
                write!(f, "existing layer has type \"{}\", not \"Data\"", found)
            }
            ForceReason::TopCount { expected, found } => {
                write!(f, "existing layer has {} tops, expected {}", found, expected)
            }
            ForceReason::TopName {
                index,
                expected,
                found,
            } => write!(
                f,
                "existing layer top[{}] is \"{}\", expected \"{}\"",
                index, found, expected
            ),
            ForceReason::LayerCount { count } => {
                write!(f, "found {} data layers for this phase", count)
            }
        }
    }
}

/// Result type alias for network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;
