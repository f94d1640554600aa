//! Error types for benchsql.

use thiserror::Error;

/// The main error type for benchsql operations.
///
/// Only fatal conditions are represented here. Recoverable problems met while
/// merging or templating (a skeleton name with no SQL, a bad bound in one
/// override token) are logged and skipped instead.
#[derive(Debug, Error)]
pub enum BenchError {
    /// The annotated SQL source is structurally invalid.
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A descriptor path could not be resolved.
    #[error("Lookup error: {0}")]
    Lookup(String),

    /// Override tokens survived templating and the caller asked to deny them.
    #[error("Unresolved generator tokens: {}", .0.join(", "))]
    Unresolved(Vec<String>),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Descriptor JSON could not be read or written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BenchError {
    /// Create a parse error at the given 1-based line.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Self::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create a lookup error.
    pub fn lookup(message: impl Into<String>) -> Self {
        Self::Lookup(message.into())
    }
}

/// Result type alias for benchsql operations.
pub type BenchResult<T> = Result<T, BenchError>;
