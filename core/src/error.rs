//! Error types for sqlgen.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A query is missing its `-- name:` annotation or the annotation is malformed.
    #[error("{file}:{line}: invalid query annotation: {message}")]
    InvalidQueryAnnotation {
        file: String,
        line: usize,
        message: String,
    },

    /// Unrecognized kind on a `-- name:` line.
    #[error("Unknown query kind ':{0}'. Expected: :one, :many, :exec, or :execrows")]
    UnknownQueryKind(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// Create an annotation error at the given line.
    pub fn annotation(file: impl Into<String>, line: usize, message: impl Into<String>) -> Self {
        Self::InvalidQueryAnnotation {
            file: file.into(),
            line,
            message: message.into(),
        }
    }
}

/// Result type alias for sqlgen-core operations.
pub type CoreResult<T> = Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CoreError::annotation("users.sql", 3, "missing name");
        assert_eq!(
            err.to_string(),
            "users.sql:3: invalid query annotation: missing name"
        );
    }
}
