//! Error types for Draftmill.
//!
//! Library crates use [`DraftmillError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Draftmill operations.
#[derive(Debug, thiserror::Error)]
pub enum DraftmillError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error while talking to a collaborator service.
    #[error("network error: {0}")]
    Network(String),

    /// The content index did not finish indexing within the allotted attempts.
    #[error("content index not ready after {attempts} attempts")]
    IndexingTimeout { attempts: u32 },

    /// The generation provider reported a non-success completion or empty output.
    #[error("generation failed: {0}")]
    Generation(String),

    /// No default author with the required role exists in the store.
    #[error("no author available with role '{role}'")]
    NoAuthor { role: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DraftmillError>;

impl DraftmillError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a generation error from any displayable message.
    pub fn generation(msg: impl Into<String>) -> Self {
        Self::Generation(msg.into())
    }

    /// Create a storage error from any displayable message.
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = DraftmillError::config("missing service URL");
        assert_eq!(err.to_string(), "config error: missing service URL");

        let err = DraftmillError::IndexingTimeout { attempts: 120 };
        assert_eq!(
            err.to_string(),
            "content index not ready after 120 attempts"
        );

        let err = DraftmillError::NoAuthor {
            role: "author".into(),
        };
        assert!(err.to_string().contains("role 'author'"));
    }
}
