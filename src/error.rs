//! Error types for the core modules.
//!
//! The store, block editor and environment applier return these typed errors.
//! The command layer wraps them into `anyhow::Error` with context and decides
//! how to present them.

use std::path::PathBuf;
use thiserror::Error;

/// Failures of the profile store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Profile '{0}' not found")]
    NotFound(String),

    #[error("Profile '{0}' already exists")]
    DuplicateName(String),

    #[error("Failed to access profile store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The store file exists but does not parse
    #[error("Profile store {path} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize profile store: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Rejected user input, caught at the input boundary
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Profile name is required")]
    EmptyName,

    #[error("Profile name cannot be longer than {0} characters")]
    NameTooLong(usize),

    #[error(
        "Invalid profile name '{0}'. Only letters, numbers, hyphens (-), and underscores (_) are allowed"
    )]
    InvalidName(String),

    #[error("Token is required")]
    EmptyToken,

    #[error("Base URL is required")]
    EmptyUrl,

    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Failures while materializing a profile into the environment
#[derive(Error, Debug)]
pub enum ApplyError {
    #[error("Failed to update {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A platform mechanism was invoked on the wrong host
    #[error("{0}")]
    Platform(String),

    #[error("'{program}' failed: {message}")]
    Command { program: String, message: String },
}

impl ApplyError {
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
    fn test_error_display() {
        let err = StoreError::NotFound("work".to_string());
        assert_eq!(err.to_string(), "Profile 'work' not found");

        let err = StoreError::DuplicateName("work".to_string());
        assert_eq!(err.to_string(), "Profile 'work' already exists");
    }

    #[test]
    fn test_io_constructor_keeps_path() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = ApplyError::io("/home/u/.zshrc", source);
        assert!(err.to_string().contains("/home/u/.zshrc"));
        assert!(err.to_string().contains("denied"));
    }
}
