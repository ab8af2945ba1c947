//! Error types for configuration loading, profile management and validation

use std::path::PathBuf;
use thiserror::Error;

use super::validate::ValidationErrors;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{what} not found")]
    NotFound { what: String },

    #[error("no configuration file found (searched: {})", format_paths(.searched))]
    NoConfigFound { searched: Vec<PathBuf> },

    #[error("failed to parse config file {}: {message}", .path.display())]
    Deserialization { path: PathBuf, message: String },

    #[error("failed to serialize configuration: {0}")]
    Serialization(String),

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Profile(#[from] ProfileError),
}

/// Illegal profile-management operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProfileError {
    #[error("profile name cannot be empty")]
    EmptyName,

    #[error("profile name '{0}' is reserved")]
    Reserved(String),

    #[error("profile '{0}' already exists")]
    AlreadyExists(String),

    #[error("profile '{0}' not found")]
    NotFound(String),
}

fn format_paths(paths: &[PathBuf]) -> String {
    paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", ")
}
