//! Error types for treeforge-core

use thiserror::Error;

/// Result type alias for treeforge-core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in treeforge-core
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file could not be found
    #[error("configuration file not found: {path}")]
    ConfigNotFound {
        /// Path that was searched
        path: String,
    },

    /// Failed to parse YAML configuration or model document
    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    /// Invalid configuration value
    #[error("invalid configuration: {message}")]
    ConfigInvalid {
        /// Description of what's invalid
        message: String,
    },

    /// Structurally invalid model document or tree
    #[error("invalid model '{model}': {message}")]
    InvalidModel {
        /// Name of the model with the error
        model: String,
        /// Description of the error
        message: String,
    },

    /// Scoring a record against a tree failed
    #[error("evaluation error at node '{node}': {message}")]
    EvaluationError {
        /// Node id where evaluation failed
        node: String,
        /// Description of the error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
