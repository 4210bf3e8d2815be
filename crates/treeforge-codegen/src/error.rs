//! Error types for code generation

use thiserror::Error;

/// Result type for codegen operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during code generation
#[derive(Error, Debug)]
pub enum Error {
    /// A field type could not be resolved (unknown type, duplicate, cycle)
    #[error("cannot resolve type of field '{field}': {message}")]
    TypeResolutionError {
        /// Field name
        field: String,
        /// Error description
        message: String,
    },

    /// A predicate references a field that cannot be used
    #[error("invalid predicate on field '{field}' at node {node}: {message}")]
    PredicateResolutionError {
        /// Field name
        field: String,
        /// Path of node ids from the root, e.g. `0/1/4`
        node: String,
        /// Error description
        message: String,
    },

    /// The tree is structurally invalid
    #[error("malformed model '{model}': {message}")]
    MalformedModelError {
        /// Model name
        model: String,
        /// Error description
        message: String,
    },

    /// Emission was requested for an AST without rules
    #[error("model '{model}' produced no rules to emit")]
    EmptyModelError {
        /// Model name
        model: String,
    },

    /// Two model documents generate the same unit
    #[error("unit '{unit}' is generated by both {first} and {second}")]
    DuplicateUnitError {
        /// Qualified unit name
        unit: String,
        /// Document that produced the unit first
        first: String,
        /// Document that produced it again
        second: String,
    },

    /// The skeleton unit lacks an insertion point
    #[error("template error: {message}")]
    TemplateError {
        /// Error description
        message: String,
    },

    /// Rendering the unit body failed
    #[error("code generation failed: {0}")]
    RenderError(#[from] minijinja::Error),

    /// Loading the model failed
    #[error(transparent)]
    Model(#[from] treeforge_core::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
