//! treeforge Core Library
//!
//! This crate provides the data model shared by the treeforge pipeline:
//! - Field dictionaries and derived field definitions
//! - The arena-based tree model and its predicates
//! - Model documents (YAML/JSON) and project configuration
//! - A reference interpreter that scores records without code generation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  Document   │────▶│ Tree Model  │────▶│ Interpreter │
//! │ (YAML/JSON) │     │   (Arena)   │     │ / Codegen   │
//! └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use treeforge_core::{ModelDocument, interpreter};
//!
//! let doc = ModelDocument::load("models/tree_sample.yaml")?;
//! let tree = doc.tree_model()?;
//! let fields = doc.field_types()?;
//! let record = serde_json::json!({"temperature": 45});
//! let prediction = interpreter::evaluate(&tree, &fields, &record)?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod document;
pub mod error;
pub mod fields;
pub mod interpreter;
pub mod model;

pub use config::{Config, ProjectConfig};
pub use document::ModelDocument;
pub use error::{Error, Result};
pub use fields::{DataField, DerivedField, Expression, FieldType, FieldTypes};
pub use model::{Node, NodeId, Predicate, TreeModel};
