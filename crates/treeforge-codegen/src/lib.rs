//! treeforge Code Generation
//!
//! This crate compiles decision-tree models into Java scoring units.
//!
//! # Pipeline Overview
//!
//! ```text
//! ┌──────────┐     ┌──────────┐     ┌──────────┐     ┌──────────┐
//! │  Fields  │────▶│  Field   │────▶│   Tree   │────▶│  Source  │
//! │  + Tree  │     │ Type Map │     │   AST    │     │   Map    │
//! └──────────┘     └──────────┘     └──────────┘     └──────────┘
//!                   (resolver)       (builder)        (emitter)
//!                                                         ▲
//!                                     skeleton ─(binder)──┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use treeforge_codegen::{CompileOptions, TreeCompiler};
//!
//! let compiler = TreeCompiler::new(CompileOptions::default());
//! let compiled = compiler.compile_file("models/golf.yaml")?;
//! compiled.save("generated")?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod builder;
pub mod compiler;
pub mod emitter;
pub mod error;
pub mod ir;
pub mod naming;
pub mod resolver;
pub mod sources;
pub mod template;

pub use compiler::{CompileOptions, CompileRequest, CompiledModel, TreeCompiler};
pub use error::{Error, Result};
pub use ir::TreeAst;
pub use resolver::{FieldTypeMap, GeneratedType};
pub use sources::GeneratedSourceMap;
pub use template::{BoundTemplate, ModelMetadata, UnitSkeleton};
