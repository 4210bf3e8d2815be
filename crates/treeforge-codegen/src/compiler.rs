//! Tree compiler
//!
//! Runs the four stages for one model: resolve field types, build the AST,
//! bind the skeleton, emit the source map.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use treeforge_core::config::find_model_documents;
use treeforge_core::fields::{DataField, DerivedField};
use treeforge_core::{ModelDocument, Predicate, TreeModel};

use crate::builder::build;
use crate::emitter::emit;
use crate::error::{Error, Result};
use crate::resolver::resolve;
use crate::sources::GeneratedSourceMap;
use crate::template::{bind, ModelMetadata, UnitSkeleton};

/// Options for the compiler
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Package generated units are placed in
    pub package_name: String,

    /// Skeleton every unit is bound from
    pub skeleton: UnitSkeleton,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            package_name: "org.treeforge.generated".to_string(),
            skeleton: UnitSkeleton::tree_model(),
        }
    }
}

/// Everything needed to compile one tree
#[derive(Debug, Clone)]
pub struct CompileRequest {
    /// The tree
    pub tree: TreeModel,

    /// Base fields
    pub data_dictionary: Vec<DataField>,

    /// Globally derived fields
    pub transformation_dictionary: Vec<DerivedField>,

    /// Guards applied to every rule
    pub extra_constraints: Vec<Predicate>,
}

impl CompileRequest {
    /// Request for a tree with no dictionaries
    pub fn new(tree: TreeModel) -> Self {
        Self {
            tree,
            data_dictionary: Vec::new(),
            transformation_dictionary: Vec::new(),
            extra_constraints: Vec::new(),
        }
    }

    /// Request built from a model document
    pub fn from_document(doc: &ModelDocument) -> Result<Self> {
        Ok(Self {
            tree: doc.tree_model()?,
            data_dictionary: doc.data_dictionary.clone(),
            transformation_dictionary: doc.transformation_dictionary.clone(),
            extra_constraints: Vec::new(),
        })
    }

    /// Set the base fields
    pub fn with_data_dictionary(mut self, fields: Vec<DataField>) -> Self {
        self.data_dictionary = fields;
        self
    }

    /// Set the globally derived fields
    pub fn with_transformations(mut self, fields: Vec<DerivedField>) -> Self {
        self.transformation_dictionary = fields;
        self
    }

    /// Add a guard
    pub fn with_constraint(mut self, predicate: Predicate) -> Self {
        self.extra_constraints.push(predicate);
        self
    }
}

/// Tree model compiler
pub struct TreeCompiler {
    options: CompileOptions,
}

impl TreeCompiler {
    /// Create a new compiler with the given options
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Compiler options
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile one tree
    pub fn compile(&self, request: &CompileRequest) -> Result<CompiledModel> {
        let tree = &request.tree;
        tracing::info!("Compiling model: {}", tree.model_name);

        let fields = resolve(
            &request.data_dictionary,
            &request.transformation_dictionary,
            &tree.local_transformations,
        )?;
        let ast = build(&fields, tree, &request.extra_constraints)?;
        let bound = bind(&self.options.skeleton, &ModelMetadata::from_tree(tree))?;
        let sources = emit(&ast, &bound, &self.options.package_name)?;

        let hash = sources.fingerprint();
        tracing::info!(
            "Compiled model '{}': {} rules, {} unit(s), hash {}",
            tree.model_name,
            ast.rules().len(),
            sources.len(),
            &hash[..12]
        );

        Ok(CompiledModel {
            name: tree.model_name.clone(),
            sources,
            hash,
        })
    }

    /// Compile a parsed model document
    pub fn compile_document(&self, doc: &ModelDocument) -> Result<CompiledModel> {
        self.compile(&CompileRequest::from_document(doc)?)
    }

    /// Compile a model document file
    pub fn compile_file(&self, path: impl AsRef<Path>) -> Result<CompiledModel> {
        let path = path.as_ref();
        tracing::debug!("Reading model document: {}", path.display());
        let doc = ModelDocument::load(path)?;
        self.compile_document(&doc)
    }

    /// Compile every model document under a directory, in path order
    ///
    /// Fails if two documents generate a unit with the same qualified name.
    pub fn compile_all(&self, models_dir: impl AsRef<Path>) -> Result<Vec<CompiledModel>> {
        let mut results = Vec::new();
        let mut origins: BTreeMap<String, PathBuf> = BTreeMap::new();

        for path in find_model_documents(models_dir.as_ref()) {
            let compiled = self.compile_file(&path)?;
            for (unit, _) in compiled.sources.iter() {
                if let Some(first) = origins.insert(unit.to_string(), path.clone()) {
                    return Err(Error::DuplicateUnitError {
                        unit: unit.to_string(),
                        first: first.display().to_string(),
                        second: path.display().to_string(),
                    });
                }
            }
            results.push(compiled);
        }

        Ok(results)
    }
}

impl Default for TreeCompiler {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}

/// A compiled model ready to hand to a Java compiler
#[derive(Debug, Clone)]
pub struct CompiledModel {
    /// Model name
    pub name: String,

    /// Generated units
    pub sources: GeneratedSourceMap,

    /// Fingerprint of the sources
    pub hash: String,
}

impl CompiledModel {
    /// Write every unit as `<out_dir>/<package path>/<Class>.java`
    pub fn save(&self, out_dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let out_dir = out_dir.as_ref();
        let mut written = Vec::with_capacity(self.sources.len());
        for (name, source) in self.sources.iter() {
            let path = out_dir.join(format!("{}.java", name.replace('.', "/")));
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, source)?;
            tracing::debug!("Wrote {}", path.display());
            written.push(path);
        }
        Ok(written)
    }

    /// Number of generated units
    pub fn unit_count(&self) -> usize {
        self.sources.len()
    }
}
