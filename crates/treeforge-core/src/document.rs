//! Model documents
//!
//! A model document is the already-parsed form of a tree model: the two
//! global dictionaries plus the tree model with its nodes nested the way they
//! are written. [`ModelDocument::tree_model`] flattens the nesting into the
//! arena used by the rest of the pipeline.
//!
//! # Example
//!
//! ```yaml
//! data_dictionary:
//!   - { name: temperature, data_type: double }
//!   - { name: whatIdo, data_type: string }
//!
//! tree_model:
//!   model_name: TreeSample
//!   algorithm_name: TreeModel
//!   mining_schema:
//!     - { name: temperature }
//!     - { name: whatIdo, usage_type: predicted }
//!   node:
//!     id: "0"
//!     score: will play
//!     nodes:
//!       - id: "1"
//!         predicate:
//!           simple: { field: temperature, operator: lessThan, value: 50 }
//!         score: no play
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::fields::{DataField, DerivedField, FieldTypes};
use crate::model::{
    MiningField, MiningFunction, MissingValueStrategy, NoTrueChildStrategy, Node, NodeId,
    Predicate, ScoreDistribution, TreeModel, scalar_as_string,
};

/// A parsed model document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDocument {
    /// Raw input fields
    #[serde(default)]
    pub data_dictionary: Vec<DataField>,

    /// Globally derived fields
    #[serde(default)]
    pub transformation_dictionary: Vec<DerivedField>,

    /// The tree model
    pub tree_model: TreeModelConfig,
}

/// Tree model as written in a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeModelConfig {
    /// Model name
    pub model_name: String,

    /// Algorithm identifier
    #[serde(default)]
    pub algorithm_name: Option<String>,

    /// Classification or regression
    #[serde(default)]
    pub function_name: MiningFunction,

    /// Mining schema
    #[serde(default)]
    pub mining_schema: Vec<MiningField>,

    /// Model-local derived fields
    #[serde(default)]
    pub local_transformations: Vec<DerivedField>,

    /// Unknown-predicate policy
    #[serde(default)]
    pub missing_value_strategy: MissingValueStrategy,

    /// No-matching-child policy
    #[serde(default)]
    pub no_true_child_strategy: NoTrueChildStrategy,

    /// Root node; absent for an empty tree
    #[serde(default)]
    pub node: Option<NodeConfig>,
}

/// Node as written in a document, children nested
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Node id; numbered in depth-first order when absent
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub id: Option<String>,

    /// Entry predicate
    #[serde(default)]
    pub predicate: Option<Predicate>,

    /// Outcome
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub score: Option<String>,

    /// Training records that reached the node
    #[serde(default)]
    pub record_count: Option<f64>,

    /// Per-label record counts
    #[serde(default)]
    pub score_distributions: Vec<ScoreDistribution>,

    /// Child taken on unknown predicates
    #[serde(default, deserialize_with = "scalar_as_string")]
    pub default_child: Option<String>,

    /// Children in declaration order
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
}

impl ModelDocument {
    /// Parse a YAML document
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Parse a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a document, choosing the format from the file extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        let doc = if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json(&contents)?
        } else {
            Self::from_yaml(&contents)?
        };
        tracing::debug!(
            "Loaded model '{}' from {}",
            doc.tree_model.model_name,
            path.display()
        );
        Ok(doc)
    }

    /// Model name
    pub fn name(&self) -> &str {
        &self.tree_model.model_name
    }

    /// Declared field types across the three dictionary layers
    pub fn field_types(&self) -> Result<FieldTypes> {
        FieldTypes::from_dictionaries(
            self.name(),
            &self.data_dictionary,
            &self.transformation_dictionary,
            &self.tree_model.local_transformations,
        )
    }

    /// Build the arena tree model
    pub fn tree_model(&self) -> Result<TreeModel> {
        let config = &self.tree_model;
        let mut tree = TreeModel::new(&config.model_name);
        tree.algorithm_name = config.algorithm_name.clone();
        tree.function_name = config.function_name;
        tree.mining_schema = config.mining_schema.clone();
        tree.local_transformations = config.local_transformations.clone();
        tree.missing_value_strategy = config.missing_value_strategy;
        tree.no_true_child_strategy = config.no_true_child_strategy;

        if let Some(root) = &config.node {
            let mut counter = 0usize;
            let root_id = tree.add_root(to_node(root, &mut counter))?;
            add_children(&mut tree, root_id, root, &mut counter)?;
        }
        Ok(tree)
    }
}

fn to_node(config: &NodeConfig, counter: &mut usize) -> Node {
    let id = config.id.clone().unwrap_or_else(|| counter.to_string());
    *counter += 1;
    let mut node = Node::new(id);
    node.predicate = config.predicate.clone();
    node.score = config.score.clone();
    node.record_count = config.record_count;
    node.score_distributions = config.score_distributions.clone();
    node.default_child = config.default_child.clone();
    node
}

fn add_children(
    tree: &mut TreeModel,
    parent: NodeId,
    config: &NodeConfig,
    counter: &mut usize,
) -> Result<()> {
    for child in &config.nodes {
        let id = tree.add_child(parent, to_node(child, counter))?;
        add_children(tree, id, child, counter)?;
    }
    Ok(())
}

impl TryFrom<&ModelDocument> for TreeModel {
    type Error = Error;

    fn try_from(doc: &ModelDocument) -> Result<Self> {
        doc.tree_model()
    }
}
