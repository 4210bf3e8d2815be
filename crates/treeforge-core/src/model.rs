//! Tree model definition
//!
//! A tree model is stored as an arena: nodes live in one vector and refer to
//! their children by [`NodeId`]. The root is always the first node added.
//! Child order is declaration order, which is what first-match selection
//! depends on.

use serde::{Deserialize, Deserializer, Serialize};
use std::ops::Index;

use crate::error::{Error, Result};
use crate::fields::DerivedField;

/// Index of a node inside its [`TreeModel`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// Position of the node in the arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// Operator of a simple predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SimpleOperator {
    /// `field == value`
    Equal,
    /// `field != value`
    NotEqual,
    /// `field < value`
    LessThan,
    /// `field <= value`
    LessOrEqual,
    /// `field > value`
    GreaterThan,
    /// `field >= value`
    GreaterOrEqual,
    /// Field has no value
    IsMissing,
    /// Field has a value
    IsNotMissing,
}

impl SimpleOperator {
    /// Whether the operator tests presence instead of comparing a value
    pub fn is_presence_check(self) -> bool {
        matches!(self, SimpleOperator::IsMissing | SimpleOperator::IsNotMissing)
    }
}

/// Operator of a set membership predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SetOperator {
    /// Value is one of the listed values
    IsIn,
    /// Value is none of the listed values
    IsNotIn,
}

/// Operator of a compound predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanOperator {
    /// All operands true
    And,
    /// Any operand true
    Or,
    /// Odd number of operands true
    Xor,
    /// First operand that is not unknown
    Surrogate,
}

/// Boolean test attached to a tree node
///
/// In documents a predicate is written as a single-key map naming its kind
/// (`simple`, `simple_set`, `compound`) or as one of the constants `"true"`
/// and `"false"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "PredicateConfig", into = "PredicateConfig")]
pub enum Predicate {
    /// Compare one field against a literal
    Simple {
        /// Field name
        field: String,
        /// Comparison operator
        operator: SimpleOperator,
        /// Literal, absent for presence checks
        value: Option<String>,
    },

    /// Test a field against a set of literals
    SimpleSet {
        /// Field name
        field: String,
        /// Membership operator
        operator: SetOperator,
        /// Literals
        values: Vec<String>,
    },

    /// Boolean combination of nested predicates
    Compound {
        /// Combination operator
        operator: BooleanOperator,
        /// Operands in evaluation order
        predicates: Vec<Predicate>,
    },

    /// Always matches
    True,

    /// Never matches
    False,
}

/// Document form of a [`Predicate`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum PredicateConfig {
    Simple { simple: SimpleConfig },
    SimpleSet { simple_set: SimpleSetConfig },
    Compound { compound: CompoundConfig },
    Constant(ConstantPredicate),
    Flag(bool),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SimpleConfig {
    field: String,
    operator: SimpleOperator,
    #[serde(
        default,
        deserialize_with = "scalar_as_string",
        skip_serializing_if = "Option::is_none"
    )]
    value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct SimpleSetConfig {
    field: String,
    operator: SetOperator,
    #[serde(deserialize_with = "scalars_as_strings")]
    values: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CompoundConfig {
    operator: BooleanOperator,
    predicates: Vec<Predicate>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum ConstantPredicate {
    #[serde(rename = "true", alias = "always")]
    True,
    #[serde(rename = "false", alias = "never")]
    False,
}

impl From<PredicateConfig> for Predicate {
    fn from(config: PredicateConfig) -> Self {
        match config {
            PredicateConfig::Simple { simple } => Predicate::Simple {
                field: simple.field,
                operator: simple.operator,
                value: simple.value,
            },
            PredicateConfig::SimpleSet { simple_set } => Predicate::SimpleSet {
                field: simple_set.field,
                operator: simple_set.operator,
                values: simple_set.values,
            },
            PredicateConfig::Compound { compound } => Predicate::Compound {
                operator: compound.operator,
                predicates: compound.predicates,
            },
            PredicateConfig::Constant(ConstantPredicate::True) | PredicateConfig::Flag(true) => {
                Predicate::True
            }
            PredicateConfig::Constant(ConstantPredicate::False) | PredicateConfig::Flag(false) => {
                Predicate::False
            }
        }
    }
}

impl From<Predicate> for PredicateConfig {
    fn from(predicate: Predicate) -> Self {
        match predicate {
            Predicate::Simple {
                field,
                operator,
                value,
            } => PredicateConfig::Simple {
                simple: SimpleConfig {
                    field,
                    operator,
                    value,
                },
            },
            Predicate::SimpleSet {
                field,
                operator,
                values,
            } => PredicateConfig::SimpleSet {
                simple_set: SimpleSetConfig {
                    field,
                    operator,
                    values,
                },
            },
            Predicate::Compound {
                operator,
                predicates,
            } => PredicateConfig::Compound {
                compound: CompoundConfig {
                    operator,
                    predicates,
                },
            },
            Predicate::True => PredicateConfig::Constant(ConstantPredicate::True),
            Predicate::False => PredicateConfig::Constant(ConstantPredicate::False),
        }
    }
}

impl Predicate {
    /// Simple comparison predicate
    pub fn simple(
        field: impl Into<String>,
        operator: SimpleOperator,
        value: impl Into<String>,
    ) -> Self {
        Predicate::Simple {
            field: field.into(),
            operator,
            value: Some(value.into()),
        }
    }

    /// `isMissing` predicate
    pub fn is_missing(field: impl Into<String>) -> Self {
        Predicate::Simple {
            field: field.into(),
            operator: SimpleOperator::IsMissing,
            value: None,
        }
    }

    /// `isNotMissing` predicate
    pub fn is_not_missing(field: impl Into<String>) -> Self {
        Predicate::Simple {
            field: field.into(),
            operator: SimpleOperator::IsNotMissing,
            value: None,
        }
    }

    /// Set membership predicate
    pub fn set<I, S>(field: impl Into<String>, operator: SetOperator, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Predicate::SimpleSet {
            field: field.into(),
            operator,
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Compound predicate
    pub fn compound(operator: BooleanOperator, predicates: Vec<Predicate>) -> Self {
        Predicate::Compound {
            operator,
            predicates,
        }
    }

    /// Field names referenced anywhere in the predicate, in first-use order
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Predicate::Simple { field, .. } | Predicate::SimpleSet { field, .. } => {
                if !out.contains(&field.as_str()) {
                    out.push(field);
                }
            }
            Predicate::Compound { predicates, .. } => {
                for p in predicates {
                    p.collect_fields(out);
                }
            }
            Predicate::True | Predicate::False => {}
        }
    }
}

/// Class label with its share of the training records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreDistribution {
    /// Class label
    #[serde(deserialize_with = "scalar_string")]
    pub value: String,

    /// Training records that reached the node with this label
    pub record_count: f64,

    /// Explicit confidence, overriding `record_count / total`
    #[serde(default)]
    pub confidence: Option<f64>,
}

/// A node of the decision tree
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    /// Node identifier from the document (unique within the tree)
    pub id: String,

    /// Predicate guarding entry into this node; `None` on the root
    pub predicate: Option<Predicate>,

    /// Outcome when evaluation stops at this node
    pub score: Option<String>,

    /// Training records that reached the node
    pub record_count: Option<f64>,

    /// Per-label record counts, used for confidences
    pub score_distributions: Vec<ScoreDistribution>,

    /// Child taken when a sibling predicate evaluates to unknown
    pub default_child: Option<String>,

    children: Vec<NodeId>,
}

impl Node {
    /// Create a node with no predicate, score or children
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            predicate: None,
            score: None,
            record_count: None,
            score_distributions: Vec::new(),
            default_child: None,
            children: Vec::new(),
        }
    }

    /// Set the entry predicate
    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Set the score
    pub fn with_score(mut self, score: impl Into<String>) -> Self {
        self.score = Some(score.into());
        self
    }

    /// Set the default child id
    pub fn with_default_child(mut self, id: impl Into<String>) -> Self {
        self.default_child = Some(id.into());
        self
    }

    /// Add a score distribution entry
    pub fn with_distribution(mut self, value: impl Into<String>, record_count: f64) -> Self {
        self.score_distributions.push(ScoreDistribution {
            value: value.into(),
            record_count,
            confidence: None,
        });
        self
    }

    /// Children in declaration order
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Whether the node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Confidence per label, in declaration order
    ///
    /// Explicit confidences win; otherwise each label gets its record count
    /// divided by the node's total (the node record count if present, else
    /// the sum of the distribution counts).
    pub fn confidences(&self) -> Vec<(String, f64)> {
        let total = self.record_count.unwrap_or_else(|| {
            self.score_distributions
                .iter()
                .map(|d| d.record_count)
                .sum()
        });
        self.score_distributions
            .iter()
            .map(|d| {
                let confidence = match d.confidence {
                    Some(c) => c,
                    None if total > 0.0 => d.record_count / total,
                    None => 0.0,
                };
                (d.value.clone(), confidence)
            })
            .collect()
    }
}

/// Kind of prediction the model makes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MiningFunction {
    /// Predicts a label
    #[default]
    Classification,
    /// Predicts a number
    Regression,
}

/// Role of a field in the mining schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FieldUsage {
    /// Input to the model
    #[default]
    Active,
    /// Field the model predicts
    Target,
    /// Legacy spelling of `target`
    Predicted,
    /// Carried along, not used for scoring
    Supplementary,
}

/// Field entry of the mining schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MiningField {
    /// Field name
    pub name: String,

    /// Role of the field
    #[serde(default)]
    pub usage_type: FieldUsage,
}

/// What to do when a sibling predicate evaluates to unknown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum MissingValueStrategy {
    /// Treat unknown as no match; honor a declared default child
    #[default]
    None,
    /// Take the parent's default child
    DefaultChild,
    /// Stop with a null prediction
    NullPrediction,
    /// Stop with the parent's prediction
    LastPrediction,
}

/// What to do when no child of an internal node matches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum NoTrueChildStrategy {
    /// Stop with a null prediction
    #[default]
    ReturnNullPrediction,
    /// Stop with the parent's prediction
    ReturnLastPrediction,
}

/// A decision tree model
#[derive(Debug, Clone, PartialEq)]
pub struct TreeModel {
    /// Model name
    pub model_name: String,

    /// Algorithm identifier
    pub algorithm_name: Option<String>,

    /// Classification or regression
    pub function_name: MiningFunction,

    /// Fields used by the model and their roles
    pub mining_schema: Vec<MiningField>,

    /// Derived fields private to this model
    pub local_transformations: Vec<DerivedField>,

    /// Unknown-predicate policy
    pub missing_value_strategy: MissingValueStrategy,

    /// No-matching-child policy
    pub no_true_child_strategy: NoTrueChildStrategy,

    nodes: Vec<Node>,
}

impl TreeModel {
    /// Create a model with no nodes
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            algorithm_name: None,
            function_name: MiningFunction::default(),
            mining_schema: Vec::new(),
            local_transformations: Vec::new(),
            missing_value_strategy: MissingValueStrategy::default(),
            no_true_child_strategy: NoTrueChildStrategy::default(),
            nodes: Vec::new(),
        }
    }

    /// Add the root node. Fails if the tree already has one.
    pub fn add_root(&mut self, node: Node) -> Result<NodeId> {
        if !self.nodes.is_empty() {
            return Err(Error::InvalidModel {
                model: self.model_name.clone(),
                message: format!("root already set, cannot add '{}' as root", node.id),
            });
        }
        self.nodes.push(node);
        Ok(NodeId(0))
    }

    /// Append a child to `parent`, after its existing children
    pub fn add_child(&mut self, parent: NodeId, node: Node) -> Result<NodeId> {
        if parent.0 >= self.nodes.len() {
            return Err(Error::InvalidModel {
                model: self.model_name.clone(),
                message: format!("parent index {} does not exist", parent.0),
            });
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        self.nodes[parent.0].children.push(id);
        Ok(id)
    }

    /// Root node, if the tree has any node
    pub fn root(&self) -> Option<NodeId> {
        if self.nodes.is_empty() {
            None
        } else {
            Some(NodeId(0))
        }
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree has no nodes
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All nodes in insertion order
    pub fn nodes(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// Look a node up by its document id
    pub fn find(&self, id: &str) -> Option<NodeId> {
        self.nodes.iter().position(|n| n.id == id).map(NodeId)
    }

    /// Name of the target field from the mining schema
    pub fn target_field(&self) -> Option<&str> {
        self.mining_schema
            .iter()
            .find(|f| matches!(f.usage_type, FieldUsage::Target | FieldUsage::Predicted))
            .map(|f| f.name.as_str())
    }

    /// Number of leaves reachable from the root
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }
}

impl Index<NodeId> for TreeModel {
    type Output = Node;

    fn index(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }
}

fn scalar_to_string(value: serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    }
}

pub(crate) fn scalar_string<'de, D: Deserializer<'de>>(d: D) -> std::result::Result<String, D::Error> {
    serde_json::Value::deserialize(d).map(scalar_to_string)
}

pub(crate) fn scalar_as_string<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Option<String>, D::Error> {
    let value: Option<serde_json::Value> = Option::deserialize(d)?;
    Ok(value.map(scalar_to_string))
}

pub(crate) fn scalars_as_strings<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Vec<String>, D::Error> {
    let values: Vec<serde_json::Value> = Vec::deserialize(d)?;
    Ok(values.into_iter().map(scalar_to_string).collect())
}
