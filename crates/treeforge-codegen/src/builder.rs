//! Predicate/AST builder
//!
//! Walks the arena tree depth-first and produces a [`TreeAst`]: a typed
//! [`Branch`] for every node plus one [`TreeRule`] per root-to-leaf path.
//! Every field a predicate mentions must be present in the [`FieldTypeMap`],
//! and its literal must convert to the field's generated type; violations
//! are reported with the node path (`0/1/4`) so they can be traced back to
//! the document.

use std::collections::HashSet;

use treeforge_core::model::{
    BooleanOperator, MiningFunction, Node, SetOperator, SimpleOperator, TreeModel,
};
use treeforge_core::{NodeId, Predicate};

use crate::error::{Error, Result};
use crate::ir::{
    Branch, CompareOp, Condition, Expr, Literal, Outcome, SelectionPolicy, TreeAst, TreeRule,
};
use crate::naming::rule_name;
use crate::resolver::{FieldTypeMap, GeneratedType};

/// Build the AST for `tree`.
///
/// `extra_constraints` are translated with the same field map and attached
/// to every rule as guards; an empty slice means no guards.
pub fn build(
    fields: &FieldTypeMap,
    tree: &TreeModel,
    extra_constraints: &[Predicate],
) -> Result<TreeAst> {
    let root = tree.root().ok_or_else(|| Error::MalformedModelError {
        model: tree.model_name.clone(),
        message: "tree has no nodes".to_string(),
    })?;
    check_unique_ids(tree)?;

    let builder = Builder { fields, tree };

    let guards = extra_constraints
        .iter()
        .map(|p| builder.translate(p, "guard"))
        .collect::<Result<Vec<_>>>()?;

    let mut state = Walk {
        branches: Vec::with_capacity(tree.len()),
        rules: Vec::new(),
        path: Vec::new(),
        guards: &guards,
    };
    builder.visit(root, &mut state)?;

    // Nodes were visited depth-first; the emitter looks them up by index.
    state.branches.sort_by_key(|b| b.node);

    tracing::debug!(
        "Built AST for '{}': {} nodes, {} rules, {} guards",
        tree.model_name,
        state.branches.len(),
        state.rules.len(),
        guards.len()
    );

    Ok(TreeAst {
        model_name: tree.model_name.clone(),
        rules: state.rules,
        branches: state.branches,
        guards,
        policy: SelectionPolicy {
            missing_value: tree.missing_value_strategy,
            no_true_child: tree.no_true_child_strategy,
        },
    })
}

fn check_unique_ids(tree: &TreeModel) -> Result<()> {
    let mut seen = HashSet::new();
    for (_, node) in tree.nodes() {
        if !seen.insert(node.id.as_str()) {
            return Err(Error::MalformedModelError {
                model: tree.model_name.clone(),
                message: format!("node id '{}' is used more than once", node.id),
            });
        }
    }
    Ok(())
}

struct Builder<'a> {
    fields: &'a FieldTypeMap,
    tree: &'a TreeModel,
}

struct Walk<'g> {
    branches: Vec<Branch>,
    rules: Vec<TreeRule>,
    path: Vec<(NodeId, Option<Expr>)>,
    guards: &'g [Expr],
}

impl Builder<'_> {
    fn visit(&self, id: NodeId, state: &mut Walk<'_>) -> Result<()> {
        let node = &self.tree[id];
        let node_path = self.node_path(state, node);

        let condition = match &node.predicate {
            Some(predicate) => Some(self.translate(predicate, &node_path)?),
            None => None,
        };
        let outcome = self.outcome(id, node);
        let default_child = self.default_child(node, &node_path)?;

        state.branches.push(Branch {
            node: id,
            node_id: node.id.clone(),
            condition: condition.clone(),
            outcome: outcome.clone(),
            children: node.children().to_vec(),
            default_child,
        });
        state.path.push((id, condition));

        if node.is_leaf() {
            let outcome = outcome
                .ok_or_else(|| self.malformed(format!("leaf node {} has no score", node_path)))?;
            let rule = TreeRule {
                name: rule_name(state.path.iter().map(|(n, _)| self.tree[*n].id.as_str())),
                path: state.path.iter().map(|(n, _)| *n).collect(),
                conditions: state
                    .path
                    .iter()
                    .filter_map(|(n, expr)| {
                        expr.as_ref().map(|expr| Condition {
                            node: *n,
                            node_id: self.tree[*n].id.clone(),
                            expr: expr.clone(),
                        })
                    })
                    .collect(),
                guards: state.guards.to_vec(),
                outcome,
            };
            state.rules.push(rule);
        } else {
            for &child in node.children() {
                self.visit(child, state)?;
            }
        }

        state.path.pop();
        Ok(())
    }

    fn node_path(&self, state: &Walk<'_>, node: &Node) -> String {
        let mut ids: Vec<&str> = state
            .path
            .iter()
            .map(|(n, _)| self.tree[*n].id.as_str())
            .collect();
        ids.push(&node.id);
        ids.join("/")
    }

    fn outcome(&self, id: NodeId, node: &Node) -> Option<Outcome> {
        let score = node.score.as_ref()?;
        let literal = match self.tree.function_name {
            MiningFunction::Regression => match score.trim().parse::<f64>() {
                Ok(n) if n.is_finite() => Literal::Number(n),
                _ => Literal::Text(score.clone()),
            },
            MiningFunction::Classification => Literal::Text(score.clone()),
        };
        Some(Outcome {
            node: id,
            node_id: node.id.clone(),
            score: literal,
            confidences: node.confidences(),
        })
    }

    fn default_child(&self, node: &Node, node_path: &str) -> Result<Option<NodeId>> {
        let Some(default_id) = &node.default_child else {
            return Ok(None);
        };
        node.children()
            .iter()
            .copied()
            .find(|c| self.tree[*c].id == *default_id)
            .map(Some)
            .ok_or_else(|| {
                self.malformed(format!(
                    "default child '{}' of node {} is not one of its children",
                    default_id, node_path
                ))
            })
    }

    fn malformed(&self, message: String) -> Error {
        Error::MalformedModelError {
            model: self.tree.model_name.clone(),
            message,
        }
    }

    fn translate(&self, predicate: &Predicate, node_path: &str) -> Result<Expr> {
        match predicate {
            Predicate::True => Ok(Expr::Const(true)),
            Predicate::False => Ok(Expr::Const(false)),
            Predicate::Simple {
                field,
                operator,
                value,
            } => {
                let ty = self.field_type(field, node_path)?;
                let op = match operator {
                    SimpleOperator::IsMissing => return Ok(Expr::IsMissing(field.clone())),
                    SimpleOperator::IsNotMissing => return Ok(Expr::IsNotMissing(field.clone())),
                    SimpleOperator::Equal => CompareOp::Eq,
                    SimpleOperator::NotEqual => CompareOp::Ne,
                    SimpleOperator::LessThan => CompareOp::Lt,
                    SimpleOperator::LessOrEqual => CompareOp::Le,
                    SimpleOperator::GreaterThan => CompareOp::Gt,
                    SimpleOperator::GreaterOrEqual => CompareOp::Ge,
                };
                if ty == GeneratedType::Boolean && !matches!(op, CompareOp::Eq | CompareOp::Ne) {
                    return Err(predicate_error(
                        field,
                        node_path,
                        format!("operator {:?} cannot order a boolean field", operator),
                    ));
                }
                let raw = value.as_deref().ok_or_else(|| {
                    predicate_error(
                        field,
                        node_path,
                        format!("operator {:?} needs a value", operator),
                    )
                })?;
                Ok(Expr::Compare {
                    field: field.clone(),
                    op,
                    ty,
                    literal: convert_literal(raw, ty, field, node_path)?,
                })
            }
            Predicate::SimpleSet {
                field,
                operator,
                values,
            } => {
                let ty = self.field_type(field, node_path)?;
                let values = values
                    .iter()
                    .map(|raw| convert_literal(raw, ty, field, node_path))
                    .collect::<Result<Vec<_>>>()?;
                Ok(Expr::In {
                    field: field.clone(),
                    ty,
                    values,
                    negated: *operator == SetOperator::IsNotIn,
                })
            }
            Predicate::Compound {
                operator,
                predicates,
            } => {
                if predicates.is_empty() {
                    return Err(self.malformed(format!(
                        "compound predicate at node {} has no operands",
                        node_path
                    )));
                }
                let ops = predicates
                    .iter()
                    .map(|p| self.translate(p, node_path))
                    .collect::<Result<Vec<_>>>()?;
                Ok(match operator {
                    BooleanOperator::And => Expr::And(ops),
                    BooleanOperator::Or => Expr::Or(ops),
                    BooleanOperator::Xor => Expr::Xor(ops),
                    BooleanOperator::Surrogate => Expr::Surrogate(ops),
                })
            }
        }
    }

    fn field_type(&self, field: &str, node_path: &str) -> Result<GeneratedType> {
        self.fields
            .get(field)
            .map(|f| f.generated)
            .ok_or_else(|| predicate_error(field, node_path, "field is not defined".to_string()))
    }
}

fn predicate_error(field: &str, node_path: &str, message: String) -> Error {
    Error::PredicateResolutionError {
        field: field.to_string(),
        node: node_path.to_string(),
        message,
    }
}

fn convert_literal(raw: &str, ty: GeneratedType, field: &str, node_path: &str) -> Result<Literal> {
    match ty {
        GeneratedType::Double => match raw.trim().parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Literal::Number(n)),
            _ => Err(predicate_error(
                field,
                node_path,
                format!("'{}' is not a number", raw),
            )),
        },
        GeneratedType::Boolean => match raw.trim() {
            b if b.eq_ignore_ascii_case("true") => Ok(Literal::Bool(true)),
            b if b.eq_ignore_ascii_case("false") => Ok(Literal::Bool(false)),
            _ => Err(predicate_error(
                field,
                node_path,
                format!("'{}' is not a boolean", raw),
            )),
        },
        GeneratedType::String => Ok(Literal::Text(raw.to_string())),
    }
}
