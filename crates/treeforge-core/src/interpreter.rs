//! Tree interpreter
//!
//! Scores a [`TreeModel`] directly against a JSON record without generating
//! source. It applies the same selection rules the generated units follow:
//!
//! - record values are coerced to the field's declared type first; a value
//!   that cannot be coerced counts as missing,
//! - predicates are three-valued; comparing a missing field yields unknown,
//! - the first child whose predicate is true wins, in declaration order,
//! - an unknown child predicate is handled by the model's missing-value
//!   strategy (a declared default child is taken under `none` and
//!   `defaultChild`),
//! - a node where no child matches is handled by the no-true-child strategy.

use serde_json::{Map, Value};
use std::borrow::Cow;
use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::fields::{FieldType, FieldTypes};
use crate::model::{
    BooleanOperator, MissingValueStrategy, NoTrueChildStrategy, Node, NodeId, Predicate,
    SetOperator, SimpleOperator, TreeModel,
};

/// Result of a three-valued predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Truth {
    /// Predicate holds
    True,
    /// Predicate does not hold
    False,
    /// A needed value is missing
    Unknown,
}

impl From<bool> for Truth {
    fn from(b: bool) -> Self {
        if b { Truth::True } else { Truth::False }
    }
}

impl Truth {
    fn and(results: impl IntoIterator<Item = Truth>) -> Truth {
        let mut acc = Truth::True;
        for r in results {
            match r {
                Truth::False => return Truth::False,
                Truth::Unknown => acc = Truth::Unknown,
                Truth::True => {}
            }
        }
        acc
    }

    fn or(results: impl IntoIterator<Item = Truth>) -> Truth {
        let mut acc = Truth::False;
        for r in results {
            match r {
                Truth::True => return Truth::True,
                Truth::Unknown => acc = Truth::Unknown,
                Truth::False => {}
            }
        }
        acc
    }

    fn xor(results: impl IntoIterator<Item = Truth>) -> Truth {
        let mut parity = false;
        for r in results {
            match r {
                Truth::Unknown => return Truth::Unknown,
                Truth::True => parity = !parity,
                Truth::False => {}
            }
        }
        parity.into()
    }

    fn surrogate(results: impl IntoIterator<Item = Truth>) -> Truth {
        results
            .into_iter()
            .find(|r| *r != Truth::Unknown)
            .unwrap_or(Truth::Unknown)
    }
}

/// The outcome of scoring one record
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    /// Id of the node evaluation stopped at
    pub node_id: String,

    /// Score of that node
    pub score: Option<String>,

    /// Confidence per label
    pub confidences: Vec<(String, f64)>,
}

impl Prediction {
    fn from_node(node: &Node) -> Self {
        Self {
            node_id: node.id.clone(),
            score: node.score.clone(),
            confidences: node.confidences(),
        }
    }
}

enum Step {
    Descend(NodeId),
    NullPrediction,
    LastPrediction,
    NoTrueChild,
}

/// Score a record against a tree.
///
/// Returns `Ok(None)` for a null prediction.
pub fn evaluate(
    tree: &TreeModel,
    fields: &FieldTypes,
    record: &Value,
) -> Result<Option<Prediction>> {
    let record = record.as_object().ok_or_else(|| Error::EvaluationError {
        node: String::new(),
        message: "record is not a JSON object".to_string(),
    })?;
    let root = tree.root().ok_or_else(|| Error::InvalidModel {
        model: tree.model_name.clone(),
        message: "tree has no nodes".to_string(),
    })?;

    if let Some(predicate) = &tree[root].predicate
        && evaluate_predicate(predicate, fields, record, &tree[root].id)? != Truth::True
    {
        return Ok(None);
    }

    let mut current = root;
    loop {
        let node = &tree[current];
        if node.is_leaf() {
            return Ok(Some(Prediction::from_node(node)));
        }

        match select_child(tree, fields, current, record)? {
            Step::Descend(child) => current = child,
            Step::NullPrediction => return Ok(None),
            Step::LastPrediction => return Ok(last_prediction(node)),
            Step::NoTrueChild => {
                return Ok(match tree.no_true_child_strategy {
                    NoTrueChildStrategy::ReturnNullPrediction => None,
                    NoTrueChildStrategy::ReturnLastPrediction => last_prediction(node),
                });
            }
        }
    }
}

fn last_prediction(node: &Node) -> Option<Prediction> {
    node.score.as_ref().map(|_| Prediction::from_node(node))
}

fn select_child(
    tree: &TreeModel,
    fields: &FieldTypes,
    parent: NodeId,
    record: &Map<String, Value>,
) -> Result<Step> {
    let node = &tree[parent];
    for &child in node.children() {
        let truth = match &tree[child].predicate {
            Some(predicate) => evaluate_predicate(predicate, fields, record, &tree[child].id)?,
            None => Truth::True,
        };

        match truth {
            Truth::True => return Ok(Step::Descend(child)),
            Truth::False => continue,
            Truth::Unknown => match tree.missing_value_strategy {
                MissingValueStrategy::None | MissingValueStrategy::DefaultChild => {
                    if let Some(default_id) = &node.default_child {
                        let default = node
                            .children()
                            .iter()
                            .copied()
                            .find(|c| tree[*c].id == *default_id)
                            .ok_or_else(|| Error::EvaluationError {
                                node: node.id.clone(),
                                message: format!("default child '{}' is not a child", default_id),
                            })?;
                        return Ok(Step::Descend(default));
                    }
                }
                MissingValueStrategy::NullPrediction => return Ok(Step::NullPrediction),
                MissingValueStrategy::LastPrediction => return Ok(Step::LastPrediction),
            },
        }
    }
    Ok(Step::NoTrueChild)
}

/// Evaluate one predicate against a record
pub fn evaluate_predicate(
    predicate: &Predicate,
    fields: &FieldTypes,
    record: &Map<String, Value>,
    node: &str,
) -> Result<Truth> {
    match predicate {
        Predicate::True => Ok(Truth::True),
        Predicate::False => Ok(Truth::False),
        Predicate::Simple {
            field,
            operator,
            value,
        } => {
            let ty = field_type(fields, field, node)?;
            let Some(actual) = lookup(record, field) else {
                return Ok(match operator {
                    SimpleOperator::IsMissing => Truth::True,
                    SimpleOperator::IsNotMissing => Truth::False,
                    _ => Truth::Unknown,
                });
            };
            if operator.is_presence_check() {
                return Ok((*operator == SimpleOperator::IsNotMissing).into());
            }
            let literal = value.as_deref().ok_or_else(|| Error::EvaluationError {
                node: node.to_string(),
                message: format!("predicate on '{}' has no value", field),
            })?;
            let Some(actual) = coerce(actual, ty) else {
                return Ok(Truth::Unknown);
            };
            if matches!(actual, Scalar::Flag(_))
                && !matches!(operator, SimpleOperator::Equal | SimpleOperator::NotEqual)
            {
                return Err(Error::EvaluationError {
                    node: node.to_string(),
                    message: format!("boolean field '{}' cannot be ordered", field),
                });
            }
            let ordering = compare(&actual, literal, field, node)?;
            let holds = match operator {
                SimpleOperator::Equal => ordering == Some(Ordering::Equal),
                SimpleOperator::NotEqual => ordering != Some(Ordering::Equal),
                SimpleOperator::LessThan => ordering == Some(Ordering::Less),
                SimpleOperator::LessOrEqual => {
                    matches!(ordering, Some(Ordering::Less | Ordering::Equal))
                }
                SimpleOperator::GreaterThan => ordering == Some(Ordering::Greater),
                SimpleOperator::GreaterOrEqual => {
                    matches!(ordering, Some(Ordering::Greater | Ordering::Equal))
                }
                SimpleOperator::IsMissing => false,
                SimpleOperator::IsNotMissing => true,
            };
            Ok(holds.into())
        }
        Predicate::SimpleSet {
            field,
            operator,
            values,
        } => {
            let ty = field_type(fields, field, node)?;
            let Some(actual) = lookup(record, field).and_then(|v| coerce(v, ty)) else {
                return Ok(Truth::Unknown);
            };
            let mut found = false;
            for literal in values {
                if compare(&actual, literal, field, node)? == Some(Ordering::Equal) {
                    found = true;
                    break;
                }
            }
            Ok(match operator {
                SetOperator::IsIn => found.into(),
                SetOperator::IsNotIn => (!found).into(),
            })
        }
        Predicate::Compound {
            operator,
            predicates,
        } => {
            let results = predicates
                .iter()
                .map(|p| evaluate_predicate(p, fields, record, node))
                .collect::<Result<Vec<_>>>()?;
            Ok(match operator {
                BooleanOperator::And => Truth::and(results),
                BooleanOperator::Or => Truth::or(results),
                BooleanOperator::Xor => Truth::xor(results),
                BooleanOperator::Surrogate => Truth::surrogate(results),
            })
        }
    }
}

/// A record value read as its field's declared type
#[derive(Debug)]
enum Scalar<'a> {
    Number(f64),
    Text(Cow<'a, str>),
    Flag(bool),
}

fn field_type(fields: &FieldTypes, field: &str, node: &str) -> Result<FieldType> {
    fields.get(field).ok_or_else(|| Error::EvaluationError {
        node: node.to_string(),
        message: format!("field '{}' is not declared", field),
    })
}

fn lookup<'a>(record: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    record.get(field).filter(|v| !v.is_null())
}

/// Read a value as `ty`; `None` when it has no reading of that type
fn coerce(value: &Value, ty: FieldType) -> Option<Scalar<'_>> {
    match ty {
        FieldType::Numeric => match value {
            Value::Number(n) => n.as_f64().map(Scalar::Number),
            Value::String(s) => s.trim().parse().ok().map(Scalar::Number),
            _ => None,
        },
        FieldType::Categorical | FieldType::Text => Some(Scalar::Text(match value {
            Value::String(s) => Cow::Borrowed(s.as_str()),
            other => Cow::Owned(other.to_string()),
        })),
        FieldType::Boolean => match value {
            Value::Bool(b) => Some(Scalar::Flag(*b)),
            Value::String(s) => parse_flag(s).map(Scalar::Flag),
            _ => None,
        },
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn compare(actual: &Scalar<'_>, literal: &str, field: &str, node: &str) -> Result<Option<Ordering>> {
    let mismatch = |kind: &str| Error::EvaluationError {
        node: node.to_string(),
        message: format!("field '{}' is {} but literal '{}' is not", field, kind, literal),
    };
    match actual {
        Scalar::Number(lhs) => {
            let rhs: f64 = literal.trim().parse().map_err(|_| mismatch("numeric"))?;
            Ok(lhs.partial_cmp(&rhs))
        }
        Scalar::Text(lhs) => Ok(Some((**lhs).cmp(literal))),
        Scalar::Flag(lhs) => {
            let rhs = parse_flag(literal).ok_or_else(|| mismatch("boolean"))?;
            Ok(Some(lhs.cmp(&rhs)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn fields() -> FieldTypes {
        FieldTypes::new()
            .with("temperature", FieldType::Numeric)
            .with("humidity", FieldType::Numeric)
            .with("x", FieldType::Numeric)
            .with("id", FieldType::Numeric)
            .with("a", FieldType::Numeric)
            .with("b", FieldType::Numeric)
            .with("outlook", FieldType::Text)
            .with("zip", FieldType::Text)
            .with("windy", FieldType::Boolean)
    }

    fn lt(field: &str, value: &str) -> Predicate {
        Predicate::simple(field, SimpleOperator::LessThan, value)
    }

    /// root
    /// ├── 1: temperature < 50   -> "cold"
    /// ├── 2: temperature < 80   -> "mild"
    /// └── 3: true               -> "hot"
    fn weather_tree() -> TreeModel {
        let mut tree = TreeModel::new("weather");
        let root = tree.add_root(Node::new("0").with_score("unknown")).unwrap();
        tree.add_child(
            root,
            Node::new("1")
                .with_predicate(lt("temperature", "50"))
                .with_score("cold"),
        )
        .unwrap();
        tree.add_child(
            root,
            Node::new("2")
                .with_predicate(lt("temperature", "80"))
                .with_score("mild"),
        )
        .unwrap();
        tree.add_child(
            root,
            Node::new("3")
                .with_predicate(Predicate::True)
                .with_score("hot"),
        )
        .unwrap();
        tree
    }

    fn score(tree: &TreeModel, record: Value) -> Option<String> {
        evaluate(tree, &fields(), &record).unwrap().and_then(|p| p.score)
    }

    #[rstest]
    #[case(json!({"temperature": 10}), "cold")]
    #[case(json!({"temperature": 60}), "mild")]
    #[case(json!({"temperature": 95}), "hot")]
    fn test_first_matching_child_wins(#[case] record: Value, #[case] expected: &str) {
        let tree = weather_tree();
        assert_eq!(score(&tree, record).as_deref(), Some(expected));
    }

    #[test]
    fn test_missing_value_is_not_a_match() {
        let tree = weather_tree();
        // Both comparisons are unknown, the catch-all sibling is taken.
        assert_eq!(score(&tree, json!({})).as_deref(), Some("hot"));
        assert_eq!(
            score(&tree, json!({"temperature": null})).as_deref(),
            Some("hot")
        );
    }

    #[test]
    fn test_missing_value_takes_declared_default_child() {
        let mut tree = TreeModel::new("weather");
        let root = tree
            .add_root(Node::new("0").with_default_child("2"))
            .unwrap();
        tree.add_child(
            root,
            Node::new("1")
                .with_predicate(lt("temperature", "50"))
                .with_score("cold"),
        )
        .unwrap();
        tree.add_child(
            root,
            Node::new("2")
                .with_predicate(Predicate::False)
                .with_score("fallback"),
        )
        .unwrap();

        assert_eq!(score(&tree, json!({})).as_deref(), Some("fallback"));
        assert_eq!(score(&tree, json!({"temperature": 99})), None);
    }

    #[test]
    fn test_null_prediction_strategy() {
        let mut tree = weather_tree();
        tree.missing_value_strategy = MissingValueStrategy::NullPrediction;
        assert_eq!(evaluate(&tree, &fields(), &json!({})).unwrap(), None);
    }

    #[test]
    fn test_last_prediction_strategy() {
        let mut tree = weather_tree();
        tree.missing_value_strategy = MissingValueStrategy::LastPrediction;
        let prediction = evaluate(&tree, &fields(), &json!({})).unwrap().unwrap();
        assert_eq!(prediction.node_id, "0");
        assert_eq!(prediction.score.as_deref(), Some("unknown"));
    }

    #[test]
    fn test_no_true_child_strategies() {
        let mut tree = TreeModel::new("partial");
        let root = tree.add_root(Node::new("0").with_score("parent")).unwrap();
        tree.add_child(
            root,
            Node::new("1")
                .with_predicate(lt("x", "0"))
                .with_score("negative"),
        )
        .unwrap();

        assert_eq!(score(&tree, json!({"x": 5})), None);

        tree.no_true_child_strategy = NoTrueChildStrategy::ReturnLastPrediction;
        assert_eq!(score(&tree, json!({"x": 5})).as_deref(), Some("parent"));
    }

    #[test]
    fn test_root_predicate_must_hold() {
        let mut tree = TreeModel::new("guarded");
        tree.add_root(
            Node::new("0")
                .with_predicate(Predicate::is_not_missing("id"))
                .with_score("ok"),
        )
        .unwrap();
        assert_eq!(score(&tree, json!({"id": 1})).as_deref(), Some("ok"));
        assert_eq!(score(&tree, json!({})), None);
    }

    #[rstest]
    #[case(BooleanOperator::And, json!({"a": 1, "b": 1}), Truth::True)]
    #[case(BooleanOperator::And, json!({"a": 1}), Truth::Unknown)]
    #[case(BooleanOperator::And, json!({"a": 9}), Truth::False)]
    #[case(BooleanOperator::Or, json!({"a": 1}), Truth::True)]
    #[case(BooleanOperator::Or, json!({"a": 9}), Truth::Unknown)]
    #[case(BooleanOperator::Or, json!({"a": 9, "b": 9}), Truth::False)]
    #[case(BooleanOperator::Xor, json!({"a": 1, "b": 1}), Truth::False)]
    #[case(BooleanOperator::Xor, json!({"a": 1, "b": 9}), Truth::True)]
    #[case(BooleanOperator::Xor, json!({"a": 1}), Truth::Unknown)]
    #[case(BooleanOperator::Surrogate, json!({"b": 9}), Truth::False)]
    #[case(BooleanOperator::Surrogate, json!({"a": 1, "b": 9}), Truth::True)]
    #[case(BooleanOperator::Surrogate, json!({}), Truth::Unknown)]
    fn test_compound_three_valued_logic(
        #[case] operator: BooleanOperator,
        #[case] record: Value,
        #[case] expected: Truth,
    ) {
        let predicate = Predicate::compound(operator, vec![lt("a", "5"), lt("b", "5")]);
        let record = record.as_object().unwrap().clone();
        assert_eq!(
            evaluate_predicate(&predicate, &fields(), &record, "n").unwrap(),
            expected
        );
    }

    #[test]
    fn test_set_and_text_predicates() {
        let record = json!({"outlook": "sunny", "windy": true})
            .as_object()
            .unwrap()
            .clone();
        let is_in = Predicate::set("outlook", SetOperator::IsIn, ["sunny", "overcast"]);
        let not_in = Predicate::set("outlook", SetOperator::IsNotIn, ["rain"]);
        let windy = Predicate::simple("windy", SimpleOperator::Equal, "true");
        let missing = Predicate::set("humidity", SetOperator::IsNotIn, ["1"]);

        assert_eq!(evaluate_predicate(&is_in, &fields(), &record, "n").unwrap(), Truth::True);
        assert_eq!(evaluate_predicate(&not_in, &fields(), &record, "n").unwrap(), Truth::True);
        assert_eq!(evaluate_predicate(&windy, &fields(), &record, "n").unwrap(), Truth::True);
        assert_eq!(
            evaluate_predicate(&missing, &fields(), &record, "n").unwrap(),
            Truth::Unknown
        );
    }

    #[test]
    fn test_non_numeric_literal_errors() {
        let record = json!({"a": 1}).as_object().unwrap().clone();
        let err = evaluate_predicate(&lt("a", "abc"), &fields(), &record, "7").unwrap_err();
        assert!(err.to_string().contains("node '7'"));
    }

    #[test]
    fn test_confidences_are_reported() {
        let mut tree = TreeModel::new("conf");
        tree.add_root(
            Node::new("0")
                .with_score("yes")
                .with_distribution("yes", 9.0)
                .with_distribution("no", 1.0),
        )
        .unwrap();
        let prediction = evaluate(&tree, &fields(), &json!({})).unwrap().unwrap();
        assert_eq!(prediction.confidences[0], ("yes".to_string(), 0.9));
    }

    #[test]
    fn test_non_object_record_errors() {
        let tree = weather_tree();
        assert!(evaluate(&tree, &fields(), &json!([1, 2])).is_err());
    }

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    #[test]
    fn test_text_field_compares_as_text() {
        let equal = Predicate::simple("zip", SimpleOperator::Equal, "501");
        assert_eq!(
            evaluate_predicate(&equal, &fields(), &record(json!({"zip": "00501"})), "n").unwrap(),
            Truth::False
        );
        assert_eq!(
            evaluate_predicate(&equal, &fields(), &record(json!({"zip": 501})), "n").unwrap(),
            Truth::True
        );
    }

    #[test]
    fn test_text_field_holding_number_against_word() {
        let predicate = Predicate::set("outlook", SetOperator::IsIn, ["sunny", "42"]);
        assert_eq!(
            evaluate_predicate(&predicate, &fields(), &record(json!({"outlook": 7})), "n").unwrap(),
            Truth::False
        );
        assert_eq!(
            evaluate_predicate(&predicate, &fields(), &record(json!({"outlook": 42})), "n")
                .unwrap(),
            Truth::True
        );
    }

    #[rstest]
    #[case(json!({"temperature": "45"}), Truth::True)]
    #[case(json!({"temperature": " 60 "}), Truth::False)]
    #[case(json!({"temperature": "warm"}), Truth::Unknown)]
    #[case(json!({"temperature": true}), Truth::Unknown)]
    fn test_numeric_field_coercion(#[case] value: Value, #[case] expected: Truth) {
        assert_eq!(
            evaluate_predicate(&lt("temperature", "50"), &fields(), &record(value), "n").unwrap(),
            expected
        );
    }

    #[test]
    fn test_unparseable_number_takes_missing_value_policy() {
        let mut tree = weather_tree();
        assert_eq!(
            score(&tree, json!({"temperature": "warm"})).as_deref(),
            Some("hot")
        );
        tree.missing_value_strategy = MissingValueStrategy::NullPrediction;
        assert_eq!(score(&tree, json!({"temperature": "warm"})), None);
    }

    #[rstest]
    #[case(json!({"windy": "TRUE"}), Truth::True)]
    #[case(json!({"windy": false}), Truth::False)]
    #[case(json!({"windy": "yes"}), Truth::Unknown)]
    #[case(json!({"windy": 1}), Truth::Unknown)]
    fn test_boolean_field_coercion(#[case] value: Value, #[case] expected: Truth) {
        let predicate = Predicate::simple("windy", SimpleOperator::Equal, "true");
        assert_eq!(
            evaluate_predicate(&predicate, &fields(), &record(value), "n").unwrap(),
            expected
        );
    }

    #[test]
    fn test_undeclared_field_errors() {
        let predicate = Predicate::simple("colour", SimpleOperator::Equal, "red");
        let err = evaluate_predicate(&predicate, &fields(), &record(json!({})), "3").unwrap_err();
        assert!(err.to_string().contains("field 'colour' is not declared"));
    }

    #[test]
    fn test_ordering_a_boolean_field_errors() {
        let predicate = Predicate::simple("windy", SimpleOperator::LessThan, "true");
        let err = evaluate_predicate(&predicate, &fields(), &record(json!({"windy": true})), "n")
            .unwrap_err();
        assert!(err.to_string().contains("cannot be ordered"));
    }
}
