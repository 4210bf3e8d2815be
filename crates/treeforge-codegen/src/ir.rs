//! Intermediate representation of a compiled tree
//!
//! The AST is an easier shape to generate code from than the arena tree:
//! every predicate is already typed against the field map, literals are
//! converted, and node ids are resolved to indices. It is built once by
//! [`crate::builder::build`] and never changed afterwards.

use std::fmt;

use treeforge_core::model::{MissingValueStrategy, NoTrueChildStrategy};
use treeforge_core::NodeId;

use crate::naming::{java_double, java_string};
use crate::resolver::GeneratedType;

/// Intermediate representation of one tree model
#[derive(Debug, Clone, PartialEq)]
pub struct TreeAst {
    pub(crate) model_name: String,
    pub(crate) rules: Vec<TreeRule>,
    pub(crate) branches: Vec<Branch>,
    pub(crate) guards: Vec<Expr>,
    pub(crate) policy: SelectionPolicy,
}

impl TreeAst {
    /// Name of the source model
    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// One rule per root-to-leaf path, depth-first in declaration order
    pub fn rules(&self) -> &[TreeRule] {
        &self.rules
    }

    /// Every tree node, indexed like the source arena
    pub fn branches(&self) -> &[Branch] {
        &self.branches
    }

    /// Branch for a node
    pub fn branch(&self, id: NodeId) -> Option<&Branch> {
        self.branches.get(id.index())
    }

    /// Root branch
    pub fn root(&self) -> Option<&Branch> {
        self.branches.first()
    }

    /// Extra constraints every rule is guarded by
    pub fn guards(&self) -> &[Expr] {
        &self.guards
    }

    /// Selection policy
    pub fn policy(&self) -> SelectionPolicy {
        self.policy
    }

    /// Whether the AST has no rules
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

/// How children are selected when predicates are unknown or all false
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SelectionPolicy {
    /// Unknown sibling predicate handling
    pub missing_value: MissingValueStrategy,
    /// No matching child handling
    pub no_true_child: NoTrueChildStrategy,
}

/// A condition → outcome rule derived from one root-to-leaf path
#[derive(Debug, Clone, PartialEq)]
pub struct TreeRule {
    /// Name derived from the path, e.g. `_0_1_3`
    pub name: String,
    /// Nodes from the root to the leaf
    pub path: Vec<NodeId>,
    /// One condition per predicate on the path, root first
    pub conditions: Vec<Condition>,
    /// Extra constraints
    pub guards: Vec<Expr>,
    /// Leaf outcome
    pub outcome: Outcome,
}

/// Translated predicate of one node on a rule path
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// Node carrying the predicate
    pub node: NodeId,
    /// Document id of that node
    pub node_id: String,
    /// Typed expression
    pub expr: Expr,
}

/// Result of stopping at a node
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// Node index
    pub node: NodeId,
    /// Document id
    pub node_id: String,
    /// Score literal
    pub score: Literal,
    /// Confidence per label, in declaration order
    pub confidences: Vec<(String, f64)>,
}

/// One tree node as seen by the emitter
#[derive(Debug, Clone, PartialEq)]
pub struct Branch {
    /// Node index
    pub node: NodeId,
    /// Document id
    pub node_id: String,
    /// Entry condition; `None` means always enter
    pub condition: Option<Expr>,
    /// Outcome when evaluation stops here
    pub outcome: Option<Outcome>,
    /// Children in declaration order
    pub children: Vec<NodeId>,
    /// Child taken when a sibling predicate is unknown
    pub default_child: Option<NodeId>,
}

impl Branch {
    /// Whether the node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
        }
    }

    fn helper(self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Ne => "ne",
            CompareOp::Lt => "lt",
            CompareOp::Le => "le",
            CompareOp::Gt => "gt",
            CompareOp::Ge => "ge",
        }
    }
}

/// Literal converted to a field's generated type
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Numeric literal
    Number(f64),
    /// Text literal
    Text(String),
    /// Boolean literal
    Bool(bool),
}

impl Literal {
    /// Java source for the literal
    pub fn java(&self) -> String {
        match self {
            Literal::Number(n) => java_double(*n),
            Literal::Text(s) => java_string(s),
            Literal::Bool(b) => b.to_string(),
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Number(n) => write!(f, "{}", n),
            Literal::Text(s) => write!(f, "{:?}", s),
            Literal::Bool(b) => write!(f, "{}", b),
        }
    }
}

/// Typed three-valued boolean expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Field compared against a literal; unknown when the field is missing
    Compare {
        /// Field name
        field: String,
        /// Operator
        op: CompareOp,
        /// Generated type of the field
        ty: GeneratedType,
        /// Converted literal
        literal: Literal,
    },
    /// Field has no value (two-valued)
    IsMissing(String),
    /// Field has a value (two-valued)
    IsNotMissing(String),
    /// Set membership; unknown when the field is missing
    In {
        /// Field name
        field: String,
        /// Generated type of the field
        ty: GeneratedType,
        /// Converted literals
        values: Vec<Literal>,
        /// `isNotIn`
        negated: bool,
    },
    /// False dominates, then unknown
    And(Vec<Expr>),
    /// True dominates, then unknown
    Or(Vec<Expr>),
    /// Unknown if any operand is unknown, else parity
    Xor(Vec<Expr>),
    /// First operand that is not unknown
    Surrogate(Vec<Expr>),
    /// Constant
    Const(bool),
}

impl Expr {
    /// Java expression of type `Boolean` (null is unknown) over `requestData`
    pub fn java(&self) -> String {
        match self {
            Expr::Compare {
                field,
                op,
                ty,
                literal,
            } => format!("{}({}, {})", op.helper(), accessor(field, *ty), literal.java()),
            Expr::IsMissing(field) => format!("isMissing(requestData, {})", java_string(field)),
            Expr::IsNotMissing(field) => {
                format!("isNotMissing(requestData, {})", java_string(field))
            }
            Expr::In {
                field,
                ty,
                values,
                negated,
            } => {
                let helper = if *negated { "isNotIn" } else { "isIn" };
                let mut args = vec![accessor(field, *ty)];
                args.extend(values.iter().map(Literal::java));
                format!("{}({})", helper, args.join(", "))
            }
            Expr::And(ops) => call("and", ops),
            Expr::Or(ops) => call("or", ops),
            Expr::Xor(ops) => call("xor", ops),
            Expr::Surrogate(ops) => call("surrogate", ops),
            Expr::Const(true) => "Boolean.TRUE".to_string(),
            Expr::Const(false) => "Boolean.FALSE".to_string(),
        }
    }

    /// Fields read by the expression, in first-use order
    pub fn fields(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_fields(&mut out);
        out
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expr::Compare { field, .. }
            | Expr::IsMissing(field)
            | Expr::IsNotMissing(field)
            | Expr::In { field, .. } => {
                if !out.contains(&field.as_str()) {
                    out.push(field);
                }
            }
            Expr::And(ops) | Expr::Or(ops) | Expr::Xor(ops) | Expr::Surrogate(ops) => {
                for op in ops {
                    op.collect_fields(out);
                }
            }
            Expr::Const(_) => {}
        }
    }
}

fn accessor(field: &str, ty: GeneratedType) -> String {
    let getter = match ty {
        GeneratedType::Double => "number",
        GeneratedType::String => "text",
        GeneratedType::Boolean => "flag",
    };
    format!("{}(requestData, {})", getter, java_string(field))
}

fn call(helper: &str, ops: &[Expr]) -> String {
    let args: Vec<String> = ops.iter().map(Expr::java).collect();
    format!("{}({})", helper, args.join(", "))
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Compare {
                field, op, literal, ..
            } => write!(f, "{} {} {}", field, op.symbol(), literal),
            Expr::IsMissing(field) => write!(f, "{} is missing", field),
            Expr::IsNotMissing(field) => write!(f, "{} is not missing", field),
            Expr::In {
                field,
                values,
                negated,
                ..
            } => {
                let values: Vec<String> = values.iter().map(ToString::to_string).collect();
                let op = if *negated { "not in" } else { "in" };
                write!(f, "{} {} ({})", field, op, values.join(", "))
            }
            Expr::And(ops) => join(f, "and", ops),
            Expr::Or(ops) => join(f, "or", ops),
            Expr::Xor(ops) => join(f, "xor", ops),
            Expr::Surrogate(ops) => join(f, "surrogate", ops),
            Expr::Const(b) => write!(f, "{}", b),
        }
    }
}

fn join(f: &mut fmt::Formatter<'_>, name: &str, ops: &[Expr]) -> fmt::Result {
    let parts: Vec<String> = ops.iter().map(ToString::to_string).collect();
    write!(f, "{}({})", name, parts.join(", "))
}

impl fmt::Display for TreeRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut terms: Vec<String> = self.guards.iter().map(ToString::to_string).collect();
        terms.extend(self.conditions.iter().map(|c| c.expr.to_string()));
        let when = if terms.is_empty() {
            "true".to_string()
        } else {
            terms.join(" && ")
        };
        write!(f, "{}: {} -> {}", self.name, when, self.outcome.score)
    }
}
