//! Template binding
//!
//! A skeleton unit is a small typed syntax tree of the class every compiled
//! tree is generated from. Binding never touches the skeleton it is given:
//! each call returns a fresh tree with the insertion points filled in, so
//! one skeleton can be shared by concurrent compilations.
//!
//! The constructor is the main insertion point. Binding rewrites its
//! `super(...)` call to pass the model name, the contributing field names
//! and the algorithm, then assigns the target field and clears the model
//! kind placeholder:
//!
//! ```text
//! public GolfTree() {
//!     super("golf tree", Collections.emptyList(), "CART");
//!     targetField = "whatIdo";
//!     pmmlMODEL = null;
//! }
//! ```

use std::fmt;

use treeforge_core::TreeModel;

use crate::error::{Error, Result};
use crate::naming::{avoid_clash, class_name, java_string};

const TARGET_FIELD: &str = "targetField";
const MODEL_KIND: &str = "pmmlMODEL";

/// Expression that can appear in a skeleton statement
#[derive(Debug, Clone, PartialEq)]
pub enum JavaExpr {
    /// String literal
    Str(String),
    /// `null`
    Null,
    /// Bare identifier
    Name(String),
    /// List of string literals
    StringList(Vec<String>),
}

impl fmt::Display for JavaExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JavaExpr::Str(s) => f.write_str(&java_string(s)),
            JavaExpr::Null => f.write_str("null"),
            JavaExpr::Name(n) => f.write_str(n),
            JavaExpr::StringList(items) if items.is_empty() => {
                f.write_str("Collections.emptyList()")
            }
            JavaExpr::StringList(items) => {
                let items: Vec<String> = items.iter().map(|i| java_string(i)).collect();
                write!(f, "Arrays.asList({})", items.join(", "))
            }
        }
    }
}

/// Constructor statement
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `super(args);`
    SuperCall(Vec<JavaExpr>),
    /// `target = value;`
    Assign {
        /// Assigned attribute
        target: String,
        /// Assigned value
        value: JavaExpr,
    },
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::SuperCall(args) => {
                let args: Vec<String> = args.iter().map(ToString::to_string).collect();
                write!(f, "super({});", args.join(", "))
            }
            Statement::Assign { target, value } => write!(f, "{} = {};", target, value),
        }
    }
}

/// Public no-argument constructor
#[derive(Debug, Clone, PartialEq)]
pub struct ConstructorDecl {
    /// Constructor (and class) simple name
    pub name: String,
    /// Statements in order
    pub body: Vec<Statement>,
}

impl ConstructorDecl {
    fn assignment_mut(&mut self, target: &str) -> Result<&mut JavaExpr> {
        self.body
            .iter_mut()
            .find_map(|s| match s {
                Statement::Assign { target: t, value } if t == target => Some(value),
                _ => None,
            })
            .ok_or_else(|| Error::TemplateError {
                message: format!("constructor of '{}' never assigns '{}'", self.name, target),
            })
    }
}

impl fmt::Display for ConstructorDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "public {}() {{", self.name)?;
        for statement in &self.body {
            writeln!(f, "    {}", statement)?;
        }
        f.write_str("}")
    }
}

/// Skeleton of a generated unit
#[derive(Debug, Clone, PartialEq)]
pub struct UnitSkeleton {
    /// Imported types
    pub imports: Vec<String>,
    /// Class simple name
    pub class_name: String,
    /// Superclass simple name
    pub extends: Option<String>,
    /// The constructor insertion point
    pub constructor: ConstructorDecl,
}

impl UnitSkeleton {
    /// Skeleton for tree model units
    pub fn tree_model() -> Self {
        let class_name = "TreeModelTemplate".to_string();
        Self {
            imports: vec![
                "java.util.Arrays".to_string(),
                "java.util.Collections".to_string(),
                "java.util.LinkedHashMap".to_string(),
                "java.util.Map".to_string(),
                "org.treeforge.runtime.TreeScoringUnit".to_string(),
            ],
            extends: Some("TreeScoringUnit".to_string()),
            constructor: ConstructorDecl {
                name: class_name.clone(),
                body: vec![
                    Statement::SuperCall(vec![
                        JavaExpr::Name("name".to_string()),
                        JavaExpr::StringList(Vec::new()),
                        JavaExpr::Name("algorithmName".to_string()),
                    ]),
                    Statement::Assign {
                        target: TARGET_FIELD.to_string(),
                        value: JavaExpr::Name(TARGET_FIELD.to_string()),
                    },
                    Statement::Assign {
                        target: MODEL_KIND.to_string(),
                        value: JavaExpr::Null,
                    },
                ],
            },
            class_name,
        }
    }
}

impl Default for UnitSkeleton {
    fn default() -> Self {
        Self::tree_model()
    }
}

/// Model metadata injected into the skeleton
#[derive(Debug, Clone, PartialEq)]
pub struct ModelMetadata {
    /// Model name
    pub model_name: String,
    /// Names of the fields contributed by the model's local transformations
    pub contributing_fields: Vec<String>,
    /// Algorithm identifier
    pub algorithm_name: Option<String>,
    /// Predicted field
    pub target_field: Option<String>,
}

impl ModelMetadata {
    /// Metadata of a tree model
    pub fn from_tree(tree: &TreeModel) -> Self {
        Self {
            model_name: tree.model_name.clone(),
            contributing_fields: tree
                .local_transformations
                .iter()
                .map(|f| f.name.clone())
                .collect(),
            algorithm_name: tree.algorithm_name.clone(),
            target_field: tree.target_field().map(String::from),
        }
    }
}

/// Skeleton with every insertion point filled in
#[derive(Debug, Clone, PartialEq)]
pub struct BoundTemplate {
    unit: UnitSkeleton,
}

impl BoundTemplate {
    /// Generated class simple name
    pub fn class_name(&self) -> &str {
        &self.unit.class_name
    }

    /// Imported types
    pub fn imports(&self) -> &[String] {
        &self.unit.imports
    }

    /// Superclass
    pub fn extends(&self) -> Option<&str> {
        self.unit.extends.as_deref()
    }

    /// Bound constructor
    pub fn constructor(&self) -> &ConstructorDecl {
        &self.unit.constructor
    }
}

/// Rename `constructor` to `simple_name` and rewrite its `super(...)` call
/// with the model name, contributing fields and algorithm of `metadata`.
pub fn set_super_invocation(
    metadata: &ModelMetadata,
    constructor: &ConstructorDecl,
    simple_name: &str,
) -> Result<ConstructorDecl> {
    let mut bound = constructor.clone();
    bound.name = simple_name.to_string();

    let args = bound
        .body
        .iter_mut()
        .find_map(|s| match s {
            Statement::SuperCall(args) => Some(args),
            _ => None,
        })
        .ok_or_else(|| Error::TemplateError {
            message: format!("constructor of '{}' has no super invocation", constructor.name),
        })?;

    *args = vec![
        JavaExpr::Str(metadata.model_name.clone()),
        JavaExpr::StringList(metadata.contributing_fields.clone()),
        metadata
            .algorithm_name
            .clone()
            .map_or(JavaExpr::Null, JavaExpr::Str),
    ];
    Ok(bound)
}

/// Bind `skeleton` with `metadata`, returning a new unit
pub fn bind(skeleton: &UnitSkeleton, metadata: &ModelMetadata) -> Result<BoundTemplate> {
    let imported = skeleton
        .imports
        .iter()
        .filter_map(|import| import.rsplit('.').next())
        .chain(skeleton.extends.as_deref());
    let class_name = avoid_clash(class_name(&metadata.model_name), imported);
    let mut constructor = set_super_invocation(metadata, &skeleton.constructor, &class_name)?;

    *constructor.assignment_mut(TARGET_FIELD)? = metadata
        .target_field
        .clone()
        .map_or(JavaExpr::Null, JavaExpr::Str);
    *constructor.assignment_mut(MODEL_KIND)? = JavaExpr::Null;

    tracing::debug!(
        "Bound template '{}' as '{}'",
        skeleton.class_name,
        class_name
    );

    Ok(BoundTemplate {
        unit: UnitSkeleton {
            imports: skeleton.imports.clone(),
            class_name,
            extends: skeleton.extends.clone(),
            constructor,
        },
    })
}
