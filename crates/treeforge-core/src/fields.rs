//! Field dictionaries
//!
//! A model sees three layers of fields:
//!
//! - the data dictionary (raw input fields),
//! - the transformation dictionary (globally derived fields),
//! - the model's local transformations (derived fields private to one model).
//!
//! Declared types are kept exactly as written in the document. They are only
//! interpreted when the codegen resolver merges the layers, so an unknown type
//! name surfaces as a resolution failure rather than a parse failure.
//!
//! # Example
//!
//! ```yaml
//! data_dictionary:
//!   - name: temperature
//!     data_type: double
//!   - name: outlook
//!     data_type: string
//!
//! transformation_dictionary:
//!   - name: temperature_f
//!     data_type: double
//!     expression:
//!       apply: "*"
//!       arguments:
//!         - field: temperature
//!         - constant: 1.8
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Primitive type a field is declared with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// Integers and floating point values
    Numeric,
    /// Values drawn from a closed set of labels
    Categorical,
    /// Free text
    Text,
    /// `true` / `false`
    Boolean,
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "numeric" | "integer" | "float" | "double" | "continuous" => Ok(FieldType::Numeric),
            "categorical" | "ordinal" => Ok(FieldType::Categorical),
            "text" | "string" => Ok(FieldType::Text),
            "boolean" => Ok(FieldType::Boolean),
            other => Err(format!("unrecognized data type '{}'", other)),
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::Numeric => "numeric",
            FieldType::Categorical => "categorical",
            FieldType::Text => "text",
            FieldType::Boolean => "boolean",
        };
        f.write_str(name)
    }
}

/// An input field from the data dictionary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataField {
    /// Field name (unique within the dictionary)
    pub name: String,

    /// Declared type as written in the document
    pub data_type: String,

    /// Allowed values for categorical fields
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl DataField {
    /// Create a data field with the given declared type
    pub fn new(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            values: Vec::new(),
        }
    }
}

/// A computed field, either global or local to a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedField {
    /// Field name
    pub name: String,

    /// Declared type as written in the document
    pub data_type: String,

    /// Defining expression
    pub expression: Expression,
}

impl DerivedField {
    /// Create a derived field
    pub fn new(
        name: impl Into<String>,
        data_type: impl Into<String>,
        expression: Expression,
    ) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            expression,
        }
    }

    /// Names of the fields this definition reads, in first-use order
    pub fn dependencies(&self) -> Vec<&str> {
        let mut deps = Vec::new();
        self.expression.collect_fields(&mut deps);
        deps
    }
}

/// Expression defining a derived field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expression {
    /// Reference to another field
    FieldRef {
        /// Referenced field name
        field: String,
    },

    /// Literal value
    Constant {
        /// The value
        constant: serde_json::Value,
    },

    /// Function application (`+`, `*`, `if`, ...)
    Apply {
        /// Function name
        apply: String,
        /// Arguments, evaluated left to right
        #[serde(default)]
        arguments: Vec<Expression>,
    },
}

impl Expression {
    /// Shorthand for a field reference
    pub fn field(name: impl Into<String>) -> Self {
        Expression::FieldRef { field: name.into() }
    }

    /// Shorthand for a constant
    pub fn constant(value: impl Into<serde_json::Value>) -> Self {
        Expression::Constant {
            constant: value.into(),
        }
    }

    /// Shorthand for a function application
    pub fn apply(function: impl Into<String>, arguments: Vec<Expression>) -> Self {
        Expression::Apply {
            apply: function.into(),
            arguments,
        }
    }

    fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Expression::FieldRef { field } => {
                if !out.contains(&field.as_str()) {
                    out.push(field);
                }
            }
            Expression::Constant { .. } => {}
            Expression::Apply { arguments, .. } => {
                for arg in arguments {
                    arg.collect_fields(out);
                }
            }
        }
    }
}

/// Parsed type of every field a model can read
///
/// Layers are applied in order, so local transformations shadow derived
/// fields and derived fields shadow data fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTypes(HashMap<String, FieldType>);

impl FieldTypes {
    /// Empty set of field types
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect the types of the three dictionary layers of `model`
    pub fn from_dictionaries(
        model: &str,
        data: &[DataField],
        derived: &[DerivedField],
        local: &[DerivedField],
    ) -> Result<Self> {
        let declared = data
            .iter()
            .map(|f| (&f.name, &f.data_type))
            .chain(derived.iter().map(|f| (&f.name, &f.data_type)))
            .chain(local.iter().map(|f| (&f.name, &f.data_type)));

        let mut types = Self::new();
        for (name, data_type) in declared {
            let ty = data_type.parse().map_err(|message| Error::InvalidModel {
                model: model.to_string(),
                message: format!("field '{}': {}", name, message),
            })?;
            types.insert(name.clone(), ty);
        }
        Ok(types)
    }

    /// Set the type of a field
    pub fn insert(&mut self, name: impl Into<String>, ty: FieldType) {
        self.0.insert(name.into(), ty);
    }

    /// Builder form of [`FieldTypes::insert`]
    pub fn with(mut self, name: impl Into<String>, ty: FieldType) -> Self {
        self.insert(name, ty);
        self
    }

    /// Type of a field, if declared
    pub fn get(&self, name: &str) -> Option<FieldType> {
        self.0.get(name).copied()
    }
}
