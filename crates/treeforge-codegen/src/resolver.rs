//! Field type resolution
//!
//! Merges the three field layers into one [`FieldTypeMap`]:
//!
//! 1. the data dictionary,
//! 2. the transformation dictionary,
//! 3. the model's local transformations.
//!
//! Each pass is a last-writer-wins merge into an ordered map. Only a local
//! transformation may replace an existing entry, and only a derived one;
//! every other collision is an error. Once the layers are merged, every
//! dependency of a derived field must name a field in the map and the
//! dependency graph must be acyclic.

use indexmap::IndexMap;
use std::collections::HashSet;
use std::fmt;

use treeforge_core::fields::{DataField, DerivedField, FieldType};

use crate::error::{Error, Result};

/// Representation type used by the generated code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneratedType {
    /// Boxed floating point
    Double,
    /// Text
    String,
    /// Boxed boolean
    Boolean,
}

impl GeneratedType {
    /// Java type name
    pub fn java_name(self) -> &'static str {
        match self {
            GeneratedType::Double => "Double",
            GeneratedType::String => "String",
            GeneratedType::Boolean => "Boolean",
        }
    }
}

impl From<FieldType> for GeneratedType {
    fn from(ty: FieldType) -> Self {
        match ty {
            FieldType::Numeric => GeneratedType::Double,
            FieldType::Categorical | FieldType::Text => GeneratedType::String,
            FieldType::Boolean => GeneratedType::Boolean,
        }
    }
}

impl fmt::Display for GeneratedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.java_name())
    }
}

/// Which layer a field comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldOrigin {
    /// Data dictionary
    Data,
    /// Transformation dictionary
    Derived,
    /// Model-local transformation
    Local,
}

/// Resolved type information for one field
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedField {
    /// Declared type
    pub original: FieldType,
    /// Type used by generated code
    pub generated: GeneratedType,
    /// Layer the winning definition comes from
    pub origin: FieldOrigin,
    /// Fields read by the defining expression
    pub dependencies: Vec<String>,
}

/// Field name → resolved type, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldTypeMap {
    fields: IndexMap<String, ResolvedField>,
}

impl FieldTypeMap {
    /// Look a field up
    pub fn get(&self, name: &str) -> Option<&ResolvedField> {
        self.fields.get(name)
    }

    /// Whether the field is known
    pub fn contains_key(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field names in declaration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Entries in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResolvedField)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Merge the three field layers into a [`FieldTypeMap`]
pub fn resolve(
    data_dictionary: &[DataField],
    derived_dictionary: &[DerivedField],
    local_transformations: &[DerivedField],
) -> Result<FieldTypeMap> {
    let mut map = FieldTypeMap::default();

    let mut seen = HashSet::new();
    for field in data_dictionary {
        reject_duplicate(&mut seen, &field.name, "data dictionary")?;
        let original = parse_type(&field.name, &field.data_type)?;
        map.fields.insert(
            field.name.clone(),
            ResolvedField {
                original,
                generated: original.into(),
                origin: FieldOrigin::Data,
                dependencies: Vec::new(),
            },
        );
    }

    overlay(
        &mut map,
        derived_dictionary,
        FieldOrigin::Derived,
        "transformation dictionary",
    )?;
    overlay(
        &mut map,
        local_transformations,
        FieldOrigin::Local,
        "local transformations",
    )?;

    check_dependencies(&map)?;
    check_cycles(&map)?;

    tracing::debug!(
        "Resolved {} fields ({} data, {} derived, {} local)",
        map.len(),
        data_dictionary.len(),
        derived_dictionary.len(),
        local_transformations.len()
    );
    Ok(map)
}

fn overlay(
    map: &mut FieldTypeMap,
    fields: &[DerivedField],
    origin: FieldOrigin,
    layer: &str,
) -> Result<()> {
    let mut seen = HashSet::new();
    for field in fields {
        reject_duplicate(&mut seen, &field.name, layer)?;

        if let Some(existing) = map.fields.get(&field.name) {
            let may_shadow =
                origin == FieldOrigin::Local && existing.origin == FieldOrigin::Derived;
            if !may_shadow {
                return Err(Error::TypeResolutionError {
                    field: field.name.clone(),
                    message: format!(
                        "{} entry collides with a field from the {}",
                        layer,
                        layer_name(existing.origin)
                    ),
                });
            }
            tracing::debug!("Local transformation '{}' shadows derived field", field.name);
        }

        let original = parse_type(&field.name, &field.data_type)?;
        map.fields.insert(
            field.name.clone(),
            ResolvedField {
                original,
                generated: original.into(),
                origin,
                dependencies: field.dependencies().into_iter().map(String::from).collect(),
            },
        );
    }
    Ok(())
}

fn reject_duplicate(seen: &mut HashSet<String>, name: &str, layer: &str) -> Result<()> {
    if seen.insert(name.to_string()) {
        Ok(())
    } else {
        Err(Error::TypeResolutionError {
            field: name.to_string(),
            message: format!("defined more than once in the {}", layer),
        })
    }
}

fn parse_type(name: &str, declared: &str) -> Result<FieldType> {
    declared
        .parse::<FieldType>()
        .map_err(|message| Error::TypeResolutionError {
            field: name.to_string(),
            message,
        })
}

fn layer_name(origin: FieldOrigin) -> &'static str {
    match origin {
        FieldOrigin::Data => "data dictionary",
        FieldOrigin::Derived => "transformation dictionary",
        FieldOrigin::Local => "local transformations",
    }
}

fn check_dependencies(map: &FieldTypeMap) -> Result<()> {
    for (name, field) in map.iter() {
        if let Some(missing) = field.dependencies.iter().find(|d| !map.contains_key(d)) {
            return Err(Error::TypeResolutionError {
                field: name.to_string(),
                message: format!("depends on undefined field '{}'", missing),
            });
        }
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

fn check_cycles(map: &FieldTypeMap) -> Result<()> {
    let mut marks = vec![Mark::Unvisited; map.len()];
    let mut stack = Vec::new();
    for index in 0..map.len() {
        visit(map, index, &mut marks, &mut stack)?;
    }
    Ok(())
}

fn visit(
    map: &FieldTypeMap,
    index: usize,
    marks: &mut [Mark],
    stack: &mut Vec<usize>,
) -> Result<()> {
    match marks[index] {
        Mark::Done => return Ok(()),
        Mark::InProgress => {
            let start = stack.iter().position(|i| *i == index).unwrap_or(0);
            let mut cycle: Vec<&str> = stack[start..]
                .iter()
                .filter_map(|i| map.fields.get_index(*i).map(|(k, _)| k.as_str()))
                .collect();
            let name = map
                .fields
                .get_index(index)
                .map(|(k, _)| k.as_str())
                .unwrap_or_default();
            cycle.push(name);
            return Err(Error::TypeResolutionError {
                field: name.to_string(),
                message: format!("dependency cycle: {}", cycle.join(" -> ")),
            });
        }
        Mark::Unvisited => {}
    }

    marks[index] = Mark::InProgress;
    stack.push(index);
    if let Some((_, field)) = map.fields.get_index(index) {
        for dep in &field.dependencies {
            if let Some(dep_index) = map.fields.get_index_of(dep) {
                visit(map, dep_index, marks, stack)?;
            }
        }
    }
    stack.pop();
    marks[index] = Mark::Done;
    Ok(())
}
