//! Generated source map

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Fully-qualified unit name → complete source text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedSourceMap {
    units: BTreeMap<String, String>,
}

impl GeneratedSourceMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a unit, returning the source it replaced
    pub fn insert(&mut self, name: impl Into<String>, source: impl Into<String>) -> Option<String> {
        self.units.insert(name.into(), source.into())
    }

    /// Source of one unit
    pub fn get(&self, name: &str) -> Option<&str> {
        self.units.get(name).map(String::as_str)
    }

    /// Number of units
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Whether the map has no units
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Units ordered by name
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.units.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// SHA-256 over every unit name and source, hex encoded
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        for (name, source) in &self.units {
            hasher.update(name.as_bytes());
            hasher.update([0u8]);
            hasher.update(source.as_bytes());
            hasher.update([0u8]);
        }
        hex::encode(hasher.finalize())
    }
}

impl IntoIterator for GeneratedSourceMap {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.units.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_same_for_identical() {
        let mut a = GeneratedSourceMap::new();
        a.insert("org.example.A", "class A {}");
        let b = a.clone();
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_fingerprint_changes_with_source() {
        let mut a = GeneratedSourceMap::new();
        a.insert("org.example.A", "class A {}");
        let mut b = GeneratedSourceMap::new();
        b.insert("org.example.A", "class A { }");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_name_and_source_boundary_matters() {
        let mut a = GeneratedSourceMap::new();
        a.insert("ab", "c");
        let mut b = GeneratedSourceMap::new();
        b.insert("a", "bc");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_insert_replaces() {
        let mut map = GeneratedSourceMap::new();
        assert!(map.insert("x.A", "one").is_none());
        assert_eq!(map.insert("x.A", "two").as_deref(), Some("one"));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("x.A"), Some("two"));
    }
}
