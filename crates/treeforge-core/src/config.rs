//! Configuration parsing and validation
//!
//! This module handles loading treeforge project configuration.
//!
//! # Configuration Files
//!
//! - `treeforge.yaml` - Project root configuration
//! - `models/**/*.yaml` - Model documents (`.yml` and `.json` are accepted too)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::document::ModelDocument;
use crate::error::{Error, Result};

/// Root project configuration from `treeforge.yaml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    /// Project name
    pub name: String,

    /// Project version
    #[serde(default = "default_version")]
    pub version: String,

    /// Package the generated units are placed in
    #[serde(default = "default_package_name")]
    pub package_name: String,

    /// Directory holding model documents, relative to the project root
    #[serde(default = "default_models_dir")]
    pub models_dir: String,

    /// Directory generated sources are written to, relative to the project root
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
}

fn default_version() -> String {
    "0.1.0".to_string()
}

fn default_package_name() -> String {
    "org.treeforge.generated".to_string()
}

fn default_models_dir() -> String {
    "models".to_string()
}

fn default_output_dir() -> String {
    "generated".to_string()
}

/// Main configuration container
#[derive(Debug, Clone)]
pub struct Config {
    /// Project configuration
    pub project: ProjectConfig,

    /// Base path of the project
    pub base_path: PathBuf,
}

impl Config {
    /// Load configuration from a directory
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the project directory or treeforge.yaml file
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// let config = Config::load("./my-project")?;
    /// println!("Package: {}", config.project.package_name);
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let (config_path, base_path) = if path.is_dir() {
            (path.join("treeforge.yaml"), path.to_path_buf())
        } else {
            (
                path.to_path_buf(),
                path.parent().unwrap_or(Path::new(".")).to_path_buf(),
            )
        };

        if !config_path.exists() {
            return Err(Error::ConfigNotFound {
                path: config_path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(&config_path)?;
        let project: ProjectConfig = serde_yaml::from_str(&contents)?;
        validate_package_name(&project.package_name)?;

        Ok(Self { project, base_path })
    }

    /// Absolute models directory
    pub fn models_dir(&self) -> PathBuf {
        self.base_path.join(&self.project.models_dir)
    }

    /// Absolute output directory
    pub fn output_dir(&self) -> PathBuf {
        self.base_path.join(&self.project.output_dir)
    }

    /// Model document files under the models directory, sorted by path
    pub fn model_paths(&self) -> Result<Vec<PathBuf>> {
        Ok(find_model_documents(&self.models_dir()))
    }

    /// Load all model documents from the models directory
    pub fn load_models(&self) -> Result<Vec<ModelDocument>> {
        self.model_paths()?
            .iter()
            .map(ModelDocument::load)
            .collect()
    }

    /// Load one model document by model name
    pub fn load_model(&self, name: &str) -> Result<ModelDocument> {
        self.load_models()?
            .into_iter()
            .find(|doc| doc.name() == name)
            .ok_or_else(|| Error::ConfigInvalid {
                message: format!(
                    "model '{}' not found in {}",
                    name,
                    self.models_dir().display()
                ),
            })
    }
}

/// Model document files anywhere under `dir`, sorted by path
///
/// A missing directory yields no documents.
pub fn find_model_documents(dir: &Path) -> Vec<PathBuf> {
    let mut paths: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| is_model_document(p))
        .collect();
    paths.sort();
    paths
}

/// Whether a path looks like a model document
pub fn is_model_document(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .is_some_and(|ext| ext == "yaml" || ext == "yml" || ext == "json")
}

fn validate_package_name(package: &str) -> Result<()> {
    let valid = !package.is_empty()
        && package.split('.').all(|segment| {
            let mut chars = segment.chars();
            chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        });
    if valid {
        Ok(())
    } else {
        Err(Error::ConfigInvalid {
            message: format!("package name '{}' is not a valid dotted identifier", package),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MODEL: &str = r#"
tree_model:
  model_name: Small
  node:
    id: "0"
    score: yes
"#;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
name: test-project
"#;
        let config: ProjectConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.name, "test-project");
        assert_eq!(config.version, "0.1.0");
        assert_eq!(config.package_name, "org.treeforge.generated");
        assert_eq!(config.models_dir, "models");
        assert_eq!(config.output_dir, "generated");
    }

    #[test]
    fn test_parse_full_config() {
        let yaml = r#"
name: test-project
version: "1.0.0"
package_name: com.example.scoring
models_dir: trees
output_dir: out/java
"#;
        let config: ProjectConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.version, "1.0.0");
        assert_eq!(config.package_name, "com.example.scoring");
        assert_eq!(config.models_dir, "trees");
    }

    #[test]
    fn test_load_missing_config() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound { .. }));
    }

    #[test]
    fn test_invalid_package_name_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("treeforge.yaml"),
            "name: test\npackage_name: com..bad\n",
        )
        .unwrap();
        let err = Config::load(dir.path()).unwrap_err();
        assert!(err.to_string().contains("com..bad"));
    }

    #[test]
    fn test_load_models_from_dir() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("models")).unwrap();
        std::fs::write(dir.path().join("treeforge.yaml"), "name: test\n").unwrap();
        std::fs::write(dir.path().join("models/b.yaml"), MODEL).unwrap();
        std::fs::write(
            dir.path().join("models/a.json"),
            r#"{"tree_model": {"model_name": "Json", "node": {"score": "x"}}}"#,
        )
        .unwrap();
        std::fs::write(dir.path().join("models/notes.txt"), "ignored").unwrap();

        let config = Config::load(dir.path()).unwrap();
        let models = config.load_models().unwrap();
        assert_eq!(models.len(), 2);
        assert_eq!(models[0].name(), "Json");
        assert_eq!(models[1].name(), "Small");

        assert_eq!(config.load_model("Small").unwrap().name(), "Small");
        assert!(config.load_model("Nope").is_err());
    }

    #[test]
    fn test_no_models_dir_gives_empty_list() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("treeforge.yaml"), "name: test\n").unwrap();
        let config = Config::load(dir.path()).unwrap();
        assert!(config.load_models().unwrap().is_empty());
    }
}
