//! Validate configuration and models

use anyhow::{Context, Result};
use std::collections::HashMap;
use treeforge_codegen::{CompileOptions, TreeCompiler};
use treeforge_core::Config;

/// Run the validate command
pub fn run(config_path: &str) -> Result<()> {
    tracing::info!("Validating configuration: {}", config_path);

    let config = Config::load(config_path).context("Failed to load configuration")?;

    tracing::info!("✓ Project: {}", config.project.name);
    tracing::info!("✓ Version: {}", config.project.version);
    tracing::info!("✓ Package: {}", config.project.package_name);

    let compiler = TreeCompiler::new(CompileOptions {
        package_name: config.project.package_name.clone(),
        ..Default::default()
    });

    let models = config.load_models().context("Failed to load models")?;
    if models.is_empty() {
        tracing::warn!("No models found in {}", config.models_dir().display());
    }

    let mut units: HashMap<String, String> = HashMap::new();
    for doc in &models {
        let tree = doc
            .tree_model()
            .with_context(|| format!("Invalid model '{}'", doc.name()))?;
        let compiled = compiler
            .compile_document(doc)
            .with_context(|| format!("Model '{}' does not compile", doc.name()))?;
        for (unit, _) in compiled.sources.iter() {
            if let Some(other) = units.insert(unit.to_string(), doc.name().to_string()) {
                anyhow::bail!(
                    "Models '{}' and '{}' both generate {}",
                    other,
                    doc.name(),
                    unit
                );
            }
        }
        tracing::info!(
            "✓ Model: {} ({} nodes, {} leaves)",
            doc.name(),
            tree.len(),
            tree.leaf_count()
        );
    }

    tracing::info!("✓ Configuration is valid");
    Ok(())
}
