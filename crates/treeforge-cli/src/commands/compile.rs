//! Compile models to Java sources

use anyhow::{Context, Result};
use treeforge_codegen::{CompileOptions, CompiledModel, TreeCompiler};
use treeforge_core::Config;

/// Run the compile command
pub fn run(
    config_path: &str,
    model: Option<&str>,
    package: Option<&str>,
    output: Option<&str>,
) -> Result<()> {
    tracing::info!("Loading configuration from {}", config_path);

    let config = Config::load(config_path).context("Failed to load configuration")?;
    let output_dir = match output {
        Some(dir) => config.base_path.join(dir),
        None => config.output_dir(),
    };

    let options = CompileOptions {
        package_name: package.unwrap_or(&config.project.package_name).to_string(),
        ..Default::default()
    };
    let compiler = TreeCompiler::new(options);

    let results = match model {
        Some(name) => {
            let doc = config
                .load_model(name)
                .with_context(|| format!("Model not found: {}", name))?;
            vec![
                compiler
                    .compile_document(&doc)
                    .with_context(|| format!("Failed to compile model '{}'", name))?,
            ]
        }
        None => {
            let models_dir = config.models_dir();
            tracing::info!("Compiling all models in {}", models_dir.display());
            compiler
                .compile_all(&models_dir)
                .context("Failed to compile models")?
        }
    };

    tracing::info!("Compiled {} models:", results.len());
    for compiled in &results {
        save(compiled, &output_dir)?;
    }

    tracing::info!("Compilation complete");
    Ok(())
}

fn save(compiled: &CompiledModel, output_dir: &std::path::Path) -> Result<()> {
    let written = compiled
        .save(output_dir)
        .with_context(|| format!("Failed to write sources for '{}'", compiled.name))?;
    for path in written {
        tracing::info!(
            "  ✓ {} → {} (hash: {}...)",
            compiled.name,
            path.display(),
            &compiled.hash[..8]
        );
    }
    Ok(())
}
