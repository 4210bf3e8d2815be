//! Initialize a new treeforge project

use anyhow::Result;
use std::fs;
use std::path::Path;

const SAMPLE_MODEL: &str = r#"# Example tree model
data_dictionary:
  - { name: temperature, data_type: double }
  - { name: humidity, data_type: double }
  - { name: outlook, data_type: string }
  - { name: whatIdo, data_type: string }

tree_model:
  model_name: golfing
  algorithm_name: CART
  mining_schema:
    - { name: temperature }
    - { name: humidity }
    - { name: outlook }
    - { name: whatIdo, usage_type: target }
  missing_value_strategy: defaultChild
  no_true_child_strategy: returnLastPrediction
  node:
    id: root
    score: will play
    default_child: overcast
    nodes:
      - id: sunny
        score: will play
        predicate:
          simple: { field: outlook, operator: equal, value: sunny }
        nodes:
          - id: sunny-mild
            score: will play
            score_distributions:
              - { value: will play, record_count: 4 }
              - { value: no play, record_count: 1 }
            predicate:
              compound:
                operator: and
                predicates:
                  - simple: { field: temperature, operator: lessThan, value: 90 }
                  - simple: { field: temperature, operator: greaterThan, value: 50 }
          - id: sunny-humid
            score: no play
            predicate:
              simple: { field: humidity, operator: greaterOrEqual, value: 80 }
      - id: overcast
        score: may play
        predicate:
          simple_set: { field: outlook, operator: isIn, values: [overcast, rain] }
      - id: otherwise
        score: no play
        predicate: "true"
"#;

/// Run the init command
pub fn run(path: &str, name: Option<&str>) -> Result<()> {
    let project_dir = Path::new(path);

    // Create directory if it doesn't exist
    if !project_dir.exists() {
        fs::create_dir_all(project_dir)?;
    }

    // Get absolute path for deriving name
    let abs_path = project_dir.canonicalize()?;

    // Derive project name from directory name if not provided
    let project_name = match name {
        Some(n) => n.to_string(),
        None => abs_path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow::anyhow!("Could not determine project name from path"))?,
    };

    // Check if already initialized
    if project_dir.join("treeforge.yaml").exists() {
        anyhow::bail!(
            "Directory '{}' already contains a treeforge.yaml",
            project_dir.display()
        );
    }

    tracing::info!("Creating new treeforge project: {}", project_name);

    fs::create_dir_all(project_dir.join("models"))?;
    fs::create_dir_all(project_dir.join("data"))?;

    let config = format!(
        r#"# treeforge project configuration
name: {project_name}
version: "0.1.0"

# Package the generated scoring units are placed in
package_name: org.treeforge.generated

models_dir: models
output_dir: generated
"#
    );
    fs::write(project_dir.join("treeforge.yaml"), config)?;
    fs::write(project_dir.join("models/golfing.yaml"), SAMPLE_MODEL)?;

    let sample_records = r#"{"outlook": "sunny", "temperature": 72, "humidity": 60}
{"outlook": "rain", "temperature": 65}
{"temperature": 70}
"#;
    fs::write(project_dir.join("data/records.jsonl"), sample_records)?;

    let gitignore = r#"# Generated sources
generated/

# IDE
.idea/
.vscode/
*.swp
"#;
    fs::write(project_dir.join(".gitignore"), gitignore)?;

    tracing::info!(
        "✓ Created project '{}' at {}",
        project_name,
        abs_path.display()
    );
    tracing::info!("");
    tracing::info!("Next steps:");
    if path != "." {
        tracing::info!("  cd {}", project_dir.display());
    }
    tracing::info!("  treeforge validate                 # Check models");
    tracing::info!("  treeforge compile                  # Generate Java sources");
    tracing::info!("  treeforge score golfing -i data/records.jsonl");

    Ok(())
}
