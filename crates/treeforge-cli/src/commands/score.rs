//! Score records with the reference interpreter

use anyhow::{Context, Result};
use serde_json::{Value, json};
use treeforge_core::interpreter::{self, Prediction};
use treeforge_core::{Config, FieldTypes, TreeModel};

/// Run the score command
///
/// Prints one JSON object per record on stdout.
pub fn run(config_path: &str, model: &str, record: Option<&str>, input: Option<&str>) -> Result<()> {
    let config = Config::load(config_path).context("Failed to load configuration")?;
    let doc = config
        .load_model(model)
        .with_context(|| format!("Model not found: {}", model))?;
    let tree = doc.tree_model()?;
    let fields = doc.field_types()?;

    let records: Vec<Value> = match (record, input) {
        (Some(raw), _) => vec![serde_json::from_str(raw).context("Invalid JSON record")?],
        (None, Some(path)) => {
            let path = config.base_path.join(path);
            let contents = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            contents
                .lines()
                .filter(|l| !l.trim().is_empty())
                .enumerate()
                .map(|(i, l)| {
                    serde_json::from_str(l)
                        .with_context(|| format!("Invalid JSON on line {}", i + 1))
                })
                .collect::<Result<_>>()?
        }
        (None, None) => anyhow::bail!("Provide a record with --record or a file with --input"),
    };

    tracing::debug!("Scoring {} records with '{}'", records.len(), model);
    for record in &records {
        println!("{}", score(&tree, &fields, record)?);
    }
    Ok(())
}

fn score(tree: &TreeModel, fields: &FieldTypes, record: &Value) -> Result<Value> {
    let prediction = interpreter::evaluate(tree, fields, record)?;
    Ok(match prediction {
        Some(Prediction {
            node_id,
            score,
            confidences,
        }) => {
            let confidences: serde_json::Map<String, Value> = confidences
                .into_iter()
                .map(|(label, c)| (label, json!(c)))
                .collect();
            json!({ "node": node_id, "score": score, "confidences": confidences })
        }
        None => json!({ "node": null, "score": null, "confidences": {} }),
    })
}
