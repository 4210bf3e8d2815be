//! Source emitter
//!
//! Renders a [`TreeAst`] and a [`BoundTemplate`] into one Java unit. The
//! AST is first flattened into a plain view (strings only) so the
//! minijinja template stays free of logic: one private method per tree
//! node, each testing its children in declaration order.

use minijinja::{AutoEscape, Environment};
use serde::Serialize;

use treeforge_core::model::{MissingValueStrategy, NoTrueChildStrategy};
use treeforge_core::NodeId;

use crate::error::{Error, Result};
use crate::ir::{Branch, Outcome, TreeAst};
use crate::naming::{java_comment, java_double, java_string};
use crate::sources::GeneratedSourceMap;
use crate::template::BoundTemplate;

const UNIT_TEMPLATE: &str = include_str!("../templates/tree_unit.java.j2");
const UNIT_TEMPLATE_NAME: &str = "tree_unit.java";

#[derive(Serialize)]
struct UnitView {
    package: String,
    imports: Vec<String>,
    model_name: String,
    rules: Vec<String>,
    class_name: String,
    extends: Option<String>,
    outcomes: Vec<OutcomeView>,
    constructor: String,
    guards: Vec<String>,
    root_condition: Option<String>,
    root_method: String,
    methods: Vec<MethodView>,
}

#[derive(Serialize)]
struct OutcomeView {
    constant: String,
    args: String,
}

#[derive(Serialize)]
struct MethodView {
    name: String,
    leaf: Option<String>,
    steps: Vec<StepView>,
    fallback: String,
}

#[derive(Serialize)]
struct StepView {
    condition: String,
    child: String,
    on_unknown: Option<String>,
}

/// Emit the source map for one compiled tree.
///
/// The single entry is keyed `package_name.ClassName`.
pub fn emit(
    ast: &TreeAst,
    template: &BoundTemplate,
    package_name: &str,
) -> Result<GeneratedSourceMap> {
    let root = match ast.root() {
        Some(root) if !ast.is_empty() => root,
        _ => {
            return Err(Error::EmptyModelError {
                model: ast.model_name().to_string(),
            });
        }
    };

    let view = UnitView {
        package: package_name.to_string(),
        imports: template.imports().to_vec(),
        model_name: java_comment(ast.model_name()),
        rules: ast
            .rules()
            .iter()
            .map(|r| java_comment(&r.to_string()))
            .collect(),
        class_name: template.class_name().to_string(),
        extends: template.extends().map(String::from),
        outcomes: ast
            .branches()
            .iter()
            .filter_map(|b| b.outcome.as_ref())
            .map(|o| OutcomeView {
                constant: outcome_constant(o.node),
                args: outcome_args(o),
            })
            .collect(),
        constructor: indent(&template.constructor().to_string()),
        guards: ast.guards().iter().map(|g| g.java()).collect(),
        root_condition: root.condition.as_ref().map(|c| c.java()),
        root_method: method_name(root.node),
        methods: ast
            .branches()
            .iter()
            .map(|b| method_view(ast, b))
            .collect(),
    };

    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.set_keep_trailing_newline(true);
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.add_template(UNIT_TEMPLATE_NAME, UNIT_TEMPLATE)?;
    let source = env.get_template(UNIT_TEMPLATE_NAME)?.render(&view)?;

    let qualified = if package_name.is_empty() {
        template.class_name().to_string()
    } else {
        format!("{}.{}", package_name, template.class_name())
    };

    tracing::debug!(
        "Emitted {} ({} methods, {} bytes)",
        qualified,
        view.methods.len(),
        source.len()
    );

    let mut sources = GeneratedSourceMap::new();
    sources.insert(qualified, source);
    Ok(sources)
}

fn method_view(ast: &TreeAst, branch: &Branch) -> MethodView {
    if branch.is_leaf() {
        return MethodView {
            name: method_name(branch.node),
            leaf: Some(return_outcome(branch)),
            steps: Vec::new(),
            fallback: String::new(),
        };
    }

    let policy = ast.policy();
    let on_unknown = match policy.missing_value {
        MissingValueStrategy::None | MissingValueStrategy::DefaultChild => branch
            .default_child
            .map(|d| format!("return {}(requestData);", method_name(d))),
        MissingValueStrategy::NullPrediction => Some("return null;".to_string()),
        MissingValueStrategy::LastPrediction => Some(format!("return {};", return_outcome(branch))),
    };
    let fallback = match policy.no_true_child {
        NoTrueChildStrategy::ReturnNullPrediction => "null".to_string(),
        NoTrueChildStrategy::ReturnLastPrediction => return_outcome(branch),
    };

    let steps = branch
        .children
        .iter()
        .filter_map(|id| ast.branch(*id))
        .map(|child| StepView {
            condition: child
                .condition
                .as_ref()
                .map_or_else(|| "Boolean.TRUE".to_string(), |c| c.java()),
            child: method_name(child.node),
            on_unknown: on_unknown.clone(),
        })
        .collect();

    MethodView {
        name: method_name(branch.node),
        leaf: None,
        steps,
        fallback,
    }
}

fn method_name(node: NodeId) -> String {
    format!("node{}", node.index())
}

fn outcome_constant(node: NodeId) -> String {
    format!("OUTCOME_{}", node.index())
}

fn return_outcome(branch: &Branch) -> String {
    match &branch.outcome {
        Some(outcome) => outcome_constant(outcome.node),
        None => "null".to_string(),
    }
}

fn outcome_args(outcome: &Outcome) -> String {
    let labels: Vec<String> = outcome
        .confidences
        .iter()
        .map(|(label, _)| java_string(label))
        .collect();
    let values: Vec<String> = outcome
        .confidences
        .iter()
        .map(|(_, value)| java_double(*value))
        .collect();
    format!(
        "{}, {}, new String[] {{{}}}, new double[] {{{}}}",
        java_string(&outcome.node_id),
        outcome.score.java(),
        labels.join(", "),
        values.join(", ")
    )
}

fn indent(block: &str) -> String {
    block
        .lines()
        .map(|line| format!("    {}", line))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::build;
    use crate::ir::SelectionPolicy;
    use crate::resolver::resolve;
    use crate::template::{bind, ModelMetadata, UnitSkeleton};
    use pretty_assertions::assert_eq;
    use treeforge_core::fields::DataField;
    use treeforge_core::model::SimpleOperator;
    use treeforge_core::{Node, Predicate, TreeModel};

    fn fields() -> Vec<DataField> {
        vec![
            DataField::new("temperature", "double"),
            DataField::new("outlook", "string"),
        ]
    }

    fn compile(tree: &TreeModel) -> GeneratedSourceMap {
        let map = resolve(&fields(), &[], &[]).unwrap();
        let ast = build(&map, tree, &[]).unwrap();
        let bound = bind(&UnitSkeleton::tree_model(), &ModelMetadata::from_tree(tree)).unwrap();
        emit(&ast, &bound, "org.example").unwrap()
    }

    fn source_of(tree: &TreeModel) -> String {
        let sources = compile(tree);
        let (_, source) = sources.iter().next().unwrap();
        source.to_string()
    }

    fn cold_tree() -> TreeModel {
        let mut tree = TreeModel::new("cold");
        let root = tree.add_root(Node::new("0").with_score("mild")).unwrap();
        tree.add_child(
            root,
            Node::new("1")
                .with_predicate(Predicate::simple("temperature", SimpleOperator::LessThan, "60"))
                .with_score("cold"),
        )
        .unwrap();
        tree.add_child(
            root,
            Node::new("2")
                .with_predicate(Predicate::True)
                .with_score("warm"),
        )
        .unwrap();
        tree
    }

    #[test]
    fn test_root_is_leaf_yields_one_unit() {
        let mut tree = TreeModel::new("single");
        tree.add_root(
            Node::new("0")
                .with_score("yes")
                .with_distribution("yes", 3.0)
                .with_distribution("no", 1.0),
        )
        .unwrap();
        let sources = compile(&tree);
        assert_eq!(sources.len(), 1);
        let source = sources.get("org.example.Single").unwrap();
        assert!(source.starts_with("package org.example;\n\nimport java.util.Arrays;\n"));
        assert!(source.contains(
            "    private static final Outcome OUTCOME_0 = new Outcome(\"0\", \"yes\", new String[] {\"yes\", \"no\"}, new double[] {0.75, 0.25});\n"
        ));
        assert!(source.contains("    private Outcome node0(Map<String, Object> requestData) {\n        return OUTCOME_0;\n    }\n"));
    }

    #[test]
    fn test_comment_text_cannot_form_unicode_escapes() {
        let mut tree = cold_tree();
        tree.model_name = "C:\\users tree".to_string();
        let sources = compile(&tree);
        let source = sources.get("org.example.CUsersTree").unwrap();
        assert!(source.contains(" * Scoring unit for tree model C:\\\\users tree.\n"));
        assert!(!source.contains("C:\\users"));
    }

    #[test]
    fn test_model_named_like_nested_class() {
        let mut tree = cold_tree();
        tree.model_name = "outcome".to_string();
        let sources = compile(&tree);
        let source = sources.get("org.example.OutcomeModel").unwrap();
        assert!(source.contains("public class OutcomeModel extends TreeScoringUnit {"));
        assert!(source.contains("public static final class Outcome {"));
    }

    #[test]
    fn test_first_match_method_body() {
        let source = source_of(&cold_tree());
        let expected = "    private Outcome node0(Map<String, Object> requestData) {
        Boolean matched;
        matched = lt(number(requestData, \"temperature\"), 60.0);
        if (isTrue(matched)) {
            return node1(requestData);
        }
        matched = Boolean.TRUE;
        if (isTrue(matched)) {
            return node2(requestData);
        }
        return null;
    }
";
        assert!(source.contains(expected), "{}", source);
    }

    #[test]
    fn test_constructor_is_embedded() {
        let mut tree = cold_tree();
        tree.algorithm_name = Some("CART".to_string());
        let source = source_of(&tree);
        assert!(source.contains(
            "    public Cold() {\n        super(\"cold\", Collections.emptyList(), \"CART\");\n        targetField = null;\n        pmmlMODEL = null;\n    }\n"
        ));
        assert!(source.contains("public class Cold extends TreeScoringUnit {"));
    }

    #[test]
    fn test_default_child_taken_on_unknown() {
        let mut tree = TreeModel::new("cold");
        let root = tree
            .add_root(Node::new("0").with_score("mild").with_default_child("2"))
            .unwrap();
        tree.add_child(
            root,
            Node::new("1")
                .with_predicate(Predicate::simple("temperature", SimpleOperator::LessThan, "60"))
                .with_score("cold"),
        )
        .unwrap();
        tree.add_child(root, Node::new("2").with_score("warm")).unwrap();
        let source = source_of(&tree);
        assert!(source.contains(
            "        if (matched == null) {\n            return node2(requestData);\n        }\n"
        ));
    }

    #[test]
    fn test_no_default_child_means_no_unknown_branch() {
        let source = source_of(&cold_tree());
        assert!(!source.contains("matched == null"));
    }

    #[test]
    fn test_last_prediction_strategies() {
        let mut tree = cold_tree();
        tree.missing_value_strategy = MissingValueStrategy::LastPrediction;
        tree.no_true_child_strategy = NoTrueChildStrategy::ReturnLastPrediction;
        let source = source_of(&tree);
        assert!(source.contains("        if (matched == null) {\n            return OUTCOME_0;\n        }\n"));
        assert!(source.contains("        return OUTCOME_0;\n    }\n"));
    }

    #[test]
    fn test_null_prediction_strategy() {
        let mut tree = cold_tree();
        tree.missing_value_strategy = MissingValueStrategy::NullPrediction;
        let source = source_of(&tree);
        assert!(source.contains("        if (matched == null) {\n            return null;\n        }\n"));
    }

    #[test]
    fn test_guards_and_rule_summary() {
        let tree = cold_tree();
        let map = resolve(&fields(), &[], &[]).unwrap();
        let ast = build(&map, &tree, &[Predicate::is_not_missing("outlook")]).unwrap();
        let bound = bind(&UnitSkeleton::tree_model(), &ModelMetadata::from_tree(&tree)).unwrap();
        let sources = emit(&ast, &bound, "org.example").unwrap();
        let source = sources.get("org.example.Cold").unwrap();
        assert!(source.contains(
            "        if (!isTrue(isNotMissing(requestData, \"outlook\"))) {\n            return null;\n        }\n        return node0(requestData);\n"
        ));
        assert!(source.contains(" *   _0_1: outlook is not missing && temperature < 60 -> \"cold\"\n"));
    }

    #[test]
    fn test_emission_is_deterministic() {
        let tree = cold_tree();
        assert_eq!(compile(&tree), compile(&tree));
    }

    #[test]
    fn test_empty_ast_is_rejected() {
        let ast = TreeAst {
            model_name: "nothing".to_string(),
            rules: Vec::new(),
            branches: Vec::new(),
            guards: Vec::new(),
            policy: SelectionPolicy::default(),
        };
        let bound = bind(
            &UnitSkeleton::tree_model(),
            &ModelMetadata::from_tree(&TreeModel::new("nothing")),
        )
        .unwrap();
        let err = emit(&ast, &bound, "org.example").unwrap_err();
        assert!(matches!(err, Error::EmptyModelError { ref model } if model == "nothing"));
    }
}
