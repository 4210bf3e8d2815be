//! Integration tests for the compilation pipeline
//!
//! Each test goes from a model document to generated source:
//! - Field resolution across all three layers
//! - Rule extraction and emitted method bodies
//! - Template binding as seen in the final unit
//! - Directory compilation and writing sources to disk

use pretty_assertions::assert_eq;
use rstest::rstest;
use tempfile::TempDir;
use treeforge_codegen::builder::build;
use treeforge_codegen::emitter::emit;
use treeforge_codegen::resolver::resolve;
use treeforge_codegen::template::{bind, set_super_invocation};
use treeforge_codegen::{
    CompileOptions, CompileRequest, Error, ModelMetadata, TreeCompiler, UnitSkeleton,
};
use treeforge_core::fields::{DataField, DerivedField, Expression, FieldType};
use treeforge_core::{ModelDocument, Predicate};

const TREE_SAMPLE: &str = r#"
data_dictionary:
  - { name: temperature, data_type: double }
  - { name: humidity, data_type: double }
  - { name: outlook, data_type: string }
  - { name: whatIdo, data_type: string }
transformation_dictionary:
  - name: humid_hot
    data_type: double
    expression:
      apply: "*"
      arguments:
        - field: temperature
        - field: humidity
tree_model:
  model_name: TreeSample
  algorithm_name: TreeModel
  mining_schema:
    - { name: temperature }
    - { name: humidity }
    - { name: outlook }
    - { name: whatIdo, usage_type: predicted }
  node:
    score: will play
    nodes:
      - score: will play
        predicate:
          simple: { field: outlook, operator: equal, value: sunny }
        nodes:
          - score: will play
            predicate:
              compound:
                operator: and
                predicates:
                  - simple: { field: temperature, operator: lessThan, value: 90 }
                  - simple: { field: temperature, operator: greaterThan, value: 50 }
          - score: no play
            predicate:
              simple: { field: humid_hot, operator: greaterOrEqual, value: 6300 }
      - score: may play
        predicate:
          simple_set: { field: outlook, operator: isIn, values: [overcast, rain] }
      - score: no play
        predicate: "true"
"#;

fn tree_sample() -> ModelDocument {
    ModelDocument::from_yaml(TREE_SAMPLE).unwrap()
}

// =============================================================================
// Stage by stage
// =============================================================================

#[test]
fn test_resolve_document_layers() {
    let doc = tree_sample();
    let tree = doc.tree_model().unwrap();
    let fields = resolve(
        &doc.data_dictionary,
        &doc.transformation_dictionary,
        &tree.local_transformations,
    )
    .unwrap();
    assert_eq!(fields.len(), 5);
    assert_eq!(fields.get("humid_hot").unwrap().original, FieldType::Numeric);
}

#[test]
fn test_rules_cover_every_leaf() {
    let doc = tree_sample();
    let tree = doc.tree_model().unwrap();
    let fields = resolve(&doc.data_dictionary, &doc.transformation_dictionary, &[]).unwrap();
    let ast = build(&fields, &tree, &[]).unwrap();

    let rules: Vec<String> = ast.rules().iter().map(ToString::to_string).collect();
    assert_eq!(
        rules,
        vec![
            r#"_0_1_2: outlook == "sunny" && and(temperature < 90, temperature > 50) -> "will play""#,
            r#"_0_1_3: outlook == "sunny" && humid_hot >= 6300 -> "no play""#,
            r#"_0_4: outlook in ("overcast", "rain") -> "may play""#,
            r#"_0_5: true -> "no play""#,
        ]
    );
}

#[test]
fn test_constructor_text_for_tree_sample() {
    let doc = tree_sample();
    let metadata = ModelMetadata::from_tree(&doc.tree_model().unwrap());
    let constructor =
        set_super_invocation(&metadata, &UnitSkeleton::tree_model().constructor, "SIMPLENAME")
            .unwrap();
    assert_eq!(
        constructor.to_string(),
        "public SIMPLENAME() {\n    super(\"TreeSample\", Collections.emptyList(), \"TreeModel\");\n    targetField = targetField;\n    pmmlMODEL = null;\n}"
    );
}

#[test]
fn test_emitted_unit_for_tree_sample() {
    let doc = tree_sample();
    let tree = doc.tree_model().unwrap();
    let fields = resolve(&doc.data_dictionary, &doc.transformation_dictionary, &[]).unwrap();
    let ast = build(&fields, &tree, &[]).unwrap();
    let bound = bind(&UnitSkeleton::tree_model(), &ModelMetadata::from_tree(&tree)).unwrap();
    let sources = emit(&ast, &bound, "org.treeforge.sample").unwrap();

    assert_eq!(sources.len(), 1);
    let source = sources.get("org.treeforge.sample.TreeSample").unwrap();
    assert!(source.contains("targetField = \"whatIdo\";"));
    assert!(source.contains(
        "matched = and(lt(number(requestData, \"temperature\"), 90.0), gt(number(requestData, \"temperature\"), 50.0));"
    ));
    assert!(source.contains("matched = isIn(text(requestData, \"outlook\"), \"overcast\", \"rain\");"));
    assert!(source.contains("matched = ge(number(requestData, \"humid_hot\"), 6300.0);"));
    assert!(source.ends_with("}\n"));
}

// =============================================================================
// Compiler facade
// =============================================================================

#[test]
fn test_compile_twice_is_byte_identical() {
    let compiler = TreeCompiler::default();
    let request = CompileRequest::from_document(&tree_sample()).unwrap();
    let first = compiler.compile(&request).unwrap();
    let second = compiler.compile(&request).unwrap();
    assert_eq!(first.sources, second.sources);
    assert_eq!(first.hash, second.hash);
}

#[test]
fn test_extra_constraints_change_output() {
    let compiler = TreeCompiler::default();
    let plain = CompileRequest::from_document(&tree_sample()).unwrap();
    let guarded = plain
        .clone()
        .with_constraint(Predicate::is_not_missing("outlook"));
    let a = compiler.compile(&plain).unwrap();
    let b = compiler.compile(&guarded).unwrap();
    assert_ne!(a.hash, b.hash);
}

#[test]
fn test_local_transformation_is_a_contributing_field() {
    let mut doc = tree_sample();
    doc.tree_model.local_transformations.push(DerivedField::new(
        "humid_hot",
        "string",
        Expression::field("outlook"),
    ));
    let compiled = TreeCompiler::new(CompileOptions {
        package_name: "com.example".to_string(),
        ..CompileOptions::default()
    })
    .compile_document(&doc);

    // the local string shadow makes the numeric literal 6300 fine as text
    let compiled = compiled.unwrap();
    let source = compiled.sources.get("com.example.TreeSample").unwrap();
    assert!(source.contains("super(\"TreeSample\", Arrays.asList(\"humid_hot\"), \"TreeModel\");"));
    assert!(source.contains("matched = ge(text(requestData, \"humid_hot\"), \"6300\");"));
}

#[rstest]
#[case(
    vec![DataField::new("temperature", "decimal")],
    "temperature"
)]
#[case(
    vec![DataField::new("temperature", "double"), DataField::new("temperature", "double")],
    "temperature"
)]
fn test_type_errors_abort_compilation(#[case] dictionary: Vec<DataField>, #[case] field: &str) {
    let request = CompileRequest::from_document(&tree_sample())
        .unwrap()
        .with_data_dictionary(dictionary);
    let err = TreeCompiler::default().compile(&request).unwrap_err();
    assert!(matches!(err, Error::TypeResolutionError { field: ref f, .. } if f == field));
}

#[test]
fn test_unknown_predicate_field_aborts_compilation() {
    let request = CompileRequest::from_document(&tree_sample())
        .unwrap()
        .with_transformations(Vec::new());
    let err = TreeCompiler::default().compile(&request).unwrap_err();
    match err {
        Error::PredicateResolutionError { field, node, .. } => {
            assert_eq!(field, "humid_hot");
            assert_eq!(node, "0/1/3");
        }
        other => panic!("Expected PredicateResolutionError, got {:?}", other),
    }
}

#[test]
fn test_compile_all_directory() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("b_sample.yaml"), TREE_SAMPLE).unwrap();
    std::fs::write(
        dir.path().join("a_constant.json"),
        r#"{"tree_model": {"model_name": "constant", "node": {"score": "yes"}}}"#,
    )
    .unwrap();
    std::fs::write(dir.path().join("README.md"), "not a model").unwrap();

    let compiled = TreeCompiler::default().compile_all(dir.path()).unwrap();
    let names: Vec<&str> = compiled.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec!["constant", "TreeSample"]);

    let out = TempDir::new().unwrap();
    for model in &compiled {
        model.save(out.path()).unwrap();
    }
    assert!(out.path().join("org/treeforge/generated/Constant.java").exists());
    assert!(out.path().join("org/treeforge/generated/TreeSample.java").exists());
}

#[test]
fn test_document_without_nodes_is_malformed() {
    let doc = ModelDocument::from_yaml("tree_model:\n  model_name: hollow\n").unwrap();
    let err = TreeCompiler::default().compile_document(&doc).unwrap_err();
    assert!(matches!(err, Error::MalformedModelError { .. }));
}
