//! Identifier and literal helpers for generated source

use once_cell::sync::Lazy;
use regex::Regex;

static WORD_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9]+").expect("valid regex"));
static NON_IDENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^A-Za-z0-9_]").expect("valid regex"));

/// Simple names the generated unit declares or refers to unqualified
const RESERVED: &[&str] = &[
    "Arrays",
    "Boolean",
    "Collections",
    "Double",
    "LinkedHashMap",
    "Map",
    "Number",
    "NumberFormatException",
    "Object",
    "Outcome",
    "String",
    "TreeScoringUnit",
];

/// Class name for a model name: `golf tree-v2` → `GolfTreeV2`
///
/// Names that would start with a digit are prefixed with `Tree`; a name with
/// no usable characters becomes `TreeModel`. A name that clashes with a type
/// the unit itself uses gets a `Model` suffix.
pub fn class_name(model_name: &str) -> String {
    avoid_clash(base_class_name(model_name), RESERVED.iter().copied())
}

/// Append `Model` to `name` until it differs from every name in `taken`
pub fn avoid_clash<'a>(mut name: String, taken: impl IntoIterator<Item = &'a str>) -> String {
    let taken: Vec<&str> = taken.into_iter().collect();
    while taken.contains(&name.as_str()) {
        name.push_str("Model");
    }
    name
}

fn base_class_name(model_name: &str) -> String {
    let mut name: String = WORD_SPLIT
        .split(model_name)
        .filter(|part| !part.is_empty())
        .map(capitalize)
        .collect();

    if name.is_empty() {
        return "TreeModel".to_string();
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert_str(0, "Tree");
    }
    name
}

fn capitalize(part: &str) -> String {
    let mut chars = part.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

/// Identifier-safe fragment for a node id
pub fn fragment(raw: &str) -> String {
    NON_IDENT.replace_all(raw, "_").into_owned()
}

/// Rule name for a path of node ids: `["0", "1", "3"]` → `_0_1_3`
pub fn rule_name<'a>(path: impl IntoIterator<Item = &'a str>) -> String {
    path.into_iter().fold(String::new(), |mut acc, id| {
        acc.push('_');
        acc.push_str(&fragment(id));
        acc
    })
}

/// Double-quoted Java string literal
pub fn java_string(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('"');
    for c in raw.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Text that is safe inside a Java block comment
///
/// Backslashes are doubled so the compiler never reads a `\u` escape, and
/// comment terminators are broken up.
pub fn java_comment(raw: &str) -> String {
    raw.replace('\\', "\\\\").replace("*/", "* /")
}

/// Java double literal that round-trips `value`
pub fn java_double(value: f64) -> String {
    format!("{:?}", value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("TreeSample", "TreeSample")]
    #[case("golf tree-v2", "GolfTreeV2")]
    #[case("iris_decision_tree", "IrisDecisionTree")]
    #[case("2024 churn", "Tree2024Churn")]
    #[case("---", "TreeModel")]
    #[case("outcome", "OutcomeModel")]
    #[case("map", "MapModel")]
    #[case("collections", "CollectionsModel")]
    #[case("string", "StringModel")]
    #[case("double", "DoubleModel")]
    #[case("tree scoring unit", "TreeScoringUnitModel")]
    fn test_class_name(#[case] model: &str, #[case] expected: &str) {
        assert_eq!(class_name(model), expected);
    }

    #[test]
    fn test_avoid_clash_repeats_suffix() {
        let name = avoid_clash("Score".to_string(), ["Score", "ScoreModel"]);
        assert_eq!(name, "ScoreModelModel");
        assert_eq!(avoid_clash("Golf".to_string(), ["Score"]), "Golf");
    }

    #[test]
    fn test_rule_name() {
        assert_eq!(rule_name(["0", "1", "3"]), "_0_1_3");
        assert_eq!(rule_name(["root", "n-1"]), "_root_n_1");
    }

    #[rstest]
    #[case("sunny", "\"sunny\"")]
    #[case("say \"hi\"", "\"say \\\"hi\\\"\"")]
    #[case("a\\b", "\"a\\\\b\"")]
    #[case("line\nbreak", "\"line\\nbreak\"")]
    fn test_java_string(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(java_string(raw), expected);
    }

    #[rstest]
    #[case("golf", "golf")]
    #[case("C:\\users tree", "C:\\\\users tree")]
    #[case("x == \"\\u{1b}\"", "x == \"\\\\u{1b}\"")]
    #[case("ends */ here", "ends * / here")]
    fn test_java_comment(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(java_comment(raw), expected);
    }

    #[rstest]
    #[case(60.0, "60.0")]
    #[case(0.5, "0.5")]
    #[case(-3.25, "-3.25")]
    fn test_java_double(#[case] value: f64, #[case] expected: &str) {
        assert_eq!(java_double(value), expected);
    }
}
