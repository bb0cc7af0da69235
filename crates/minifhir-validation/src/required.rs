use serde_json::Value;

use crate::rules::RuleSet;

/// Qualified paths (`Type.path`) required by `rules` but absent from `tree`.
///
/// A required path is present when every component resolves to something
/// other than an empty string. List-valued nodes match when any element holds
/// the rest of the path. A choice group
/// contributes one entry, keyed by its base path, when no alternative exists.
pub fn missing_required(tree: &Value, rules: &RuleSet) -> Vec<String> {
    let qualify = |path: &str| format!("{}.{}", rules.resource_type, path);

    let required = rules
        .required_paths
        .iter()
        .filter(|path| !has_path(tree, &split(path)))
        .map(|path| qualify(path.as_str()));

    let choices = rules
        .choices
        .iter()
        .filter(|choice| {
            !choice
                .choices
                .iter()
                .any(|option| has_path(tree, &split(option)))
        })
        .map(|choice| qualify(choice.base_path.as_str()));

    required.chain(choices).collect()
}

fn split(path: &str) -> Vec<&str> {
    path.split('.').collect()
}

fn has_path(value: &Value, path: &[&str]) -> bool {
    let Some((head, rest)) = path.split_first() else {
        return !matches!(value, Value::String(s) if s.is_empty());
    };
    match value {
        Value::Object(map) => map.get(*head).is_some_and(|child| has_path(child, rest)),
        Value::Array(items) => items.iter().any(|item| has_path(item, path)),
        _ => false,
    }
}
