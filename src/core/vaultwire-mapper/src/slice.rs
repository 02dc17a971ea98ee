//! Conversion of untyped list responses into string sequences.
//!
//! List endpoints answer with `{"keys": [...]}` where entries are usually,
//! but not necessarily, strings. These helpers render every entry as text and
//! optionally qualify it with the path it was listed under.

use serde_json::Value;

/// Renders a wire value the way it reads in plain text.
///
/// Strings are used verbatim, numbers in their shortest form, sequences as
/// `[a b c]` and mappings as `map[k:v ...]` with sorted keys.
pub fn render(value: &Value) -> String {
    match value {
        Value::Null => "<nil>".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (None, Some(u), _) => u.to_string(),
            (None, None, Some(f)) => f.to_string(),
            _ => n.to_string(),
        },
        Value::String(s) => s.clone(),
        Value::Array(items) => {
            let inner: Vec<String> = items.iter().map(render).collect();
            format!("[{}]", inner.join(" "))
        },
        Value::Object(entries) => {
            let mut pairs: Vec<(&String, &Value)> = entries.iter().collect();
            pairs.sort_by(|a, b| a.0.cmp(b.0));
            let inner: Vec<String> = pairs
                .into_iter()
                .map(|(k, v)| format!("{}:{}", k, render(v)))
                .collect();
            format!("map[{}]", inner.join(" "))
        },
    }
}

/// Renders every element, preserving order.
pub fn to_strings(input: &[Value]) -> Vec<String> {
    input.iter().map(render).collect()
}

/// Renders every element with `prefix` prepended verbatim.
pub fn to_strings_with_prefix(input: &[Value], prefix: &str) -> Vec<String> {
    input
        .iter()
        .map(|v| format!("{}{}", prefix, render(v)))
        .collect()
}

/// Renders every element as a child of the `prefix` path.
///
/// A `/` separator is added to the prefix unless it already ends with one.
pub fn to_strings_with_path_prefix(input: &[Value], prefix: &str) -> Vec<String> {
    if prefix.ends_with('/') {
        to_strings_with_prefix(input, prefix)
    } else {
        to_strings_with_prefix(input, &format!("{}/", prefix))
    }
}
