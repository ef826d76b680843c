//! Lookups into loosely-shaped backend JSON
//!
//! The backend answers with ad-hoc shapes, so every field is probed under a
//! list of alias paths. Paths are slices of object keys; the first path that
//! resolves to a usable value wins.

use serde_json::Value;

/// A path of object keys, e.g. `&["raw", "estadoEntrada"]`
pub type Path<'a> = &'a [&'a str];

/// Follow `path` through nested objects
#[must_use]
pub fn at<'v>(value: &'v Value, path: Path<'_>) -> Option<&'v Value> {
    path.iter().try_fold(value, |current, key| current.get(*key))
}

/// Coerce a scalar to text
///
/// Strings are trimmed, numbers and booleans use their JSON text. `null`,
/// arrays and objects yield an empty string.
#[must_use]
pub fn coerce(value: &Value) -> String {
    match value {
        Value::String(text) => text.trim().to_owned(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

/// Coerce a value to non-empty text (strings and numbers only)
#[must_use]
pub fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(_) | Value::Number(_) => Some(coerce(value)).filter(|t| !t.is_empty()),
        _ => None,
    }
}

/// Non-empty string value (numbers excluded)
#[must_use]
pub fn string(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_owned)
}

/// Integer-ish flag: `1`, `"1"`, `true`
#[must_use]
pub fn flag(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .or_else(|| number.as_f64().map(|f| i64::from(f != 0.0))),
        Value::String(text) => text.trim().parse().ok(),
        Value::Bool(flag) => Some(i64::from(*flag)),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Boolean-ish value: `true`, `1`, `"true"`, `"si"`
#[must_use]
pub fn boolean(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::Number(_) => flag(value).map(|f| f != 0),
        Value::String(text) => match text.trim().to_lowercase().as_str() {
            "true" | "1" | "si" | "sí" | "yes" => Some(true),
            "false" | "0" | "no" => Some(false),
            _ => None,
        },
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// First path under any root for which `extract` yields a value
///
/// Roots are tried in order; within a root, paths are tried in order.
pub fn first<T>(
    roots: &[&Value],
    paths: &[Path<'_>],
    extract: impl Fn(&Value) -> Option<T>,
) -> Option<T> {
    roots
        .iter()
        .find_map(|root| paths.iter().find_map(|path| at(root, path).and_then(&extract)))
}

/// `value` itself plus whichever of its `wrappers` are objects
///
/// Backend payloads nest the interesting part under `raw`, `data` and the
/// like; enrichment looks at all of them.
#[must_use]
pub fn roots<'v>(value: &'v Value, wrappers: &[Path<'_>]) -> Vec<&'v Value> {
    std::iter::once(value)
        .chain(
            wrappers
                .iter()
                .filter_map(|path| at(value, path))
                .filter(|v| v.is_object()),
        )
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn at_follows_nested_keys() {
        let body = json!({ "raw": { "estadoEntrada": "Controlada" } });
        assert_eq!(
            at(&body, &["raw", "estadoEntrada"]),
            Some(&json!("Controlada"))
        );
        assert_eq!(at(&body, &["raw", "missing"]), None);
        assert_eq!(at(&body, &[]), Some(&body));
    }

    #[test]
    fn coerce_rules() {
        assert_eq!(coerce(&json!("  E1 ")), "E1");
        assert_eq!(coerce(&json!(123)), "123");
        assert_eq!(coerce(&json!(true)), "true");
        assert_eq!(coerce(&json!(null)), "");
        assert_eq!(coerce(&json!([1])), "");
        assert_eq!(coerce(&json!({ "a": 1 })), "");
    }

    #[test]
    fn flags_and_booleans() {
        assert_eq!(flag(&json!(1)), Some(1));
        assert_eq!(flag(&json!("0")), Some(0));
        assert_eq!(flag(&json!(true)), Some(1));
        assert_eq!(flag(&json!("yes")), None);

        assert_eq!(boolean(&json!("true")), Some(true));
        assert_eq!(boolean(&json!(0)), Some(false));
        assert_eq!(boolean(&json!("maybe")), None);
    }

    #[test]
    fn first_prefers_earlier_roots_then_paths() {
        let body = json!({
            "mensaje": "top",
            "data": { "message": "nested" }
        });
        let roots = roots(&body, &[&["data"], &["raw"]]);
        assert_eq!(roots.len(), 2);

        let found = first(&roots, &[&["message"], &["mensaje"]], string);
        assert_eq!(found.as_deref(), Some("top"));
    }
}
