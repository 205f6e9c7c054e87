//! Value comparison used by dependency checks.

use serde_json::Value;

/// Resolves a dotted path (`address.city`, `items.0.name`) inside a value.
pub fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return Some(value);
    }
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

/// Compares scalars the way submitted form data needs: `"1"` equals `1` and
/// an empty string equals null.
pub fn loosely_equal(a: &Value, b: &Value) -> bool {
    if a == b {
        return true;
    }
    match (a, b) {
        (Value::Null, Value::String(s)) | (Value::String(s), Value::Null) => s.is_empty(),
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .zip(n.as_f64())
            .is_some_and(|(x, y)| (x - y).abs() < f64::EPSILON),
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .zip(y.as_f64())
            .is_some_and(|(x, y)| (x - y).abs() < f64::EPSILON),
        _ => false,
    }
}

/// Built-in dependency check.
///
/// An array `expected` is a set of accepted values. An array `value` (a
/// multiple choice) matches when any of its items does.
pub fn matches_expected(value: &Value, expected: &Value) -> bool {
    let accepts = |candidate: &Value| match expected {
        Value::Array(accepted) => accepted.iter().any(|e| loosely_equal(candidate, e)),
        single => loosely_equal(candidate, single),
    };
    match value {
        Value::Array(items) => items.iter().any(accepts),
        other => accepts(other),
    }
}
