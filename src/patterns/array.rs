//! `arrayLength:` and `arrayContains:` primitives.
use crate::{helpers, paths::FieldPath};
use serde_json::Value;

/// `arrayContains:<v>` looks for an element equal to `v`;
/// `arrayContains:<field-path>:<v>` resolves the path against each
/// mapping element first.
pub(crate) fn contains(actual: &Value, field: Option<&str>, value: &str) -> bool {
    let items = match actual.as_array() {
        Some(items) => items,
        None => return false,
    };
    let target = coerce_scalar(value);
    match field {
        None => items.iter().any(|item| helpers::equal(item, &target)),
        Some(spec) => {
            let path = match FieldPath::parse(spec) {
                Ok(path) => path,
                Err(_) => return false,
            };
            items.iter().any(|item| {
                path.extract(item)
                    .map_or(false, |extracted| helpers::equal(&extracted, &target))
            })
        }
    }
}

/// Pattern arguments arrive as text; numbers, booleans and null are
/// promoted to their JSON forms so `arrayContains:5` finds `5`.
pub(crate) fn coerce_scalar(raw: &str) -> Value {
    match raw {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        "null" => return Value::Null,
        _ => {}
    }
    if let Ok(number) = serde_json::from_str::<serde_json::Number>(raw) {
        return Value::Number(number);
    }
    Value::String(raw.to_string())
}
