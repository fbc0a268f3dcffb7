use num_cmp::NumCmp;
use serde_json::{Map, Value};

macro_rules! num_cmp {
    ($left:expr, $right:expr) => {
        if let Some(b) = $right.as_u64() {
            NumCmp::num_eq($left, b)
        } else if let Some(b) = $right.as_i64() {
            NumCmp::num_eq($left, b)
        } else {
            NumCmp::num_eq($left, $right.as_f64().expect("Always valid"))
        }
    };
}

/// Deep value equality with numeric comparison across representations,
/// so `1`, `1.0` and `u64::MAX` compare by value rather than by variant.
#[inline]
pub(crate) fn equal(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Number(left), Value::Number(right)) => {
            if let Some(a) = left.as_u64() {
                num_cmp!(a, right)
            } else if let Some(a) = left.as_i64() {
                num_cmp!(a, right)
            } else {
                let a = left.as_f64().expect("Always valid");
                num_cmp!(a, right)
            }
        }
        (Value::Array(left), Value::Array(right)) => equal_arrays(left, right),
        (Value::Object(left), Value::Object(right)) => equal_objects(left, right),
        (_, _) => left == right,
    }
}

#[inline]
pub(crate) fn equal_arrays(left: &[Value], right: &[Value]) -> bool {
    left.len() == right.len() && left.iter().zip(right.iter()).all(|(a, b)| equal(a, b))
}

/// Key order is data for reporting only, not for equality.
#[inline]
pub(crate) fn equal_objects(left: &Map<String, Value>, right: &Map<String, Value>) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .all(|(key, value)| right.get(key).map_or(false, |other| equal(value, other)))
}

/// The string form a value is cast to before substring and regex
/// matching. Strings are used as-is; everything else is rendered as
/// compact JSON.
#[inline]
pub(crate) fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(item) => item.clone(),
        _ => value.to_string(),
    }
}

/// A short, single-line preview of a value for error messages.
pub(crate) fn preview(value: &Value, limit: usize) -> String {
    let mut repr = value_to_string(value);
    if repr.chars().count() > limit {
        repr = repr.chars().take(limit).collect::<String>() + "...";
    }
    repr
}

#[cfg(test)]
mod tests {
    use super::{equal, preview};
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!(1), json!(1.0), true)]
    #[test_case(json!(-1), json!(18446744073709551615u64), false)]
    #[test_case(json!({"a": 1, "b": 2}), json!({"b": 2, "a": 1}), true; "key order is irrelevant")]
    #[test_case(json!([1, 2]), json!([2, 1]), false; "element order matters")]
    #[test_case(json!(null), json!(null), true)]
    fn equality(left: serde_json::Value, right: serde_json::Value, expected: bool) {
        assert_eq!(equal(&left, &right), expected);
    }

    #[test]
    fn preview_truncates() {
        assert_eq!(preview(&json!("abcdef"), 3), "abc...");
        assert_eq!(preview(&json!([1, 2]), 64), "[1,2]");
    }
}
