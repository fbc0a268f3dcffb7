//! Numeric primitives. Every matcher requires the actual value to be a
//! JSON number; anything else fails the pattern (the analyzer then
//! suggests a type assertion).
use serde_json::Value;

const MULTIPLE_EPSILON: f64 = 1e-9;

pub(crate) fn compare(actual: &Value, check: impl Fn(f64) -> bool) -> bool {
    actual.as_f64().map_or(false, check)
}

/// Inclusive on both bounds.
pub(crate) fn between(actual: &Value, min: f64, max: f64) -> bool {
    compare(actual, |a| a >= min && a <= max)
}

pub(crate) fn approximately(actual: &Value, target: f64, tolerance: f64) -> bool {
    compare(actual, |a| (a - target).abs() <= tolerance)
}

/// A zero divisor never matches; the analyzer classifies it as a
/// malformed pattern rather than a value problem.
pub(crate) fn multiple_of(actual: &Value, divisor: f64) -> bool {
    if divisor == 0. {
        return false;
    }
    compare(actual, |a| {
        let ratio = a / divisor;
        (ratio - ratio.round()).abs() < MULTIPLE_EPSILON
    })
}

/// Exact count of fractional digits in the canonical decimal rendering.
pub(crate) fn decimal_places(actual: &Value, places: u32) -> bool {
    match actual {
        Value::Number(number) => observed_decimal_places(number) == Some(places),
        _ => false,
    }
}

pub(crate) fn observed_decimal_places(number: &serde_json::Number) -> Option<u32> {
    let canonical = number.to_string();
    // Scientific notation has no canonical digit count to assert on.
    if canonical.contains(['e', 'E']) {
        return None;
    }
    match canonical.split_once('.') {
        Some((_, fraction)) => Some(fraction.len() as u32),
        None => Some(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!(10), 10., 20., true; "lower bound inclusive")]
    #[test_case(json!(20), 10., 20., true; "upper bound inclusive")]
    #[test_case(json!(20.01), 10., 20., false)]
    #[test_case(json!("15"), 10., 20., false; "numeric strings do not count")]
    fn between_cases(actual: serde_json::Value, min: f64, max: f64, expected: bool) {
        assert_eq!(between(&actual, min, max), expected);
    }

    #[test]
    fn multiple_of_handles_fractional_divisors() {
        assert!(multiple_of(&json!(1.5), 0.5));
        assert!(!multiple_of(&json!(1.3), 0.5));
        assert!(!multiple_of(&json!(5), 0.));
    }

    #[test_case(json!(3.14), 2, true)]
    #[test_case(json!(3.1), 2, false)]
    #[test_case(json!(3), 0, true)]
    #[test_case(json!(3.0), 1, true; "serde keeps the trailing zero")]
    fn decimal_place_counts(actual: serde_json::Value, places: u32, expected: bool) {
        assert_eq!(decimal_places(&actual, places), expected);
    }
}
