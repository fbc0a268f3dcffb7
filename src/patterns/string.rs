//! String primitives: substring, affix, case-insensitive and regex
//! matching plus the string-length family.
use crate::helpers::value_to_string;
use regex::Regex;
use serde_json::Value;

pub(crate) fn contains(actual: &Value, needle: &str) -> bool {
    value_to_string(actual).contains(needle)
}

pub(crate) fn starts_with(actual: &Value, prefix: &str) -> bool {
    value_to_string(actual).starts_with(prefix)
}

pub(crate) fn ends_with(actual: &Value, suffix: &str) -> bool {
    value_to_string(actual).ends_with(suffix)
}

pub(crate) fn contains_ignore_case(actual: &Value, needle: &str) -> bool {
    value_to_string(actual)
        .to_lowercase()
        .contains(&needle.to_lowercase())
}

pub(crate) fn equals_ignore_case(actual: &Value, other: &str) -> bool {
    value_to_string(actual).to_lowercase() == other.to_lowercase()
}

/// `regex:<r>`. Against an array the pattern passes iff any element's
/// string form matches; an invalid regex never matches (the analyzer
/// reports it as malformed).
pub(crate) fn regex_match(actual: &Value, pattern: &str) -> bool {
    let regex = match Regex::new(pattern) {
        Ok(regex) => regex,
        Err(_) => return false,
    };
    match actual {
        Value::Array(items) => items
            .iter()
            .any(|item| regex.is_match(&value_to_string(item))),
        _ => regex.is_match(&value_to_string(actual)),
    }
}

/// `length:<n>` counts string characters or array elements.
pub(crate) fn length(actual: &Value) -> Option<u64> {
    match actual {
        Value::String(item) => Some(item.chars().count() as u64),
        Value::Array(items) => Some(items.len() as u64),
        _ => None,
    }
}

/// The string-length family only applies to strings.
pub(crate) fn string_length(actual: &Value) -> Option<u64> {
    match actual {
        Value::String(item) => Some(item.chars().count() as u64),
        _ => None,
    }
}

/// Characters that promote a bare pattern body from substring to regex
/// matching. The dot is deliberately included, which makes dotted
/// literals match more than their author may expect; `contains:` is the
/// unambiguous spelling.
const REGEX_METACHARACTERS: &[char] = &[
    '^', '$', '*', '+', '?', '.', '(', ')', '[', ']', '{', '}', '|', '\\',
];

pub(crate) fn looks_like_regex(body: &str) -> bool {
    body.contains(REGEX_METACHARACTERS)
}

/// The default handler for a bare body with no recognized prefix.
pub(crate) fn default_match(actual: &Value, body: &str) -> bool {
    if looks_like_regex(body) {
        regex_match(actual, body)
    } else {
        contains(actual, body)
    }
}
