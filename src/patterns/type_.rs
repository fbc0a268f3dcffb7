//! `type:`, `exists` and `count:` primitives.
use crate::primitive_type::PrimitiveType;
use serde_json::Value;
use std::convert::TryFrom;

/// `type:<t>` with alias normalization. Unknown type names never match;
/// the diagnostic analyzer points at the valid spellings.
pub(crate) fn matches_type(name: &str, actual: &Value) -> bool {
    PrimitiveType::try_from(name).map_or(false, |type_| type_.test(actual))
}

/// Mapping key-count or array length; scalars have no count.
pub(crate) fn count(actual: &Value) -> Option<u64> {
    match actual {
        Value::Object(map) => Some(map.len() as u64),
        Value::Array(items) => Some(items.len() as u64),
        _ => None,
    }
}
