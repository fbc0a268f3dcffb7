use serde_json::Value;
use std::fmt;

/// For faster handling in the "type" pattern we have this enum, to match
/// with it instead of a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimitiveType {
    Array,
    Boolean,
    Integer,
    Null,
    Number,
    Object,
    String,
}

impl PrimitiveType {
    /// The canonical type of a JSON value, as reported in diagnostics.
    /// Integers are reported as `number`; `Integer` only exists as an
    /// assertion target.
    #[must_use]
    pub fn of(value: &Value) -> PrimitiveType {
        match value {
            Value::Null => PrimitiveType::Null,
            Value::Bool(_) => PrimitiveType::Boolean,
            Value::Number(_) => PrimitiveType::Number,
            Value::String(_) => PrimitiveType::String,
            Value::Array(_) => PrimitiveType::Array,
            Value::Object(_) => PrimitiveType::Object,
        }
    }

    /// Whether `value` satisfies a type assertion for this primitive.
    /// Arrays are identified by a dedicated array test and never satisfy
    /// `object`.
    #[must_use]
    pub fn test(self, value: &Value) -> bool {
        match self {
            PrimitiveType::Array => value.is_array(),
            PrimitiveType::Boolean => value.is_boolean(),
            PrimitiveType::Integer => {
                value.is_i64()
                    || value.is_u64()
                    || value.as_f64().map_or(false, |f| f.fract() == 0.)
            }
            PrimitiveType::Null => value.is_null(),
            PrimitiveType::Number => value.is_number(),
            PrimitiveType::Object => value.is_object(),
            PrimitiveType::String => value.is_string(),
        }
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimitiveType::Array => write!(f, "array"),
            PrimitiveType::Boolean => write!(f, "boolean"),
            PrimitiveType::Integer => write!(f, "integer"),
            PrimitiveType::Null => write!(f, "null"),
            PrimitiveType::Number => write!(f, "number"),
            PrimitiveType::Object => write!(f, "object"),
            PrimitiveType::String => write!(f, "string"),
        }
    }
}

impl TryFrom<&str> for PrimitiveType {
    type Error = ();

    /// Accepts the canonical JSON type names plus the aliases test
    /// authors reach for. Capitalized names are rejected; the syntax
    /// analyzer points at the lowercase form.
    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "array" | "arr" | "list" => Ok(PrimitiveType::Array),
            "boolean" | "bool" => Ok(PrimitiveType::Boolean),
            "integer" | "int" => Ok(PrimitiveType::Integer),
            "null" | "nil" => Ok(PrimitiveType::Null),
            "number" | "float" | "double" => Ok(PrimitiveType::Number),
            "object" | "obj" | "dict" | "map" => Ok(PrimitiveType::Object),
            "string" | "str" => Ok(PrimitiveType::String),
            _ => Err(()),
        }
    }
}
