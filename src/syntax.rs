//! Offline linter over expected documents.
//!
//! Runs before any server is spawned and catches the authoring mistakes
//! the validator would otherwise report one failed test at a time:
//! misspelled pattern names, missing `match:` prefixes, wrong argument
//! delimiters, capitalized type names, operator aliases from other
//! assertion libraries, and structural misuse of the meta-keys.
use crate::patterns;
use lazy_static::lazy_static;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

/// One lint finding with a corrected form where the fix is mechanical.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Suggestion {
    /// Where in the expected document the finding sits.
    pub path: String,
    /// The offending text as written.
    pub found: String,
    /// Drop-in replacement, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected: Option<String>,
    /// What is wrong and why.
    pub message: String,
}

/// Loader-provided context. Duplicate keys cannot be observed on a
/// parsed tree (the loser is already gone), so the document loader
/// reports their paths here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxContext {
    /// Paths of keys that appeared more than once in the source document.
    pub duplicate_keys: Vec<String>,
}

/// Analyze an expected document without loader context.
#[must_use]
pub fn analyze_expected(doc: &Value) -> Vec<Suggestion> {
    analyze_expected_with_context(doc, &SyntaxContext::default())
}

/// Analyze an expected document, folding in loader-detected issues.
#[must_use]
pub fn analyze_expected_with_context(doc: &Value, context: &SyntaxContext) -> Vec<Suggestion> {
    let mut suggestions = Vec::new();
    for path in &context.duplicate_keys {
        suggestions.push(Suggestion {
            path: path.clone(),
            found: path.clone(),
            corrected: None,
            message: "duplicate key in the source document; the earlier value is discarded"
                .to_string(),
        });
    }
    scan(doc, "response", &mut suggestions);
    suggestions
}

lazy_static! {
    /// Misspellings and singular/plural slips mapped to canonical names.
    static ref MISSPELLINGS: HashMap<&'static str, &'static str> = {
        let mut table = HashMap::new();
        table.insert("contain", "contains");
        table.insert("startWith", "startsWith");
        table.insert("beginsWith", "startsWith");
        table.insert("endWith", "endsWith");
        table.insert("arrayElement", "arrayElements");
        table.insert("arrayLen", "arrayLength");
        table.insert("arraylength", "arrayLength");
        table.insert("greaterThen", "greaterThan");
        table.insert("lessThen", "lessThan");
        table.insert("equal", "equals");
        table.insert("notEqual", "notEquals");
        table.insert("aproximately", "approximately");
        table.insert("approximatly", "approximately");
        table.insert("stringLen", "stringLength");
        table.insert("dateValidate", "dateValid");
        table.insert("dateIsValid", "dateValid");
        table.insert("divisibleby", "divisibleBy");
        table.insert("multipleof", "multipleOf");
        table.insert("crossfield", "crossField");
        table.insert("extractfield", "extractField");
        table
    };

    /// Operator vocabulary from other assertion libraries.
    static ref OPERATOR_ALIASES: HashMap<&'static str, &'static str> = {
        let mut table = HashMap::new();
        table.insert("eq", "equals");
        table.insert("ne", "notEquals");
        table.insert("neq", "notEquals");
        table.insert("gt", "greaterThan");
        table.insert("gte", "greaterThanOrEqual");
        table.insert("lt", "lessThan");
        table.insert("lte", "lessThanOrEqual");
        table.insert(">", "greaterThan");
        table.insert(">=", "greaterThanOrEqual");
        table.insert("<", "lessThan");
        table.insert("<=", "lessThanOrEqual");
        table
    };
}

/// Pattern families whose arguments are colon-separated pairs; a comma
/// in the argument list is the classic slip.
const PAIRED_ARG_FAMILIES: &[&str] = &[
    "between",
    "range",
    "dateBetween",
    "stringLengthBetween",
    "approximately",
];

fn scan(node: &Value, path: &str, suggestions: &mut Vec<Suggestion>) {
    match node {
        Value::String(text) => scan_string(text, path, suggestions),
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                scan(item, &format!("{path}[{index}]"), suggestions);
            }
        }
        Value::Object(map) => scan_mapping(map, path, suggestions),
        _ => {}
    }
}

fn scan_string(text: &str, path: &str, suggestions: &mut Vec<Suggestion>) {
    match text.strip_prefix(patterns::PATTERN_PREFIX) {
        Some(body) => scan_pattern_body(text, body, path, suggestions),
        None => {
            if patterns::looks_like_unprefixed_pattern(text) {
                suggestions.push(Suggestion {
                    path: path.to_string(),
                    found: text.to_string(),
                    corrected: Some(format!("match:{text}")),
                    message: "looks like a pattern but is missing the 'match:' prefix".to_string(),
                });
            }
        }
    }
}

fn scan_pattern_body(full: &str, body: &str, path: &str, suggestions: &mut Vec<Suggestion>) {
    let mut core = body;
    while let Some(stripped) = core.strip_prefix("not:") {
        core = stripped;
    }
    let (prefix, args) = match core.split_once(':') {
        Some((prefix, args)) => (prefix, Some(args)),
        None => (core, None),
    };
    if let Some(canonical) = MISSPELLINGS.get(prefix) {
        suggestions.push(Suggestion {
            path: path.to_string(),
            found: full.to_string(),
            corrected: Some(full.replacen(prefix, canonical, 1)),
            message: format!("'{prefix}' is not a pattern name; did you mean '{canonical}'?"),
        });
        return;
    }
    if let Some(canonical) = OPERATOR_ALIASES.get(prefix) {
        suggestions.push(Suggestion {
            path: path.to_string(),
            found: full.to_string(),
            corrected: Some(full.replacen(prefix, canonical, 1)),
            message: format!(
                "operator alias '{prefix}' is not supported; the canonical name is '{canonical}'"
            ),
        });
        return;
    }
    if let Some(args) = args {
        if PAIRED_ARG_FAMILIES.contains(&prefix) && args.contains(',') && !args.contains(':') {
            suggestions.push(Suggestion {
                path: path.to_string(),
                found: full.to_string(),
                corrected: Some(full.replace(',', ":")),
                message: format!("'{prefix}' arguments are separated by colons, not commas"),
            });
            return;
        }
        if prefix == "type" {
            scan_type_argument(full, args, path, suggestions);
        }
    }
}

fn scan_type_argument(full: &str, args: &str, path: &str, suggestions: &mut Vec<Suggestion>) {
    use crate::primitive_type::PrimitiveType;
    if PrimitiveType::try_from(args).is_ok() {
        return;
    }
    let unquoted = args.trim_matches(|c| c == '"' || c == '\'');
    let folded = unquoted.to_lowercase();
    if PrimitiveType::try_from(folded.as_str()).is_ok() {
        suggestions.push(Suggestion {
            path: path.to_string(),
            found: full.to_string(),
            corrected: Some(format!("match:type:{folded}")),
            message: format!("type names are lowercase and unquoted: '{args}' -> '{folded}'"),
        });
    }
}

fn scan_mapping(map: &Map<String, Value>, path: &str, suggestions: &mut Vec<Suggestion>) {
    for (key, value) in map {
        let child_path = format!("{path}.{key}");
        // Keys can carry pattern misspellings too (meta-keys).
        if let Some(body) = key.strip_prefix(patterns::PATTERN_PREFIX) {
            let core = body.strip_prefix("not:").unwrap_or(body);
            if let Some(canonical) = MISSPELLINGS.get(core) {
                suggestions.push(Suggestion {
                    path: child_path.clone(),
                    found: key.clone(),
                    corrected: Some(key.replacen(core, canonical, 1)),
                    message: format!("'{core}' is not a directive; did you mean '{canonical}'?"),
                });
            }
        }
        scan(value, &child_path, suggestions);
    }
    if map.contains_key("match:extractField") && !map.contains_key("value") {
        suggestions.push(Suggestion {
            path: path.to_string(),
            found: "match:extractField".to_string(),
            corrected: None,
            message: "extractField requires a sibling 'value' key holding the expectation"
                .to_string(),
        });
    }
    if let Some(subtree) = map.get("match:arrayElements") {
        if !subtree.is_object() {
            suggestions.push(Suggestion {
                path: format!("{path}.match:arrayElements"),
                found: crate::helpers::preview(subtree, 40),
                corrected: None,
                message: "arrayElements takes a mapping of per-element field expectations"
                    .to_string(),
            });
        }
    }
    scan_mixed_assertions(map, path, suggestions);
}

/// A field asserted both exactly (as a sibling literal) and through a
/// `match:partial` subtree is almost always a merge mistake; the two
/// assertions silently diverge as the response evolves.
fn scan_mixed_assertions(map: &Map<String, Value>, path: &str, suggestions: &mut Vec<Suggestion>) {
    let partial = match map.get("match:partial").and_then(Value::as_object) {
        Some(partial) => partial,
        None => return,
    };
    for key in partial.keys() {
        if map.contains_key(key) {
            suggestions.push(Suggestion {
                path: format!("{path}.{key}"),
                found: key.clone(),
                corrected: None,
                message: format!(
                    "'{key}' is asserted both inside match:partial and as a sibling exact value; keep one"
                ),
            });
        }
    }
}
