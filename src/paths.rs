//! Facilities for extracting values out of a JSON tree by field path.
//!
//! Paths use the dot/bracket grammar test authors write in expected
//! documents: `tools.0.name`, `tools[0].name`, `tools.*.name` and
//! `tools[*].name` are all valid, and the dot and bracket forms are
//! interchangeable.
use serde_json::Value;
use std::{fmt, fmt::Write, str::FromStr};

/// One step of a traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Mapping key lookup.
    Key(String),
    /// Array index lookup.
    Index(usize),
    /// Broadcast over every element of an array.
    Wildcard,
}

/// A parsed field path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath(Vec<PathSegment>);

/// The path spec itself could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParseError {
    spec: String,
    reason: &'static str,
}

impl fmt::Display for PathParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid field path '{}': {}", self.spec, self.reason)
    }
}

impl std::error::Error for PathParseError {}

impl FieldPath {
    /// Parse a dot/bracket path spec into segments.
    pub fn parse(spec: &str) -> Result<FieldPath, PathParseError> {
        let fail = |reason| {
            Err(PathParseError {
                spec: spec.to_string(),
                reason,
            })
        };
        if spec.is_empty() {
            return fail("empty path");
        }
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut chars = spec.chars().peekable();
        let mut expect_segment = true;
        while let Some(ch) = chars.next() {
            match ch {
                '.' => {
                    if current.is_empty() && expect_segment {
                        return fail("empty segment");
                    }
                    if !current.is_empty() {
                        segments.push(segment_from(&current));
                        current.clear();
                    }
                    expect_segment = true;
                }
                '[' => {
                    if !current.is_empty() {
                        segments.push(segment_from(&current));
                        current.clear();
                    }
                    let mut inner = String::new();
                    loop {
                        match chars.next() {
                            Some(']') => break,
                            Some(c) => inner.push(c),
                            None => return fail("unterminated '['"),
                        }
                    }
                    if inner.is_empty() {
                        return fail("empty brackets");
                    }
                    segments.push(segment_from(&inner));
                    // A bracket closes a segment; a following dot is separator only.
                    expect_segment = false;
                    if chars.peek() == Some(&'.') {
                        chars.next();
                        expect_segment = true;
                    }
                }
                ']' => return fail("unmatched ']'"),
                _ => current.push(ch),
            }
        }
        if !current.is_empty() {
            segments.push(segment_from(&current));
        } else if expect_segment {
            return fail("trailing '.'");
        }
        if segments.is_empty() {
            return fail("empty path");
        }
        Ok(FieldPath(segments))
    }

    /// The parsed segments, in traversal order.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Walk `value` along this path.
    ///
    /// Returns `None` for out-of-bounds indexes, absent keys and
    /// segments applied to non-containers; extraction never errors.
    /// A wildcard maps the remaining path over every array element,
    /// skipping elements where the remainder resolves to nothing; a
    /// trailing wildcard yields the array itself.
    #[must_use]
    pub fn extract(&self, value: &Value) -> Option<Value> {
        extract_segments(&self.0, value)
    }
}

fn segment_from(raw: &str) -> PathSegment {
    if raw == "*" {
        PathSegment::Wildcard
    } else if let Ok(index) = raw.parse::<usize>() {
        PathSegment::Index(index)
    } else {
        PathSegment::Key(raw.to_string())
    }
}

fn extract_segments(segments: &[PathSegment], value: &Value) -> Option<Value> {
    let (head, rest) = match segments.split_first() {
        Some(split) => split,
        None => return Some(value.clone()),
    };
    match head {
        PathSegment::Key(key) => match value {
            Value::Object(map) => map.get(key).and_then(|inner| extract_segments(rest, inner)),
            // Mirrors dynamic-language indexing: a numeric-looking key
            // still indexes an array.
            Value::Array(items) => key
                .parse::<usize>()
                .ok()
                .and_then(|index| items.get(index))
                .and_then(|inner| extract_segments(rest, inner)),
            _ => None,
        },
        PathSegment::Index(index) => match value {
            Value::Array(items) => items
                .get(*index)
                .and_then(|inner| extract_segments(rest, inner)),
            Value::Object(map) => map
                .get(&index.to_string())
                .and_then(|inner| extract_segments(rest, inner)),
            _ => None,
        },
        PathSegment::Wildcard => match value {
            Value::Array(items) => {
                if rest.is_empty() {
                    Some(value.clone())
                } else {
                    Some(Value::Array(
                        items
                            .iter()
                            .filter_map(|item| extract_segments(rest, item))
                            .collect(),
                    ))
                }
            }
            _ => None,
        },
    }
}

impl fmt::Display for FieldPath {
    /// Renders in dot form; parsing the rendering yields an equal path.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.0.iter().enumerate() {
            if position > 0 {
                f.write_char('.')?;
            }
            match segment {
                PathSegment::Key(key) => f.write_str(key)?,
                PathSegment::Index(index) => write!(f, "{index}")?,
                PathSegment::Wildcard => f.write_char('*')?,
            }
        }
        Ok(())
    }
}

impl FromStr for FieldPath {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldPath::parse(s)
    }
}

/// Extract a field path from `value`; `None` covers both unresolvable
/// paths and unparseable specs.
#[must_use]
pub fn extract_field(value: &Value, spec: &str) -> Option<Value> {
    FieldPath::parse(spec).ok()?.extract(value)
}
