//! The pattern registry.
//!
//! A pattern token is a string of the form `match:<body>`. The body is
//! tokenized exactly once into a [`PatternKind`], a tagged union with
//! one variant per primitive, and evaluation is an exhaustive match
//! over it. Matchers are pure: `(kind, actual) -> bool`; everything a
//! human needs to know about a failure is produced separately by the
//! diagnostic analyzer.
pub(crate) mod array;
pub(crate) mod cross_field;
pub(crate) mod date;
pub(crate) mod numeric;
pub(crate) mod string;
pub(crate) mod type_;

use crate::options::ValidationOptions;
use serde_json::Value;

/// The `match:` marker every pattern token starts with.
pub const PATTERN_PREFIX: &str = "match:";

/// A parsed pattern token.
#[derive(Debug, Clone, PartialEq)]
pub struct Pattern {
    raw: String,
    negated: bool,
    kind: PatternKind,
}

/// One variant per primitive; arguments are parsed eagerly so matching
/// never re-tokenizes. Structurally bad argument lists collapse into
/// [`PatternKind::Malformed`].
#[derive(Debug, Clone, PartialEq)]
pub enum PatternKind {
    // type family
    Type(String),
    Exists,
    Count(u64),
    // string family
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    ContainsIgnoreCase(String),
    EqualsIgnoreCase(String),
    Regex(String),
    Length(u64),
    StringLength(u64),
    StringLengthGreaterThan(u64),
    StringLengthLessThan(u64),
    StringLengthGreaterThanOrEqual(u64),
    StringLengthLessThanOrEqual(u64),
    StringLengthBetween(u64, u64),
    StringEmpty,
    StringNotEmpty,
    // array family
    ArrayLength(u64),
    ArrayContains {
        field: Option<String>,
        value: String,
    },
    // numeric family
    GreaterThan(f64),
    GreaterThanOrEqual(f64),
    LessThan(f64),
    LessThanOrEqual(f64),
    Between(f64, f64),
    Equals(f64),
    NotEquals(f64),
    Approximately {
        target: f64,
        tolerance: f64,
    },
    MultipleOf(f64),
    DecimalPlaces(u32),
    // date family
    DateValid,
    DateAfter(String),
    DateBefore(String),
    DateEquals(String),
    DateBetween(String, String),
    DateAge(String),
    DateFormat(String),
    // cross-field predicate over the enclosing mapping
    CrossField(String),
    // bare body: regex when it looks like one, substring otherwise
    Default(String),
    // the token itself is broken; never matches, negated or not
    Malformed {
        family: &'static str,
        body: String,
    },
}

impl Pattern {
    /// Parse a full token. Returns `None` unless it starts with `match:`.
    #[must_use]
    pub fn parse(token: &str) -> Option<Pattern> {
        let body = token.strip_prefix(PATTERN_PREFIX)?;
        Some(Pattern::parse_body(body))
    }

    /// Parse a body with the `match:` marker already stripped.
    #[must_use]
    pub fn parse_body(body: &str) -> Pattern {
        let mut negated = false;
        let mut rest = body;
        while let Some(stripped) = rest.strip_prefix("not:") {
            negated = !negated;
            rest = stripped;
        }
        Pattern {
            raw: body.to_string(),
            negated,
            kind: PatternKind::parse(rest),
        }
    }

    /// Evaluate against `actual`.
    ///
    /// Negation is applied after dispatch: a malformed body stays false
    /// so it reports malformed-ness rather than flipping to true.
    #[must_use]
    pub fn matches(&self, actual: &Value, options: &ValidationOptions) -> bool {
        let result = self.kind.matches(actual, options);
        if matches!(self.kind, PatternKind::Malformed { .. }) {
            return false;
        }
        self.negated ^ result
    }

    /// The body as written, including any `not:` markers.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn negated(&self) -> bool {
        self.negated
    }

    #[must_use]
    pub fn kind(&self) -> &PatternKind {
        &self.kind
    }

    /// Canonical family name, used as the failure discriminator.
    #[must_use]
    pub fn family(&self) -> &'static str {
        self.kind.family()
    }
}

fn parse_u64(family: &'static str, args: &str, build: fn(u64) -> PatternKind) -> PatternKind {
    match args.parse::<u64>() {
        Ok(value) => build(value),
        Err(_) => PatternKind::Malformed {
            family,
            body: args.to_string(),
        },
    }
}

fn parse_f64(family: &'static str, args: &str, build: fn(f64) -> PatternKind) -> PatternKind {
    match args.parse::<f64>() {
        Ok(value) => build(value),
        Err(_) => PatternKind::Malformed {
            family,
            body: args.to_string(),
        },
    }
}

fn parse_f64_pair(
    family: &'static str,
    args: &str,
    build: fn(f64, f64) -> PatternKind,
) -> PatternKind {
    let malformed = || PatternKind::Malformed {
        family,
        body: args.to_string(),
    };
    match args.split_once(':') {
        Some((first, second)) => match (first.parse::<f64>(), second.parse::<f64>()) {
            (Ok(a), Ok(b)) => build(a, b),
            _ => malformed(),
        },
        None => malformed(),
    }
}

impl PatternKind {
    pub(crate) fn parse(body: &str) -> PatternKind {
        match body {
            "exists" => return PatternKind::Exists,
            "dateValid" => return PatternKind::DateValid,
            "stringEmpty" => return PatternKind::StringEmpty,
            "stringNotEmpty" => return PatternKind::StringNotEmpty,
            _ => {}
        }
        let (prefix, args) = match body.split_once(':') {
            Some(split) => split,
            None => return PatternKind::Default(body.to_string()),
        };
        match prefix {
            "type" => PatternKind::Type(args.to_string()),
            "count" => parse_u64("count", args, PatternKind::Count),
            "contains" => PatternKind::Contains(args.to_string()),
            "startsWith" => PatternKind::StartsWith(args.to_string()),
            "endsWith" => PatternKind::EndsWith(args.to_string()),
            "containsIgnoreCase" => PatternKind::ContainsIgnoreCase(args.to_string()),
            "equalsIgnoreCase" => PatternKind::EqualsIgnoreCase(args.to_string()),
            "regex" => PatternKind::Regex(args.to_string()),
            "length" => parse_u64("length", args, PatternKind::Length),
            "stringLength" => parse_u64("stringLength", args, PatternKind::StringLength),
            "stringLengthGreaterThan" => parse_u64(
                "stringLengthGreaterThan",
                args,
                PatternKind::StringLengthGreaterThan,
            ),
            "stringLengthLessThan" => parse_u64(
                "stringLengthLessThan",
                args,
                PatternKind::StringLengthLessThan,
            ),
            "stringLengthGreaterThanOrEqual" => parse_u64(
                "stringLengthGreaterThanOrEqual",
                args,
                PatternKind::StringLengthGreaterThanOrEqual,
            ),
            "stringLengthLessThanOrEqual" => parse_u64(
                "stringLengthLessThanOrEqual",
                args,
                PatternKind::StringLengthLessThanOrEqual,
            ),
            "stringLengthBetween" => {
                let malformed = || PatternKind::Malformed {
                    family: "stringLengthBetween",
                    body: args.to_string(),
                };
                match args.split_once(':') {
                    Some((min, max)) => match (min.parse::<u64>(), max.parse::<u64>()) {
                        (Ok(min), Ok(max)) => PatternKind::StringLengthBetween(min, max),
                        _ => malformed(),
                    },
                    None => malformed(),
                }
            }
            "arrayLength" => parse_u64("arrayLength", args, PatternKind::ArrayLength),
            "arrayContains" => match args.split_once(':') {
                Some((field, value)) => PatternKind::ArrayContains {
                    field: Some(field.to_string()),
                    value: value.to_string(),
                },
                None => PatternKind::ArrayContains {
                    field: None,
                    value: args.to_string(),
                },
            },
            "greaterThan" => parse_f64("greaterThan", args, PatternKind::GreaterThan),
            "greaterThanOrEqual" => {
                parse_f64("greaterThanOrEqual", args, PatternKind::GreaterThanOrEqual)
            }
            "lessThan" => parse_f64("lessThan", args, PatternKind::LessThan),
            "lessThanOrEqual" => parse_f64("lessThanOrEqual", args, PatternKind::LessThanOrEqual),
            "between" | "range" => parse_f64_pair("between", args, PatternKind::Between),
            "equals" => parse_f64("equals", args, PatternKind::Equals),
            "notEquals" => parse_f64("notEquals", args, PatternKind::NotEquals),
            "approximately" => parse_f64_pair("approximately", args, |target, tolerance| {
                PatternKind::Approximately { target, tolerance }
            }),
            "multipleOf" | "divisibleBy" => parse_f64("multipleOf", args, PatternKind::MultipleOf),
            "decimalPlaces" => match args.parse::<u32>() {
                Ok(places) => PatternKind::DecimalPlaces(places),
                Err(_) => PatternKind::Malformed {
                    family: "decimalPlaces",
                    body: args.to_string(),
                },
            },
            "dateAfter" => PatternKind::DateAfter(args.to_string()),
            "dateBefore" => PatternKind::DateBefore(args.to_string()),
            "dateEquals" => PatternKind::DateEquals(args.to_string()),
            "dateBetween" => match args.split_once(':') {
                Some((start, end)) => {
                    PatternKind::DateBetween(start.to_string(), end.to_string())
                }
                None => PatternKind::Malformed {
                    family: "dateBetween",
                    body: args.to_string(),
                },
            },
            "dateAge" => PatternKind::DateAge(args.to_string()),
            "dateFormat" => PatternKind::DateFormat(args.to_string()),
            "crossField" => PatternKind::CrossField(args.to_string()),
            _ => PatternKind::Default(body.to_string()),
        }
    }

    pub(crate) fn matches(&self, actual: &Value, options: &ValidationOptions) -> bool {
        match self {
            PatternKind::Type(name) => type_::matches_type(name, actual),
            PatternKind::Exists => !actual.is_null(),
            PatternKind::Count(expected) => type_::count(actual) == Some(*expected),
            PatternKind::Contains(needle) => string::contains(actual, needle),
            PatternKind::StartsWith(prefix) => string::starts_with(actual, prefix),
            PatternKind::EndsWith(suffix) => string::ends_with(actual, suffix),
            PatternKind::ContainsIgnoreCase(needle) => {
                string::contains_ignore_case(actual, needle)
            }
            PatternKind::EqualsIgnoreCase(other) => string::equals_ignore_case(actual, other),
            PatternKind::Regex(pattern) => string::regex_match(actual, pattern),
            PatternKind::Length(expected) => string::length(actual) == Some(*expected),
            PatternKind::StringLength(expected) => {
                string::string_length(actual).map_or(false, |length| length == *expected)
            }
            PatternKind::StringLengthGreaterThan(limit) => {
                string::string_length(actual).map_or(false, |length| length > *limit)
            }
            PatternKind::StringLengthLessThan(limit) => {
                string::string_length(actual).map_or(false, |length| length < *limit)
            }
            PatternKind::StringLengthGreaterThanOrEqual(limit) => {
                string::string_length(actual).map_or(false, |length| length >= *limit)
            }
            PatternKind::StringLengthLessThanOrEqual(limit) => {
                string::string_length(actual).map_or(false, |length| length <= *limit)
            }
            PatternKind::StringLengthBetween(min, max) => string::string_length(actual)
                .map_or(false, |length| length >= *min && length <= *max),
            PatternKind::StringEmpty => {
                string::string_length(actual).map_or(false, |length| length == 0)
            }
            PatternKind::StringNotEmpty => {
                string::string_length(actual).map_or(false, |length| length > 0)
            }
            PatternKind::ArrayLength(expected) => {
                actual.as_array().map_or(false, |items| {
                    items.len() as u64 == *expected
                })
            }
            PatternKind::ArrayContains { field, value } => {
                array::contains(actual, field.as_deref(), value)
            }
            PatternKind::GreaterThan(bound) => numeric::compare(actual, |a| a > *bound),
            PatternKind::GreaterThanOrEqual(bound) => numeric::compare(actual, |a| a >= *bound),
            PatternKind::LessThan(bound) => numeric::compare(actual, |a| a < *bound),
            PatternKind::LessThanOrEqual(bound) => numeric::compare(actual, |a| a <= *bound),
            PatternKind::Between(min, max) => numeric::between(actual, *min, *max),
            PatternKind::Equals(target) => numeric::compare(actual, |a| a == *target),
            PatternKind::NotEquals(target) => numeric::compare(actual, |a| a != *target),
            PatternKind::Approximately { target, tolerance } => {
                numeric::approximately(actual, *target, *tolerance)
            }
            PatternKind::MultipleOf(divisor) => numeric::multiple_of(actual, *divisor),
            PatternKind::DecimalPlaces(places) => numeric::decimal_places(actual, *places),
            PatternKind::DateValid => date::is_valid(actual),
            PatternKind::DateAfter(reference) => date::after(actual, reference),
            PatternKind::DateBefore(reference) => date::before(actual, reference),
            PatternKind::DateEquals(reference) => date::equals(actual, reference),
            PatternKind::DateBetween(start, end) => date::between(actual, start, end),
            PatternKind::DateAge(duration) => date::age_within(actual, duration, options.now()),
            PatternKind::DateFormat(token) => date::has_format(actual, token),
            PatternKind::CrossField(predicate) => {
                cross_field::evaluate(predicate, actual).passed()
            }
            PatternKind::Default(body) => string::default_match(actual, body),
            PatternKind::Malformed { .. } => false,
        }
    }

    /// Canonical family name for the failure discriminator.
    #[must_use]
    pub fn family(&self) -> &'static str {
        match self {
            PatternKind::Type(_) => "type",
            PatternKind::Exists => "exists",
            PatternKind::Count(_) => "count",
            PatternKind::Contains(_) => "contains",
            PatternKind::StartsWith(_) => "startsWith",
            PatternKind::EndsWith(_) => "endsWith",
            PatternKind::ContainsIgnoreCase(_) => "containsIgnoreCase",
            PatternKind::EqualsIgnoreCase(_) => "equalsIgnoreCase",
            PatternKind::Regex(_) => "regex",
            PatternKind::Length(_) => "length",
            PatternKind::StringLength(_) => "stringLength",
            PatternKind::StringLengthGreaterThan(_) => "stringLengthGreaterThan",
            PatternKind::StringLengthLessThan(_) => "stringLengthLessThan",
            PatternKind::StringLengthGreaterThanOrEqual(_) => "stringLengthGreaterThanOrEqual",
            PatternKind::StringLengthLessThanOrEqual(_) => "stringLengthLessThanOrEqual",
            PatternKind::StringLengthBetween(_, _) => "stringLengthBetween",
            PatternKind::StringEmpty => "stringEmpty",
            PatternKind::StringNotEmpty => "stringNotEmpty",
            PatternKind::ArrayLength(_) => "arrayLength",
            PatternKind::ArrayContains { .. } => "arrayContains",
            PatternKind::GreaterThan(_) => "greaterThan",
            PatternKind::GreaterThanOrEqual(_) => "greaterThanOrEqual",
            PatternKind::LessThan(_) => "lessThan",
            PatternKind::LessThanOrEqual(_) => "lessThanOrEqual",
            PatternKind::Between(_, _) => "between",
            PatternKind::Equals(_) => "equals",
            PatternKind::NotEquals(_) => "notEquals",
            PatternKind::Approximately { .. } => "approximately",
            PatternKind::MultipleOf(_) => "multipleOf",
            PatternKind::DecimalPlaces(_) => "decimalPlaces",
            PatternKind::DateValid => "dateValid",
            PatternKind::DateAfter(_) => "dateAfter",
            PatternKind::DateBefore(_) => "dateBefore",
            PatternKind::DateEquals(_) => "dateEquals",
            PatternKind::DateBetween(_, _) => "dateBetween",
            PatternKind::DateAge(_) => "dateAge",
            PatternKind::DateFormat(_) => "dateFormat",
            PatternKind::CrossField(_) => "crossField",
            PatternKind::Default(_) => "pattern",
            PatternKind::Malformed { family, .. } => *family,
        }
    }
}

/// Every prefix the registry dispatches on, aliases included. Shared
/// with the missing-`match:` heuristic and the syntax analyzer.
pub(crate) const KNOWN_PREFIXES: &[&str] = &[
    "type",
    "count",
    "contains",
    "startsWith",
    "endsWith",
    "containsIgnoreCase",
    "equalsIgnoreCase",
    "regex",
    "length",
    "stringLength",
    "stringLengthGreaterThan",
    "stringLengthLessThan",
    "stringLengthGreaterThanOrEqual",
    "stringLengthLessThanOrEqual",
    "stringLengthBetween",
    "arrayLength",
    "arrayContains",
    "greaterThan",
    "greaterThanOrEqual",
    "lessThan",
    "lessThanOrEqual",
    "between",
    "range",
    "equals",
    "notEquals",
    "approximately",
    "multipleOf",
    "divisibleBy",
    "decimalPlaces",
    "dateAfter",
    "dateBefore",
    "dateEquals",
    "dateBetween",
    "dateAge",
    "dateFormat",
    "crossField",
];

/// Bare identifiers with no argument list.
pub(crate) const KNOWN_BARE: &[&str] = &["exists", "dateValid", "stringEmpty", "stringNotEmpty"];

/// Whether a plain string looks like a pattern body that lost its
/// `match:` marker.
pub(crate) fn looks_like_unprefixed_pattern(candidate: &str) -> bool {
    if KNOWN_BARE.contains(&candidate) {
        return true;
    }
    candidate
        .split_once(':')
        .map_or(false, |(prefix, _)| KNOWN_PREFIXES.contains(&prefix))
}

#[cfg(test)]
mod tests {
    use super::{Pattern, PatternKind};
    use crate::options::ValidationOptions;
    use serde_json::{json, Value};
    use test_case::test_case;

    fn matches(token: &str, actual: Value) -> bool {
        Pattern::parse(token)
            .expect("token carries the match: prefix")
            .matches(&actual, &ValidationOptions::default())
    }

    #[test]
    fn tokens_without_prefix_do_not_parse() {
        assert!(Pattern::parse("arrayLength:2").is_none());
    }

    #[test]
    fn negation_is_stacked() {
        let single = Pattern::parse("match:not:exists").unwrap();
        assert!(single.negated());
        let double = Pattern::parse("match:not:not:exists").unwrap();
        assert!(!double.negated());
        assert_eq!(double.kind(), &PatternKind::Exists);
    }

    #[test_case("match:type:string", json!("x"), true)]
    #[test_case("match:type:array", json!({"a": 1}), false)]
    #[test_case("match:exists", json!(0), true)]
    #[test_case("match:exists", json!(null), false)]
    #[test_case("match:not:exists", json!(null), true)]
    #[test_case("match:count:2", json!({"a": 1, "b": 2}), true)]
    #[test_case("match:count:2", json!([1, 2, 3]), false)]
    #[test_case("match:contains:read", json!("read_file"), true)]
    #[test_case("match:startsWith:read", json!("read_file"), true)]
    #[test_case("match:endsWith:file", json!("read_file"), true)]
    #[test_case("match:containsIgnoreCase:READ", json!("read_file"), true)]
    #[test_case("match:equalsIgnoreCase:Read_File", json!("read_file"), true)]
    #[test_case("match:regex:^r.*e$", json!("read_file"), true)]
    #[test_case("match:length:4", json!("abcd"), true)]
    #[test_case("match:length:2", json!([1, 2]), true)]
    #[test_case("match:stringLengthBetween:2:4", json!("abc"), true)]
    #[test_case("match:stringEmpty", json!(""), true)]
    #[test_case("match:stringNotEmpty", json!("x"), true)]
    #[test_case("match:stringNotEmpty", json!(7), false; "numbers have no string length")]
    #[test_case("match:arrayLength:2", json!(["a", "b"]), true)]
    #[test_case("match:arrayContains:read_file", json!(["read_file", "other"]), true)]
    #[test_case("match:arrayContains:name:read_file", json!([{"name": "read_file"}]), true)]
    #[test_case("match:greaterThan:5", json!(6), true)]
    #[test_case("match:greaterThan:5", json!("6"), false; "strings are not numbers")]
    #[test_case("match:between:10:20", json!(10), true; "between is inclusive")]
    #[test_case("match:range:10:20", json!(15), true; "range is an alias")]
    #[test_case("match:approximately:100:0.5", json!(100.3), true)]
    #[test_case("match:approximately:100:0.5", json!(101), false)]
    #[test_case("match:multipleOf:3", json!(9), true)]
    #[test_case("match:divisibleBy:3", json!(10), false)]
    #[test_case("match:decimalPlaces:2", json!(3.14), true)]
    #[test_case("match:decimalPlaces:0", json!(3), true)]
    #[test_case("match:not:greaterThan:5", json!(3), true)]
    fn primitive_dispatch(token: &str, actual: Value, expected: bool) {
        assert_eq!(matches(token, actual), expected);
    }

    #[test_case("match:between:abc:5"; "between non numeric")]
    #[test_case("match:between:5"; "between missing bound")]
    #[test_case("match:arrayLength:many"; "array length non numeric")]
    #[test_case("match:not:between:abc:5"; "negation does not flip malformed")]
    fn malformed_never_matches(token: &str) {
        assert!(!matches(token, json!(10)));
        let pattern = Pattern::parse(token).unwrap();
        assert!(matches!(pattern.kind(), PatternKind::Malformed { .. }));
    }

    #[test]
    fn default_body_substring() {
        assert!(matches("match:read", json!("read_file")));
        assert!(!matches("match:write", json!("read_file")));
    }

    #[test]
    fn unknown_prefix_falls_back_to_default() {
        let pattern = Pattern::parse("match:sumGreaterThan:5").unwrap();
        assert!(matches!(pattern.kind(), PatternKind::Default(_)));
    }

    #[test_case("arrayLength:2", true)]
    #[test_case("contains:foo", true)]
    #[test_case("exists", true)]
    #[test_case("plain text", false)]
    #[test_case("unknownThing:5", false)]
    fn unprefixed_detection(candidate: &str, expected: bool) {
        assert_eq!(super::looks_like_unprefixed_pattern(candidate), expected);
    }
}
