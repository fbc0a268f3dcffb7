//! The diagnostic analyzer.
//!
//! For every failed pattern this module produces a structured
//! explanation: a discriminated failure kind, a human message, an
//! actionable suggestion, and machine-readable details (operands,
//! differences, remainders). Matching and explaining are deliberately
//! separate passes; matchers stay pure booleans.
use crate::{
    error::{FailureKind, FeatureCategory},
    helpers::{preview, value_to_string},
    options::ValidationOptions,
    patterns::{
        cross_field::{CrossFieldEval, Outcome},
        date, numeric, string, Pattern, PatternKind,
    },
    primitive_type::PrimitiveType,
};
use serde_json::{json, Value};

const PREVIEW_LIMIT: usize = 40;
const SAMPLE_LIMIT: usize = 3;

/// A structured explanation of one pattern failure.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub kind: FailureKind,
    pub message: String,
    pub suggestion: Option<String>,
    pub details: Option<Value>,
}

impl Diagnostic {
    fn new(kind: FailureKind, message: String) -> Diagnostic {
        Diagnostic {
            kind,
            message,
            suggestion: None,
            details: None,
        }
    }

    fn suggest(mut self, suggestion: String) -> Diagnostic {
        self.suggestion = Some(suggestion);
        self
    }

    fn detail(mut self, details: Value) -> Diagnostic {
        self.details = Some(details);
        self
    }
}

/// Explain why `pattern` failed on `actual`.
pub(crate) fn explain(
    pattern: &Pattern,
    actual: &Value,
    options: &ValidationOptions,
) -> Diagnostic {
    // A negated pattern fails by matching.
    if pattern.negated() && pattern.kind().matches(actual, options) {
        return Diagnostic::new(
            FailureKind::Pattern(pattern.family()),
            format!(
                "'{}' matched '{}' but the pattern is negated",
                preview(actual, PREVIEW_LIMIT),
                pattern.raw()
            ),
        )
        .suggest("remove the not: marker if a match is acceptable".to_string());
    }
    match pattern.kind() {
        PatternKind::Type(name) => explain_type(name, actual),
        PatternKind::Exists => Diagnostic::new(
            FailureKind::Pattern("exists"),
            "value is null".to_string(),
        )
        .suggest("if null is acceptable, use match:type:null or drop the assertion".to_string()),
        PatternKind::Count(expected) => explain_count(*expected, actual),
        PatternKind::Contains(needle) => explain_contains(needle, actual, false),
        PatternKind::ContainsIgnoreCase(needle) => explain_contains(needle, actual, true),
        PatternKind::StartsWith(prefix) => explain_starts_with(prefix, actual),
        PatternKind::EndsWith(suffix) => explain_ends_with(suffix, actual),
        PatternKind::EqualsIgnoreCase(other) => explain_equals_ignore_case(other, actual),
        PatternKind::Regex(regex) => explain_regex(regex, actual),
        PatternKind::Length(expected) => explain_length(*expected, actual),
        PatternKind::StringLength(n) => explain_string_length("stringLength", "exactly", *n, actual),
        PatternKind::StringLengthGreaterThan(n) => {
            explain_string_length("stringLengthGreaterThan", "more than", *n, actual)
        }
        PatternKind::StringLengthLessThan(n) => {
            explain_string_length("stringLengthLessThan", "fewer than", *n, actual)
        }
        PatternKind::StringLengthGreaterThanOrEqual(n) => {
            explain_string_length("stringLengthGreaterThanOrEqual", "at least", *n, actual)
        }
        PatternKind::StringLengthLessThanOrEqual(n) => {
            explain_string_length("stringLengthLessThanOrEqual", "at most", *n, actual)
        }
        PatternKind::StringLengthBetween(min, max) => {
            explain_string_length_between(*min, *max, actual)
        }
        PatternKind::StringEmpty => explain_string_emptiness("stringEmpty", true, actual),
        PatternKind::StringNotEmpty => explain_string_emptiness("stringNotEmpty", false, actual),
        PatternKind::ArrayLength(expected) => explain_array_length(*expected, actual),
        PatternKind::ArrayContains { field, value } => {
            explain_array_contains(field.as_deref(), value, actual, options)
        }
        PatternKind::GreaterThan(bound) => {
            explain_comparison("greaterThan", "greater than", *bound, actual)
        }
        PatternKind::GreaterThanOrEqual(bound) => {
            explain_comparison("greaterThanOrEqual", "at least", *bound, actual)
        }
        PatternKind::LessThan(bound) => explain_comparison("lessThan", "less than", *bound, actual),
        PatternKind::LessThanOrEqual(bound) => {
            explain_comparison("lessThanOrEqual", "at most", *bound, actual)
        }
        PatternKind::Equals(target) => explain_comparison("equals", "equal to", *target, actual),
        PatternKind::NotEquals(target) => {
            explain_comparison("notEquals", "different from", *target, actual)
        }
        PatternKind::Between(min, max) => explain_between(*min, *max, actual),
        PatternKind::Approximately { target, tolerance } => {
            explain_approximately(*target, *tolerance, actual)
        }
        PatternKind::MultipleOf(divisor) => explain_multiple_of(*divisor, actual),
        PatternKind::DecimalPlaces(places) => explain_decimal_places(*places, actual),
        PatternKind::DateValid => explain_unparseable_date("dateValid", actual),
        PatternKind::DateAfter(reference) => {
            explain_date_relation("dateAfter", "after", reference, actual)
        }
        PatternKind::DateBefore(reference) => {
            explain_date_relation("dateBefore", "before", reference, actual)
        }
        PatternKind::DateEquals(reference) => {
            explain_date_relation("dateEquals", "equal to", reference, actual)
        }
        PatternKind::DateBetween(start, end) => explain_date_between(start, end, actual),
        PatternKind::DateAge(duration) => explain_date_age(duration, actual, options),
        PatternKind::DateFormat(token) => explain_date_format(token, actual),
        PatternKind::CrossField(predicate) => {
            let eval = crate::patterns::cross_field::evaluate(predicate, actual);
            explain_cross_field(&eval, pattern.negated())
        }
        PatternKind::Default(body) => explain_default(body, actual),
        PatternKind::Malformed { family, body } => malformed(*family, body),
    }
}

fn malformed(family: &'static str, body: &str) -> Diagnostic {
    let mut diagnostic = Diagnostic::new(
        FailureKind::Malformed(family),
        format!("malformed '{family}' arguments: '{body}'"),
    );
    if let Some(usage) = usage(family) {
        diagnostic = diagnostic.suggest(format!("expected the form {usage}"));
    }
    diagnostic
}

/// Canonical token shapes, quoted back at the author on malformed input.
fn usage(family: &str) -> Option<&'static str> {
    Some(match family {
        "type" => "match:type:<string|number|integer|boolean|object|array|null>",
        "count" => "match:count:<n>",
        "length" => "match:length:<n>",
        "stringLength" => "match:stringLength:<n>",
        "stringLengthGreaterThan" => "match:stringLengthGreaterThan:<n>",
        "stringLengthLessThan" => "match:stringLengthLessThan:<n>",
        "stringLengthGreaterThanOrEqual" => "match:stringLengthGreaterThanOrEqual:<n>",
        "stringLengthLessThanOrEqual" => "match:stringLengthLessThanOrEqual:<n>",
        "stringLengthBetween" => "match:stringLengthBetween:<min>:<max>",
        "arrayLength" => "match:arrayLength:<n>",
        "greaterThan" => "match:greaterThan:<n>",
        "greaterThanOrEqual" => "match:greaterThanOrEqual:<n>",
        "lessThan" => "match:lessThan:<n>",
        "lessThanOrEqual" => "match:lessThanOrEqual:<n>",
        "between" => "match:between:<min>:<max>",
        "equals" => "match:equals:<n>",
        "notEquals" => "match:notEquals:<n>",
        "approximately" => "match:approximately:<target>:<tolerance>",
        "multipleOf" => "match:multipleOf:<divisor>",
        "decimalPlaces" => "match:decimalPlaces:<n>",
        "dateAfter" => "match:dateAfter:<iso-date>",
        "dateBefore" => "match:dateBefore:<iso-date>",
        "dateEquals" => "match:dateEquals:<iso-date>",
        "dateBetween" => "match:dateBetween:<start>:<end>",
        "dateAge" => "match:dateAge:<int>(ms|s|m|h|d)",
        "dateFormat" => "match:dateFormat:<iso|iso-date|iso-time|us-date|eu-date|timestamp>",
        "regex" => "match:regex:<pattern>",
        "crossField" => "match:crossField:<lhs_path> <op> <rhs_path>",
        "extractField" => "match:extractField:<path> with a sibling 'value' key",
        _ => return None,
    })
}

fn explain_type(name: &str, actual: &Value) -> Diagnostic {
    if PrimitiveType::try_from(name).is_err() {
        return malformed("type", name).suggest(format!(
            "unknown type '{name}'; use one of string, number, integer, boolean, object, array, null"
        ));
    }
    let observed = PrimitiveType::of(actual);
    let mut diagnostic = Diagnostic::new(
        FailureKind::Pattern("type"),
        format!(
            "'{}' is not of type '{name}' (received {observed})",
            preview(actual, PREVIEW_LIMIT)
        ),
    );
    let mut suggestion = format!("use match:type:{observed} to assert the received type");
    match actual {
        Value::Array(items) => {
            let element_types: Vec<String> = items
                .iter()
                .take(SAMPLE_LIMIT)
                .map(|item| PrimitiveType::of(item).to_string())
                .collect();
            diagnostic = diagnostic.detail(json!({
                "length": items.len(),
                "elementTypes": element_types,
            }));
            suggestion.push_str(&format!(
                "; received array; if asserting length use match:length:{}",
                items.len()
            ));
        }
        Value::Object(map) => {
            let keys: Vec<&String> = map.keys().take(5).collect();
            diagnostic = diagnostic.detail(json!({
                "keyCount": map.len(),
                "keys": keys,
            }));
            if name == "array" || name == "arr" || name == "list" {
                suggestion.push_str("; hint: did you mean object schema validation?");
            }
        }
        Value::String(item) => {
            diagnostic = diagnostic.detail(json!({
                "length": item.chars().count(),
                "preview": preview(actual, PREVIEW_LIMIT),
            }));
        }
        _ => {}
    }
    diagnostic.suggest(suggestion)
}

fn explain_count(expected: u64, actual: &Value) -> Diagnostic {
    match crate::patterns::type_::count(actual) {
        Some(observed) => Diagnostic::new(
            FailureKind::Pattern("count"),
            format!("expected {expected} entries, found {observed}"),
        )
        .detail(json!({"expected": expected, "actual": observed}))
        .suggest(format!("use match:count:{observed} to assert the received count")),
        None => Diagnostic::new(
            FailureKind::Pattern("count"),
            format!(
                "'{}' has no count ({} values are not containers)",
                preview(actual, PREVIEW_LIMIT),
                PrimitiveType::of(actual)
            ),
        )
        .suggest("count applies to objects and arrays only".to_string()),
    }
}

fn diff_index(left: &str, right: &str) -> usize {
    left.chars()
        .zip(right.chars())
        .take_while(|(a, b)| a == b)
        .count()
}

fn explain_contains(needle: &str, actual: &Value, ignore_case: bool) -> Diagnostic {
    let family = if ignore_case {
        "containsIgnoreCase"
    } else {
        "contains"
    };
    let text = value_to_string(actual);
    let mut diagnostic = Diagnostic::new(
        FailureKind::Pattern(family),
        format!(
            "'{}' does not contain '{needle}'",
            preview(actual, PREVIEW_LIMIT)
        ),
    )
    .detail(json!({"needle": needle, "actualLength": text.chars().count()}));
    if ignore_case {
        diagnostic = diagnostic.detail(json!({
            "needle": needle.to_lowercase(),
            "actualFolded": preview(&Value::String(text.to_lowercase()), PREVIEW_LIMIT),
        }));
    } else if string::contains_ignore_case(actual, needle) {
        diagnostic = diagnostic
            .suggest(format!("case differs; use match:containsIgnoreCase:{needle}"));
    }
    diagnostic
}

fn explain_starts_with(prefix: &str, actual: &Value) -> Diagnostic {
    let text = value_to_string(actual);
    let shared = diff_index(&text, prefix);
    Diagnostic::new(
        FailureKind::Pattern("startsWith"),
        format!(
            "'{}' does not start with '{prefix}' (diverges at index {shared})",
            preview(actual, PREVIEW_LIMIT)
        ),
    )
    .detail(json!({"sharedPrefixLength": shared, "diffIndex": shared}))
    .suggest(format!(
        "actual begins with '{}'",
        text.chars().take(prefix.chars().count()).collect::<String>()
    ))
}

fn explain_ends_with(suffix: &str, actual: &Value) -> Diagnostic {
    let text = value_to_string(actual);
    let shared = {
        let reversed_text: String = text.chars().rev().collect();
        let reversed_suffix: String = suffix.chars().rev().collect();
        diff_index(&reversed_text, &reversed_suffix)
    };
    Diagnostic::new(
        FailureKind::Pattern("endsWith"),
        format!(
            "'{}' does not end with '{suffix}'",
            preview(actual, PREVIEW_LIMIT)
        ),
    )
    .detail(json!({"sharedSuffixLength": shared}))
    .suggest(format!(
        "actual ends with '{}'",
        text.chars()
            .skip(text.chars().count().saturating_sub(suffix.chars().count()))
            .collect::<String>()
    ))
}

fn explain_equals_ignore_case(other: &str, actual: &Value) -> Diagnostic {
    let folded = value_to_string(actual).to_lowercase();
    let target = other.to_lowercase();
    Diagnostic::new(
        FailureKind::Pattern("equalsIgnoreCase"),
        format!(
            "'{}' does not equal '{other}' ignoring case",
            preview(actual, PREVIEW_LIMIT)
        ),
    )
    .detail(json!({
        "actualFolded": folded,
        "expectedFolded": target,
        "diffIndex": diff_index(&folded, &target),
    }))
}

fn explain_regex(pattern: &str, actual: &Value) -> Diagnostic {
    if let Err(error) = regex::Regex::new(pattern) {
        return Diagnostic::new(
            FailureKind::Malformed("regex"),
            format!("invalid regular expression '{pattern}': {error}"),
        );
    }
    match actual {
        Value::Array(items) => {
            let sample: Vec<String> = items
                .iter()
                .take(SAMPLE_LIMIT)
                .map(|item| preview(item, PREVIEW_LIMIT))
                .collect();
            Diagnostic::new(
                FailureKind::Pattern("regex"),
                format!("no element matched /{pattern}/"),
            )
            .detail(json!({"length": items.len(), "sample": sample}))
        }
        _ => Diagnostic::new(
            FailureKind::Pattern("regex"),
            format!(
                "'{}' does not match /{pattern}/",
                preview(actual, PREVIEW_LIMIT)
            ),
        ),
    }
}

fn explain_length(expected: u64, actual: &Value) -> Diagnostic {
    match string::length(actual) {
        Some(observed) => Diagnostic::new(
            FailureKind::Pattern("length"),
            format!("expected length {expected}, found {observed}"),
        )
        .detail(json!({"expected": expected, "actual": observed}))
        .suggest(format!("use match:length:{observed} to assert the received length")),
        None => Diagnostic::new(
            FailureKind::Pattern("length"),
            format!(
                "'{}' has no length ({} values are neither strings nor arrays)",
                preview(actual, PREVIEW_LIMIT),
                PrimitiveType::of(actual)
            ),
        ),
    }
}

fn explain_string_length(
    family: &'static str,
    relation: &str,
    limit: u64,
    actual: &Value,
) -> Diagnostic {
    match string::string_length(actual) {
        Some(observed) => Diagnostic::new(
            FailureKind::Pattern(family),
            format!("expected {relation} {limit} characters, found {observed}"),
        )
        .detail(json!({"limit": limit, "actual": observed})),
        None => not_a_string(family, actual),
    }
}

fn explain_string_length_between(min: u64, max: u64, actual: &Value) -> Diagnostic {
    if min > max {
        return Diagnostic::new(
            FailureKind::Reversed("stringLengthBetween"),
            format!("bounds are reversed: {min} > {max}"),
        )
        .suggest(format!("did you mean match:stringLengthBetween:{max}:{min}?"));
    }
    match string::string_length(actual) {
        Some(observed) => Diagnostic::new(
            FailureKind::Pattern("stringLengthBetween"),
            format!("expected between {min} and {max} characters, found {observed}"),
        )
        .detail(json!({"min": min, "max": max, "actual": observed})),
        None => not_a_string("stringLengthBetween", actual),
    }
}

fn explain_string_emptiness(family: &'static str, want_empty: bool, actual: &Value) -> Diagnostic {
    match string::string_length(actual) {
        Some(observed) => Diagnostic::new(
            FailureKind::Pattern(family),
            if want_empty {
                format!("expected an empty string, found {observed} characters")
            } else {
                "expected a non-empty string".to_string()
            },
        )
        .detail(json!({"actualLength": observed})),
        None => not_a_string(family, actual),
    }
}

fn not_a_string(family: &'static str, actual: &Value) -> Diagnostic {
    Diagnostic::new(
        FailureKind::Pattern(family),
        format!(
            "'{}' is not a string (received {})",
            preview(actual, PREVIEW_LIMIT),
            PrimitiveType::of(actual)
        ),
    )
    .suggest("assert the type first with match:type:string".to_string())
}

fn explain_array_length(expected: u64, actual: &Value) -> Diagnostic {
    match actual {
        Value::Array(items) => Diagnostic::new(
            FailureKind::Pattern("arrayLength"),
            format!("expected {expected} elements, found {}", items.len()),
        )
        .detail(json!({"expected": expected, "actual": items.len()}))
        .suggest(format!(
            "use match:arrayLength:{} to assert the received length",
            items.len()
        )),
        Value::Object(map) => Diagnostic::new(
            FailureKind::Pattern("arrayLength"),
            format!("expected an array, received an object with {} keys", map.len()),
        )
        .suggest(format!("for mappings use match:count:{}", map.len())),
        _ => Diagnostic::new(
            FailureKind::Pattern("arrayLength"),
            format!(
                "'{}' is not an array (received {})",
                preview(actual, PREVIEW_LIMIT),
                PrimitiveType::of(actual)
            ),
        ),
    }
}

fn explain_array_contains(
    field: Option<&str>,
    value: &str,
    actual: &Value,
    options: &ValidationOptions,
) -> Diagnostic {
    let described = match field {
        Some(field) => format!("an element with {field} == '{value}'"),
        None => format!("the element '{value}'"),
    };
    match actual {
        Value::Array(items) => {
            let details = if options.debug {
                json!({"length": items.len(), "payload": actual})
            } else {
                json!({
                    "length": items.len(),
                    "firstElementType": items
                        .first()
                        .map(|item| PrimitiveType::of(item).to_string()),
                })
            };
            Diagnostic::new(
                FailureKind::Pattern("arrayContains"),
                format!("array of {} elements does not contain {described}", items.len()),
            )
            .detail(details)
        }
        _ => Diagnostic::new(
            FailureKind::Pattern("arrayContains"),
            format!(
                "'{}' is not an array (received {})",
                preview(actual, PREVIEW_LIMIT),
                PrimitiveType::of(actual)
            ),
        ),
    }
}

fn not_a_number(family: &'static str, actual: &Value) -> Diagnostic {
    let mut diagnostic = Diagnostic::new(
        FailureKind::Pattern(family),
        format!(
            "'{}' is not a number (received {})",
            preview(actual, PREVIEW_LIMIT),
            PrimitiveType::of(actual)
        ),
    );
    if let Value::String(item) = actual {
        if item.trim().parse::<f64>().is_ok() {
            diagnostic = diagnostic.suggest(
                "value is a numeric string; compare it as a string or fix the producer"
                    .to_string(),
            );
            return diagnostic;
        }
    }
    diagnostic.suggest("assert the type first with match:type:number".to_string())
}

fn explain_comparison(
    family: &'static str,
    relation: &str,
    bound: f64,
    actual: &Value,
) -> Diagnostic {
    match actual.as_f64() {
        Some(observed) => Diagnostic::new(
            FailureKind::Pattern(family),
            format!("{observed} is not {relation} {bound}"),
        )
        .detail(json!({"expected": bound, "actual": observed, "difference": observed - bound})),
        None => not_a_number(family, actual),
    }
}

fn explain_between(min: f64, max: f64, actual: &Value) -> Diagnostic {
    if min > max {
        return Diagnostic::new(
            FailureKind::Reversed("between"),
            format!("bounds are reversed: {min} > {max}"),
        )
        .suggest(format!("did you mean match:between:{max}:{min}?"));
    }
    match actual.as_f64() {
        Some(observed) => {
            let distance = if observed < min {
                observed - min
            } else {
                observed - max
            };
            Diagnostic::new(
                FailureKind::Pattern("between"),
                format!("{observed} is not between {min} and {max} (inclusive)"),
            )
            .detail(json!({
                "min": min,
                "max": max,
                "actual": observed,
                "distance": distance,
            }))
        }
        None => not_a_number("between", actual),
    }
}

fn explain_approximately(target: f64, tolerance: f64, actual: &Value) -> Diagnostic {
    match actual.as_f64() {
        Some(observed) => {
            let difference = (observed - target).abs();
            Diagnostic::new(
                FailureKind::Pattern("approximately"),
                format!("|{difference}| > {tolerance} (value {observed} vs target {target})"),
            )
            .detail(json!({
                "target": target,
                "tolerance": tolerance,
                "difference": difference,
            }))
        }
        None => not_a_number("approximately", actual),
    }
}

fn explain_multiple_of(divisor: f64, actual: &Value) -> Diagnostic {
    if divisor == 0. {
        return Diagnostic::new(
            FailureKind::Malformed("multipleOf"),
            "zero is not a valid divisor".to_string(),
        )
        .suggest("use a non-zero divisor, e.g. match:multipleOf:2".to_string());
    }
    match actual.as_f64() {
        Some(observed) => {
            let remainder = observed % divisor;
            Diagnostic::new(
                FailureKind::Pattern("multipleOf"),
                format!("{observed} is not a multiple of {divisor} (remainder {remainder})"),
            )
            .detail(json!({"divisor": divisor, "remainder": remainder}))
        }
        None => not_a_number("multipleOf", actual),
    }
}

fn explain_decimal_places(places: u32, actual: &Value) -> Diagnostic {
    match actual {
        Value::Number(number) => match numeric::observed_decimal_places(number) {
            Some(observed) => Diagnostic::new(
                FailureKind::Pattern("decimalPlaces"),
                format!("expected {places} decimal places, found {observed}"),
            )
            .detail(json!({"expected": places, "actual": observed})),
            None => Diagnostic::new(
                FailureKind::Pattern("decimalPlaces"),
                format!("'{number}' has no canonical decimal rendering"),
            ),
        },
        _ => not_a_number("decimalPlaces", actual),
    }
}

fn explain_unparseable_date(family: &'static str, actual: &Value) -> Diagnostic {
    Diagnostic::new(
        FailureKind::Pattern(family),
        format!(
            "'{}' could not be parsed as a date",
            preview(actual, PREVIEW_LIMIT)
        ),
    )
    .suggest(
        "accepted forms: ISO-8601 dates/datetimes, epoch seconds, epoch milliseconds".to_string(),
    )
}

fn explain_date_relation(
    family: &'static str,
    relation: &str,
    reference: &str,
    actual: &Value,
) -> Diagnostic {
    if date::parse_str(reference).is_none() {
        return Diagnostic::new(
            FailureKind::Malformed(family),
            format!("reference date '{reference}' could not be parsed"),
        )
        .suggest("use an ISO-8601 date such as 2024-01-15".to_string());
    }
    if date::parse_value(actual).is_none() {
        return explain_unparseable_date(family, actual);
    }
    Diagnostic::new(
        FailureKind::Pattern(family),
        format!(
            "'{}' is not {relation} '{reference}'",
            preview(actual, PREVIEW_LIMIT)
        ),
    )
    .detail(json!({"reference": reference}))
}

fn explain_date_between(start: &str, end: &str, actual: &Value) -> Diagnostic {
    let parsed_start = date::parse_str(start);
    let parsed_end = date::parse_str(end);
    match (parsed_start, parsed_end) {
        (Some(parsed_start), Some(parsed_end)) => {
            if parsed_start.instant > parsed_end.end_of_covered_range() {
                return Diagnostic::new(
                    FailureKind::Reversed("dateBetween"),
                    format!("range is reversed: '{start}' is after '{end}'"),
                )
                .suggest(format!("did you mean match:dateBetween:{end}:{start}?"));
            }
            if date::parse_value(actual).is_none() {
                return explain_unparseable_date("dateBetween", actual);
            }
            Diagnostic::new(
                FailureKind::Pattern("dateBetween"),
                format!(
                    "'{}' is not between '{start}' and '{end}' (inclusive)",
                    preview(actual, PREVIEW_LIMIT)
                ),
            )
            .detail(json!({"start": start, "end": end}))
        }
        _ => Diagnostic::new(
            FailureKind::Malformed("dateBetween"),
            format!("range bounds '{start}'..'{end}' could not be parsed"),
        )
        .suggest("expected the form match:dateBetween:<start>:<end>".to_string()),
    }
}

fn explain_date_age(duration: &str, actual: &Value, options: &ValidationOptions) -> Diagnostic {
    let limit = match date::parse_duration(duration) {
        Some(limit) => limit,
        None => {
            return Diagnostic::new(
                FailureKind::Malformed("dateAge"),
                format!("'{duration}' is not a duration"),
            )
            .suggest("expected the form match:dateAge:<int>(ms|s|m|h|d), e.g. match:dateAge:5m".to_string());
        }
    };
    match date::parse_value(actual) {
        Some(parsed) => {
            let age = options.now() - parsed.instant;
            Diagnostic::new(
                FailureKind::Pattern("dateAge"),
                format!(
                    "value is {}ms old, allowed at most {}ms",
                    age.num_milliseconds(),
                    limit.num_milliseconds()
                ),
            )
            .detail(json!({
                "ageMs": age.num_milliseconds(),
                "limitMs": limit.num_milliseconds(),
            }))
        }
        None => explain_unparseable_date("dateAge", actual),
    }
}

fn explain_date_format(token: &str, actual: &Value) -> Diagnostic {
    if !date::is_supported_format(token) {
        return Diagnostic::new(
            FailureKind::Malformed("dateFormat"),
            format!("unsupported format token '{token}'"),
        )
        .suggest(format!(
            "supported tokens: {}",
            date::SUPPORTED_FORMATS.join(", ")
        ));
    }
    Diagnostic::new(
        FailureKind::Pattern("dateFormat"),
        format!(
            "'{}' does not match format '{token}'",
            preview(actual, PREVIEW_LIMIT)
        ),
    )
}

/// Explain a cross-field evaluation. The meta-key layer calls this
/// directly so negation and missing-operand reporting stay coherent.
pub(crate) fn explain_cross_field(eval: &CrossFieldEval, negated: bool) -> Diagnostic {
    match &eval.outcome {
        Outcome::Pass => Diagnostic::new(
            FailureKind::Pattern("crossField"),
            format!(
                "'{} {} {}' holds but the predicate is negated",
                eval.lhs_path,
                eval.op.map_or("?", |op| op.as_str()),
                eval.rhs_path
            ),
        ),
        Outcome::Malformed => Diagnostic::new(
            FailureKind::Malformed("crossField"),
            format!("'{}' is not a comparison predicate", eval.lhs_path),
        )
        .suggest("expected the form match:crossField:<lhs_path> <op> <rhs_path>".to_string()),
        Outcome::Missing { paths } => Diagnostic::new(
            FailureKind::Pattern("crossField"),
            format!("cross-field operand(s) missing: {}", paths.join(", ")),
        )
        .detail(json!({"reason": "missing_field", "missing": paths}))
        .suggest("ensure both operand fields are present in the response".to_string()),
        Outcome::Fail {
            lhs,
            rhs,
            difference,
        } => {
            let op = eval.op.expect("failed comparisons carry an operator");
            let mut details = json!({
                "operator": op.as_str(),
                "left": lhs,
                "right": rhs,
            });
            if let Some(difference) = difference {
                details["difference"] = json!(difference);
            }
            let mut diagnostic = Diagnostic::new(
                FailureKind::Pattern("crossField"),
                format!(
                    "'{}' ({}) {} '{}' ({}) does not hold",
                    eval.lhs_path,
                    value_to_string(lhs),
                    op.as_str(),
                    eval.rhs_path,
                    value_to_string(rhs),
                ),
            )
            .detail(details);
            if !negated && difference.is_some() {
                diagnostic = diagnostic.suggest(format!(
                    "observed relation is '{} {} {}'",
                    eval.lhs_path,
                    op.inverted().as_str(),
                    eval.rhs_path
                ));
            }
            diagnostic
        }
    }
}

/// A mistyped `match:` body whose prefix is not in the registry. When
/// it resembles a known-but-unsupported capability, name the category
/// and point at a real alternative.
fn explain_default(body: &str, actual: &Value) -> Diagnostic {
    if let Some((prefix, _)) = body.split_once(':') {
        if let Some((category, alternative, example)) = classify_unknown(prefix) {
            return Diagnostic::new(
                FailureKind::NonExistentFeature(category),
                format!("'{prefix}' is not a supported pattern ({category} features are out of scope)"),
            )
            .detail(json!({"category": category.as_str(), "example": example}))
            .suggest(format!("{alternative}, e.g. {example}"));
        }
    }
    if string::looks_like_regex(body) {
        Diagnostic::new(
            FailureKind::Pattern("pattern"),
            format!(
                "'{}' does not match /{body}/",
                preview(actual, PREVIEW_LIMIT)
            ),
        )
        .suggest("bodies with regex metacharacters are matched as regular expressions; use match:contains: for literal text".to_string())
    } else {
        Diagnostic::new(
            FailureKind::Pattern("pattern"),
            format!(
                "'{}' does not contain '{body}'",
                preview(actual, PREVIEW_LIMIT)
            ),
        )
    }
}

const NETWORK_HINTS: &[&str] = &[
    "url", "http", "https", "status", "statuscode", "ping", "latency", "port", "dns", "ssl",
    "tls", "endpoint",
];
const SECURITY_HINTS: &[&str] = &[
    "jwt", "token", "auth", "hash", "encrypt", "decrypt", "password", "secret", "signature",
    "certificate",
];
const VALIDATION_HINTS: &[&str] = &[
    "schema", "joi", "zod", "ajv", "yup", "openapi", "swagger", "validator",
];
const STATISTICAL_HINTS: &[&str] = &[
    "sum", "avg", "average", "mean", "median", "stddev", "deviation", "percentile", "variance",
    "aggregate",
];

fn classify_unknown(prefix: &str) -> Option<(FeatureCategory, &'static str, &'static str)> {
    let folded = prefix.to_lowercase();
    let hit = |hints: &[&str]| hints.iter().any(|hint| folded.contains(hint));
    if hit(NETWORK_HINTS) {
        Some((
            FeatureCategory::Network,
            "assert on the fields the server returns instead of probing the network",
            "match:type:object",
        ))
    } else if hit(SECURITY_HINTS) {
        Some((
            FeatureCategory::Security,
            "assert the token's shape with a string pattern",
            "match:regex:^[A-Za-z0-9_-]+$",
        ))
    } else if hit(VALIDATION_HINTS) {
        Some((
            FeatureCategory::ValidationLibrary,
            "express the constraint with the built-in patterns",
            "match:type:string",
        ))
    } else if hit(STATISTICAL_HINTS) {
        Some((
            FeatureCategory::Statistical,
            "compute the aggregate in the server under test and assert a range",
            "match:between:10:20",
        ))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patterns::Pattern;
    use serde_json::json;

    fn explain_token(token: &str, actual: Value) -> Diagnostic {
        let pattern = Pattern::parse(token).unwrap();
        explain(&pattern, &actual, &ValidationOptions::default())
    }

    #[test]
    fn type_failure_hints_at_object_schema() {
        let diagnostic = explain_token("match:type:array", json!({"a": 1, "b": 2}));
        assert_eq!(diagnostic.kind, FailureKind::Pattern("type"));
        assert!(diagnostic
            .suggestion
            .unwrap()
            .contains("hint: did you mean object schema validation?"));
        assert_eq!(diagnostic.details.unwrap()["keyCount"], json!(2));
    }

    #[test]
    fn approximately_reports_difference_versus_tolerance() {
        let diagnostic = explain_token("match:approximately:100:0.5", json!(101));
        assert!(diagnostic.message.contains("|1| > 0.5"));
        assert_eq!(diagnostic.details.unwrap()["difference"], json!(1.0));
    }

    #[test]
    fn reversed_between_is_classified() {
        let diagnostic = explain_token("match:between:20:10", json!(15));
        assert_eq!(diagnostic.kind, FailureKind::Reversed("between"));
        assert!(diagnostic.suggestion.unwrap().contains("match:between:10:20"));
    }

    #[test]
    fn zero_divisor_is_malformed() {
        let diagnostic = explain_token("match:multipleOf:0", json!(6));
        assert_eq!(diagnostic.kind, FailureKind::Malformed("multipleOf"));
    }

    #[test]
    fn regex_over_array_samples_elements() {
        let diagnostic = explain_token("match:regex:^x", json!(["alpha", "beta"]));
        assert!(diagnostic.message.contains("no element matched"));
        assert_eq!(diagnostic.details.unwrap()["length"], json!(2));
    }

    #[test]
    fn unknown_statistical_prefix_is_a_non_existent_feature() {
        let diagnostic = explain_token("match:sumGreaterThan:5", json!([1, 2]));
        assert_eq!(
            diagnostic.kind,
            FailureKind::NonExistentFeature(FeatureCategory::Statistical)
        );
        assert!(diagnostic.suggestion.unwrap().contains("match:between"));
    }

    #[test]
    fn negated_match_is_explained() {
        let diagnostic = explain_token("match:not:contains:read", json!("read_file"));
        assert!(diagnostic.message.contains("negated"));
    }

    #[test]
    fn cross_field_failure_proposes_inverted_operator() {
        let eval = crate::patterns::cross_field::evaluate("start < end", &json!({"start": 10, "end": 3}));
        let diagnostic = explain_cross_field(&eval, false);
        assert_eq!(diagnostic.kind, FailureKind::Pattern("crossField"));
        let details = diagnostic.details.as_ref().unwrap();
        assert_eq!(details["operator"], json!("<"));
        assert_eq!(details["left"], json!(10));
        assert_eq!(details["right"], json!(3));
        assert!(diagnostic.suggestion.unwrap().contains("start >= end"));
    }

    #[test]
    fn missing_match_prefix_usage_table_is_consistent() {
        for family in ["between", "dateAge", "crossField", "extractField"] {
            assert!(usage(family).is_some());
        }
    }

    #[test]
    fn date_format_unsupported_token() {
        let diagnostic = explain_token("match:dateFormat:rfc2822", json!("x"));
        assert_eq!(diagnostic.kind, FailureKind::Malformed("dateFormat"));
        assert!(diagnostic.suggestion.unwrap().contains("iso-date"));
    }
}
