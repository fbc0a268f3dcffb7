//! The structural validator.
//!
//! `validate` walks the expected and actual trees together and
//! accumulates every discrepancy; the walk never short-circuits, so a
//! single run reports everything the reporter needs to show. The walker
//! itself never fails on data shape; only a malformed field-path spec in
//! a meta-key produces a `pattern_failed` record, and even that does not
//! abort the traversal.
use crate::{
    diagnostics::{self, Diagnostic},
    error::{FailureKind, ValidationError, ValidationResult},
    helpers,
    options::ValidationOptions,
    paths::FieldPath,
    patterns::{self, cross_field, cross_field::Outcome, Pattern},
    primitive_type::PrimitiveType,
};
use serde_json::{Map, Value};

/// Root path used when the caller does not supply one.
pub const DEFAULT_ROOT: &str = "response";

const PREVIEW_LIMIT: usize = 40;

/// Validate `actual` against `expected`, rooted at `"response"`.
#[must_use]
pub fn validate(expected: &Value, actual: &Value) -> ValidationResult {
    validate_at(expected, actual, DEFAULT_ROOT)
}

/// Validate with an explicit root path for error reporting.
#[must_use]
pub fn validate_at(expected: &Value, actual: &Value, root: &str) -> ValidationResult {
    validate_with(expected, actual, root, &ValidationOptions::default())
}

/// Validate with explicit options (injected clock, debug diagnostics).
///
/// The result is a pure function of `(expected, actual, options.now)`.
#[must_use]
pub fn validate_with(
    expected: &Value,
    actual: &Value,
    root: &str,
    options: &ValidationOptions,
) -> ValidationResult {
    let mut walker = Walker {
        options,
        errors: Vec::new(),
    };
    walker.check(expected, actual, root, Mode::Exact);
    ValidationResult::from_errors(walker.errors)
}

/// Literal sentinel accepted in stderr expectations.
pub const STDERR_EMPTY_SENTINEL: &str = "toBeEmpty";

/// Validate a captured stderr buffer against an expectation: the
/// `toBeEmpty` sentinel (trimmed-empty check), a `match:` token, or a
/// literal string.
#[must_use]
pub fn validate_stderr(expected: &Value, buffer: &str) -> ValidationResult {
    validate_stderr_with(expected, buffer, &ValidationOptions::default())
}

/// `validate_stderr` with explicit options.
#[must_use]
pub fn validate_stderr_with(
    expected: &Value,
    buffer: &str,
    options: &ValidationOptions,
) -> ValidationResult {
    const ROOT: &str = "stderr";
    if let Value::String(sentinel) = expected {
        if sentinel == STDERR_EMPTY_SENTINEL {
            let errors = if buffer.trim().is_empty() {
                Vec::new()
            } else {
                vec![ValidationError::value_mismatch(
                    ROOT.to_string(),
                    expected,
                    &Value::String(buffer.to_string()),
                    format!("expected empty stderr, found {} bytes", buffer.len()),
                )]
            };
            return ValidationResult::from_errors(errors);
        }
    }
    validate_with(expected, &Value::String(buffer.to_string()), ROOT, options)
}

/// Direct primitive dispatch: does `pattern` hold on `actual`?
///
/// Accepts the token with or without the `match:` marker. Unknown
/// bodies fall back to the default regex/substring matcher, mirroring
/// the validator.
#[must_use]
pub fn matches_pattern(pattern: &str, actual: &Value) -> bool {
    matches_pattern_with(pattern, actual, &ValidationOptions::default())
}

/// `matches_pattern` with explicit options.
#[must_use]
pub fn matches_pattern_with(pattern: &str, actual: &Value, options: &ValidationOptions) -> bool {
    let parsed = match Pattern::parse(pattern) {
        Some(parsed) => parsed,
        None => Pattern::parse_body(pattern),
    };
    parsed.matches(actual, options)
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Structural equality: lengths must agree, extra keys are errors.
    Exact,
    /// Subset semantics: extra actual keys/elements are tolerated.
    Partial,
}

/// Reserved keys inside an expected mapping. They are never compared as
/// data fields and take precedence over structural comparison.
const META_PARTIAL: &str = "match:partial";
const META_ARRAY_ELEMENTS: &str = "match:arrayElements";
const META_EXTRACT_FIELD: &str = "match:extractField";
const META_EXTRACT_VALUE: &str = "value";
const META_CROSS_FIELD: &str = "match:crossField";
const META_NOT_CROSS_FIELD: &str = "match:not:crossField";

/// Directives surfaced from one expected mapping.
struct Directives<'a> {
    partial: Option<&'a Value>,
    array_elements: Option<&'a Value>,
    extract_field: Option<&'a Value>,
    extract_value: Option<&'a Value>,
    cross_field: Vec<(&'a Value, bool)>,
}

impl<'a> Directives<'a> {
    fn detect(map: &'a Map<String, Value>) -> Directives<'a> {
        Directives {
            partial: map.get(META_PARTIAL),
            array_elements: map.get(META_ARRAY_ELEMENTS),
            extract_field: map.get(META_EXTRACT_FIELD),
            extract_value: map.get(META_EXTRACT_VALUE),
            cross_field: [META_CROSS_FIELD, META_NOT_CROSS_FIELD]
                .iter()
                .filter_map(|key| {
                    map.get(*key)
                        .map(|value| (value, *key == META_NOT_CROSS_FIELD))
                })
                .collect(),
        }
    }

    fn any(&self) -> bool {
        self.partial.is_some()
            || self.array_elements.is_some()
            || self.extract_field.is_some()
            || !self.cross_field.is_empty()
    }

    /// Keys consumed by directives; everything else is a normal field.
    fn is_reserved(&self, key: &str) -> bool {
        matches!(
            key,
            META_PARTIAL | META_ARRAY_ELEMENTS | META_EXTRACT_FIELD | META_CROSS_FIELD
                | META_NOT_CROSS_FIELD
        ) || (key == META_EXTRACT_VALUE && self.extract_field.is_some())
    }
}

struct Walker<'a> {
    options: &'a ValidationOptions,
    errors: Vec<ValidationError>,
}

impl Walker<'_> {
    fn check(&mut self, expected: &Value, actual: &Value, path: &str, mode: Mode) {
        // Fast identity: deep equality settles the node outright.
        if helpers::equal(expected, actual) {
            return;
        }
        // Pattern dispatch comes before null handling so match:exists
        // gets to decide null-ness.
        if let Value::String(token) = expected {
            if let Some(pattern) = Pattern::parse(token) {
                if !pattern.matches(actual, self.options) {
                    let diagnostic = diagnostics::explain(&pattern, actual, self.options);
                    self.errors.push(ValidationError::pattern_failed(
                        path.to_string(),
                        token,
                        Some(actual),
                        diagnostic,
                    ));
                }
                return;
            }
        }
        // Nulls require strict equality, which the identity check above
        // already ruled out.
        if expected.is_null() || actual.is_null() {
            self.errors.push(ValidationError::value_mismatch(
                path.to_string(),
                expected,
                actual,
                format!("expected {expected}, got {actual}"),
            ));
            return;
        }
        if let Value::Object(map) = expected {
            let directives = Directives::detect(map);
            if directives.any() {
                self.check_directives(&directives, map, actual, path);
                return;
            }
        }
        // A plain string that starts with a known pattern prefix is
        // almost always a missing match: marker.
        if let Value::String(candidate) = expected {
            if patterns::looks_like_unprefixed_pattern(candidate) {
                self.errors.push(ValidationError::pattern_failed(
                    path.to_string(),
                    candidate,
                    Some(actual),
                    Diagnostic {
                        kind: FailureKind::SyntaxError,
                        message: format!(
                            "'{candidate}' looks like a pattern but is missing the 'match:' prefix"
                        ),
                        suggestion: Some(format!("change it to \"match:{candidate}\"")),
                        details: None,
                    },
                ));
                return;
            }
        }
        let expected_type = PrimitiveType::of(expected);
        let actual_type = PrimitiveType::of(actual);
        if expected_type != actual_type {
            self.errors.push(ValidationError::type_mismatch(
                path.to_string(),
                expected,
                actual,
                format!("expected {expected_type}, received {actual_type}"),
            ));
            return;
        }
        match (expected, actual) {
            (Value::Array(expected_items), Value::Array(actual_items)) => match mode {
                Mode::Exact => self.check_array(expected_items, actual_items, path),
                Mode::Partial => self.check_array_partial(expected_items, actual_items, path),
            },
            (Value::Object(expected_map), Value::Object(actual_map)) => {
                self.check_object(expected_map, actual_map, path, mode);
            }
            _ => {
                self.errors.push(ValidationError::value_mismatch(
                    path.to_string(),
                    expected,
                    actual,
                    format!("expected {expected}, got {actual}"),
                ));
            }
        }
    }

    fn check_array(&mut self, expected: &[Value], actual: &[Value], path: &str) {
        if expected.len() != actual.len() {
            let missing: Vec<String> = expected
                .iter()
                .filter(|item| !actual.iter().any(|other| helpers::equal(item, other)))
                .take(3)
                .map(|item| helpers::preview(item, PREVIEW_LIMIT))
                .collect();
            let extra: Vec<String> = actual
                .iter()
                .filter(|item| !expected.iter().any(|other| helpers::equal(item, other)))
                .take(3)
                .map(|item| helpers::preview(item, PREVIEW_LIMIT))
                .collect();
            let mut suggestion = format!(
                "expected {} elements, got {}",
                expected.len(),
                actual.len()
            );
            if !missing.is_empty() {
                suggestion.push_str(&format!("; missing: {}", missing.join(", ")));
            }
            if !extra.is_empty() {
                suggestion.push_str(&format!("; unexpected: {}", extra.join(", ")));
            }
            self.errors.push(ValidationError::length_mismatch(
                path.to_string(),
                &Value::from(expected.len()),
                &Value::from(actual.len()),
                format!(
                    "array length mismatch: expected {}, got {}",
                    expected.len(),
                    actual.len()
                ),
                Some(suggestion),
            ));
        }
        let common = expected.len().min(actual.len());
        for index in 0..common {
            self.check(
                &expected[index],
                &actual[index],
                &format!("{path}[{index}]"),
                Mode::Exact,
            );
        }
        for (index, item) in expected.iter().enumerate().skip(common) {
            self.errors.push(ValidationError::missing_field(
                format!("{path}[{index}]"),
                item,
                format!("missing element at index {index}"),
            ));
        }
        for (index, item) in actual.iter().enumerate().skip(common) {
            self.errors.push(ValidationError::extra_field(
                format!("{path}[{index}]"),
                item,
                format!("unexpected element at index {index}"),
            ));
        }
    }

    /// Presence-by-element: each expected element must match some actual
    /// element, in any position; extra actual elements pass silently.
    fn check_array_partial(&mut self, expected: &[Value], actual: &[Value], path: &str) {
        for (index, item) in expected.iter().enumerate() {
            let found = actual
                .iter()
                .any(|candidate| self.matches_silently(item, candidate));
            if !found {
                self.errors.push(
                    ValidationError::missing_field(
                        path.to_string(),
                        item,
                        format!(
                            "no array element matches expected element {index} ({})",
                            helpers::preview(item, PREVIEW_LIMIT)
                        ),
                    )
                    .with_suggestion(
                        "partial arrays match by presence; check the element's fields".to_string(),
                    ),
                );
            }
        }
    }

    /// Run a sub-walk and discard its errors; used to probe candidates
    /// during presence-by-element matching.
    fn matches_silently(&self, expected: &Value, actual: &Value) -> bool {
        let mut probe = Walker {
            options: self.options,
            errors: Vec::new(),
        };
        probe.check(expected, actual, DEFAULT_ROOT, Mode::Partial);
        probe.errors.is_empty()
    }

    fn check_object(
        &mut self,
        expected: &Map<String, Value>,
        actual: &Map<String, Value>,
        path: &str,
        mode: Mode,
    ) {
        for (key, value) in expected {
            match actual.get(key) {
                Some(actual_value) => {
                    self.check(value, actual_value, &format!("{path}.{key}"), mode);
                }
                None => {
                    self.errors.push(ValidationError::missing_field(
                        format!("{path}.{key}"),
                        value,
                        format!("missing field '{key}'"),
                    ));
                }
            }
        }
        if mode == Mode::Exact {
            for (key, value) in actual {
                if !expected.contains_key(key) {
                    self.errors.push(
                        ValidationError::extra_field(
                            format!("{path}.{key}"),
                            value,
                            format!("unexpected field '{key}'"),
                        )
                        .with_suggestion(format!(
                            "add '{key}' to the expected document or wrap it in match:partial"
                        )),
                    );
                }
            }
        }
    }

    /// Meta-keys are evaluated against the whole enclosing actual value
    /// first; any normal keys in the same mapping then match with
    /// partial semantics so directives never force structural equality.
    fn check_directives(
        &mut self,
        directives: &Directives<'_>,
        map: &Map<String, Value>,
        actual: &Value,
        path: &str,
    ) {
        if let Some(subtree) = directives.partial {
            self.check(subtree, actual, path, Mode::Partial);
        }
        if let Some(subtree) = directives.array_elements {
            match actual.as_array() {
                Some(items) => {
                    // An empty actual array is vacuously valid.
                    for (index, item) in items.iter().enumerate() {
                        self.check(subtree, item, &format!("{path}[{index}]"), Mode::Partial);
                    }
                }
                None => {
                    self.errors.push(ValidationError::type_mismatch(
                        path.to_string(),
                        &Value::String("array".to_string()),
                        actual,
                        format!(
                            "expected an array for element-wise matching, received {}",
                            PrimitiveType::of(actual)
                        ),
                    ));
                }
            }
        }
        if let Some(spec_value) = directives.extract_field {
            self.check_extract_field(spec_value, directives.extract_value, actual, path);
        }
        for &(predicate_value, negated) in &directives.cross_field {
            self.check_cross_field(predicate_value, negated, actual, path);
        }
        let normal: Vec<(&String, &Value)> = map
            .iter()
            .filter(|(key, _)| !directives.is_reserved(key))
            .collect();
        if !normal.is_empty() {
            match actual.as_object() {
                Some(actual_map) => {
                    for (key, value) in normal {
                        match actual_map.get(key) {
                            Some(actual_value) => self.check(
                                value,
                                actual_value,
                                &format!("{path}.{key}"),
                                Mode::Partial,
                            ),
                            None => self.errors.push(ValidationError::missing_field(
                                format!("{path}.{key}"),
                                value,
                                format!("missing field '{key}'"),
                            )),
                        }
                    }
                }
                None => {
                    self.errors.push(ValidationError::type_mismatch(
                        path.to_string(),
                        &Value::String("object".to_string()),
                        actual,
                        format!(
                            "expected an object, received {}",
                            PrimitiveType::of(actual)
                        ),
                    ));
                }
            }
        }
    }

    fn check_extract_field(
        &mut self,
        spec_value: &Value,
        extract_value: Option<&Value>,
        actual: &Value,
        path: &str,
    ) {
        let spec = match spec_value.as_str() {
            Some(spec) => spec,
            None => {
                self.push_malformed_extract(
                    path,
                    &helpers::value_to_string(spec_value),
                    "the extractField directive takes a field-path string",
                    actual,
                );
                return;
            }
        };
        let field_path = match FieldPath::parse(spec) {
            Ok(field_path) => field_path,
            Err(error) => {
                self.push_malformed_extract(path, spec, &error.to_string(), actual);
                return;
            }
        };
        let value_expected = match extract_value {
            Some(value_expected) => value_expected,
            None => {
                self.push_malformed_extract(
                    path,
                    spec,
                    "extractField requires a sibling 'value' key",
                    actual,
                );
                return;
            }
        };
        let extract_path = format!("{path}.extractField({spec})");
        match field_path.extract(actual) {
            Some(extracted) => {
                self.check(value_expected, &extracted, &extract_path, Mode::Exact);
            }
            None => {
                self.errors.push(ValidationError::missing_field(
                    extract_path,
                    value_expected,
                    format!("field path '{spec}' did not resolve"),
                ));
            }
        }
    }

    fn push_malformed_extract(&mut self, path: &str, spec: &str, reason: &str, actual: &Value) {
        self.errors.push(ValidationError::pattern_failed(
            path.to_string(),
            spec,
            Some(actual),
            Diagnostic {
                kind: FailureKind::Malformed("extractField"),
                message: reason.to_string(),
                suggestion: Some(
                    "pair \"match:extractField\": \"<path>\" with a sibling \"value\" key"
                        .to_string(),
                ),
                details: None,
            },
        ));
    }

    fn check_cross_field(
        &mut self,
        predicate_value: &Value,
        negated: bool,
        actual: &Value,
        path: &str,
    ) {
        let token = if negated {
            META_NOT_CROSS_FIELD
        } else {
            META_CROSS_FIELD
        };
        let predicate = match predicate_value.as_str() {
            Some(predicate) => predicate,
            None => {
                self.errors.push(ValidationError::pattern_failed(
                    path.to_string(),
                    token,
                    Some(actual),
                    Diagnostic {
                        kind: FailureKind::Malformed("crossField"),
                        message: "the crossField directive takes a predicate string".to_string(),
                        suggestion: Some(
                            "expected the form \"<lhs_path> <op> <rhs_path>\"".to_string(),
                        ),
                        details: None,
                    },
                ));
                return;
            }
        };
        let eval = cross_field::evaluate(predicate, actual);
        let failed = match (&eval.outcome, negated) {
            (Outcome::Pass, false) | (Outcome::Fail { .. }, true) => false,
            // Missing operands and malformed predicates always fail so
            // they keep reporting, negated or not.
            _ => true,
        };
        if failed {
            let diagnostic = diagnostics::explain_cross_field(&eval, negated);
            self.errors.push(ValidationError::pattern_failed(
                path.to_string(),
                predicate,
                Some(actual),
                diagnostic,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{validate, validate_stderr, validate_with, DEFAULT_ROOT};
    use crate::error::ErrorType;
    use crate::options::ValidationOptions;
    use serde_json::{json, Value};
    use test_case::test_case;

    #[test_case(json!({"a": 1}), json!({"a": 1}))]
    #[test_case(json!([1, "x", null]), json!([1, "x", null]))]
    #[test_case(json!("match:type:string"), json!("hello"))]
    #[test_case(json!({"a": "match:greaterThan:5"}), json!({"a": 6}))]
    #[test_case(json!(null), json!(null))]
    fn passes(expected: Value, actual: Value) {
        let result = validate(&expected, &actual);
        assert!(result.passed, "unexpected errors: {:?}", result.errors);
    }

    #[test]
    fn identity_beats_pattern_dispatch() {
        // The actual side is never interpreted; a literal pattern string
        // on both sides is plain equality.
        let token = json!("match:greaterThan:5");
        assert!(validate(&token, &token).passed);
    }

    #[test]
    fn null_mismatch_is_value_mismatch() {
        let result = validate(&json!(null), &json!(5));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].error_type, ErrorType::ValueMismatch);
    }

    #[test]
    fn exists_decides_nullness_before_null_handling() {
        assert!(!validate(&json!("match:exists"), &json!(null)).passed);
        assert!(validate(&json!("match:not:exists"), &json!(null)).passed);
    }

    #[test]
    fn type_mismatch_points_at_the_node() {
        let result = validate(&json!({"a": {"b": 1}}), &json!({"a": [1]}));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].error_type, ErrorType::TypeMismatch);
        assert_eq!(result.errors[0].path, "response.a");
    }

    #[test]
    fn object_key_sets_are_analyzed() {
        let result = validate(
            &json!({"keep": 1, "missing": 2}),
            &json!({"keep": 1, "extra": 3}),
        );
        let types: Vec<ErrorType> = result.errors.iter().map(|e| e.error_type).collect();
        assert!(types.contains(&ErrorType::MissingField));
        assert!(types.contains(&ErrorType::ExtraField));
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn array_length_mismatch_reports_symmetric_difference() {
        let result = validate(&json!(["a", "b", "c"]), &json!(["a", "d"]));
        let length_error = result
            .errors
            .iter()
            .find(|e| e.error_type == ErrorType::LengthMismatch)
            .expect("length mismatch reported");
        let suggestion = length_error.suggestion.as_ref().unwrap();
        assert!(suggestion.contains("missing"));
        assert!(suggestion.contains("unexpected"));
        // Pairwise walk still runs on the common prefix.
        assert!(result
            .errors
            .iter()
            .any(|e| e.path == "response[1]" && e.error_type == ErrorType::ValueMismatch));
        // The expected remainder is reported as missing.
        assert!(result
            .errors
            .iter()
            .any(|e| e.path == "response[2]" && e.error_type == ErrorType::MissingField));
    }

    #[test]
    fn errors_accumulate_without_short_circuit() {
        let result = validate(
            &json!({"a": "match:type:number", "b": "match:type:number"}),
            &json!({"a": "x", "b": "y"}),
        );
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn missing_prefix_heuristic() {
        let result = validate(&json!("arrayLength:2"), &json!(["x", "y"]));
        assert_eq!(result.errors.len(), 1);
        let error = &result.errors[0];
        assert_eq!(error.error_type, ErrorType::PatternFailed);
        let failure = error.pattern.as_ref().unwrap();
        assert_eq!(failure.kind.to_string(), "syntax_error");
        assert!(error
            .suggestion
            .as_ref()
            .unwrap()
            .contains("match:arrayLength:2"));
    }

    #[test]
    fn partial_tolerates_extras() {
        let expected = json!({"match:partial": {"tools": [{"name": "read_file"}]}});
        let actual = json!({
            "tools": [
                {"name": "read_file", "description": "x"},
                {"name": "other"},
            ]
        });
        let result = validate(&expected, &actual);
        assert!(result.passed, "unexpected errors: {:?}", result.errors);
    }

    #[test]
    fn partial_reports_missing_elements() {
        let expected = json!({"match:partial": {"tools": [{"name": "write_file"}]}});
        let actual = json!({"tools": [{"name": "read_file"}]});
        let result = validate(&expected, &actual);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].error_type, ErrorType::MissingField);
        assert_eq!(result.errors[0].path, "response.tools");
    }

    #[test]
    fn array_elements_validates_every_element() {
        let expected = json!({"tools": {"match:arrayElements": {"name": "match:type:string"}}});
        let actual = json!({"tools": [{"name": "a"}, {"name": 7}]});
        let result = validate(&expected, &actual);
        assert_eq!(result.errors.len(), 1);
        let error = &result.errors[0];
        assert_eq!(error.path, "response.tools[1].name");
        assert_eq!(error.pattern.as_ref().unwrap().kind.to_string(), "type");
    }

    #[test]
    fn array_elements_requires_an_array() {
        let expected = json!({"match:arrayElements": {"name": "match:type:string"}});
        let result = validate(&expected, &json!({"name": "a"}));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].error_type, ErrorType::TypeMismatch);
    }

    #[test]
    fn array_elements_on_empty_array_is_vacuous() {
        let expected = json!({"match:arrayElements": {"name": "match:type:string"}});
        assert!(validate(&expected, &json!([])).passed);
    }

    #[test]
    fn extract_field_with_wildcard() {
        let expected = json!({"match:extractField": "tools.*.name", "value": ["a", "b"]});
        let actual = json!({"tools": [{"name": "a"}, {"name": "b"}]});
        assert!(validate(&expected, &actual).passed);

        let actual = json!({"tools": [{"name": "a"}, {"name": "c"}]});
        let result = validate(&expected, &actual);
        assert_eq!(result.errors.len(), 1);
        let error = &result.errors[0];
        assert_eq!(error.error_type, ErrorType::ValueMismatch);
        assert_eq!(error.path, "response.extractField(tools.*.name)[1]");
    }

    #[test]
    fn extract_field_missing_path() {
        let expected = json!({"match:extractField": "tools.9.name", "value": "x"});
        let result = validate(&expected, &json!({"tools": []}));
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].error_type, ErrorType::MissingField);
        assert_eq!(result.errors[0].path, "response.extractField(tools.9.name)");
    }

    #[test]
    fn extract_field_without_value_sibling_is_malformed() {
        let expected = json!({"match:extractField": "tools"});
        let result = validate(&expected, &json!({"tools": []}));
        assert_eq!(result.errors.len(), 1);
        let failure = result.errors[0].pattern.as_ref().unwrap();
        assert_eq!(failure.kind.to_string(), "extractField_malformed");
    }

    #[test]
    fn malformed_extract_path_does_not_abort_the_walk() {
        let expected = json!({
            "match:extractField": "tools..name",
            "value": "x",
            "count": "match:type:number",
        });
        let result = validate(&expected, &json!({"tools": [], "count": "not a number"}));
        // Both the malformed path and the sibling field report.
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn cross_field_failure_carries_details() {
        let expected = json!({"match:crossField": "start < end"});
        let result = validate(&expected, &json!({"start": 10, "end": 3}));
        assert_eq!(result.errors.len(), 1);
        let error = &result.errors[0];
        let failure = error.pattern.as_ref().unwrap();
        let details = failure.details.as_ref().unwrap();
        assert_eq!(details["operator"], json!("<"));
        assert_eq!(details["left"], json!(10));
        assert_eq!(details["right"], json!(3));
        assert!(error.suggestion.as_ref().unwrap().contains("start >= end"));
    }

    #[test]
    fn negated_cross_field() {
        let expected = json!({"match:not:crossField": "start < end"});
        assert!(validate(&expected, &json!({"start": 10, "end": 3})).passed);
        assert!(!validate(&expected, &json!({"start": 1, "end": 3})).passed);
    }

    #[test]
    fn cross_field_missing_operand_fails_even_when_negated() {
        let expected = json!({"match:not:crossField": "start < end"});
        let result = validate(&expected, &json!({"start": 1}));
        assert_eq!(result.errors.len(), 1);
        let details = result.errors[0]
            .pattern
            .as_ref()
            .unwrap()
            .details
            .as_ref()
            .unwrap();
        assert_eq!(details["reason"], json!("missing_field"));
        assert_eq!(details["missing"], json!(["end"]));
    }

    #[test]
    fn meta_keys_coexist_with_normal_keys() {
        let expected = json!({
            "match:crossField": "start < end",
            "start": "match:type:number",
        });
        let actual = json!({"start": 1, "end": 3, "unrelated": true});
        // Normal keys match partially, so "unrelated" and "end" pass.
        assert!(validate(&expected, &actual).passed);
    }

    #[test]
    fn deterministic_and_idempotent() {
        let expected = json!({"a": "match:type:number", "b": [1, 2], "c": "match:between:5:1"});
        let actual = json!({"a": "x", "b": [1], "d": 4});
        let first = validate(&expected, &actual);
        let second = validate(&expected, &actual);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn meta_key_neutrality_under_key_permutation() {
        let expected_one = json!({"a": 1, "b": 2, "c": 3});
        let expected_two = json!({"c": 3, "b": 2, "a": 1});
        let actual = json!({"a": 1, "b": 2, "c": 4});
        let first = validate(&expected_one, &actual);
        let second = validate(&expected_two, &actual);
        assert_eq!(first.passed, second.passed);
        assert_eq!(first.errors.len(), second.errors.len());
        assert_eq!(first.errors[0].path, second.errors[0].path);
    }

    #[test]
    fn error_paths_are_reachable_in_the_actual_tree() {
        let expected = json!({"tools": [{"name": "match:type:number"}]});
        let actual = json!({"tools": [{"name": "read_file"}]});
        let result = validate(&expected, &actual);
        assert_eq!(result.errors.len(), 1);
        let path = result.errors[0]
            .path
            .strip_prefix(&format!("{DEFAULT_ROOT}."))
            .unwrap();
        let reached = crate::paths::extract_field(&actual, path).unwrap();
        assert_eq!(Some(&reached), result.errors[0].actual.as_ref());
    }

    #[test]
    fn date_age_uses_the_injected_clock() {
        use chrono::TimeZone;
        fn fixed_now() -> chrono::DateTime<chrono::Utc> {
            chrono::Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
        }
        let options = ValidationOptions::default().with_clock(fixed_now);
        let expected = json!("match:dateAge:60s");
        let fresh = json!("2024-06-01T11:59:30Z");
        let stale = json!("2024-06-01T11:00:00Z");
        assert!(validate_with(&expected, &fresh, DEFAULT_ROOT, &options).passed);
        assert!(!validate_with(&expected, &stale, DEFAULT_ROOT, &options).passed);
    }

    #[test]
    fn date_between_is_inclusive() {
        let expected = json!("match:dateBetween:2024-01-01:2024-12-31");
        assert!(validate(&expected, &json!("2024-12-31T23:59:59Z")).passed);
        assert!(!validate(&expected, &json!("2025-01-01T00:00:00Z")).passed);
    }

    #[test_case(json!("toBeEmpty"), "", true)]
    #[test_case(json!("toBeEmpty"), "   \n", true; "whitespace is empty")]
    #[test_case(json!("toBeEmpty"), "boom", false)]
    #[test_case(json!("match:contains:ready"), "server ready\n", true)]
    #[test_case(json!("match:contains:ready"), "starting", false)]
    #[test_case(json!("exact text"), "exact text", true)]
    fn stderr_assertions(expected: Value, buffer: &str, passes: bool) {
        assert_eq!(validate_stderr(&expected, buffer).passed, passes);
    }

    #[test]
    fn analysis_summarizes_a_failed_run() {
        let result = validate(
            &json!({"a": "match:type:number", "b": 2}),
            &json!({"a": "x", "b": 3, "c": 4}),
        );
        assert!(!result.passed);
        assert_eq!(result.analysis.total_errors, 3);
        assert_eq!(
            result.analysis.errors_by_type["pattern_failed"],
            json!(1)
        );
        assert_eq!(result.analysis.errors_by_category["structure"], json!(1));
    }
}
