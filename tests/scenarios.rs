//! End-to-end validator scenarios: literal expected/actual pairs and the
//! behavioral properties the engine guarantees.
use mcp_probe::{
    analyze_expected, extract_field, matches_pattern, validate, validate_stderr, ErrorType,
    FieldPath,
};
use serde_json::{json, Value};
use test_case::test_case;

#[test]
fn type_failure_with_object_hint() {
    let result = validate(&json!("match:type:array"), &json!({"a": 1, "b": 2}));
    assert!(!result.passed);
    assert_eq!(result.errors.len(), 1);
    let error = &result.errors[0];
    assert_eq!(error.error_type, ErrorType::PatternFailed);
    let failure = error.pattern.as_ref().unwrap();
    assert_eq!(failure.kind.to_string(), "type");
    assert!(error
        .suggestion
        .as_ref()
        .unwrap()
        .contains("hint: did you mean object schema validation?"));
}

#[test]
fn partial_tolerates_extra_fields_and_elements() {
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
fn array_elements_on_heterogeneous_array() {
    let expected = json!({"tools": {"match:arrayElements": {"name": "match:type:string"}}});
    let actual = json!({"tools": [{"name": "a"}, {"name": 7}]});
    let result = validate(&expected, &actual);
    assert_eq!(result.errors.len(), 1);
    let error = &result.errors[0];
    assert_eq!(error.path, "response.tools[1].name");
    assert_eq!(error.pattern.as_ref().unwrap().kind.to_string(), "type");
}

#[test]
fn extract_field_with_wildcard() {
    let expected = json!({"match:extractField": "tools.*.name", "value": ["a", "b"]});
    let good = json!({"tools": [{"name": "a"}, {"name": "b"}]});
    assert!(validate(&expected, &good).passed);

    let bad = json!({"tools": [{"name": "a"}, {"name": "c"}]});
    let result = validate(&expected, &bad);
    assert_eq!(result.errors.len(), 1);
    let error = &result.errors[0];
    assert_eq!(error.error_type, ErrorType::ValueMismatch);
    assert_eq!(error.path, "response.extractField(tools.*.name)[1]");
}

#[test]
fn cross_field_numeric_with_inverted_suggestion() {
    let expected = json!({"match:crossField": "start < end"});
    let result = validate(&expected, &json!({"start": 10, "end": 3}));
    assert!(!result.passed);
    let error = &result.errors[0];
    let details = error.pattern.as_ref().unwrap().details.as_ref().unwrap();
    assert_eq!(details["operator"], json!("<"));
    assert_eq!(details["left"], json!(10));
    assert_eq!(details["right"], json!(3));
    assert!(error.suggestion.as_ref().unwrap().contains("start >= end"));
}

#[test]
fn approximately_is_a_tolerance_band() {
    let expected = json!("match:approximately:100:0.5");
    assert!(validate(&expected, &json!(100.3)).passed);
    let result = validate(&expected, &json!(101));
    assert!(!result.passed);
    assert!(result.errors[0].message.contains("|1| > 0.5"));
}

#[test]
fn missing_match_prefix_is_a_syntax_error() {
    let result = validate(&json!("arrayLength:2"), &json!(["x", "y"]));
    assert!(!result.passed);
    let error = &result.errors[0];
    assert_eq!(
        error.pattern.as_ref().unwrap().kind.to_string(),
        "syntax_error"
    );
    assert!(error
        .suggestion
        .as_ref()
        .unwrap()
        .contains("match:arrayLength:2"));
}

#[test]
fn date_between_is_inclusive() {
    let expected = json!("match:dateBetween:2024-01-01:2024-12-31");
    assert!(validate(&expected, &json!("2024-12-31T23:59:59Z")).passed);
    assert!(!validate(&expected, &json!("2025-01-01T00:00:00Z")).passed);
}

// ---------------------------------------------------------------------------
// Quantified properties
// ---------------------------------------------------------------------------

#[test]
fn validation_is_deterministic_and_idempotent() {
    let expected = json!({
        "a": "match:type:number",
        "b": [1, 2, 3],
        "c": {"match:crossField": "lo < hi"},
        "d": "match:between:9:1",
    });
    let actual = json!({
        "a": "not a number",
        "b": [1, 2],
        "c": {"lo": 5, "hi": 2},
        "e": true,
    });
    let first = validate(&expected, &actual);
    let second = validate(&expected, &actual);
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn error_paths_walk_the_actual_tree() {
    let expected = json!({
        "tools": [{"name": "match:type:number"}],
        "count": "match:greaterThan:10",
        "nested": {"deep": "exact"},
    });
    let actual = json!({
        "tools": [{"name": "read_file"}],
        "count": 3,
        "nested": {"deep": "other"},
    });
    let result = validate(&expected, &actual);
    assert!(!result.passed);
    for error in &result.errors {
        let relative = error
            .path
            .strip_prefix("response.")
            .expect("all paths start at the root");
        let walked = extract_field(&actual, relative);
        assert_eq!(
            walked.as_ref(),
            error.actual.as_ref(),
            "path {} must reach the reported value",
            error.path
        );
    }
}

#[test]
fn meta_key_neutrality_under_key_permutation() {
    let expected_one = json!({"x": 1, "y": "match:type:string", "z": [true]});
    let expected_two = json!({"z": [true], "x": 1, "y": "match:type:string"});
    let actual = json!({"x": 1, "y": 7, "z": [true]});
    let first = validate(&expected_one, &actual);
    let second = validate(&expected_two, &actual);
    assert_eq!(first.passed, second.passed);
    assert_eq!(first.errors.len(), second.errors.len());
    assert_eq!(first.errors[0].path, second.errors[0].path);
}

#[test]
fn partial_matching_is_monotone_under_supersets() {
    let expected = json!({"match:partial": {
        "tools": [{"name": "read_file"}],
        "count": 1,
    }});
    let base = json!({"tools": [{"name": "read_file"}], "count": 1});
    assert!(validate(&expected, &base).passed);
    // Superset by key and by element.
    let superset = json!({
        "tools": [
            {"name": "read_file", "description": "more"},
            {"name": "extra_tool"},
        ],
        "count": 1,
        "unrelated": {"anything": true},
    });
    assert!(validate(&expected, &superset).passed);
}

#[test_case("type:string", json!("x"))]
#[test_case("contains:read", json!("read_file"))]
#[test_case("greaterThan:5", json!(10))]
#[test_case("dateValid", json!("2024-01-15"))]
#[test_case("arrayLength:2", json!([1, 2]))]
#[test_case("stringEmpty", json!(""))]
fn negation_is_an_involution(body: &str, actual: Value) {
    let plain = matches_pattern(&format!("match:{body}"), &actual);
    let doubled = matches_pattern(&format!("match:not:not:{body}"), &actual);
    assert_eq!(plain, doubled);
}

#[test_case("tools.0.name" ; "dot_index")]
#[test_case("tools[0].name" ; "bracket_index")]
#[test_case("tools.*.name" ; "wildcard")]
#[test_case("a.b.c[2].*.d" ; "mixed")]
fn field_paths_round_trip(spec: &str) {
    let parsed = FieldPath::parse(spec).unwrap();
    let rendered = parsed.to_string();
    assert_eq!(FieldPath::parse(&rendered).unwrap(), parsed);
}

// ---------------------------------------------------------------------------
// Cross-cutting checks
// ---------------------------------------------------------------------------

#[test]
fn a_full_expectation_document_passes_against_a_tools_response() {
    // The envelope shape a real tools/list test asserts against.
    let expected = json!({"match:partial": {
        "jsonrpc": "2.0",
        "result": {
            "tools": {"match:arrayElements": {
                "name": "match:regex:^[a-z_]+$",
                "description": "match:stringNotEmpty",
            }},
        },
    }});
    let actual = json!({
        "jsonrpc": "2.0",
        "id": 2,
        "result": {
            "tools": [
                {"name": "read_file", "description": "Read a file", "inputSchema": {}},
                {"name": "list_dir", "description": "List a directory"},
            ],
        },
    });
    let result = validate(&expected, &actual);
    assert!(result.passed, "unexpected errors: {:?}", result.errors);
}

#[test]
fn stderr_assertions_route_through_the_registry() {
    assert!(validate_stderr(&json!("toBeEmpty"), "  \n ").passed);
    assert!(validate_stderr(&json!("match:regex:ready in \\d+ms"), "ready in 42ms\n").passed);
    let result = validate_stderr(&json!("toBeEmpty"), "panic: boom");
    assert_eq!(result.errors[0].path, "stderr");
}

#[test]
fn the_linter_catches_what_the_validator_would_reject() {
    let doc = json!({
        "tools": "match:arrayLen:2",
        "count": "greaterThan:0",
        "when": "match:dateBetween:2024-01-01,2024-12-31",
    });
    let suggestions = analyze_expected(&doc);
    assert_eq!(suggestions.len(), 3);
    let corrected: Vec<&str> = suggestions
        .iter()
        .filter_map(|s| s.corrected.as_deref())
        .collect();
    assert!(corrected.contains(&"match:arrayLength:2"));
    assert!(corrected.contains(&"match:greaterThan:0"));
    assert!(corrected.contains(&"match:dateBetween:2024-01-01:2024-12-31"));
}
