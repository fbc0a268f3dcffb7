//! Validation discrepancies as data.
//!
//! The validator never fails with `Err`: every mismatch becomes a
//! [`ValidationError`] record accumulated into a [`ValidationResult`],
//! so a single run reports every discrepancy at once.
use crate::diagnostics::Diagnostic;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;

/// Discriminates what went wrong at a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// A field required by the expected document is absent.
    MissingField,
    /// The actual document carries a field the expected one does not.
    ExtraField,
    /// The JSON types of expected and actual differ.
    TypeMismatch,
    /// Array lengths differ.
    LengthMismatch,
    /// Same type, different value.
    ValueMismatch,
    /// A `match:` pattern did not hold.
    PatternFailed,
}

impl ErrorType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorType::MissingField => "missing_field",
            ErrorType::ExtraField => "extra_field",
            ErrorType::TypeMismatch => "type_mismatch",
            ErrorType::LengthMismatch => "length_mismatch",
            ErrorType::ValueMismatch => "value_mismatch",
            ErrorType::PatternFailed => "pattern_failed",
        }
    }

    /// Every error type belongs to exactly one reporting category.
    #[must_use]
    pub fn category(self) -> ErrorCategory {
        match self {
            ErrorType::MissingField
            | ErrorType::ExtraField
            | ErrorType::TypeMismatch
            | ErrorType::LengthMismatch => ErrorCategory::Structure,
            ErrorType::ValueMismatch => ErrorCategory::Content,
            ErrorType::PatternFailed => ErrorCategory::Pattern,
        }
    }
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse grouping used by the reporter's summary line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Structure,
    Content,
    Pattern,
}

impl ErrorCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Structure => "structure",
            ErrorCategory::Content => "content",
            ErrorCategory::Pattern => "pattern",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The category a pattern failure resolves to once analyzed.
///
/// The discriminant renders as the `patternType` string surfaced to
/// reporters (`between`, `between_malformed`, `syntax_error`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// The named pattern family evaluated to false on well-formed input.
    Pattern(&'static str),
    /// The pattern token itself is ill-formed (bad arity, non-numeric
    /// argument, zero divisor, unparseable reference date).
    Malformed(&'static str),
    /// Range-style arguments were given in the wrong order.
    Reversed(&'static str),
    /// An expected string that is not a pattern but starts with a known
    /// pattern prefix; almost always a missing `match:`.
    SyntaxError,
    /// The pattern resembles a feature this harness does not provide.
    NonExistentFeature(FeatureCategory),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Pattern(family) => f.write_str(family),
            FailureKind::Malformed(family) => write!(f, "{family}_malformed"),
            FailureKind::Reversed(family) => write!(f, "{family}_reversed"),
            FailureKind::SyntaxError => f.write_str("syntax_error"),
            FailureKind::NonExistentFeature(_) => f.write_str("non_existent_feature"),
        }
    }
}

impl Serialize for FailureKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Categories of patterns people ask for that the registry does not
/// (and will not) implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureCategory {
    /// Reachability, status codes, latency probes.
    Network,
    /// Tokens, hashes, signatures, encryption.
    Security,
    /// Schema-validator vocabulary (`joi`, `zod`, `ajv`, ...).
    ValidationLibrary,
    /// Aggregations over arrays (sums, averages, percentiles).
    Statistical,
}

impl FeatureCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            FeatureCategory::Network => "network",
            FeatureCategory::Security => "security",
            FeatureCategory::ValidationLibrary => "validation_library",
            FeatureCategory::Statistical => "statistical",
        }
    }
}

impl fmt::Display for FeatureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured payload attached to `pattern_failed` errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PatternFailure {
    /// Discriminated failure kind; serialized as the `patternType` string.
    #[serde(rename = "patternType")]
    pub kind: FailureKind,
    /// Free-form structured context (operands, differences, remainders).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// One discrepancy between the expected and the actual tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationError {
    /// What went wrong.
    #[serde(rename = "type")]
    pub error_type: ErrorType,
    /// Reporting category derived from the type.
    pub category: ErrorCategory,
    /// Concrete traversal from the root of the actual tree.
    pub path: String,
    /// The expected value or pattern token, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<Value>,
    /// The observed value, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual: Option<Value>,
    /// Human-readable description.
    pub message: String,
    /// Actionable correction, when the analyzer has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Present iff `error_type` is `pattern_failed`.
    #[serde(flatten)]
    pub pattern: Option<PatternFailure>,
}

/// Shortcuts for creation of specific error kinds.
impl ValidationError {
    pub(crate) fn missing_field(path: String, expected: &Value, message: String) -> ValidationError {
        ValidationError {
            error_type: ErrorType::MissingField,
            category: ErrorType::MissingField.category(),
            path,
            expected: Some(expected.clone()),
            actual: None,
            message,
            suggestion: None,
            pattern: None,
        }
    }

    pub(crate) fn extra_field(path: String, actual: &Value, message: String) -> ValidationError {
        ValidationError {
            error_type: ErrorType::ExtraField,
            category: ErrorType::ExtraField.category(),
            path,
            expected: None,
            actual: Some(actual.clone()),
            message,
            suggestion: None,
            pattern: None,
        }
    }

    pub(crate) fn type_mismatch(
        path: String,
        expected: &Value,
        actual: &Value,
        message: String,
    ) -> ValidationError {
        ValidationError {
            error_type: ErrorType::TypeMismatch,
            category: ErrorType::TypeMismatch.category(),
            path,
            expected: Some(expected.clone()),
            actual: Some(actual.clone()),
            message,
            suggestion: None,
            pattern: None,
        }
    }

    pub(crate) fn length_mismatch(
        path: String,
        expected: &Value,
        actual: &Value,
        message: String,
        suggestion: Option<String>,
    ) -> ValidationError {
        ValidationError {
            error_type: ErrorType::LengthMismatch,
            category: ErrorType::LengthMismatch.category(),
            path,
            expected: Some(expected.clone()),
            actual: Some(actual.clone()),
            message,
            suggestion,
            pattern: None,
        }
    }

    pub(crate) fn value_mismatch(
        path: String,
        expected: &Value,
        actual: &Value,
        message: String,
    ) -> ValidationError {
        ValidationError {
            error_type: ErrorType::ValueMismatch,
            category: ErrorType::ValueMismatch.category(),
            path,
            expected: Some(expected.clone()),
            actual: Some(actual.clone()),
            message,
            suggestion: None,
            pattern: None,
        }
    }

    pub(crate) fn pattern_failed(
        path: String,
        raw: &str,
        actual: Option<&Value>,
        diagnostic: Diagnostic,
    ) -> ValidationError {
        ValidationError {
            error_type: ErrorType::PatternFailed,
            category: ErrorType::PatternFailed.category(),
            path,
            expected: Some(Value::String(raw.to_string())),
            actual: actual.cloned(),
            message: diagnostic.message,
            suggestion: diagnostic.suggestion,
            pattern: Some(PatternFailure {
                kind: diagnostic.kind,
                details: diagnostic.details,
            }),
        }
    }

    pub(crate) fn with_suggestion(mut self, suggestion: String) -> ValidationError {
        self.suggestion = Some(suggestion);
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Aggregated view over one run's errors, reporter-friendly.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Analysis {
    /// Number of accumulated errors.
    pub total_errors: usize,
    /// Error counts keyed by `ErrorType` string, insertion-ordered.
    pub errors_by_type: Map<String, Value>,
    /// Error counts keyed by category string, insertion-ordered.
    pub errors_by_category: Map<String, Value>,
    /// One-line outcome description.
    pub summary: String,
    /// The first distinct suggestions, most useful first.
    pub top_suggestions: Vec<String>,
}

const TOP_SUGGESTIONS: usize = 3;

impl Analysis {
    pub(crate) fn from_errors(errors: &[ValidationError]) -> Analysis {
        let mut by_type = Map::new();
        let mut by_category = Map::new();
        for error in errors {
            bump(&mut by_type, error.error_type.as_str());
            bump(&mut by_category, error.category.as_str());
        }
        let summary = if errors.is_empty() {
            "validation passed".to_string()
        } else {
            let breakdown = by_category
                .iter()
                .map(|(category, count)| format!("{count} {category}"))
                .collect::<Vec<String>>()
                .join(", ");
            format!(
                "validation failed with {} error{} ({breakdown})",
                errors.len(),
                if errors.len() == 1 { "" } else { "s" },
            )
        };
        let mut top_suggestions = Vec::new();
        for suggestion in errors.iter().filter_map(|error| error.suggestion.as_ref()) {
            if top_suggestions.len() == TOP_SUGGESTIONS {
                break;
            }
            if !top_suggestions.contains(suggestion) {
                top_suggestions.push(suggestion.clone());
            }
        }
        Analysis {
            total_errors: errors.len(),
            errors_by_type: by_type,
            errors_by_category: by_category,
            summary,
            top_suggestions,
        }
    }
}

fn bump(counts: &mut Map<String, Value>, key: &str) {
    let next = counts.get(key).and_then(Value::as_u64).unwrap_or(0) + 1;
    counts.insert(key.to_string(), Value::from(next));
}

/// The outcome of one validation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationResult {
    /// True iff `errors` is empty.
    pub passed: bool,
    /// Every discrepancy found, in traversal order.
    pub errors: Vec<ValidationError>,
    /// Aggregated counts and suggestions.
    pub analysis: Analysis,
}

impl ValidationResult {
    pub(crate) fn from_errors(errors: Vec<ValidationError>) -> ValidationResult {
        let analysis = Analysis::from_errors(&errors);
        ValidationResult {
            passed: errors.is_empty(),
            errors,
            analysis,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn categories_follow_types() {
        assert_eq!(ErrorType::MissingField.category(), ErrorCategory::Structure);
        assert_eq!(ErrorType::ValueMismatch.category(), ErrorCategory::Content);
        assert_eq!(ErrorType::PatternFailed.category(), ErrorCategory::Pattern);
    }

    #[test]
    fn failure_kind_rendering() {
        assert_eq!(FailureKind::Pattern("between").to_string(), "between");
        assert_eq!(
            FailureKind::Malformed("between").to_string(),
            "between_malformed"
        );
        assert_eq!(
            FailureKind::Reversed("dateBetween").to_string(),
            "dateBetween_reversed"
        );
        assert_eq!(FailureKind::SyntaxError.to_string(), "syntax_error");
        assert_eq!(
            FailureKind::NonExistentFeature(FeatureCategory::Network).to_string(),
            "non_existent_feature"
        );
    }

    #[test]
    fn analysis_counts_and_summary() {
        let errors = vec![
            ValidationError::value_mismatch(
                "response.a".to_string(),
                &json!(1),
                &json!(2),
                "expected 1, got 2".to_string(),
            ),
            ValidationError::missing_field(
                "response.b".to_string(),
                &json!("x"),
                "missing field 'b'".to_string(),
            )
            .with_suggestion("add field 'b'".to_string()),
        ];
        let analysis = Analysis::from_errors(&errors);
        assert_eq!(analysis.total_errors, 2);
        assert_eq!(analysis.errors_by_type["value_mismatch"], json!(1));
        assert_eq!(analysis.errors_by_category["structure"], json!(1));
        assert_eq!(
            analysis.summary,
            "validation failed with 2 errors (1 content, 1 structure)"
        );
        assert_eq!(analysis.top_suggestions, vec!["add field 'b'".to_string()]);
    }

    #[test]
    fn result_passes_without_errors() {
        let result = ValidationResult::from_errors(Vec::new());
        assert!(result.passed);
        assert_eq!(result.analysis.summary, "validation passed");
    }

    #[test]
    fn error_serialization_shape() {
        let error = ValidationError::pattern_failed(
            "response.count".to_string(),
            "match:greaterThan:5",
            Some(&json!(3)),
            crate::diagnostics::Diagnostic {
                kind: FailureKind::Pattern("greaterThan"),
                message: "3 is not greater than 5".to_string(),
                suggestion: Some("use match:lessThanOrEqual:5".to_string()),
                details: Some(json!({"difference": -2.0})),
            },
        );
        let serialized = serde_json::to_value(&error).unwrap();
        assert_eq!(serialized["type"], json!("pattern_failed"));
        assert_eq!(serialized["category"], json!("pattern"));
        assert_eq!(serialized["patternType"], json!("greaterThan"));
        assert_eq!(serialized["details"]["difference"], json!(-2.0));
    }
}
