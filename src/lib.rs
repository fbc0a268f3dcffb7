//! # mcp-probe
//!
//! A test harness for MCP servers that speak JSON-RPC 2.0 over stdio.
//! It spawns the server under test, performs the MCP handshake, issues
//! scripted requests, and validates the responses against declarative
//! expectation documents.
//!
//! The heart of the crate is the validation engine: expected documents
//! embed `match:` pattern tokens and meta-keys (`match:partial`,
//! `match:arrayElements`, `match:extractField`, `match:crossField`),
//! and every discrepancy is reported as a structured error with a
//! precise path and an actionable suggestion.
//!
//! ## Example
//!
//! ```rust
//! use mcp_probe::validate;
//! use serde_json::json;
//!
//! let expected = json!({
//!     "result": {
//!         "tools": {"match:arrayElements": {"name": "match:type:string"}}
//!     }
//! });
//! let actual = json!({
//!     "result": {
//!         "tools": [{"name": "read_file"}, {"name": "list_dir"}]
//!     }
//! });
//! let outcome = validate(&expected, &actual);
//! assert!(outcome.passed);
//! ```
//!
//! Running against a live server:
//!
//! ```rust,no_run
//! use mcp_probe::harness::{ServerConfig, Session};
//! use serde_json::json;
//!
//! fn main() -> Result<(), mcp_probe::harness::HarnessError> {
//!     let mut session = Session::start(ServerConfig::new("./my-mcp-server"))?;
//!     let response = session.list_tools()?;
//!     let expected = json!({"match:partial": {
//!         "result": {"tools": "match:arrayLength:2"}
//!     }});
//!     let outcome = mcp_probe::validate(&expected, &response);
//!     assert!(outcome.passed, "{}", outcome.analysis.summary);
//!     session.close()?;
//!     Ok(())
//! }
//! ```
#![warn(
    clippy::doc_markdown,
    clippy::redundant_closure,
    clippy::explicit_iter_loop,
    clippy::match_same_arms,
    clippy::needless_pass_by_value,
    clippy::print_stdout,
    trivial_casts,
    trivial_numeric_casts,
    unused_extern_crates,
    unused_import_braces,
    unused_qualifications
)]
mod diagnostics;
mod error;
pub mod harness;
mod helpers;
mod options;
mod paths;
mod patterns;
mod primitive_type;
mod syntax;
mod validator;

pub use diagnostics::Diagnostic;
pub use error::{
    Analysis, ErrorCategory, ErrorType, FailureKind, FeatureCategory, PatternFailure,
    ValidationError, ValidationResult,
};
pub use options::ValidationOptions;
pub use paths::{extract_field, FieldPath, PathParseError, PathSegment};
pub use patterns::{Pattern, PatternKind, PATTERN_PREFIX};
pub use primitive_type::PrimitiveType;
pub use syntax::{analyze_expected, analyze_expected_with_context, Suggestion, SyntaxContext};
pub use validator::{
    matches_pattern, matches_pattern_with, validate, validate_at, validate_stderr,
    validate_stderr_with, validate_with, DEFAULT_ROOT, STDERR_EMPTY_SENTINEL,
};

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pattern_shortcut_accepts_both_spellings() {
        assert!(matches_pattern("match:greaterThan:5", &json!(6)));
        assert!(matches_pattern("greaterThan:5", &json!(6)));
        assert!(!matches_pattern("greaterThan:5", &json!(4)));
    }

    #[test]
    fn extraction_shortcut() {
        let actual = json!({"tools": [{"name": "read_file"}]});
        assert_eq!(
            extract_field(&actual, "tools[0].name"),
            Some(json!("read_file"))
        );
    }

    #[test]
    fn validate_shortcut_roots_at_response() {
        let result = validate(&json!({"a": 1}), &json!({"a": 2}));
        assert_eq!(result.errors[0].path, "response.a");
    }
}
