//! The `crossField` predicate: `<lhs_path> <op> <rhs_path>` evaluated
//! against the enclosing actual mapping.
use crate::{
    helpers::value_to_string,
    paths::FieldPath,
    patterns::date,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use std::cmp::Ordering;

/// Comparison operators accepted in predicates. `=` and `==` are the
/// same operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CrossOp {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl CrossOp {
    fn parse(token: &str) -> Option<CrossOp> {
        match token {
            "<" => Some(CrossOp::Lt),
            "<=" => Some(CrossOp::Le),
            ">" => Some(CrossOp::Gt),
            ">=" => Some(CrossOp::Ge),
            "=" | "==" => Some(CrossOp::Eq),
            "!=" => Some(CrossOp::Ne),
            _ => None,
        }
    }

    pub(crate) fn as_str(self) -> &'static str {
        match self {
            CrossOp::Lt => "<",
            CrossOp::Le => "<=",
            CrossOp::Gt => ">",
            CrossOp::Ge => ">=",
            CrossOp::Eq => "==",
            CrossOp::Ne => "!=",
        }
    }

    /// The logical complement, used to phrase corrective suggestions.
    pub(crate) fn inverted(self) -> CrossOp {
        match self {
            CrossOp::Lt => CrossOp::Ge,
            CrossOp::Le => CrossOp::Gt,
            CrossOp::Gt => CrossOp::Le,
            CrossOp::Ge => CrossOp::Lt,
            CrossOp::Eq => CrossOp::Ne,
            CrossOp::Ne => CrossOp::Eq,
        }
    }

    fn holds(self, ordering: Ordering) -> bool {
        match self {
            CrossOp::Lt => ordering == Ordering::Less,
            CrossOp::Le => ordering != Ordering::Greater,
            CrossOp::Gt => ordering == Ordering::Greater,
            CrossOp::Ge => ordering != Ordering::Less,
            CrossOp::Eq => ordering == Ordering::Equal,
            CrossOp::Ne => ordering != Ordering::Equal,
        }
    }
}

/// Everything the diagnostic analyzer needs to explain the evaluation.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct CrossFieldEval {
    pub(crate) lhs_path: String,
    pub(crate) rhs_path: String,
    pub(crate) op: Option<CrossOp>,
    pub(crate) outcome: Outcome,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    Pass,
    Fail {
        lhs: Value,
        rhs: Value,
        /// `lhs - rhs` when both operands were compared numerically.
        difference: Option<f64>,
    },
    Missing {
        paths: Vec<String>,
    },
    Malformed,
}

impl CrossFieldEval {
    pub(crate) fn passed(&self) -> bool {
        matches!(self.outcome, Outcome::Pass)
    }

    fn malformed(predicate: &str) -> CrossFieldEval {
        CrossFieldEval {
            lhs_path: predicate.to_string(),
            rhs_path: String::new(),
            op: None,
            outcome: Outcome::Malformed,
        }
    }
}

lazy_static! {
    static ref PREDICATE_RE: Regex =
        Regex::new(r"^\s*(.+?)\s*(<=|>=|==|!=|<|>|=)\s*(.+?)\s*$").expect("Is a valid regex");
}

/// Evaluate `predicate` with both paths resolved on `scope`.
pub(crate) fn evaluate(predicate: &str, scope: &Value) -> CrossFieldEval {
    let captures = match PREDICATE_RE.captures(predicate) {
        Some(captures) => captures,
        None => return CrossFieldEval::malformed(predicate),
    };
    let lhs_path = captures[1].to_string();
    let rhs_path = captures[3].to_string();
    let op = match CrossOp::parse(&captures[2]) {
        Some(op) => op,
        None => return CrossFieldEval::malformed(predicate),
    };
    let lhs_parsed = FieldPath::parse(&lhs_path);
    let rhs_parsed = FieldPath::parse(&rhs_path);
    let (lhs_parsed, rhs_parsed) = match (lhs_parsed, rhs_parsed) {
        (Ok(lhs), Ok(rhs)) => (lhs, rhs),
        _ => return CrossFieldEval::malformed(predicate),
    };
    let lhs = lhs_parsed.extract(scope);
    let rhs = rhs_parsed.extract(scope);
    let (lhs, rhs) = match (lhs, rhs) {
        (Some(lhs), Some(rhs)) => (lhs, rhs),
        (lhs, rhs) => {
            let mut paths = Vec::new();
            if lhs.is_none() {
                paths.push(lhs_path.clone());
            }
            if rhs.is_none() {
                paths.push(rhs_path.clone());
            }
            return CrossFieldEval {
                lhs_path,
                rhs_path,
                op: Some(op),
                outcome: Outcome::Missing { paths },
            };
        }
    };
    let (ordering, difference) = compare(&lhs, &rhs);
    let outcome = match ordering {
        Some(ordering) if op.holds(ordering) => Outcome::Pass,
        _ => Outcome::Fail {
            lhs,
            rhs,
            difference,
        },
    };
    CrossFieldEval {
        lhs_path,
        rhs_path,
        op: Some(op),
        outcome,
    }
}

/// Operands are coerced in a fixed order: numeric when both look
/// numeric, dates when both strings are date-shaped, lexical otherwise.
fn compare(lhs: &Value, rhs: &Value) -> (Option<Ordering>, Option<f64>) {
    if let (Some(a), Some(b)) = (as_numeric(lhs), as_numeric(rhs)) {
        return (a.partial_cmp(&b), Some(a - b));
    }
    if let (Value::String(a), Value::String(b)) = (lhs, rhs) {
        if date::looks_like_date(a) && date::looks_like_date(b) {
            if let (Some(a), Some(b)) = (date::parse_str(a), date::parse_str(b)) {
                return (Some(a.instant.cmp(&b.instant)), None);
            }
        }
    }
    (
        Some(value_to_string(lhs).cmp(&value_to_string(rhs))),
        None,
    )
}

fn as_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(item) => item.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{evaluate, CrossOp, Outcome};
    use serde_json::json;
    use test_case::test_case;

    #[test_case("start < end", json!({"start": 1, "end": 5}), true)]
    #[test_case("start < end", json!({"start": 10, "end": 3}), false)]
    #[test_case("a <= b", json!({"a": 5, "b": 5}), true)]
    #[test_case("a != b", json!({"a": 1, "b": 2}), true)]
    #[test_case("a = b", json!({"a": "x", "b": "x"}), true)]
    #[test_case("a == b", json!({"a": 1, "b": "1"}), true; "numeric strings coerce")]
    #[test_case("created < updated", json!({"created": "2024-01-01", "updated": "2024-06-01T00:00:00Z"}), true; "dates coerce")]
    #[test_case("a < b", json!({"a": "apple", "b": "banana"}), true; "lexical fallback")]
    #[test_case("meta.start < meta.end", json!({"meta": {"start": 1, "end": 2}}), true; "nested paths")]
    fn predicates(predicate: &str, scope: serde_json::Value, expected: bool) {
        assert_eq!(evaluate(predicate, &scope).passed(), expected);
    }

    #[test]
    fn failure_carries_operands_and_difference() {
        let eval = evaluate("start < end", &json!({"start": 10, "end": 3}));
        assert_eq!(eval.op, Some(CrossOp::Lt));
        match eval.outcome {
            Outcome::Fail {
                lhs,
                rhs,
                difference,
            } => {
                assert_eq!(lhs, json!(10));
                assert_eq!(rhs, json!(3));
                assert_eq!(difference, Some(7.0));
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[test]
    fn missing_operands_are_named() {
        let eval = evaluate("start < end", &json!({"start": 10}));
        assert_eq!(
            eval.outcome,
            Outcome::Missing {
                paths: vec!["end".to_string()]
            }
        );
        assert!(!eval.passed());
    }

    #[test]
    fn unparseable_predicates_are_malformed() {
        assert_eq!(evaluate("no operator here", &json!({})).outcome, Outcome::Malformed);
    }

    #[test]
    fn inversion_round_trips() {
        for op in [CrossOp::Lt, CrossOp::Le, CrossOp::Gt, CrossOp::Ge, CrossOp::Eq, CrossOp::Ne] {
            assert_eq!(op.inverted().inverted(), op);
        }
    }
}
