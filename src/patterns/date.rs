//! Date primitives.
//!
//! Actual values are accepted as ISO-8601 strings (date, datetime, or
//! datetime with offset), epoch seconds (magnitude at most 1e10) or
//! epoch milliseconds, given as numbers or numeric strings.
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, TimeZone, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

/// Largest magnitude still interpreted as epoch seconds; anything
/// bigger is milliseconds.
const EPOCH_SECONDS_LIMIT: f64 = 1e10;

/// A parsed instant; `date_only` records that the source carried no
/// time component, which widens inclusive upper bounds to end-of-day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ParsedDate {
    pub(crate) instant: DateTime<Utc>,
    pub(crate) date_only: bool,
}

impl ParsedDate {
    fn at(instant: DateTime<Utc>) -> ParsedDate {
        ParsedDate {
            instant,
            date_only: false,
        }
    }

    /// The last representable millisecond of the covered range.
    pub(crate) fn end_of_covered_range(&self) -> DateTime<Utc> {
        if self.date_only {
            self.instant + Duration::days(1) - Duration::milliseconds(1)
        } else {
            self.instant
        }
    }
}

pub(crate) fn parse_value(value: &Value) -> Option<ParsedDate> {
    match value {
        Value::String(item) => parse_str(item),
        Value::Number(number) => from_epoch(number.as_f64()?),
        _ => None,
    }
}

pub(crate) fn parse_str(input: &str) -> Option<ParsedDate> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Some(ParsedDate::at(parsed.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Some(ParsedDate::at(Utc.from_utc_datetime(&naive)));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Some(ParsedDate {
            instant: Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?),
            date_only: true,
        });
    }
    if let Ok(number) = input.parse::<f64>() {
        return from_epoch(number);
    }
    None
}

fn from_epoch(number: f64) -> Option<ParsedDate> {
    if !number.is_finite() {
        return None;
    }
    let millis = if number.abs() <= EPOCH_SECONDS_LIMIT {
        number * 1000.
    } else {
        number
    };
    Utc.timestamp_millis_opt(millis as i64)
        .single()
        .map(ParsedDate::at)
}

pub(crate) fn is_valid(actual: &Value) -> bool {
    parse_value(actual).is_some()
}

pub(crate) fn after(actual: &Value, reference: &str) -> bool {
    match (parse_value(actual), parse_str(reference)) {
        (Some(actual), Some(reference)) => actual.instant > reference.instant,
        _ => false,
    }
}

pub(crate) fn before(actual: &Value, reference: &str) -> bool {
    match (parse_value(actual), parse_str(reference)) {
        (Some(actual), Some(reference)) => actual.instant < reference.instant,
        _ => false,
    }
}

pub(crate) fn equals(actual: &Value, reference: &str) -> bool {
    match (parse_value(actual), parse_str(reference)) {
        (Some(actual), Some(reference)) => actual.instant == reference.instant,
        _ => false,
    }
}

/// Inclusive on both ends; a date-only upper bound covers its whole day.
pub(crate) fn between(actual: &Value, start: &str, end: &str) -> bool {
    match (parse_value(actual), parse_str(start), parse_str(end)) {
        (Some(actual), Some(start), Some(end)) => {
            actual.instant >= start.instant && actual.instant <= end.end_of_covered_range()
        }
        _ => false,
    }
}

/// `now - actual <= duration`; future-dated values trivially pass.
pub(crate) fn age_within(actual: &Value, duration: &str, now: DateTime<Utc>) -> bool {
    match (parse_value(actual), parse_duration(duration)) {
        (Some(actual), Some(duration)) => now - actual.instant <= duration,
        _ => false,
    }
}

lazy_static! {
    static ref DURATION_RE: Regex =
        Regex::new(r"^(\d+)(ms|s|m|h|d)$").expect("Is a valid regex");
    static ref ISO_RE: Regex = Regex::new(
        r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:\d{2})?$"
    )
    .expect("Is a valid regex");
    static ref ISO_DATE_RE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("Is a valid regex");
    static ref ISO_TIME_RE: Regex =
        Regex::new(r"^\d{2}:\d{2}:\d{2}(\.\d+)?$").expect("Is a valid regex");
    static ref US_DATE_RE: Regex =
        Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").expect("Is a valid regex");
    static ref EU_DATE_RE: Regex =
        Regex::new(r"^\d{1,2}\.\d{1,2}\.\d{4}$").expect("Is a valid regex");
    static ref TIMESTAMP_RE: Regex = Regex::new(r"^\d{10}(\d{3})?$").expect("Is a valid regex");
    static ref DATE_SHAPED_RES: Vec<Regex> = vec![
        Regex::new(r"^\d{4}-\d{2}-\d{2}([T ].+)?$").expect("Is a valid regex"),
        Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").expect("Is a valid regex"),
    ];
}

pub(crate) fn parse_duration(input: &str) -> Option<Duration> {
    let captures = DURATION_RE.captures(input)?;
    let amount: i64 = captures[1].parse().ok()?;
    match &captures[2] {
        "ms" => Some(Duration::milliseconds(amount)),
        "s" => Some(Duration::seconds(amount)),
        "m" => Some(Duration::minutes(amount)),
        "h" => Some(Duration::hours(amount)),
        "d" => Some(Duration::days(amount)),
        _ => None,
    }
}

/// Format tokens accepted by `dateFormat:<token>`.
pub(crate) const SUPPORTED_FORMATS: &[&str] =
    &["iso", "iso-date", "iso-time", "us-date", "eu-date", "timestamp"];

pub(crate) fn is_supported_format(token: &str) -> bool {
    SUPPORTED_FORMATS.contains(&token)
}

/// Shape check only; an unknown token never matches (the analyzer lists
/// the supported ones).
pub(crate) fn has_format(actual: &Value, token: &str) -> bool {
    let text = crate::helpers::value_to_string(actual);
    match token {
        "iso" => ISO_RE.is_match(&text),
        "iso-date" => ISO_DATE_RE.is_match(&text),
        "iso-time" => ISO_TIME_RE.is_match(&text),
        "us-date" => US_DATE_RE.is_match(&text),
        "eu-date" => EU_DATE_RE.is_match(&text),
        "timestamp" => TIMESTAMP_RE.is_match(&text),
        _ => false,
    }
}

/// Used by cross-field coercion to decide whether two strings should be
/// compared as dates.
pub(crate) fn looks_like_date(input: &str) -> bool {
    DATE_SHAPED_RES.iter().any(|regex| regex.is_match(input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!("2024-01-15"), true)]
    #[test_case(json!("2024-01-15T10:30:00Z"), true)]
    #[test_case(json!("2024-01-15T10:30:00.123+02:00"), true)]
    #[test_case(json!("2024-01-15 10:30:00"), true)]
    #[test_case(json!(1705312200), true; "epoch seconds")]
    #[test_case(json!(1705312200000i64), true; "epoch milliseconds")]
    #[test_case(json!("1705312200"), true; "epoch seconds as string")]
    #[test_case(json!("not a date"), false)]
    #[test_case(json!(["2024-01-15"]), false)]
    fn validity(actual: serde_json::Value, expected: bool) {
        assert_eq!(is_valid(&actual), expected);
    }

    #[test]
    fn epoch_seconds_and_millis_agree() {
        let seconds = parse_value(&json!(1705312200)).unwrap();
        let millis = parse_value(&json!(1705312200000i64)).unwrap();
        assert_eq!(seconds.instant, millis.instant);
    }

    #[test]
    fn between_is_inclusive_to_end_of_day() {
        let actual = json!("2024-12-31T23:59:59Z");
        assert!(between(&actual, "2024-01-01", "2024-12-31"));
        assert!(!between(&json!("2025-01-01T00:00:00Z"), "2024-01-01", "2024-12-31"));
    }

    #[test]
    fn age_uses_injected_now() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        assert!(age_within(&json!("2024-06-01T11:59:30Z"), "60s", now));
        assert!(!age_within(&json!("2024-06-01T11:58:00Z"), "60s", now));
        // Future-dated values trivially pass.
        assert!(age_within(&json!("2024-06-02T00:00:00Z"), "1h", now));
    }

    #[test_case("500ms", 500)]
    #[test_case("2s", 2_000)]
    #[test_case("3m", 180_000)]
    #[test_case("1h", 3_600_000)]
    #[test_case("1d", 86_400_000)]
    fn durations(input: &str, millis: i64) {
        assert_eq!(parse_duration(input), Some(Duration::milliseconds(millis)));
    }

    #[test]
    fn bad_durations_do_not_parse() {
        assert_eq!(parse_duration("5 days"), None);
        assert_eq!(parse_duration("h"), None);
    }

    #[test_case("iso", "2024-01-15T10:30:00Z", true)]
    #[test_case("iso", "2024-01-15", false)]
    #[test_case("iso-date", "2024-01-15", true)]
    #[test_case("iso-time", "10:30:00", true)]
    #[test_case("us-date", "1/15/2024", true)]
    #[test_case("eu-date", "15.1.2024", true)]
    #[test_case("timestamp", "1705312200", true)]
    #[test_case("timestamp", "1705312200000", true)]
    #[test_case("rfc2822", "anything", false; "unknown token never matches")]
    fn formats(token: &str, text: &str, expected: bool) {
        assert_eq!(has_format(&json!(text), token), expected);
    }
}
