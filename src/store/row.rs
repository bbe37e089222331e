//! Typed accessors over loosely-typed result rows.
//!
//! REST backends hand back numeric columns as JSON numbers or, for
//! arbitrary-precision types, as strings, so every accessor accepts both.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::Value;

use super::Row;

/// Integer value of a column. Floats are truncated toward zero.
pub fn get_i64(row: &Row, column: &str) -> Option<i64> {
    match row.get(column)? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
        }
        _ => None,
    }
}

pub fn get_f64(row: &Row, column: &str) -> Option<f64> {
    match row.get(column)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Non-empty string value of a column.
pub fn get_str<'a>(row: &'a Row, column: &str) -> Option<&'a str> {
    match row.get(column)? {
        Value::String(s) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    }
}

pub fn get_bool(row: &Row, column: &str) -> Option<bool> {
    match row.get(column)? {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_i64().map(|i| i != 0),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "t" | "1" | "yes" => Some(true),
            "false" | "f" | "0" | "no" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub fn get_timestamp(row: &Row, column: &str) -> Option<DateTime<Utc>> {
    get_str(row, column).and_then(parse_timestamp)
}

/// Parse the timestamp renderings PostgREST, PostgreSQL and SQLite produce.
/// Values without an offset are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"] {
        if let Ok(ts) = DateTime::parse_from_str(value, format) {
            return Some(ts.with_timezone(&Utc));
        }
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts.and_utc());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn row(value: Value) -> Row {
        match value {
            Value::Object(map) => map,
            _ => panic!("row must be an object"),
        }
    }

    #[test]
    fn test_numeric_accessors_accept_strings() {
        let r = row(json!({"a": 10, "b": "12", "c": 0.5, "d": "0.020000", "e": null}));
        assert_eq!(get_i64(&r, "a"), Some(10));
        assert_eq!(get_i64(&r, "b"), Some(12));
        assert_eq!(get_f64(&r, "c"), Some(0.5));
        assert_eq!(get_f64(&r, "d"), Some(0.02));
        assert_eq!(get_i64(&r, "e"), None);
        assert_eq!(get_f64(&r, "missing"), None);
    }

    #[test]
    fn test_bool_accessor() {
        let r = row(json!({"a": true, "b": 0, "c": "t", "d": "maybe"}));
        assert_eq!(get_bool(&r, "a"), Some(true));
        assert_eq!(get_bool(&r, "b"), Some(false));
        assert_eq!(get_bool(&r, "c"), Some(true));
        assert_eq!(get_bool(&r, "d"), None);
    }

    #[test]
    fn test_empty_string_is_absent() {
        let r = row(json!({"url": ""}));
        assert_eq!(get_str(&r, "url"), None);
    }

    #[rstest]
    #[case::rfc3339_z("2024-01-05T10:30:00Z")]
    #[case::rfc3339_offset("2024-01-05T07:30:00-03:00")]
    #[case::postgrest_naive("2024-01-05T10:30:00")]
    #[case::postgrest_fraction("2024-01-05T10:30:00.000000")]
    #[case::postgres_text_tz("2024-01-05 10:30:00+00")]
    #[case::postgres_text_naive("2024-01-05 10:30:00")]
    fn test_parse_timestamp(#[case] input: &str) {
        let expected = Utc.with_ymd_and_hms(2024, 1, 5, 10, 30, 0).unwrap();
        assert_eq!(parse_timestamp(input), Some(expected));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp(""), None);
    }
}
