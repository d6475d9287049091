//! Readers for values the document tree stores in more than one shape:
//! timestamps as RFC 3339, plain date-times or epoch numbers, amounts as
//! numbers or numeric strings, and id lists holding numbers or digit strings.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Reads RFC 3339, plain date-times with a space or `T`, bare dates, and
/// epoch seconds or millis.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| Utc.from_utc_datetime(&naive));
    }
    if raw.bytes().all(|b| b.is_ascii_digit()) {
        let n: i64 = raw.parse().ok()?;
        // 10^11 seconds is far in the future, so anything larger is millis
        return if n >= 100_000_000_000 {
            DateTime::from_timestamp_millis(n)
        } else {
            DateTime::from_timestamp(n, 0)
        };
    }
    None
}

pub(crate) fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        other => return Err(D::Error::custom(format!("expected a timestamp, got {other}"))),
    };
    parse_timestamp(&raw).ok_or_else(|| D::Error::custom(format!("unreadable timestamp '{raw}'")))
}

pub(crate) fn amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| D::Error::custom(format!("amount {n} out of range"))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| D::Error::custom(format!("unreadable amount '{s}'"))),
        other => Err(D::Error::custom(format!("expected an amount, got {other}"))),
    }
}

/// Integer ids written either as numbers or as digit strings.
pub(crate) fn id_set<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeSet<i64>, D::Error> {
    let items = match Value::deserialize(deserializer)? {
        Value::Null => return Ok(BTreeSet::new()),
        Value::Array(items) => items,
        other => return Err(D::Error::custom(format!("expected a list of ids, got {other}"))),
    };
    items
        .into_iter()
        .filter(|item| !item.is_null())
        .map(|item| {
            let id = match &item {
                Value::Number(n) => n.as_i64(),
                Value::String(s) => s.trim().parse::<i64>().ok(),
                _ => None,
            };
            id.ok_or_else(|| D::Error::custom(format!("unreadable id {item}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_the_stored_timestamp_shapes() {
        let expected = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(parse_timestamp("2025-01-02T03:04:05Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-01-02 03:04:05"), Some(expected));
        assert_eq!(parse_timestamp("2025-01-02T03:04:05"), Some(expected));
        assert_eq!(parse_timestamp(&expected.timestamp().to_string()), Some(expected));
        assert_eq!(parse_timestamp(&expected.timestamp_millis().to_string()), Some(expected));
        assert_eq!(parse_timestamp("soon"), None);
        assert_eq!(parse_timestamp("  "), None);
    }
}
