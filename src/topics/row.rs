//! Typed row values and the comparison rules used for sorting.

#![allow(missing_docs)]

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;

/// Semantic type of a column. Drives parsing at ingestion time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    Integer,
    Decimal,
    Boolean,
    Timestamp,
}

/// One typed cell value. `Null` stands in for absent or unparsable data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Decimal(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

static NULL: Value = Value::Null;

/// Display format for timestamp cells.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

impl Value {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Parse an RFC 3339 (or naive ISO 8601) string, keeping the raw text when it
    /// does not look like a timestamp.
    #[must_use]
    pub fn timestamp_from_str(raw: &str) -> Self {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
            return Self::Timestamp(parsed.with_timezone(&Utc));
        }
        for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
                return Self::Timestamp(naive.and_utc());
            }
        }
        if raw.is_empty() {
            Self::Null
        } else {
            Self::Text(raw.to_string())
        }
    }

    /// Parse a decimal string such as `"1234.50"`. Non-numeric input becomes `Null`.
    #[must_use]
    pub fn decimal_from_str(raw: &str) -> Self {
        raw.trim()
            .replace(',', "")
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
            .map_or(Self::Null, Self::Decimal)
    }

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// Numeric view of integer and decimal values.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Decimal(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Integer(_) | Self::Decimal(_) => 2,
            Self::Timestamp(_) => 3,
            Self::Text(_) => 4,
        }
    }

    /// Total order over values: `Null` first, numbers by value (integers and
    /// decimals compare with each other), text by bytes. Values of unrelated
    /// kinds order by kind.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn compare(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Text(a), Self::Text(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Self::Integer(a), Self::Integer(b)) => a.cmp(b),
            (Self::Decimal(a), Self::Decimal(b)) => a.total_cmp(b),
            (Self::Integer(a), Self::Decimal(b)) => (*a as f64).total_cmp(b),
            (Self::Decimal(a), Self::Integer(b)) => a.total_cmp(&(*b as f64)),
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Timestamp(a), Self::Timestamp(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Text(text) => f.write_str(text),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Decimal(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Timestamp(value) => write!(f, "{}", value.format(TIMESTAMP_FORMAT)),
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

/// A single immutable record keyed by column name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Row {
    cells: BTreeMap<String, Value>,
}

impl Row {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, column: &str, value: impl Into<Value>) -> Self {
        self.cells.insert(column.to_string(), value.into());
        self
    }

    /// Value for `column`, or `Null` when the row does not carry it.
    #[must_use]
    pub fn get(&self, column: &str) -> &Value {
        self.cells.get(column).unwrap_or(&NULL)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_column_reads_as_null() {
        let row = Row::new().with("name", "alpha");
        assert_eq!(row.get("name"), &Value::text("alpha"));
        assert!(row.get("owner").is_null());
    }

    #[test]
    fn null_sorts_before_everything() {
        for value in [
            Value::text(""),
            Value::Integer(-5),
            Value::Decimal(-1.0),
            Value::Bool(false),
        ] {
            assert_eq!(Value::Null.compare(&value), Ordering::Less);
            assert_eq!(value.compare(&Value::Null), Ordering::Greater);
        }
    }

    #[test]
    fn integers_and_decimals_compare_numerically() {
        assert_eq!(
            Value::Integer(3).compare(&Value::Decimal(2.5)),
            Ordering::Greater
        );
        assert_eq!(
            Value::Decimal(10.0).compare(&Value::Integer(10)),
            Ordering::Equal
        );
        assert_eq!(Value::Integer(9).compare(&Value::Integer(10)), Ordering::Less);
    }

    #[test]
    fn text_compares_by_bytes_not_locale() {
        // Uppercase ASCII sorts before lowercase in byte order.
        assert_eq!(
            Value::text("Zed").compare(&Value::text("alpha")),
            Ordering::Less
        );
        assert_eq!(
            Value::text("10").compare(&Value::text("9")),
            Ordering::Less
        );
    }

    #[test]
    fn timestamps_parse_rfc3339_and_naive_forms() {
        let a = Value::timestamp_from_str("2023-01-02T03:04:05Z");
        let b = Value::timestamp_from_str("2023-01-02T03:04:05.250000");
        let c = Value::timestamp_from_str("2023-01-02 03:04:06");
        assert!(matches!(a, Value::Timestamp(_)));
        assert!(matches!(b, Value::Timestamp(_)));
        assert_eq!(a.compare(&b), Ordering::Less);
        assert_eq!(b.compare(&c), Ordering::Less);
        assert_eq!(a.to_string(), "2023-01-02 03:04:05");
    }

    #[test]
    fn unparsable_timestamp_keeps_text() {
        assert_eq!(Value::timestamp_from_str("yesterday"), Value::text("yesterday"));
        assert!(Value::timestamp_from_str("").is_null());
    }

    #[test]
    fn decimal_parsing_accepts_separators_and_rejects_garbage() {
        assert_eq!(Value::decimal_from_str("1,234.5"), Value::Decimal(1234.5));
        assert_eq!(Value::decimal_from_str(" 7 "), Value::Decimal(7.0));
        assert!(Value::decimal_from_str("n/a").is_null());
        assert!(Value::decimal_from_str("NaN").is_null());
    }
}
