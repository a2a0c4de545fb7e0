//! Defensive conversion of loosely typed JSON values.
//!
//! Upstream payloads mix numbers, numeric strings, empty strings and
//! placeholder text freely. None of these functions fail: a value that can't
//! be converted becomes `None` and ends up as SQL NULL.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rusqlite::types::{ToSql, ToSqlOutput, Value as SqlValue};
use serde_json::Value;

/// Unix values at or above this magnitude are taken as milliseconds.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

pub fn coerce_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                None
            } else {
                Some(trimmed.to_string())
            }
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

pub fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral_f64)),
        Value::String(s) => {
            let trimmed = s.trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().and_then(integral_f64))
        }
        _ => None,
    }
}

fn integral_f64(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

pub fn coerce_decimal(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|f| f.is_finite())
}

pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "t" | "yes" | "y" => Some(true),
            "false" | "0" | "f" | "no" | "n" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

pub fn coerce_date(value: &Value) -> Option<NaiveDate> {
    let s = value.as_str()?.trim();
    if s.is_empty() || s.starts_with("0000-00-00") {
        return None;
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }
    // Date part of a timestamp.
    s.get(..10)
        .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
}

pub fn coerce_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(_) => coerce_int(value).and_then(from_unix),
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() || s.starts_with("0000-00-00") {
                return None;
            }
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, format) {
                    return Some(naive.and_utc());
                }
            }
            if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
            }
            s.parse::<i64>().ok().and_then(from_unix)
        }
        _ => None,
    }
}

fn from_unix(n: i64) -> Option<DateTime<Utc>> {
    if n.abs() >= MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(n)
    } else {
        DateTime::from_timestamp(n, 0)
    }
}

/// Parses track times such as `"22:05"` or `"1:02:30"` into seconds.
pub fn parse_duration_secs(value: &Value) -> Option<i64> {
    match value {
        Value::Number(_) => coerce_int(value).filter(|secs| *secs >= 0),
        Value::String(s) => {
            let s = s.trim();
            let parts: Vec<&str> = s.split(':').collect();
            if parts
                .iter()
                .any(|p| p.is_empty() || !p.bytes().all(|b| b.is_ascii_digit()))
            {
                return None;
            }
            let nums: Vec<i64> = parts
                .iter()
                .map(|p| p.parse::<i64>())
                .collect::<Result<_, _>>()
                .ok()?;
            match nums.as_slice() {
                [secs] => Some(*secs),
                [mins, secs] if *secs < 60 => Some(mins * 60 + secs),
                [hours, mins, secs] if *mins < 60 && *secs < 60 => {
                    Some(hours * 3600 + mins * 60 + secs)
                }
                _ => None,
            }
        }
        _ => None,
    }
}

/// A coerced value ready to be bound into a curated row.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Text(String),
    Int(i64),
    Real(f64),
    Bool(bool),
    Json(Value),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            FieldValue::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// Stable textual form fed into the content hash.
    pub fn canonical(&self) -> String {
        match self {
            FieldValue::Null => "null".to_string(),
            FieldValue::Text(s) => format!("s:{}", s),
            FieldValue::Int(i) => format!("i:{}", i),
            FieldValue::Real(f) => format!("r:{}", f),
            FieldValue::Bool(b) => format!("b:{}", b),
            FieldValue::Json(v) => format!("j:{}", v),
        }
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Real(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Text(value.format("%Y-%m-%d").to_string())
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Int(value.timestamp_millis())
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        let value = match self {
            FieldValue::Null => SqlValue::Null,
            FieldValue::Text(s) => SqlValue::Text(s.clone()),
            FieldValue::Int(i) => SqlValue::Integer(*i),
            FieldValue::Real(f) => SqlValue::Real(*f),
            FieldValue::Bool(b) => SqlValue::Integer(*b as i64),
            FieldValue::Json(v) => SqlValue::Text(v.to_string()),
        };
        Ok(ToSqlOutput::Owned(value))
    }
}

/// How a payload value is turned into a column value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    Text,
    Int,
    Decimal,
    Bool,
    Date,
    Timestamp,
    DurationSecs,
    Json,
}

impl Coercion {
    pub fn apply(&self, value: &Value) -> FieldValue {
        match self {
            Coercion::Text => coerce_text(value).into(),
            Coercion::Int => coerce_int(value).into(),
            Coercion::Decimal => coerce_decimal(value).into(),
            Coercion::Bool => coerce_bool(value).into(),
            Coercion::Date => coerce_date(value).into(),
            Coercion::Timestamp => coerce_timestamp(value).into(),
            Coercion::DurationSecs => parse_duration_secs(value).into(),
            Coercion::Json => match value {
                Value::Null => FieldValue::Null,
                other => FieldValue::Json(other.clone()),
            },
        }
    }
}
