//! Conversion between wire values (JSON, filter literals) and storage values.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use sea_orm::Value;
use serde_json::Value as JsonValue;
use uuid::Uuid;

use crate::reflect::FieldType;

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%Y%m%d"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M"];

/// Parse a timestamp written in any of the common layouts.
///
/// Accepts `2022-01-02 03:04:05`, the `T`-separated form, minute precision,
/// slash-separated dates, RFC 3339 with an offset (normalised to UTC), bare
/// dates (midnight) and unix seconds.
#[must_use]
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_utc()))
        .or_else(|| parse_date(raw).and_then(|date| date.and_hms_opt(0, 0, 0)))
        .or_else(|| {
            raw.parse::<i64>()
                .ok()
                .filter(|_| raw.len() >= 9)
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .map(|dt| dt.naive_utc())
        })
}

/// Offset-aware timestamp; naive input is taken as UTC.
#[must_use]
pub fn parse_datetime_tz(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .or_else(|| DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f%:z").ok())
        .or_else(|| parse_datetime(raw).map(|naive| naive.and_utc().fixed_offset()))
}

#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
                .map(|dt| dt.date())
        })
}

#[must_use]
pub fn parse_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(raw, format).ok())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Typed SQL `NULL` for a field.
#[must_use]
pub fn null_value(field_type: &FieldType) -> Value {
    match field_type {
        FieldType::Bool => Value::Bool(None),
        FieldType::Integer => Value::BigInt(None),
        FieldType::Float | FieldType::Decimal => Value::Double(None),
        FieldType::String | FieldType::Text | FieldType::Enum(_) => Value::String(None),
        FieldType::Date => Value::ChronoDate(None),
        FieldType::DateTime => Value::ChronoDateTime(None),
        FieldType::DateTimeTz => Value::ChronoDateTimeWithTimeZone(None),
        FieldType::Time => Value::ChronoTime(None),
        FieldType::Uuid => Value::Uuid(None),
        FieldType::Json => Value::Json(None),
        FieldType::Binary => Value::Bytes(None),
    }
}

/// Coerce a JSON payload value into the field's storage type.
///
/// # Errors
/// Returns a short description of the expected type on mismatch.
pub fn json_to_value(value: &JsonValue, field_type: &FieldType) -> Result<Value, String> {
    if value.is_null() {
        return Ok(null_value(field_type));
    }

    let mismatch = || format!("expected {}", expected(field_type));
    match field_type {
        FieldType::Json => Ok(value.clone().into()),
        FieldType::Bool => match value {
            JsonValue::Bool(flag) => Ok((*flag).into()),
            JsonValue::Number(n) => match n.as_i64() {
                Some(0) => Ok(false.into()),
                Some(1) => Ok(true.into()),
                _ => Err(mismatch()),
            },
            JsonValue::String(s) => parse_bool(s).map(Value::from).ok_or_else(mismatch),
            _ => Err(mismatch()),
        },
        FieldType::Integer => match value {
            JsonValue::Number(n) => n.as_i64().map(Value::from).ok_or_else(mismatch),
            JsonValue::String(s) => s.trim().parse::<i64>().map(Value::from).map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
        FieldType::Float | FieldType::Decimal => match value {
            JsonValue::Number(n) => n.as_f64().map(Value::from).ok_or_else(mismatch),
            JsonValue::String(s) => s.trim().parse::<f64>().map(Value::from).map_err(|_| mismatch()),
            _ => Err(mismatch()),
        },
        FieldType::String | FieldType::Text | FieldType::Enum(_) => match value {
            JsonValue::String(s) => Ok(s.clone().into()),
            JsonValue::Number(n) => Ok(n.to_string().into()),
            JsonValue::Bool(b) => Ok(b.to_string().into()),
            _ => Err(mismatch()),
        },
        FieldType::Binary => value
            .as_str()
            .map(|s| Value::from(s.as_bytes().to_vec()))
            .ok_or_else(mismatch),
        _ => value
            .as_str()
            .and_then(|s| parse_temporal_or_uuid(s, field_type))
            .ok_or_else(mismatch),
    }
}

fn parse_temporal_or_uuid(raw: &str, field_type: &FieldType) -> Option<Value> {
    match field_type {
        FieldType::Date => parse_date(raw).map(Value::from),
        FieldType::DateTime => parse_datetime(raw).map(Value::from),
        FieldType::DateTimeTz => parse_datetime_tz(raw).map(Value::from),
        FieldType::Time => parse_time(raw).map(Value::from),
        FieldType::Uuid => Uuid::parse_str(raw.trim()).ok().map(Value::from),
        _ => None,
    }
}

/// Coerce one filter literal; anything that does not parse stays a string.
#[must_use]
pub fn literal_to_value(literal: &str, field_type: &FieldType) -> Value {
    let parsed = match field_type {
        FieldType::Bool => parse_bool(literal).map(Value::from),
        FieldType::Integer => literal
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .or_else(|_| literal.trim().parse::<f64>().map(Value::from))
            .ok(),
        FieldType::Float | FieldType::Decimal => literal.trim().parse::<f64>().ok().map(Value::from),
        FieldType::String | FieldType::Text | FieldType::Enum(_) | FieldType::Json | FieldType::Binary => {
            None
        }
        _ => parse_temporal_or_uuid(literal, field_type),
    };
    parsed.unwrap_or_else(|| Value::from(literal.to_owned()))
}

/// Normalise a fetched column value to its wire form.
///
/// Drivers without native booleans return `0`/`1`, and JSON columns may come
/// back as text.
#[must_use]
pub fn normalize_output(value: JsonValue, field_type: &FieldType) -> JsonValue {
    match (field_type, value) {
        (FieldType::Bool, JsonValue::Number(n)) => JsonValue::Bool(n.as_i64().is_some_and(|v| v != 0)),
        (FieldType::Json, JsonValue::String(s)) => {
            serde_json::from_str(&s).unwrap_or(JsonValue::String(s))
        }
        (_, value) => value,
    }
}

/// Falsy values never reach an insert for a primary key.
#[must_use]
pub fn is_falsy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::Bool(b) => !b,
        JsonValue::Number(n) => n.as_f64() == Some(0.0),
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(items) => items.is_empty(),
        JsonValue::Object(map) => map.is_empty(),
    }
}

const fn expected(field_type: &FieldType) -> &'static str {
    match field_type {
        FieldType::Bool => "a boolean",
        FieldType::Integer => "an integer",
        FieldType::Float | FieldType::Decimal => "a number",
        FieldType::String | FieldType::Text => "a string",
        FieldType::Enum(_) => "one of the declared choices",
        FieldType::Date => "a date",
        FieldType::DateTime | FieldType::DateTimeTz => "a date-time",
        FieldType::Time => "a time",
        FieldType::Uuid => "a UUID",
        FieldType::Json => "JSON",
        FieldType::Binary => "a string of bytes",
    }
}
