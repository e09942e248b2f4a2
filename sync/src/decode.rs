//! Tolerant decoding of cached and remote payloads.
//!
//! Snapshots are written by older app versions and by other clients, so the
//! decoders here accept the shapes those produce: dates with a time part,
//! numbers as strings, fractional or negative counts, `null` in place of a
//! value. Collections decode element by element; a record that still does not
//! fit is logged and skipped so the rest of the snapshot survives.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;

/// Calendar date from `YYYY-MM-DD` or from a date-time (RFC 3339 or naive ISO)
///
/// For a date-time the date part is kept as written, offset ignored.
pub(crate) fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|dt| dt.date())
        })
}

/// Required calendar date
pub(crate) fn date<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_date(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date '{raw}'")))
}

/// Optional timestamp: RFC 3339, a bare date (midnight UTC) or epoch milliseconds
///
/// Anything else decodes as `None`.
pub(crate) fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(raw)) => DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
            .or_else(|| {
                parse_date(&raw)
                    .and_then(|day| day.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.and_utc())
            }),
        Some(Value::Number(n)) => n.as_i64().and_then(DateTime::<Utc>::from_timestamp_millis),
        _ => None,
    })
}

fn number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}

/// Non-negative whole count; fractions round, negatives and garbage become 0
pub(crate) fn count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(number(value.as_ref()).map_or(0, clamp_count))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped to the u32 range first
fn clamp_count(n: f64) -> u32 {
    n.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

/// Amount or quantity; numeric strings accepted, anything else becomes 0
pub(crate) fn amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(number(value.as_ref()).unwrap_or(0.0))
}

/// Optional amount; anything that is not a number becomes `None`
pub(crate) fn optional_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(number(value.as_ref()))
}

/// Optional nested record; one that does not decode becomes `None`
pub(crate) fn optional_record<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(value) => decode_record(0, value),
        None => None,
    })
}

/// Optional collection decoded element by element
///
/// `null` or a non-array counts as absent.
pub(crate) fn elements<'de, D, T>(deserializer: D) -> Result<Option<Vec<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => Some(decode_elements(items)),
        Some(other) => {
            tracing::warn!(
                kind = std::any::type_name::<T>(),
                found = value_kind(&other),
                "Ignoring collection that is not an array"
            );
            None
        },
        None => None,
    })
}

/// Collection decoded element by element; absent counts as empty
pub(crate) fn elements_or_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    elements(deserializer).map(Option::unwrap_or_default)
}

fn decode_elements<T: DeserializeOwned>(items: Vec<Value>) -> Vec<T> {
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| decode_record(index, item))
        .collect()
}

fn decode_record<T: DeserializeOwned>(index: usize, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(record) => Some(record),
        Err(error) => {
            tracing::warn!(
                kind = std::any::type_name::<T>(),
                index,
                %error,
                "Skipping record that does not decode"
            );
            None
        },
    }
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
