//! Tolerant field decoders for persisted state of unknown vintage.
//!
//! Every decoder here is total: a value with the wrong shape falls back to a
//! default instead of failing the whole document.

use chrono::{DateTime, Utc};
use nonempty::NonEmpty;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serializer};
use serde_json::Value;

/// Default effort assigned when none is recorded.
pub const DEFAULT_EFFORT: f64 = 5.0;

/// Default verification method.
pub const DEFAULT_VERIFICATION: &str = "Analysis";

/// Decode `T`, falling back to `T::default()` on a shape mismatch.
pub fn or_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_else(|e| {
        tracing::debug!("defaulting malformed field: {e}");
        T::default()
    }))
}

/// Decode a list, skipping elements that do not decode.
pub fn skip_malformed<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let Value::Array(items) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| {
            serde_json::from_value(item)
                .map_err(|e| tracing::warn!("skipping malformed entry: {e}"))
                .ok()
        })
        .collect())
}

/// Decode an RFC 3339 timestamp, or nothing.
pub fn timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .map(|t| t.with_timezone(&Utc))
            .ok(),
        _ => None,
    })
}

/// Decode a number from a number or a numeric string.
pub fn effort<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|n: &f64| n.is_finite() && *n != 0.0)
    .unwrap_or(DEFAULT_EFFORT))
}

/// Decode a "next value" counter; anything unusable becomes 1.
pub fn counter<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
    .filter(|n| *n > 0)
    .unwrap_or(1))
}

/// The initial value of a "next value" counter.
#[must_use]
pub const fn first() -> u64 {
    1
}

/// The fallback verification list.
#[must_use]
pub fn default_verification() -> NonEmpty<String> {
    NonEmpty::new(DEFAULT_VERIFICATION.to_string())
}

/// Normalize a free-form verification list: trimmed, empties dropped.
///
/// Returns the default list if nothing remains.
pub fn verification_from<I, S>(items: I) -> NonEmpty<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let cleaned: Vec<String> = items
        .into_iter()
        .map(|item| item.as_ref().trim().to_string())
        .filter(|item| !item.is_empty())
        .collect();
    NonEmpty::from_vec(cleaned).unwrap_or_else(default_verification)
}

/// Decode a verification list from an array or a comma separated string.
pub fn verification<'de, D>(deserializer: D) -> Result<NonEmpty<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => verification_from(items.iter().filter_map(Value::as_str)),
        Value::String(s) => verification_from(s.split(',')),
        _ => default_verification(),
    })
}

/// Decode an optional identifier reference where `""` means "none".
pub fn reference<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Encode an optional identifier reference, writing `""` for "none".
#[allow(clippy::ref_option)]
pub fn serialize_reference<S>(value: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(value.as_deref().unwrap_or_default())
}

/// Encode a verification list as a plain array.
pub fn serialize_verification<S>(value: &NonEmpty<String>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(value.iter())
}
