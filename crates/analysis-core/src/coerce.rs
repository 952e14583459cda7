//! Lenient boundary coercion for snapshot fields.
//!
//! Upstream analyzers are loosely typed: valuation ratios arrive as `"12.5%"`,
//! flags as `0/1`, whole sections as `"n/a"` when a detector had nothing to say.
//! Every helper here degrades to an absent/neutral value instead of failing, so a
//! snapshot always deserializes as long as the document itself is a JSON object.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parse numeric text, stripping `%`, `,` and whitespace.
///
/// Returns `None` for empty, unparsable or non-finite input.
pub fn parse_numeric(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(c, '%' | ',') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Coerce an arbitrary JSON value to a finite `f64`.
pub fn value_to_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => parse_numeric(s),
        _ => None,
    }
}

/// Coerce an arbitrary JSON value to a flag. Unrecognized input is `false`.
pub fn value_to_bool(value: &Value) -> bool {
    match value {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|v| v != 0.0).unwrap_or(false),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().as_str(),
            "true" | "yes" | "y" | "1"
        ),
        _ => false,
    }
}

pub fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value))
}

pub fn lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_bool(&value))
}

/// Non-negative whole-number counts (streak lengths). Negative input is absent.
pub fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value)
        .filter(|v| *v >= 0.0)
        .map(|v| v.round().min(u32::MAX as f64) as u32))
}

/// Severity scores are clamped to 0..=5.
pub fn lenient_severity<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_f64(&value)
        .map(|v| v.round().clamp(0.0, 5.0) as u8)
        .unwrap_or(0))
}

pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Enumerated labels: trimmed, lowercased, then matched against the target's
/// serde names. Unknown labels are absent.
pub fn lenient_label<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) => {
            let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
            serde_json::from_value(Value::String(normalized)).ok()
        }
        _ => None,
    })
}

/// A whole section; malformed input falls back to the section's default.
pub fn lenient_section<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// A list whose malformed entries are dropped individually.
pub fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}
