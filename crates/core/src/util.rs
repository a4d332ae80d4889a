use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Strip the time portion from an ISO-8601 timestamp (`2024-04-23T10:00:00Z` -> `2024-04-23`).
/// Values without a time separator are returned unchanged.
pub fn date_only(value: &str) -> &str { value.split_once('T').map_or(value, |(date, _)| date) }

/// Accepts a JSON string or number, yielding its text form. Anything else becomes `None`.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where D: Deserializer<'de> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accepts a JSON number or a numeric string. Anything else becomes `None`.
pub fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where D: Deserializer<'de> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Accepts a JSON boolean or the strings `"true"`/`"false"`.
pub fn lenient_bool<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where D: Deserializer<'de> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => Some(b),
        Some(Value::String(s)) => match s.as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    })
}
