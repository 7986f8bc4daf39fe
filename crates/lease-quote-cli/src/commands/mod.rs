pub mod deal;
pub mod quote;

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Parse a snake_case flag value into one of the core enums.
pub(crate) fn parse_enum<T: DeserializeOwned>(
    raw: &str,
    flag: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    serde_json::from_value(Value::String(raw.trim().to_lowercase()))
        .map_err(|_| format!("Invalid value '{}' for {}", raw, flag).into())
}

/// Parse a comma-separated list of enum values.
pub(crate) fn parse_enum_list<T: DeserializeOwned>(
    raw: &str,
    flag: &str,
) -> Result<Vec<T>, Box<dyn std::error::Error>> {
    raw.split(',')
        .filter(|s| !s.trim().is_empty())
        .map(|s| parse_enum(s, flag))
        .collect()
}
