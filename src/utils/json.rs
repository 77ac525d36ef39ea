use crate::error::{MinerError, Result};
use serde_json::Value;

/// Returns `value[key]`. A missing key is a shape mismatch, an explicit `null` is not.
pub fn field<'a>(value: &'a Value, key: &str) -> Result<&'a Value> {
    value.get(key).ok_or_else(|| MinerError::missing(key))
}

/// Like [`field`], but `null` counts as missing too.
pub fn required<'a>(value: &'a Value, key: &str) -> Result<&'a Value> {
    match field(value, key)? {
        Value::Null => Err(MinerError::missing(key)),
        found => Ok(found),
    }
}

/// Walks a chain of required keys, reporting the dotted path that broke.
pub fn path<'a>(value: &'a Value, keys: &[&str]) -> Result<&'a Value> {
    let mut current = value;
    for (depth, key) in keys.iter().enumerate() {
        current = required(current, key).map_err(|_| MinerError::missing(keys[..=depth].join(".")))?;
    }
    Ok(current)
}

/// Twitch sends ids as strings in GQL and as numbers elsewhere; accept both.
pub fn id(value: &Value, key: &str) -> Result<u64> {
    match required(value, key)? {
        Value::String(s) => s.parse().map_err(|_| MinerError::missing(key)),
        Value::Number(n) => n.as_u64().ok_or_else(|| MinerError::missing(key)),
        _ => Err(MinerError::missing(key)),
    }
}

pub fn uint(value: &Value, key: &str) -> Result<u64> {
    required(value, key)?
        .as_u64()
        .ok_or_else(|| MinerError::missing(key))
}

pub fn string<'a>(value: &'a Value, key: &str) -> Result<&'a str> {
    required(value, key)?
        .as_str()
        .ok_or_else(|| MinerError::missing(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_id_accepts_strings_and_numbers() {
        let data = json!({"a": "123", "b": 456, "c": "abc"});
        assert_eq!(id(&data, "a").unwrap(), 123);
        assert_eq!(id(&data, "b").unwrap(), 456);
        assert!(id(&data, "c").is_err());
    }

    #[test]
    fn test_path_reports_broken_segment() {
        let data = json!({"data": {"community": {"channel": null}}});
        match path(&data, &["data", "community", "channel", "self"]) {
            Err(MinerError::ShapeMismatch(field)) => assert_eq!(field, "data.community.channel"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_field_allows_null() {
        let data = json!({"game": null});
        assert!(field(&data, "game").unwrap().is_null());
        assert!(required(&data, "game").is_err());
        assert!(field(&data, "tags").is_err());
    }
}
