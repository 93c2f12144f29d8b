//! Canonical records.
//!
//! Payloads are normalized here, right after they are fetched, so nothing
//! downstream has to care how the server spelled a field. The wire format is
//! camelCase; identifiers may arrive as JSON strings or numbers and are always
//! held as strings. Fields the console depends on are required (though they
//! may be `null`), so a payload in any other naming fails to decode instead
//! of silently reading as empty.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::fetch::FetchError;

/// Offset used when a property has no invoice settings
pub const DEFAULT_TIMEZONE_OFFSET: &str = "UTC+00:00";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    #[serde(deserialize_with = "id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Required key, `null` for unassigned properties
    #[serde(deserialize_with = "optional_id")]
    pub landlord_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Landlord {
    #[serde(deserialize_with = "id")]
    pub id: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceSettings {
    pub timezone_offset: String,
}

impl Default for InvoiceSettings {
    fn default() -> Self {
        Self { timezone_offset: DEFAULT_TIMEZONE_OFFSET.to_string() }
    }
}

/// Decode a single record
pub fn decode<T: DeserializeOwned>(value: Value) -> Result<T, FetchError> {
    Ok(serde_json::from_value(value)?)
}

/// Decode a list endpoint; anything but a JSON array is rejected
pub fn decode_list<T: DeserializeOwned>(value: Value) -> Result<Vec<T>, FetchError> {
    match value {
        Value::Array(_) => decode(value),
        other => Err(FetchError::Decode(format!("expected a list, got {}", kind(&other)))),
    }
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

impl From<RawId> for String {
    fn from(raw: RawId) -> Self {
        match raw {
            RawId::Text(s) => s,
            RawId::Number(n) => n.to_string(),
        }
    }
}

fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    RawId::deserialize(deserializer).map(String::from)
}

fn optional_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(Option::<RawId>::deserialize(deserializer)?.map(String::from))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_ids_become_strings() {
        let properties: Vec<Property> = decode_list(json!([
            { "id": 12, "name": "Riverside", "landlordId": 3 },
            { "id": "p-9", "name": "Hilltop", "landlordId": null },
            { "id": "p-10", "landlordId": "L4" }
        ]))
        .unwrap();

        assert_eq!(properties[0].id, "12");
        assert_eq!(properties[0].landlord_id.as_deref(), Some("3"));
        assert_eq!(properties[1].landlord_id, None);
        assert_eq!(properties[2].name, "");
    }

    #[test]
    fn test_snake_case_settings_are_rejected() {
        let err = decode::<InvoiceSettings>(json!({ "timezone_offset": "UTC+03:00" })).unwrap_err();
        assert!(matches!(err, FetchError::Decode(ref msg) if msg.contains("timezoneOffset")));

        let settings: InvoiceSettings = decode(json!({ "timezoneOffset": "UTC+03:00" })).unwrap();
        assert_eq!(settings.timezone_offset, "UTC+03:00");
    }

    #[test]
    fn test_snake_case_property_is_rejected() {
        let err = decode_list::<Property>(json!([{ "id": 1, "landlord_id": "L1" }])).unwrap_err();
        assert!(matches!(err, FetchError::Decode(ref msg) if msg.contains("landlordId")));
    }

    #[test]
    fn test_list_endpoint_must_return_array() {
        let err = decode_list::<Landlord>(json!({ "error": "nope" })).unwrap_err();
        assert_eq!(err, FetchError::Decode("expected a list, got an object".into()));
    }
}
