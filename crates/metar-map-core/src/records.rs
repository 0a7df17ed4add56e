//! Tolerant access to the JSON records returned by the lookup services.
//!
//! The upstream APIs are inconsistent about field spellings, so every value
//! is read through a [`FieldAliases`] list tried in priority order.

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Malformed JSON body: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Expected a JSON array of records")]
    NotAnArray,
}

/// Accepted field names for one value, highest priority first.
#[derive(Debug, Clone, Copy)]
pub struct FieldAliases(pub &'static [&'static str]);

impl FieldAliases {
    /// First alias present on `record` with a non-null value.
    pub fn lookup<'a>(&self, record: &'a Value) -> Option<&'a Value> {
        self.0
            .iter()
            .filter_map(|name| record.get(*name))
            .find(|v| !v.is_null())
    }

    /// Trimmed, uppercased string value. Empty strings count as missing.
    pub fn text(&self, record: &Value) -> Option<String> {
        let s = self.lookup(record)?.as_str()?.trim();
        (!s.is_empty()).then(|| s.to_ascii_uppercase())
    }

    /// Numeric value, accepting either a JSON number or a numeric string.
    pub fn number(&self, record: &Value) -> Option<f64> {
        match self.lookup(record)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }
}

/// Parses a response body into its records.
///
/// An empty body means "no data" and yields no records. An object wrapping a
/// `data` array is unwrapped.
pub fn parse_records(body: &str) -> Result<Vec<Value>, RecordError> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    match serde_json::from_str::<Value>(body)? {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(RecordError::NotAnArray),
        },
        _ => Err(RecordError::NotAnArray),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const IDS: FieldAliases = FieldAliases(&["icaoId", "station_id"]);
    const LAT: FieldAliases = FieldAliases(&["lat", "latitude"]);

    #[test]
    fn test_aliases_follow_priority_order() {
        let both = json!({"icaoId": "kjfk", "station_id": "KLGA"});
        assert_eq!(IDS.text(&both).as_deref(), Some("KJFK"));

        let legacy = json!({"station_id": " klga "});
        assert_eq!(IDS.text(&legacy).as_deref(), Some("KLGA"));

        let null_first = json!({"icaoId": null, "station_id": "KEWR"});
        assert_eq!(IDS.text(&null_first).as_deref(), Some("KEWR"));
    }

    #[test]
    fn test_missing_or_wrongly_typed_fields() {
        assert_eq!(IDS.text(&json!({"id": "KJFK"})), None);
        assert_eq!(IDS.text(&json!({"icaoId": 42})), None);
        assert_eq!(IDS.text(&json!({"icaoId": "  "})), None);
        assert_eq!(LAT.number(&json!({"lat": true})), None);
    }

    #[test]
    fn test_numbers_from_strings() {
        assert_eq!(LAT.number(&json!({"lat": 40.5})), Some(40.5));
        assert_eq!(LAT.number(&json!({"latitude": " -33.25 "})), Some(-33.25));
        assert_eq!(LAT.number(&json!({"lat": "north"})), None);
    }

    #[test]
    fn test_parse_records_shapes() {
        assert_eq!(parse_records("[{\"a\":1},{\"b\":2}]").unwrap().len(), 2);
        assert_eq!(parse_records("{\"data\":[{}]}").unwrap().len(), 1);
        assert!(parse_records("").unwrap().is_empty());
        assert!(matches!(parse_records("{\"x\":1}"), Err(RecordError::NotAnArray)));
        assert!(matches!(parse_records("<html>"), Err(RecordError::Json(_))));
    }
}
