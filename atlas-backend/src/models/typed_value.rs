use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

pub type Payload = Map<String, Value>;

/// One JSON payload attached to a record under a specific object type
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypedValue {
    pub id: Uuid,
    pub record_id: Uuid,
    pub object_type_id: Uuid,
    pub payload: Payload,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachValueRequest {
    pub type_id: Uuid,
    pub payload: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateValueRequest {
    pub payload: Value,
}

/// Accept any JSON object; anything else is malformed input.
pub fn payload_object(value: Value) -> Result<Payload, String> {
    match value {
        Value::Object(map) => Ok(map),
        _ => Err("Payload must be a JSON object".to_string()),
    }
}

/// Flatten every leaf of a payload into one space-separated string for the
/// full-text index. Keys are not indexed; numbers, booleans and dates take
/// their textual form.
pub fn payload_text(payload: &Payload) -> String {
    let mut parts = Vec::new();
    for value in payload.values() {
        collect_leaves(value, &mut parts);
    }
    parts.join(" ")
}

fn collect_leaves(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Null => {}
        Value::String(s) => {
            if !s.trim().is_empty() {
                out.push(s.clone());
            }
        }
        Value::Number(n) => out.push(n.to_string()),
        Value::Bool(b) => out.push(b.to_string()),
        Value::Array(items) => items.iter().for_each(|v| collect_leaves(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_leaves(v, out)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_payload_must_be_object() {
        assert!(payload_object(json!({"a": 1})).is_ok());
        assert!(payload_object(json!([1, 2])).is_err());
        assert!(payload_object(json!("text")).is_err());
        assert!(payload_object(Value::Null).is_err());
    }

    #[test]
    fn test_payload_text_flattens_leaves() {
        let payload = payload_object(json!({
            "revenue": 125000,
            "active": true,
            "founded": "2019-04-01",
            "owner": {"id": "8a1c5f0e-2f43-4f55-9d59-3a8e7c6c9f10", "name": "Dana"},
            "labels": ["saas", "b2b"],
            "empty": null
        }))
        .unwrap();

        let text = payload_text(&payload);
        for expected in ["125000", "true", "2019-04-01", "Dana", "saas", "b2b"] {
            assert!(text.contains(expected), "missing {} in {}", expected, text);
        }
        assert!(!text.contains("revenue"));
        assert!(!text.contains("null"));
    }
}
