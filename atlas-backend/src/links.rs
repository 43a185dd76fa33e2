//! Reference discovery inside free-form typed-value payloads.
//!
//! Payload values point at other records by convention only: a bare id
//! string, a `{id, name, ...}` reference object, or an array of either. This
//! module classifies each top-level value into one of those shapes and
//! collects the ids. Unrecognized shapes are dropped, never reported.

use serde_json::Value;
use std::collections::HashSet;
use uuid::Uuid;

use crate::models::Payload;

/// Shape of one top-level payload value
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue<'a> {
    /// String, number, bool, null, or an array made only of those
    Scalar(&'a Value),
    Reference(Uuid),
    ReferenceList(Vec<Uuid>),
    Unrecognized,
}

/// Classify a single payload value. Nested arrays are never descended into.
pub fn classify(value: &Value) -> PayloadValue<'_> {
    match value {
        Value::Array(items) => {
            let ids: Vec<Uuid> = items.iter().filter_map(element_reference).collect();
            if !ids.is_empty() {
                PayloadValue::ReferenceList(ids)
            } else if items.iter().all(is_scalar) {
                PayloadValue::Scalar(value)
            } else {
                PayloadValue::Unrecognized
            }
        }
        Value::Object(_) => match element_reference(value) {
            Some(id) => PayloadValue::Reference(id),
            None => PayloadValue::Unrecognized,
        },
        Value::String(_) => match element_reference(value) {
            Some(id) => PayloadValue::Reference(id),
            None => PayloadValue::Scalar(value),
        },
        Value::Null | Value::Bool(_) | Value::Number(_) => PayloadValue::Scalar(value),
    }
}

/// Rules shared by top-level values and array elements: an id string, or an
/// object whose `id` is an id string.
fn element_reference(value: &Value) -> Option<Uuid> {
    match value {
        Value::String(s) => parse_record_id(s),
        Value::Object(map) => map.get("id").and_then(Value::as_str).and_then(parse_record_id),
        _ => None,
    }
}

fn parse_record_id(s: &str) -> Option<Uuid> {
    Uuid::parse_str(s).ok()
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

/// Every record id referenced by any top-level value of any payload.
pub fn extract_references<'a, I>(payloads: I) -> HashSet<Uuid>
where
    I: IntoIterator<Item = &'a Payload>,
{
    let mut ids = HashSet::new();
    for payload in payloads {
        for value in payload.values() {
            match classify(value) {
                PayloadValue::Reference(id) => {
                    ids.insert(id);
                }
                PayloadValue::ReferenceList(list) => ids.extend(list),
                PayloadValue::Scalar(_) | PayloadValue::Unrecognized => {}
            }
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            _ => panic!("test payload must be an object"),
        }
    }

    #[test]
    fn test_mixed_shapes_are_deduplicated() {
        let id1 = Uuid::new_v4();
        let id2 = Uuid::new_v4();
        let id3 = Uuid::new_v4();

        let payloads = vec![
            payload(json!({"a": id1.to_string()})),
            payload(json!({"b": {"id": id2.to_string(), "name": "x"}})),
            payload(json!({"c": [id3.to_string(), "not-an-id", {"id": id2.to_string()}]})),
        ];

        let refs = extract_references(&payloads);
        assert_eq!(refs.len(), 3);
        assert!(refs.contains(&id1));
        assert!(refs.contains(&id2));
        assert!(refs.contains(&id3));
    }

    #[test]
    fn test_classify_shapes() {
        let id = Uuid::new_v4();

        assert_eq!(classify(&json!(id.to_string())), PayloadValue::Reference(id));
        assert_eq!(
            classify(&json!({"id": id.to_string(), "name": "Acme"})),
            PayloadValue::Reference(id)
        );
        assert_eq!(
            classify(&json!([id.to_string()])),
            PayloadValue::ReferenceList(vec![id])
        );

        let text = json!("hello");
        assert_eq!(classify(&text), PayloadValue::Scalar(&text));
        let number = json!(42);
        assert_eq!(classify(&number), PayloadValue::Scalar(&number));
        let tags = json!(["a", "b", 3]);
        assert_eq!(classify(&tags), PayloadValue::Scalar(&tags));
    }

    #[test]
    fn test_unrecognized_shapes_are_ignored() {
        let id = Uuid::new_v4();

        assert_eq!(classify(&json!({"name": "no id"})), PayloadValue::Unrecognized);
        assert_eq!(classify(&json!({"id": 17})), PayloadValue::Unrecognized);
        assert_eq!(classify(&json!({"id": "nope"})), PayloadValue::Unrecognized);
        assert_eq!(
            classify(&json!([[id.to_string()]])),
            PayloadValue::Unrecognized
        );

        let payloads = vec![payload(json!({
            "nested": [[id.to_string()]],
            "deep": {"inner": {"id": id.to_string()}},
            "count": 3
        }))];
        assert!(extract_references(&payloads).is_empty());
    }

    #[test]
    fn test_padded_id_is_not_a_reference() {
        let id = Uuid::new_v4();
        let padded = json!(format!(" {} ", id));
        assert!(matches!(classify(&padded), PayloadValue::Scalar(_)));
        assert_eq!(
            classify(&json!({"id": format!("{}\n", id)})),
            PayloadValue::Unrecognized
        );
        assert!(extract_references([&payload(json!({"owner": padded}))]).is_empty());
    }

    #[test]
    fn test_empty_input() {
        let payloads: Vec<Payload> = vec![];
        assert!(extract_references(&payloads).is_empty());
        assert!(extract_references(&vec![Payload::new()]).is_empty());
    }
}
