//! Mapping between [`Pattern`] records and Qdrant point payloads.
//!
//! Patterns are stored as payload-only points; the payload is the serde JSON
//! form of the record, converted field-by-field into Qdrant values (nested
//! structs and lists included, which `related_issues` needs).

use std::collections::HashMap;

use qdrant_client::qdrant::{ListValue, Struct, Value as QValue, value::Kind};
use serde_json::Value as JValue;

use crate::errors::StoreError;
use crate::record::Pattern;

/// Serializes a [`Pattern`] into a Qdrant payload map.
pub fn pattern_to_payload(p: &Pattern) -> Result<HashMap<String, QValue>, StoreError> {
    let json = serde_json::to_value(p)?;
    match json {
        JValue::Object(map) => Ok(map
            .into_iter()
            .map(|(k, v)| (k, json_to_qvalue(v)))
            .collect()),
        _ => Err(StoreError::Config(
            "pattern did not serialize to a JSON object".into(),
        )),
    }
}

/// Reconstructs a [`Pattern`] from a point payload.
///
/// # Errors
/// Returns [`StoreError::Mapping`] if the payload does not deserialize into
/// the record shape (e.g., a hand-written or legacy point).
pub fn payload_to_pattern(payload: HashMap<String, QValue>) -> Result<Pattern, StoreError> {
    let mut map = serde_json::Map::with_capacity(payload.len());
    for (k, v) in payload {
        map.insert(k, qvalue_to_json(v));
    }
    Ok(serde_json::from_value(JValue::Object(map))?)
}

/// Converts a JSON value into a Qdrant payload value, recursively.
fn json_to_qvalue(v: JValue) -> QValue {
    let kind = match v {
        JValue::Null => Kind::NullValue(0),
        JValue::Bool(b) => Kind::BoolValue(b),
        JValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Kind::IntegerValue(i)
            } else {
                Kind::DoubleValue(n.as_f64().unwrap_or(0.0))
            }
        }
        JValue::String(s) => Kind::StringValue(s),
        JValue::Array(items) => Kind::ListValue(ListValue {
            values: items.into_iter().map(json_to_qvalue).collect(),
        }),
        JValue::Object(map) => Kind::StructValue(Struct {
            fields: map
                .into_iter()
                .map(|(k, v)| (k, json_to_qvalue(v)))
                .collect(),
        }),
    };
    QValue { kind: Some(kind) }
}

/// Converts a Qdrant payload value back into JSON, recursively.
fn qvalue_to_json(v: QValue) -> JValue {
    match v.kind {
        Some(Kind::StringValue(s)) => JValue::String(s),
        Some(Kind::IntegerValue(i)) => JValue::Number(i.into()),
        Some(Kind::DoubleValue(f)) => serde_json::json!(f),
        Some(Kind::BoolValue(b)) => JValue::Bool(b),
        Some(Kind::ListValue(list)) => {
            JValue::Array(list.values.into_iter().map(qvalue_to_json).collect())
        }
        Some(Kind::StructValue(st)) => JValue::Object(
            st.fields
                .into_iter()
                .map(|(k, v)| (k, qvalue_to_json(v)))
                .collect(),
        ),
        Some(Kind::NullValue(_)) | None => JValue::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{Complexity, RelatedIssue};
    use chrono::Utc;

    fn sample() -> Pattern {
        Pattern {
            pattern_id: Pattern::derive_id("javascript", "https://example.com/x.js"),
            language: "javascript".into(),
            source_repository: "acme/shop".into(),
            source_path: "src/cart.js".into(),
            source_url: "https://example.com/x.js".into(),
            code_snippet: "function computeTotal(items) { return 0; }".into(),
            primary_feature: "computeTotal".into(),
            all_features: vec!["computeTotal".into(), "items".into()],
            code_type: "function".into(),
            complexity: Complexity::Medium,
            related_issues: vec![RelatedIssue {
                title: "Cart total is wrong".into(),
                url: "https://example.com/issues/1".into(),
                state: "closed".into(),
                created_at: Some(Utc::now()),
                closed_at: None,
                labels: vec!["bug".into()],
            }],
            date_added: Utc::now(),
        }
    }

    #[test]
    fn pattern_round_trips_through_payload() {
        let p = sample();
        let payload = pattern_to_payload(&p).unwrap();
        let back = payload_to_pattern(payload).unwrap();
        assert_eq!(back.pattern_id, p.pattern_id);
        assert_eq!(back.related_issues.len(), 1);
        assert_eq!(back.related_issues[0].labels, vec!["bug".to_string()]);
    }

    #[test]
    fn malformed_payload_is_a_mapping_error() {
        let mut payload = HashMap::new();
        payload.insert(
            "pattern_id".to_string(),
            QValue {
                kind: Some(Kind::StringValue("x".into())),
            },
        );
        // Missing all other required fields.
        assert!(matches!(
            payload_to_pattern(payload),
            Err(StoreError::Mapping(_))
        ));
    }
}
