use serde::Deserialize;
use serde_json::Value;

use crate::util::json_kind;

use super::graph::{Entity, EntityCategory, GraphPayload, Relation};

const UNKNOWN_TEXT: &str = "Unknown";
const UNKNOWN_CATEGORY: &str = "UNKNOWN";

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("graph payload is not valid JSON")]
    InvalidJson(#[from] serde_json::Error),
    #[error("graph payload must be a JSON object, got {0}")]
    NotAnObject(&'static str),
}

#[derive(Debug, Deserialize)]
struct RawEntity {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default, alias = "entity_text", alias = "label")]
    text: Option<String>,
    #[serde(default, rename = "type", alias = "entity_type")]
    category: Option<String>,
    #[serde(default, alias = "entity_value")]
    value: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct RawRelation {
    source: Value,
    target: Value,
    #[serde(default)]
    relation: Option<String>,
}

pub fn parse_graph_payload(raw: &str) -> Result<GraphPayload, PayloadError> {
    let parsed: Value = serde_json::from_str(raw)?;
    graph_payload_from_value(&parsed)
}

/// Interprets `{nodes: [...], edges: [...]}`.
///
/// Only a non-object payload is an error. A missing `nodes` array or a non-array
/// `edges` field yields an empty payload, and individual malformed entries are
/// skipped.
pub fn graph_payload_from_value(value: &Value) -> Result<GraphPayload, PayloadError> {
    let object = value
        .as_object()
        .ok_or_else(|| PayloadError::NotAnObject(json_kind(value)))?;

    let notice = object
        .get("error")
        .and_then(Value::as_str)
        .map(str::to_owned);

    let Some(raw_nodes) = object.get("nodes").and_then(Value::as_array) else {
        log::warn!("graph payload has no `nodes` array; treating it as empty");
        return Ok(GraphPayload {
            notice,
            ..GraphPayload::default()
        });
    };

    let raw_edges = match object.get("edges") {
        None | Some(Value::Null) => &[][..],
        Some(Value::Array(edges)) => edges.as_slice(),
        Some(other) => {
            log::warn!(
                "graph payload `edges` is a {} instead of an array; treating it as empty",
                json_kind(other)
            );
            return Ok(GraphPayload {
                notice,
                ..GraphPayload::default()
            });
        }
    };

    let entities = raw_nodes
        .iter()
        .enumerate()
        .filter_map(|(index, raw)| parse_entity(index, raw))
        .collect::<Vec<_>>();

    let mut malformed_relations = 0usize;
    let mut relations = Vec::with_capacity(raw_edges.len());
    for raw in raw_edges {
        match parse_relation(raw) {
            Some(relation) => relations.push(relation),
            None => {
                log::debug!("dropping malformed edge entry: {raw}");
                malformed_relations += 1;
            }
        }
    }

    Ok(GraphPayload {
        entities,
        relations,
        malformed_relations,
        notice,
    })
}

fn parse_entity(index: usize, raw: &Value) -> Option<Entity> {
    if let Some(text) = raw.as_str() {
        return Some(Entity {
            key: index.to_string(),
            text: text.to_owned(),
            category: EntityCategory::parse(UNKNOWN_CATEGORY),
            value: None,
        });
    }

    if !raw.is_object() {
        log::warn!("skipping node entry {index}: expected an object, got {}", json_kind(raw));
        return None;
    }

    let entity = match RawEntity::deserialize(raw) {
        Ok(entity) => entity,
        Err(error) => {
            log::warn!("skipping node entry {index}: {error}");
            return None;
        }
    };

    let key = entity
        .id
        .as_ref()
        .and_then(scalar_key)
        .unwrap_or_else(|| index.to_string());

    Some(Entity {
        key,
        text: entity.text.unwrap_or_else(|| UNKNOWN_TEXT.to_owned()),
        category: EntityCategory::parse(entity.category.as_deref().unwrap_or(UNKNOWN_CATEGORY)),
        value: entity
            .value
            .as_ref()
            .and_then(display_value)
            .filter(|value| !value.is_empty()),
    })
}

fn parse_relation(raw: &Value) -> Option<Relation> {
    let relation = RawRelation::deserialize(raw).ok()?;
    Some(Relation {
        source: scalar_key(&relation.source)?,
        target: scalar_key(&relation.target)?,
        relation: relation.relation,
    })
}

fn scalar_key(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn display_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn parses_explicit_ids_and_spec_field_names() {
        let payload = graph_payload_from_value(&json!({
            "nodes": [
                {"id": 1, "text": "Ada Lovelace", "type": "PERSON"},
                {"id": "two", "text": "Analytical Engine", "type": "PRODUCT"}
            ],
            "edges": [{"source": 1, "target": "two", "relation": "designed"}]
        }))
        .unwrap();

        assert_eq!(payload.entities.len(), 2);
        assert_eq!(payload.entities[0].key, "1");
        assert_eq!(payload.entities[1].category, EntityCategory::Product);
        assert_eq!(
            payload.relations,
            vec![Relation {
                source: "1".to_owned(),
                target: "two".to_owned(),
                relation: Some("designed".to_owned()),
            }]
        );
    }

    #[test]
    fn backend_shape_is_keyed_by_position() {
        let payload = graph_payload_from_value(&json!({
            "nodes": [
                {"entity_text": "Acme", "entity_type": "ORG", "entity_value": ""},
                {"entity_text": "$4M", "entity_type": "MONEY", "entity_value": "4000000"}
            ],
            "edges": [{"source": 0, "target": 1, "relation": "related"}]
        }))
        .unwrap();

        assert_eq!(payload.entities[0].key, "0");
        assert_eq!(payload.entities[0].value, None);
        assert_eq!(payload.entities[1].key, "1");
        assert_eq!(payload.entities[1].value.as_deref(), Some("4000000"));
        assert_eq!(payload.relations[0].source, "0");
    }

    #[test]
    fn missing_nodes_is_no_data_not_an_error() {
        let payload = graph_payload_from_value(&json!({"edges": []})).unwrap();
        assert!(payload.is_empty());

        let payload = graph_payload_from_value(&json!({"nodes": "nope"})).unwrap();
        assert!(payload.is_empty());
    }

    #[test]
    fn non_array_edges_is_no_data() {
        let payload =
            graph_payload_from_value(&json!({"nodes": [{"text": "a"}], "edges": {"source": 0}}))
                .unwrap();
        assert!(payload.is_empty());
        assert!(payload.relations.is_empty());
    }

    #[test]
    fn absent_edges_means_no_relations() {
        let payload =
            graph_payload_from_value(&json!({"nodes": [{"text": "a"}, {"text": "b"}]})).unwrap();
        assert_eq!(payload.entities.len(), 2);
        assert!(payload.relations.is_empty());
        assert_eq!(payload.malformed_relations, 0);
    }

    #[test]
    fn malformed_edges_are_dropped_and_counted() {
        let payload = graph_payload_from_value(&json!({
            "nodes": [{"id": 1}, {"id": 2}],
            "edges": [
                {"source": 1},
                "1->2",
                {"source": [1], "target": 2},
                {"source": 1, "target": 2}
            ]
        }))
        .unwrap();

        assert_eq!(payload.relations.len(), 1);
        assert_eq!(payload.malformed_relations, 3);
    }

    #[test]
    fn missing_text_and_type_use_backend_defaults() {
        let payload = graph_payload_from_value(&json!({"nodes": [{"id": 7}]})).unwrap();
        let entity = &payload.entities[0];
        assert_eq!(entity.text, "Unknown");
        assert_eq!(entity.category, EntityCategory::Other("UNKNOWN".to_owned()));
    }

    #[test]
    fn error_field_becomes_notice() {
        let payload = graph_payload_from_value(&json!({
            "nodes": [],
            "edges": [],
            "error": "No nodes found for file abc."
        }))
        .unwrap();
        assert!(payload.is_empty());
        assert_eq!(payload.notice.as_deref(), Some("No nodes found for file abc."));
    }

    #[test]
    fn non_object_payload_is_fatal() {
        let error = graph_payload_from_value(&json!([1, 2, 3])).unwrap_err();
        assert!(matches!(error, PayloadError::NotAnObject("array")));

        assert!(matches!(
            parse_graph_payload("not json"),
            Err(PayloadError::InvalidJson(_))
        ));
    }
}
