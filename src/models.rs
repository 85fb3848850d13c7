use crate::config::INIT_VERTEX_EDGES_CAPACITY;
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Source-assigned vertex identifier. Graph stores hand out either numeric or
/// string ids, so both are kept in their native JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VertexId {
    Number(i64),
    String(String),
}

impl fmt::Display for VertexId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VertexId::Number(n) => write!(f, "{}", n),
            VertexId::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for VertexId {
    fn from(id: i64) -> Self {
        VertexId::Number(id)
    }
}

impl From<&str> for VertexId {
    fn from(id: &str) -> Self {
        VertexId::String(id.to_string())
    }
}

impl From<String> for VertexId {
    fn from(id: String) -> Self {
        VertexId::String(id)
    }
}

/// Pre-serialized property payload. The text is carried through untouched and
/// only parsed back when a caller explicitly asks for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawProperties(String);

impl RawProperties {
    pub fn from_map(properties: &Map<String, Value>) -> Self {
        Self(Value::Object(properties.clone()).to_string())
    }

    pub fn from_value(value: &Value) -> Self {
        Self(value.to_string())
    }

    /// Wraps text that is already serialized; it is not validated here.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Borrows the payload as a JSON raw value, failing if it is not valid JSON.
    pub fn as_raw_value(&self) -> serde_json::Result<&RawValue> {
        serde_json::from_str(&self.0)
    }

    pub fn parse(&self) -> serde_json::Result<Map<String, Value>> {
        serde_json::from_str(&self.0)
    }
}

impl Default for RawProperties {
    fn default() -> Self {
        Self("{}".to_string())
    }
}

/// Vertex as delivered by the graph store
#[derive(Debug, Clone, Deserialize)]
pub struct RawVertex {
    pub id: VertexId,
    pub label: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// Edge as delivered by the graph store
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawEdge {
    pub id: String,
    pub label: String,
    #[serde(alias = "outV")]
    pub source: VertexId,
    #[serde(alias = "outVLabel")]
    pub source_label: String,
    #[serde(alias = "inV")]
    pub target: VertexId,
    #[serde(alias = "inVLabel")]
    pub target_label: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

/// Immutable edge shared by both of its endpoints' edge lists
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeRecord {
    pub id: String,
    pub label: String,
    pub source: VertexId,
    pub target: VertexId,
    pub properties: RawProperties,
}

impl EdgeRecord {
    pub fn from_raw(edge: &RawEdge) -> Self {
        Self {
            id: edge.id.clone(),
            label: edge.label.clone(),
            source: edge.source.clone(),
            target: edge.target.clone(),
            properties: RawProperties::from_map(&edge.properties),
        }
    }
}

/// A vertex together with every edge incident to it, in discovery order
#[derive(Debug, Clone)]
pub struct VertexRecord {
    pub id: VertexId,
    pub label: String,
    pub properties: RawProperties,
    pub edges: Vec<Arc<EdgeRecord>>,
}

impl VertexRecord {
    pub fn new(id: VertexId, label: impl Into<String>, properties: RawProperties) -> Self {
        Self {
            id,
            label: label.into(),
            properties,
            edges: Vec::with_capacity(INIT_VERTEX_EDGES_CAPACITY),
        }
    }

    pub fn from_raw(vertex: RawVertex) -> Self {
        let properties = RawProperties::from_map(&vertex.properties);
        Self::new(vertex.id, vertex.label, properties)
    }

    pub fn add_edge(&mut self, edge: Arc<EdgeRecord>) {
        self.edges.push(edge);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn vertex_id_keeps_json_shape() {
        let n: VertexId = serde_json::from_str("42").unwrap();
        let s: VertexId = serde_json::from_str("\"1:marko\"").unwrap();
        assert_eq!(n, VertexId::Number(42));
        assert_eq!(s, VertexId::from("1:marko"));
        assert_eq!(serde_json::to_string(&n).unwrap(), "42");
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"1:marko\"");
    }

    #[test]
    fn vertex_id_display() {
        assert_eq!(VertexId::from(7).to_string(), "7");
        assert_eq!(VertexId::from("abc").to_string(), "abc");
    }

    #[test]
    fn properties_from_map() {
        let map = json!({"name": "marko", "age": 29});
        let props = RawProperties::from_value(&map);
        let parsed = props.parse().unwrap();
        assert_eq!(parsed.get("name"), Some(&json!("marko")));
        assert_eq!(parsed.get("age"), Some(&json!(29)));
    }

    #[test]
    fn empty_properties_serialize_as_object() {
        assert_eq!(RawProperties::from_map(&Map::new()).as_str(), "{}");
        assert_eq!(RawProperties::default().as_str(), "{}");
    }

    #[test]
    fn raw_properties_are_not_validated_until_used() {
        let props = RawProperties::from_raw("{not json");
        assert_eq!(props.as_str(), "{not json");
        assert!(props.as_raw_value().is_err());
        assert!(props.parse().is_err());
    }

    #[test]
    fn raw_edge_accepts_store_aliases() {
        let edge: RawEdge = serde_json::from_value(json!({
            "id": "S1>knows>>S2",
            "label": "knows",
            "outV": 1,
            "outVLabel": "person",
            "inV": 2,
            "inVLabel": "person",
            "properties": {"weight": 0.5}
        }))
        .unwrap();
        assert_eq!(edge.source, VertexId::Number(1));
        assert_eq!(edge.source_label, "person");
        assert_eq!(edge.target, VertexId::Number(2));
        assert_eq!(edge.target_label, "person");
    }

    #[test]
    fn raw_edge_camel_case_fields() {
        let edge: RawEdge = serde_json::from_value(json!({
            "id": "e1",
            "label": "created",
            "source": "a",
            "sourceLabel": "person",
            "target": "b",
            "targetLabel": "software"
        }))
        .unwrap();
        assert_eq!(edge.target_label, "software");
        assert!(edge.properties.is_empty());
    }

    #[test]
    fn vertex_record_from_raw() {
        let raw: RawVertex = serde_json::from_value(json!({
            "id": 1,
            "label": "person",
            "properties": {"name": "marko"}
        }))
        .unwrap();
        let record = VertexRecord::from_raw(raw);
        assert_eq!(record.id, VertexId::Number(1));
        assert_eq!(record.label, "person");
        assert_eq!(record.properties.as_str(), r#"{"name":"marko"}"#);
        assert!(record.edges.is_empty());
    }
}
