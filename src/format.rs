use crate::models::{EdgeRecord, VertexId, VertexRecord};
use serde::Serialize;
use serde_json::value::RawValue;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to encode vertex: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("properties of {kind} {id} are not valid JSON")]
    InvalidProperties { kind: &'static str, id: String },

    #[error("{0}")]
    Custom(String),
}

/// Turns one fully populated vertex into the bytes of a single output record.
///
/// The returned bytes must not contain the record terminator; the writer adds it.
pub trait Formatter: Send + Sync {
    fn format(&self, vertex: &VertexRecord) -> Result<Vec<u8>, FormatError>;

    fn name(&self) -> &str {
        "custom"
    }
}

impl<F> Formatter for F
where
    F: Fn(&VertexRecord) -> Result<Vec<u8>, FormatError> + Send + Sync,
{
    fn format(&self, vertex: &VertexRecord) -> Result<Vec<u8>, FormatError> {
        self(vertex)
    }
}

/// Writes each vertex as one compact JSON document. Property blobs are embedded
/// verbatim, so the source encoding survives byte for byte.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormatter;

#[derive(Serialize)]
struct JsonVertex<'a> {
    id: &'a VertexId,
    label: &'a str,
    properties: &'a RawValue,
    edges: Vec<JsonEdge<'a>>,
}

#[derive(Serialize)]
struct JsonEdge<'a> {
    id: &'a str,
    label: &'a str,
    source: &'a VertexId,
    target: &'a VertexId,
    properties: &'a RawValue,
}

impl<'a> JsonEdge<'a> {
    fn from_record(edge: &'a EdgeRecord) -> Result<Self, FormatError> {
        let properties = edge
            .properties
            .as_raw_value()
            .map_err(|_| FormatError::InvalidProperties {
                kind: "edge",
                id: edge.id.clone(),
            })?;
        Ok(Self {
            id: &edge.id,
            label: &edge.label,
            source: &edge.source,
            target: &edge.target,
            properties,
        })
    }
}

impl Formatter for JsonFormatter {
    fn format(&self, vertex: &VertexRecord) -> Result<Vec<u8>, FormatError> {
        let properties = vertex
            .properties
            .as_raw_value()
            .map_err(|_| FormatError::InvalidProperties {
                kind: "vertex",
                id: vertex.id.to_string(),
            })?;
        let edges = vertex
            .edges
            .iter()
            .map(|edge| JsonEdge::from_record(edge))
            .collect::<Result<Vec<_>, _>>()?;

        let doc = JsonVertex {
            id: &vertex.id,
            label: &vertex.label,
            properties,
            edges,
        };
        Ok(serde_json::to_vec(&doc)?)
    }

    fn name(&self) -> &str {
        "json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RawProperties;
    use serde_json::{json, Value};
    use std::sync::Arc;

    fn person(id: i64, properties: &str) -> VertexRecord {
        VertexRecord::new(
            VertexId::Number(id),
            "person",
            RawProperties::from_raw(properties),
        )
    }

    fn knows(id: &str, source: i64, target: i64, properties: &str) -> Arc<EdgeRecord> {
        Arc::new(EdgeRecord {
            id: id.to_string(),
            label: "knows".to_string(),
            source: VertexId::Number(source),
            target: VertexId::Number(target),
            properties: RawProperties::from_raw(properties),
        })
    }

    #[test]
    fn json_round_trip_recovers_structure() {
        let mut vertex = person(1, r#"{"name":"marko"}"#);
        vertex.add_edge(knows("e1", 1, 2, r#"{"weight":0.5}"#));
        vertex.add_edge(knows("e2", 3, 1, "{}"));

        let bytes = JsonFormatter.format(&vertex).unwrap();
        let doc: Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(doc["id"], json!(1));
        assert_eq!(doc["label"], json!("person"));
        assert_eq!(doc["properties"]["name"], json!("marko"));

        let edges = doc["edges"].as_array().unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[0]["id"], json!("e1"));
        assert_eq!(edges[0]["label"], json!("knows"));
        assert_eq!(edges[0]["source"], json!(1));
        assert_eq!(edges[0]["target"], json!(2));
        assert_eq!(edges[0]["properties"]["weight"], json!(0.5));
        assert_eq!(edges[1]["source"], json!(3));
    }

    #[test]
    fn properties_are_embedded_verbatim() {
        // Key order and spacing differ from what serde_json would produce.
        let raw = r#"{"z": 1, "a":  "x"}"#;
        let mut vertex = person(7, raw);
        vertex.add_edge(knows("e1", 7, 8, r#"{"since" : 2010}"#));

        let bytes = JsonFormatter.format(&vertex).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.contains(r#""properties":{"z": 1, "a":  "x"}"#));
        assert!(text.contains(r#""properties":{"since" : 2010}"#));
    }

    #[test]
    fn structural_json_is_compact() {
        let vertex = person(1, "{\n  \"multi\": \"line\"\n}");
        let bytes = JsonFormatter.format(&vertex).unwrap();
        // The raw blob keeps its own newlines; only the structural JSON is compact.
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with(r#"{"id":1,"label":"person","properties":"#));
        assert!(text.ends_with(r#","edges":[]}"#));
    }

    #[test]
    fn string_ids_are_quoted() {
        let vertex = VertexRecord::new(
            VertexId::from("1:marko"),
            "person",
            RawProperties::default(),
        );
        let bytes = JsonFormatter.format(&vertex).unwrap();
        let doc: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(doc["id"], json!("1:marko"));
    }

    #[test]
    fn invalid_vertex_properties_fail() {
        let vertex = person(3, "{broken");
        let err = JsonFormatter.format(&vertex).unwrap_err();
        assert!(matches!(
            err,
            FormatError::InvalidProperties { kind: "vertex", .. }
        ));
        assert_eq!(err.to_string(), "properties of vertex 3 are not valid JSON");
    }

    #[test]
    fn invalid_edge_properties_fail() {
        let mut vertex = person(1, "{}");
        vertex.add_edge(knows("bad", 1, 2, ""));
        let err = JsonFormatter.format(&vertex).unwrap_err();
        assert!(matches!(err, FormatError::InvalidProperties { kind: "edge", .. }));
    }

    #[test]
    fn closures_are_formatters() {
        let formatter = |v: &VertexRecord| -> Result<Vec<u8>, FormatError> {
            Ok(format!("{}:{}", v.label, v.id).into_bytes())
        };
        let bytes = formatter.format(&person(5, "{}")).unwrap();
        assert_eq!(bytes, b"person:5");
        assert_eq!(Formatter::name(&formatter), "custom");
        assert_eq!(JsonFormatter.name(), "json");
    }
}
