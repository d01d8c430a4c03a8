// Typed graph nodes: ordered field maps built from decoded JSON objects.
// Nodes are immutable once built; equality is structural.
use crate::core::edge::Edge;
use crate::core::scalar::Timestamp;
use serde_json::{Map, Value};

#[derive(Clone, Debug, PartialEq)]
pub enum FieldValue {
    Raw(Value),
    Timestamp(Timestamp),
    Node(Node),
    Edge(Edge),
}

impl FieldValue {
    pub fn as_raw(&self) -> Option<&Value> {
        match self {
            FieldValue::Raw(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            FieldValue::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_edge(&self) -> Option<&Edge> {
        match self {
            FieldValue::Edge(edge) => Some(edge),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<&Timestamp> {
        match self {
            FieldValue::Timestamp(timestamp) => Some(timestamp),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_raw().and_then(Value::as_str)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_raw().and_then(Value::as_i64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_raw().and_then(Value::as_bool)
    }

    pub fn into_node(self) -> Option<Node> {
        match self {
            FieldValue::Node(node) => Some(node),
            _ => None,
        }
    }

    pub fn into_edge(self) -> Option<Edge> {
        match self {
            FieldValue::Edge(edge) => Some(edge),
            _ => None,
        }
    }

    /// Renders the value back to plain JSON, timestamps as ISO-8601 strings.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Raw(value) => value.clone(),
            FieldValue::Timestamp(timestamp) => Value::String(timestamp.to_iso8601()),
            FieldValue::Node(node) => node.to_json(),
            FieldValue::Edge(edge) => edge.to_json(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Node {
    subtype: Option<String>,
    fields: Vec<(String, FieldValue)>,
}

impl Node {
    pub(crate) fn new(subtype: Option<String>, fields: Vec<(String, FieldValue)>) -> Self {
        Self { subtype, fields }
    }

    pub fn subtype(&self) -> Option<&str> {
        self.subtype.as_deref()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(key, _)| key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn get_raw(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(FieldValue::as_raw)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(FieldValue::as_i64)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(FieldValue::as_bool)
    }

    pub fn get_node(&self, name: &str) -> Option<&Node> {
        self.get(name).and_then(FieldValue::as_node)
    }

    pub fn get_edge(&self, name: &str) -> Option<&Edge> {
        self.get(name).and_then(FieldValue::as_edge)
    }

    pub fn get_timestamp(&self, name: &str) -> Option<&Timestamp> {
        self.get(name).and_then(FieldValue::as_timestamp)
    }

    /// The `id` field as text; numeric ids are rendered in decimal.
    pub fn id(&self) -> Option<String> {
        self.get_raw("id").and_then(id_text)
    }

    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        for (key, value) in &self.fields {
            map.insert(key.clone(), value.to_json());
        }
        Value::Object(map)
    }
}

pub(crate) fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
