// Graph casting: decides whether decoded JSON is a node, an edge or a plain
// value, and recurses into nested objects.
// Casting is pure; the same input and registry always give equal trees.
use crate::core::edge::Edge;
use crate::core::error::{Error, ErrorKind};
use crate::core::node::{FieldValue, Node, id_text};
use crate::core::request::Request;
use crate::core::scalar::cast_scalar;
use crate::core::subtype::{BASE_SUBTYPE, SubtypeRegistry};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, trace};

/// True for JSON arrays and for objects that are empty or keyed exactly
/// `"0".."n-1"` in order.
pub fn is_list_like(value: &Value) -> bool {
    match value {
        Value::Array(_) => true,
        Value::Object(map) => map
            .keys()
            .enumerate()
            .all(|(index, key)| *key == index.to_string()),
        _ => false,
    }
}

/// True when `value` is a mapping whose `data` member would become an edge.
pub fn is_edge_shaped(value: &Value) -> bool {
    value
        .as_object()
        .and_then(|map| map.get("data"))
        .is_some_and(|data| !data.is_null() && is_list_like(data))
}

#[derive(Clone, Debug)]
pub struct GraphCaster {
    registry: Arc<SubtypeRegistry>,
    request: Option<Arc<Request>>,
}

impl GraphCaster {
    pub fn new(registry: Arc<SubtypeRegistry>) -> Self {
        Self {
            registry,
            request: None,
        }
    }

    /// Edges produced by this caster remember `request` for pagination.
    pub fn with_request(mut self, request: Arc<Request>) -> Self {
        self.request = Some(request);
        self
    }

    pub fn registry(&self) -> &SubtypeRegistry {
        &self.registry
    }

    pub fn request(&self) -> Option<&Request> {
        self.request.as_deref()
    }

    pub fn cast(&self, raw: &Value, subtype: Option<&str>) -> Result<FieldValue, Error> {
        self.cast_value(raw, subtype, None, None)
    }

    pub fn cast_value(
        &self,
        raw: &Value,
        subtype: Option<&str>,
        field_name: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<FieldValue, Error> {
        let subtype = self.checked_subtype(subtype)?;

        let Value::Object(map) = raw else {
            if let Value::Array(items) = raw {
                trace!(len = items.len(), "casting sequence as index-keyed node");
                return self.build_indexed(items, subtype).map(FieldValue::Node);
            }
            return Ok(match field_name {
                Some(name) => cast_scalar(name, raw),
                None => FieldValue::Raw(raw.clone()),
            });
        };

        match map.get("data") {
            Some(data) if !data.is_null() && is_list_like(data) => {
                let edge = self.build_edge(map, data, subtype, field_name, parent_id)?;
                Ok(FieldValue::Edge(edge))
            }
            Some(Value::Object(inner)) => {
                debug!(subtype = subtype.unwrap_or(BASE_SUBTYPE), "unwrapping data object");
                self.build_node(inner, subtype).map(FieldValue::Node)
            }
            _ => self.build_node(map, subtype).map(FieldValue::Node),
        }
    }

    /// Casts every field of `fields` into a node of `subtype`.
    pub fn build_node(&self, fields: &Map<String, Value>, subtype: Option<&str>) -> Result<Node, Error> {
        let subtype = self.checked_subtype(subtype)?;
        let id = fields.get("id").and_then(id_text);
        let mut cast = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            let field = match value {
                Value::Object(_) => {
                    let nested = subtype.and_then(|tag| self.registry.nested_subtype(tag, name));
                    self.cast_value(value, nested, Some(name), id.as_deref())?
                }
                Value::Array(_) => FieldValue::Raw(value.clone()),
                _ => cast_scalar(name, value),
            };
            cast.push((name.clone(), field));
        }
        Ok(Node::new(subtype.map(str::to_string), cast))
    }

    fn build_edge(
        &self,
        wrapper: &Map<String, Value>,
        data: &Value,
        subtype: Option<&str>,
        field_name: Option<&str>,
        parent_id: Option<&str>,
    ) -> Result<Edge, Error> {
        let elements: Vec<&Value> = match data {
            Value::Array(items) => items.iter().collect(),
            Value::Object(map) => map.values().collect(),
            _ => Vec::new(),
        };
        debug!(
            len = elements.len(),
            subtype = subtype.unwrap_or(BASE_SUBTYPE),
            field = field_name.unwrap_or(""),
            "casting edge"
        );

        let mut items = Vec::with_capacity(elements.len());
        for (index, element) in elements.into_iter().enumerate() {
            let node = match element {
                Value::Object(fields) => self.build_node(fields, subtype)?,
                Value::Array(values) => self.build_indexed(values, subtype)?,
                other => {
                    return Err(Error::new(ErrorKind::Malformed)
                        .with_message(format!(
                            "edge element {index} is a {} instead of an object",
                            json_kind(other)
                        ))
                        .with_hint("Edge data must be a list of objects."));
                }
            };
            items.push(node);
        }

        let mut metadata = wrapper.clone();
        metadata.remove("data");
        let parent_edge_path = match (parent_id, field_name) {
            (Some(id), Some(field)) => Some(format!("/{id}/{field}")),
            _ => None,
        };
        Ok(Edge::new(
            items,
            metadata,
            self.request.clone(),
            parent_edge_path,
            subtype.map(str::to_string),
        ))
    }

    fn build_indexed(&self, values: &[Value], subtype: Option<&str>) -> Result<Node, Error> {
        let fields: Map<String, Value> = values
            .iter()
            .enumerate()
            .map(|(index, value)| (index.to_string(), value.clone()))
            .collect();
        self.build_node(&fields, subtype)
    }

    fn checked_subtype<'a>(&self, subtype: Option<&'a str>) -> Result<Option<&'a str>, Error> {
        if let Some(tag) = subtype {
            self.registry.validate(tag)?;
        }
        Ok(subtype)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
