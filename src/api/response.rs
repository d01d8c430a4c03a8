//! Purpose: Wrap one raw HTTP response and expose decoding, errors, and casting.
//! Exports: `RawResponse`, `Response`.
//! Role: Boundary between transports and the graph casting core.
//! Invariants: The body is decoded once at construction and never changes.
//! Invariants: Error payloads are classified eagerly but only raised by `into_result`.
//! Invariants: Casting entry points never mutate the envelope.

use super::models::{Media, PostMedia, User};
use crate::core::cast::{GraphCaster, is_edge_shaped};
use crate::core::classify::{ApiError, classify};
use crate::core::edge::Edge;
use crate::core::error::{Error, ErrorKind};
use crate::core::node::{FieldValue, Node};
use crate::core::request::Request;
use crate::core::subtype::{MEDIA, POST_MEDIA, SubtypeRegistry, USER};
use crate::json::parse::decode_body;
use serde_json::Value;
use std::sync::Arc;

pub const ETAG_HEADER: &str = "ETag";
pub const API_VERSION_HEADER: &str = "Steein-API-Version";

/// Status line, headers, and body exactly as a transport received them.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RawResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

#[derive(Clone, Debug)]
pub struct Response {
    request: Option<Arc<Request>>,
    raw: RawResponse,
    decoded: Value,
    api_error: Option<ApiError>,
    registry: Arc<SubtypeRegistry>,
}

impl Response {
    pub fn new(
        request: Option<Arc<Request>>,
        raw: RawResponse,
        registry: Arc<SubtypeRegistry>,
    ) -> Self {
        let decoded = decode_body(&raw.body);
        let api_error = decoded
            .get("error")
            .is_some()
            .then(|| classify(&decoded, Some(raw.status), &raw.body));
        Self {
            request,
            raw,
            decoded,
            api_error,
            registry,
        }
    }

    pub fn request(&self) -> Option<&Request> {
        self.request.as_deref()
    }

    pub fn status(&self) -> u16 {
        self.raw.status
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.raw.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.raw
            .headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn etag(&self) -> Option<&str> {
        self.header(ETAG_HEADER)
    }

    pub fn api_version(&self) -> Option<&str> {
        self.header(API_VERSION_HEADER)
    }

    pub fn body(&self) -> &str {
        &self.raw.body
    }

    pub fn decoded(&self) -> &Value {
        &self.decoded
    }

    pub fn is_error(&self) -> bool {
        self.api_error.is_some()
    }

    pub fn api_error(&self) -> Option<&ApiError> {
        self.api_error.as_ref()
    }

    pub fn into_result(self) -> Result<Self, Error> {
        let Some(api_error) = self.api_error.clone() else {
            return Ok(self);
        };
        let err = Error::api(api_error);
        Err(match &self.request {
            Some(request) => err.with_endpoint(request.endpoint().to_string()),
            None => err,
        })
    }

    pub fn caster(&self) -> GraphCaster {
        let caster = GraphCaster::new(self.registry.clone());
        match &self.request {
            Some(request) => caster.with_request(request.clone()),
            None => caster,
        }
    }

    /// Casts the decoded body to whatever shape it has.
    pub fn graph_object(&self, subtype: Option<&str>) -> Result<FieldValue, Error> {
        self.caster().cast(&self.decoded, subtype)
    }

    pub fn graph_node(&self, subtype: Option<&str>) -> Result<Node, Error> {
        if is_edge_shaped(&self.decoded) {
            return Err(self.malformed("response is a list of nodes, not a single node")
                .with_hint("Use graph_edge for list responses."));
        }
        self.graph_object(subtype)?
            .into_node()
            .ok_or_else(|| self.malformed("response body is not a node"))
    }

    pub fn graph_edge(&self, subtype: Option<&str>) -> Result<Edge, Error> {
        if !is_edge_shaped(&self.decoded) {
            return Err(self.malformed("response is not a list of nodes")
                .with_hint("Use graph_node for single-object responses."));
        }
        self.graph_object(subtype)?
            .into_edge()
            .ok_or_else(|| self.malformed("response body is not an edge"))
    }

    pub fn user(&self) -> Result<User, Error> {
        User::from_node(self.graph_node(Some(USER))?, &self.registry)
    }

    pub fn media(&self) -> Result<Media, Error> {
        Media::from_node(self.graph_node(Some(MEDIA))?, &self.registry)
    }

    pub fn post_media(&self) -> Result<PostMedia, Error> {
        PostMedia::from_node(self.graph_node(Some(POST_MEDIA))?, &self.registry)
    }

    fn malformed(&self, message: &str) -> Error {
        let err = Error::new(ErrorKind::Malformed).with_message(message);
        match &self.request {
            Some(request) => err.with_endpoint(request.endpoint().to_string()),
            None => err,
        }
    }
}
