// Edges: ordered node collections with the paging metadata the server sent.
// An edge remembers the request that produced it so pages can be followed.
use crate::core::error::{Error, ErrorKind};
use crate::core::node::Node;
use crate::core::request::Request;
use crate::core::url::graph_endpoint;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PageDirection {
    Next,
    Previous,
}

impl PageDirection {
    /// Key under `paging` holding the page URL.
    pub fn url_key(self) -> &'static str {
        match self {
            PageDirection::Next => "next",
            PageDirection::Previous => "previous",
        }
    }

    /// Key under `paging.cursors` holding the cursor.
    pub fn cursor_key(self) -> &'static str {
        match self {
            PageDirection::Next => "after",
            PageDirection::Previous => "before",
        }
    }
}

impl FromStr for PageDirection {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "next" | "after" => Ok(PageDirection::Next),
            "previous" | "before" => Ok(PageDirection::Previous),
            other => Err(Error::new(ErrorKind::Usage)
                .with_message(format!("unknown page direction: {other}"))
                .with_hint("Use next or previous.")),
        }
    }
}

impl fmt::Display for PageDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url_key())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Edge {
    items: Vec<Node>,
    metadata: Map<String, Value>,
    source_request: Option<Arc<Request>>,
    parent_edge_path: Option<String>,
    element_subtype: Option<String>,
}

impl Edge {
    pub(crate) fn new(
        items: Vec<Node>,
        metadata: Map<String, Value>,
        source_request: Option<Arc<Request>>,
        parent_edge_path: Option<String>,
        element_subtype: Option<String>,
    ) -> Self {
        Self {
            items,
            metadata,
            source_request,
            parent_edge_path,
            element_subtype,
        }
    }

    pub fn items(&self) -> &[Node] {
        &self.items
    }

    pub fn into_items(self) -> Vec<Node> {
        self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Node> {
        self.items.get(index)
    }

    /// Wrapper fields that came alongside `data` (`paging`, `summary`, ...).
    pub fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    pub fn source_request(&self) -> Option<&Request> {
        self.source_request.as_deref()
    }

    /// `/{parent_id}/{field}` for edges nested under a node with an id.
    pub fn parent_edge_path(&self) -> Option<&str> {
        self.parent_edge_path.as_deref()
    }

    pub fn element_subtype(&self) -> Option<&str> {
        self.element_subtype.as_deref()
    }

    pub fn cursor(&self, direction: PageDirection) -> Option<&str> {
        self.metadata
            .get("paging")?
            .get("cursors")?
            .get(direction.cursor_key())?
            .as_str()
    }

    pub fn next_cursor(&self) -> Option<&str> {
        self.cursor(PageDirection::Next)
    }

    pub fn previous_cursor(&self) -> Option<&str> {
        self.cursor(PageDirection::Previous)
    }

    /// Origin-relative endpoint of the page in `direction`, with the host
    /// and API version prefix removed.
    pub fn pagination_url(&self, direction: PageDirection) -> Result<Option<String>, Error> {
        let source = self.paginating_request()?;
        let Some(page_url) = self
            .metadata
            .get("paging")
            .and_then(|paging| paging.get(direction.url_key()))
            .and_then(Value::as_str)
            .filter(|url| !url.is_empty())
        else {
            return Ok(None);
        };
        Ok(Some(graph_endpoint(page_url, source.api_version())))
    }

    /// Request for the page in `direction`; only the endpoint differs from
    /// the request that produced this edge.
    pub fn pagination_request(&self, direction: PageDirection) -> Result<Option<Request>, Error> {
        let Some(endpoint) = self.pagination_url(direction)? else {
            return Ok(None);
        };
        let source = self.paginating_request()?;
        let request = source.with_endpoint(&endpoint)?;
        tracing::debug!(%direction, endpoint = %request.endpoint(), "derived page request");
        Ok(Some(request))
    }

    pub fn next_page_request(&self) -> Result<Option<Request>, Error> {
        self.pagination_request(PageDirection::Next)
    }

    pub fn previous_page_request(&self) -> Result<Option<Request>, Error> {
        self.pagination_request(PageDirection::Previous)
    }

    pub fn total_count(&self) -> Option<i64> {
        let count = self.metadata.get("summary")?.get("total_count")?;
        count
            .as_i64()
            .or_else(|| count.as_str().and_then(|text| text.trim().parse().ok()))
    }

    /// Applies `transform` to every item. Metadata, source request and
    /// order carry over unchanged.
    pub fn map<F>(&self, mut transform: F) -> Edge
    where
        F: FnMut(&Node, usize) -> Node,
    {
        let items = self
            .items
            .iter()
            .enumerate()
            .map(|(index, node)| transform(node, index))
            .collect();
        Edge {
            items,
            metadata: self.metadata.clone(),
            source_request: self.source_request.clone(),
            parent_edge_path: self.parent_edge_path.clone(),
            element_subtype: self.element_subtype.clone(),
        }
    }

    /// Renders the edge in its wire shape: `{"data": [...], ...metadata}`.
    pub fn to_json(&self) -> Value {
        let mut map = Map::new();
        map.insert(
            "data".to_string(),
            Value::Array(self.items.iter().map(Node::to_json).collect()),
        );
        for (key, value) in &self.metadata {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }

    fn paginating_request(&self) -> Result<&Request, Error> {
        let Some(source) = self.source_request.as_deref() else {
            return Err(Error::new(ErrorKind::InvalidOperation)
                .with_message("edge has no source request to paginate from")
                .with_hint("Cast the response with a request attached."));
        };
        source.validate_read_only()?;
        Ok(source)
    }
}

impl<'a> IntoIterator for &'a Edge {
    type Item = &'a Node;
    type IntoIter = std::slice::Iter<'a, Node>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
