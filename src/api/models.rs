//! Purpose: Typed views over nodes of the built-in subtypes.
//! Exports: `User`, `Media`, `PostMedia`.
//! Role: Convenience accessors on top of `Node`; no extra state.
//! Invariants: A view can only be made from a node of its subtype (or a descendant).
//! Invariants: Accessors return `None` for missing or differently typed fields.

use crate::core::error::{Error, ErrorKind};
use crate::core::node::{FieldValue, Node};
use crate::core::subtype::{MEDIA, MEDIA_FINALLY, POST_MEDIA, SubtypeRegistry, USER};
use serde_json::Value;

fn expect_subtype(node: &Node, registry: &SubtypeRegistry, tag: &str) -> Result<(), Error> {
    let matches = node
        .subtype()
        .is_some_and(|subtype| registry.is_descendant(subtype, tag));
    if matches {
        return Ok(());
    }
    Err(Error::new(ErrorKind::InvalidSubtype)
        .with_message(format!(
            "expected a {tag} node, got {}",
            node.subtype().unwrap_or("an untyped node")
        ))
        .with_subtype(tag))
}

#[derive(Clone, Debug, PartialEq)]
pub struct User {
    node: Node,
}

impl User {
    pub fn from_node(node: Node, registry: &SubtypeRegistry) -> Result<Self, Error> {
        expect_subtype(&node, registry, USER)?;
        Ok(Self { node })
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn into_node(self) -> Node {
        self.node
    }

    pub fn id(&self) -> Option<String> {
        self.node.id()
    }

    pub fn email(&self) -> Option<&str> {
        self.node.get_str("email")
    }

    pub fn username(&self) -> Option<&str> {
        self.node.get_str("username")
    }

    pub fn display_name(&self) -> Option<&str> {
        self.node.get_str("displayName")
    }

    pub fn first_name(&self) -> Option<&str> {
        self.node.get_node("name")?.get_str("first_name")
    }

    pub fn last_name(&self) -> Option<&str> {
        self.node.get_node("name")?.get_str("last_name")
    }

    pub fn description(&self) -> Option<&str> {
        self.node.get_str("description")
    }

    /// Either a plain country name or a nested node, depending on the fields requested.
    pub fn country(&self) -> Option<&FieldValue> {
        self.node.get("country")
    }

    pub fn link(&self) -> Option<&str> {
        self.node.get_str("link")
    }

    /// The flag arrives either as a JSON boolean or as `0`/`1`.
    pub fn is_verified(&self) -> Option<bool> {
        let value = self.node.get_raw("verified")?;
        value
            .as_bool()
            .or_else(|| value.as_i64().map(|flag| flag != 0))
    }

    pub fn avatar(&self) -> Option<&FieldValue> {
        self.node.get("avatar")
    }

    /// Avatar URL, whether sent as a bare string or as a node with a `url` field.
    pub fn avatar_url(&self) -> Option<&str> {
        match self.avatar()? {
            FieldValue::Node(node) => node.get_str("url"),
            other => other.as_str(),
        }
    }

    pub fn followers_count(&self) -> Option<i64> {
        self.action_count("followers")
    }

    pub fn following_count(&self) -> Option<i64> {
        self.action_count("following")
    }

    pub fn posts_count(&self) -> Option<i64> {
        self.action_count("posts")
    }

    fn action_count(&self, name: &str) -> Option<i64> {
        self.node.get_node("action")?.get_i64(name)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Media {
    node: Node,
}

impl Media {
    pub fn from_node(node: Node, registry: &SubtypeRegistry) -> Result<Self, Error> {
        expect_subtype(&node, registry, MEDIA)?;
        Ok(Self { node })
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn status(&self) -> Option<&Value> {
        self.node.get_raw("status")
    }

    /// The processed rendition, cast as a `media_finally` node.
    pub fn finally(&self) -> Option<&Node> {
        self.node
            .get_node("finally")
            .filter(|node| node.subtype() == Some(MEDIA_FINALLY))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PostMedia {
    node: Node,
}

impl PostMedia {
    pub fn from_node(node: Node, registry: &SubtypeRegistry) -> Result<Self, Error> {
        expect_subtype(&node, registry, POST_MEDIA)?;
        Ok(Self { node })
    }

    pub fn node(&self) -> &Node {
        &self.node
    }

    pub fn image(&self) -> Option<&FieldValue> {
        self.node.get("image")
    }
}
