// Subtype registry: static tables mapping a node subtype tag to its parent
// and to the subtypes expected for its nested fields.
// A registry is immutable once built; share it behind an `Arc`.
use crate::core::error::{Error, ErrorKind};
use std::collections::{BTreeMap, HashMap};

/// Root of every subtype chain. Casting without a hint uses it.
pub const BASE_SUBTYPE: &str = "node";

pub const USER: &str = "user";
pub const MEDIA: &str = "media";
pub const MEDIA_FINALLY: &str = "media_finally";
pub const POST_MEDIA: &str = "post_media";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Subtype {
    tag: String,
    parent: String,
    nested: BTreeMap<String, String>,
}

impl Subtype {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            parent: BASE_SUBTYPE.to_string(),
            nested: BTreeMap::new(),
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.parent = parent.into();
        self
    }

    pub fn nested(mut self, field: impl Into<String>, subtype: impl Into<String>) -> Self {
        self.nested.insert(field.into(), subtype.into());
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn parent(&self) -> &str {
        &self.parent
    }
}

#[derive(Debug, Default)]
pub struct SubtypeRegistryBuilder {
    subtypes: Vec<Subtype>,
}

impl SubtypeRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, subtype: Subtype) -> Self {
        self.subtypes.push(subtype);
        self
    }

    pub fn build(self) -> Result<SubtypeRegistry, Error> {
        let mut subtypes = HashMap::new();
        for subtype in self.subtypes {
            if subtype.tag.is_empty() {
                return Err(Error::new(ErrorKind::InvalidSubtype)
                    .with_message("subtype tag must not be empty"));
            }
            if subtype.tag == BASE_SUBTYPE {
                return Err(Error::new(ErrorKind::InvalidSubtype)
                    .with_message("the base subtype cannot be redefined")
                    .with_subtype(subtype.tag));
            }
            if subtypes.contains_key(&subtype.tag) {
                return Err(Error::new(ErrorKind::InvalidSubtype)
                    .with_message("subtype registered twice")
                    .with_subtype(subtype.tag));
            }
            subtypes.insert(subtype.tag.clone(), subtype);
        }

        let registry = SubtypeRegistry { subtypes };
        for subtype in registry.subtypes.values() {
            registry.check_chain(&subtype.tag)?;
            for target in subtype.nested.values() {
                if !registry.is_known(target) {
                    return Err(Error::new(ErrorKind::InvalidSubtype)
                        .with_message(format!("nested subtype {target} is not registered"))
                        .with_subtype(subtype.tag.clone()));
                }
            }
        }
        Ok(registry)
    }
}

#[derive(Debug)]
pub struct SubtypeRegistry {
    subtypes: HashMap<String, Subtype>,
}

impl SubtypeRegistry {
    pub fn builder() -> SubtypeRegistryBuilder {
        SubtypeRegistryBuilder::new()
    }

    /// The models shipped with the SDK.
    pub fn builtin() -> Self {
        let mut subtypes = HashMap::new();
        for subtype in [
            Subtype::new(USER),
            Subtype::new(MEDIA).nested("finally", MEDIA_FINALLY),
            Subtype::new(MEDIA_FINALLY),
            Subtype::new(POST_MEDIA),
        ] {
            subtypes.insert(subtype.tag.clone(), subtype);
        }
        Self { subtypes }
    }

    pub fn is_known(&self, tag: &str) -> bool {
        tag == BASE_SUBTYPE || self.subtypes.contains_key(tag)
    }

    /// Fails with `InvalidSubtype` unless `tag` descends from the base subtype.
    pub fn validate(&self, tag: &str) -> Result<(), Error> {
        if self.is_known(tag) {
            return Ok(());
        }
        Err(Error::new(ErrorKind::InvalidSubtype)
            .with_message("subtype is not registered as a node subtype")
            .with_subtype(tag))
    }

    /// Subtype expected for `field` on nodes of subtype `tag`, looked up on
    /// the subtype itself and then along its parent chain.
    pub fn nested_subtype(&self, tag: &str, field: &str) -> Option<&str> {
        let mut current = self.subtypes.get(tag);
        while let Some(subtype) = current {
            if let Some(target) = subtype.nested.get(field) {
                return Some(target.as_str());
            }
            current = self.subtypes.get(&subtype.parent);
        }
        None
    }

    pub fn is_descendant(&self, tag: &str, ancestor: &str) -> bool {
        if ancestor == BASE_SUBTYPE {
            return self.is_known(tag);
        }
        let mut current = self.subtypes.get(tag);
        while let Some(subtype) = current {
            if subtype.tag == ancestor {
                return true;
            }
            current = self.subtypes.get(&subtype.parent);
        }
        false
    }

    fn check_chain(&self, tag: &str) -> Result<(), Error> {
        let mut seen = vec![tag];
        let mut current = tag;
        loop {
            let Some(subtype) = self.subtypes.get(current) else {
                return Err(Error::new(ErrorKind::InvalidSubtype)
                    .with_message(format!("parent subtype {current} is not registered"))
                    .with_subtype(tag));
            };
            if subtype.parent == BASE_SUBTYPE {
                return Ok(());
            }
            if seen.contains(&subtype.parent.as_str()) {
                return Err(Error::new(ErrorKind::InvalidSubtype)
                    .with_message("subtype inheritance cycle")
                    .with_subtype(tag));
            }
            current = subtype.parent.as_str();
            seen.push(current);
        }
    }
}

impl Default for SubtypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}
