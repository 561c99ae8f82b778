//! HAL resource envelope.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

/// One navigational link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HalLink {
    pub href: String,
}

/// A HAL document: the embedded payload, navigational links and an `_extra`
/// bag for auxiliary data such as a fact's signature base.
#[derive(Debug, Clone, Serialize)]
pub struct Hal<T: Serialize> {
    #[serde(rename = "_embedded")]
    embedded: T,
    #[serde(rename = "_links", skip_serializing_if = "BTreeMap::is_empty")]
    links: BTreeMap<String, HalLink>,
    #[serde(rename = "_extra", skip_serializing_if = "Map::is_empty")]
    extra: Map<String, Value>,
}

impl<T: Serialize> Hal<T> {
    pub fn new(embedded: T) -> Self {
        Hal {
            embedded,
            links: BTreeMap::new(),
            extra: Map::new(),
        }
    }

    pub fn with_self_link(self, href: impl Into<String>) -> Self {
        self.with_link("self", href)
    }

    pub fn with_link(mut self, rel: &str, href: impl Into<String>) -> Self {
        self.links.insert(rel.to_string(), HalLink { href: href.into() });
        self
    }

    pub fn with_extra(mut self, key: &str, value: Value) -> Self {
        self.extra.insert(key.to_string(), value);
        self
    }
}
