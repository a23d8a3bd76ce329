//! Protocol metadata records.

#![allow(dead_code)]

use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;

use crate::cache::Cacheable;

/// Metadata for a supported device protocol.
///
/// Low write rate, correctness-sensitive, read on every capture request:
/// cached read-through-invalidate. Payload decoding itself lives outside
/// this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Protocol {
    /// Record id assigned by the store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,

    /// Protocol name, used as the cache key
    pub name: String,

    /// Free-text description
    pub description: String,

    /// Whether the protocol is accepted at the capture front door
    pub active: bool,
}

impl Protocol {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
            active: true,
        }
    }
}

impl Cacheable for Protocol {
    fn cache_key(&self) -> String {
        self.name.clone()
    }
}
