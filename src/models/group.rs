//! Group records and the back-link graph they form.

#![allow(dead_code)]

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;

use crate::cache::Cacheable;
use crate::models::User;

/// Reserved prefix for virtual (per-user) group ids.
///
/// The short-id alphabet contains no underscore, so a persisted short id can
/// never collide with this namespace.
pub const VIRTUAL_PREFIX: &str = "user_";

/// A device group.
///
/// Groups form a hierarchy through `referring_groups`: each group records the
/// short ids of every group that transitively references it (its ancestors),
/// a denormalized reverse-edge index over the hierarchy graph. The short id
/// is the natural key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    /// Record id assigned by the store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,

    /// Globally unique short random alphanumeric id
    pub short_id: String,

    /// Human-readable name
    pub name: String,

    /// Free-text description
    pub description: String,

    /// Preferred language (ISO 639-1)
    pub language: String,

    /// Whether the group is enabled
    pub active: bool,

    /// Virtual groups are synthesized per user and never persisted
    #[serde(rename = "virtual")]
    pub is_virtual: bool,

    /// Timestamp of creation
    pub created_at: DateTime<Utc>,

    /// Login of the creating account
    pub created_by: String,

    /// Free-form attributes
    pub attributes: HashMap<String, String>,

    /// Short ids of every group that transitively references this one
    pub referring_groups: Vec<String>,
}

impl Group {
    pub fn new(short_id: impl Into<String>, name: impl Into<String>, created_by: impl Into<String>) -> Self {
        Self {
            id: None,
            short_id: short_id.into(),
            name: name.into(),
            description: String::new(),
            language: "en".to_string(),
            active: true,
            is_virtual: false,
            created_at: Utc::now(),
            created_by: created_by.into(),
            attributes: HashMap::new(),
            referring_groups: Vec::new(),
        }
    }

    /// Sets the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Records the groups this one belongs to (its transitive referrers)
    pub fn with_referring_groups(mut self, referrers: Vec<String>) -> Self {
        self.referring_groups = referrers;
        self
    }

    /// Whether an id addresses a virtual per-user group
    pub fn is_virtual_id(id: &str) -> bool {
        id.starts_with(VIRTUAL_PREFIX)
    }

    /// Login encoded in a virtual group id, if any
    pub fn virtual_login(id: &str) -> Option<&str> {
        id.strip_prefix(VIRTUAL_PREFIX)
    }

    /// Synthesizes the virtual group for a user's personal scope.
    ///
    /// Virtual groups are derived on demand: never persisted, never cached,
    /// empty referring set so cascades skip them by construction.
    pub fn virtual_for(user: &User) -> Self {
        Self {
            id: None,
            short_id: format!("{}{}", VIRTUAL_PREFIX, user.login),
            name: format!("Personal scope of {}", user.display_name),
            description: String::new(),
            language: user.language.clone(),
            active: user.active,
            is_virtual: true,
            created_at: user.created_at,
            created_by: user.login.clone(),
            attributes: HashMap::new(),
            referring_groups: Vec::new(),
        }
    }
}

impl Cacheable for Group {
    fn cache_key(&self) -> String {
        self.short_id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_id_detection() {
        assert!(Group::is_virtual_id("user_42"));
        assert!(!Group::is_virtual_id("a7Bc9"));
        assert_eq!(Group::virtual_login("user_alice"), Some("alice"));
        assert_eq!(Group::virtual_login("a7Bc9"), None);
    }

    #[test]
    fn test_virtual_for_user() {
        let user = User::new("alice", "alice@example.org").with_language("de");
        let group = Group::virtual_for(&user);

        assert_eq!(group.short_id, "user_alice");
        assert!(group.is_virtual);
        assert_eq!(group.language, "de");
        assert_eq!(group.created_at, user.created_at);
        assert!(group.referring_groups.is_empty());
        assert!(group.id.is_none());
    }

    #[test]
    fn test_referring_groups_builder() {
        let group = Group::new("c3Dx1", "floor-3", "alice")
            .with_referring_groups(vec!["a7Bc9".to_string(), "r00tZ".to_string()]);

        assert_eq!(group.referring_groups.len(), 2);
        assert_eq!(group.cache_key(), "c3Dx1");
    }
}
