//! Account records.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;

use crate::cache::Cacheable;

/// A platform account.
///
/// The login is the natural key; the backing store owns the authoritative
/// record, caches hold working copies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Record id assigned by the store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,

    /// Unique login, used as the cache key
    pub login: String,

    /// Contact email
    pub email: String,

    /// Display name
    pub display_name: String,

    /// Preferred language (ISO 639-1)
    pub language: String,

    /// Whether the account is enabled
    pub active: bool,

    /// Timestamp of creation
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(login: impl Into<String>, email: impl Into<String>) -> Self {
        let login = login.into();
        Self {
            id: None,
            display_name: login.clone(),
            login,
            email: email.into(),
            language: "en".to_string(),
            active: true,
            created_at: Utc::now(),
        }
    }

    /// Sets the display name
    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = name.into();
        self
    }

    /// Sets the preferred language
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

impl Cacheable for User {
    fn cache_key(&self) -> String {
        self.login.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_user_defaults() {
        let user = User::new("alice", "alice@example.org");
        assert_eq!(user.login, "alice");
        assert_eq!(user.display_name, "alice");
        assert_eq!(user.language, "en");
        assert!(user.active);
        assert!(user.id.is_none());
    }

    #[test]
    fn test_cache_key_is_login() {
        let user = User::new("bob", "bob@example.org").with_language("fr");
        assert_eq!(user.cache_key(), "bob");
        assert_eq!(user.language, "fr");
    }
}
