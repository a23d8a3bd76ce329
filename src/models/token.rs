//! API token records.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::sql::Thing;
use uuid::Uuid;

use crate::cache::Cacheable;

/// An API token mapping a bearer string to an account.
///
/// Looked up on every authenticated request, so the token string is the
/// cache key of a read-through cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiToken {
    /// Record id assigned by the store
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Thing>,

    /// Opaque token string, used as the cache key
    pub token: String,

    /// Login of the owning account
    pub login: String,

    /// Operator-facing label
    pub label: String,

    /// Timestamp of creation
    pub created_at: DateTime<Utc>,
}

impl ApiToken {
    /// Issues a fresh token for an account
    pub fn issue(login: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: None,
            token: Uuid::new_v4().simple().to_string(),
            login: login.into(),
            label: label.into(),
            created_at: Utc::now(),
        }
    }
}

impl Cacheable for ApiToken {
    fn cache_key(&self) -> String {
        self.token.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_tokens_are_unique() {
        let a = ApiToken::issue("alice", "cli");
        let b = ApiToken::issue("alice", "cli");
        assert_ne!(a.token, b.token);
        assert_eq!(a.cache_key(), a.token);
    }
}
