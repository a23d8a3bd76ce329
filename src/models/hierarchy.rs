//! Materialized, depth-bounded view of a group hierarchy.

#![allow(dead_code)]

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::cache::Cacheable;
use crate::models::Group;

/// Errors raised while materializing a hierarchy view.
#[derive(Error, Debug)]
pub enum HierarchyError {
    /// The query result did not contain the requested head row. A hierarchy
    /// without its head is unusable and is surfaced as not-found.
    #[error("hierarchy for '{head}' is missing its head row")]
    MissingHead { head: String },
}

/// A head group plus its reachable descendants, indexed by short id.
///
/// Built from one flat query result (head row plus every row whose
/// `referring_groups` contains the head's short id) and rebuildable at any
/// time from the store. Reads vastly outnumber structural changes, so the
/// view is itself a cacheable value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupHierarchy {
    /// Short id of the head group
    pub head: String,

    /// Head and descendants, keyed by short id
    pub groups: HashMap<String, Group>,

    /// Depth bound the view was built with
    pub max_depth: usize,
}

impl GroupHierarchy {
    /// Materializes a hierarchy from a flat query result.
    ///
    /// The row whose short id equals `head_short_id` becomes the head; its
    /// absence is a hard error. Every remaining row must be reachable from
    /// the head within `max_depth` levels following `referring_groups`
    /// back-links; rows that are not are dropped with a warning rather than
    /// failing the whole fetch. Traversal keeps a visited set, so cyclic
    /// back-link data terminates instead of looping.
    pub fn build(
        head_short_id: &str,
        rows: Vec<Group>,
        max_depth: usize,
    ) -> Result<Self, HierarchyError> {
        let mut pending: HashMap<String, Group> = rows
            .into_iter()
            .map(|g| (g.short_id.clone(), g))
            .collect();

        let head = pending
            .remove(head_short_id)
            .ok_or_else(|| HierarchyError::MissingHead {
                head: head_short_id.to_string(),
            })?;

        let mut groups = HashMap::with_capacity(pending.len() + 1);
        groups.insert(head.short_id.clone(), head);

        // Breadth-first from the head: level k+1 holds the rows whose
        // referring set names any short id already admitted at level <= k.
        let mut frontier = vec![head_short_id.to_string()];
        let mut depth = 0;
        while !frontier.is_empty() && depth < max_depth {
            let mut next = Vec::new();
            let reachable: Vec<String> = pending
                .iter()
                .filter(|(_, row)| {
                    row.referring_groups
                        .iter()
                        .any(|r| frontier.contains(r) || groups.contains_key(r))
                })
                .map(|(short_id, _)| short_id.clone())
                .collect();

            for short_id in reachable {
                if let Some(row) = pending.remove(&short_id) {
                    next.push(row.short_id.clone());
                    groups.insert(row.short_id.clone(), row);
                }
            }

            frontier = next;
            depth += 1;
        }

        for (short_id, _) in pending {
            warn!(
                "dropping group '{}' from hierarchy '{}': not reachable within depth {}",
                short_id, head_short_id, max_depth
            );
        }

        Ok(Self {
            head: head_short_id.to_string(),
            groups,
            max_depth,
        })
    }

    /// A view containing just one group, used for virtual groups which have
    /// no descendants.
    pub fn single(group: Group, max_depth: usize) -> Self {
        let head = group.short_id.clone();
        let mut groups = HashMap::with_capacity(1);
        groups.insert(head.clone(), group);
        Self {
            head,
            groups,
            max_depth,
        }
    }

    /// The head group
    pub fn head_group(&self) -> &Group {
        // build() guarantees the head is present
        &self.groups[&self.head]
    }

    /// Looks up a member by short id
    pub fn get(&self, short_id: &str) -> Option<&Group> {
        self.groups.get(short_id)
    }

    /// Whether a short id belongs to this hierarchy
    pub fn contains(&self, short_id: &str) -> bool {
        self.groups.contains_key(short_id)
    }

    /// Number of groups in the view, head included
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Short ids of all members, head included
    pub fn short_ids(&self) -> Vec<String> {
        self.groups.keys().cloned().collect()
    }
}

impl Cacheable for GroupHierarchy {
    fn cache_key(&self) -> String {
        self.head.clone()
    }
}
