//! Cross-instance invalidation bus.
//!
//! Sibling cluster nodes run the same caches; a write on one node broadcasts
//! a flush message so the others drop their stale local copies. Delivery is
//! fire-and-forget: no acknowledgment, no retry, a lost message is bounded
//! by the per-entry TTL.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

/// Fire-and-forget broadcast to sibling cluster instances.
///
/// One implementation is injected at startup based on configuration; the
/// base edition ships a no-op.
pub trait InvalidationBus: Send + Sync {
    fn broadcast(&self, module_id: &str, action: &str, payload: &str);
}

/// Single-node default: broadcasts go nowhere
pub struct NoopBus;

impl InvalidationBus for NoopBus {
    fn broadcast(&self, _module_id: &str, _action: &str, _payload: &str) {}
}

/// Logs every broadcast at debug level, for deployments that want
/// visibility without a real transport
pub struct LogBus;

impl InvalidationBus for LogBus {
    fn broadcast(&self, module_id: &str, action: &str, payload: &str) {
        debug!("bus broadcast: module={} action={} payload={}", module_id, action, payload);
    }
}

/// Records broadcasts for inspection; used by tests
pub struct RecordingBus {
    messages: Mutex<Vec<(String, String, String)>>,
}

impl RecordingBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            messages: Mutex::new(Vec::new()),
        })
    }

    /// Everything broadcast so far, in order
    pub fn messages(&self) -> Vec<(String, String, String)> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

impl InvalidationBus for RecordingBus {
    fn broadcast(&self, module_id: &str, action: &str, payload: &str) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push((
                module_id.to_string(),
                action.to_string(),
                payload.to_string(),
            ));
        }
    }
}

/// Picks the bus implementation named by configuration
pub fn bus_for(kind: &str) -> Arc<dyn InvalidationBus> {
    match kind {
        "log" => Arc::new(LogBus),
        "noop" | "" => Arc::new(NoopBus),
        other => {
            warn!("unknown bus kind '{}', falling back to noop", other);
            Arc::new(NoopBus)
        }
    }
}
