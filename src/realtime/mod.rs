//! Server-push notifications.
//!
//! `PushChannel` is the in-process side of the portal's notification socket:
//! the transport (owned by the surrounding application) calls `emit` for every
//! frame it receives and `PushChannel` fans it out to every listener currently
//! registered for that event name. `RealtimeInvalidator` is the list views'
//! subscription lifecycle on top of it.

mod invalidator;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::Result;

pub use invalidator::{InvalidatorState, RealtimeInvalidator, TypeFilter, WatchSpec};

/// Payload delivered with every push event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl PushEvent {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            data: serde_json::Value::Null,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// Identifies one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type PushHandler = Arc<dyn Fn(&PushEvent) + Send + Sync>;

/// Multicast registry of push listeners, keyed by event name.
///
/// Cloning yields another handle to the same registry.
#[derive(Clone, Default)]
pub struct PushChannel {
    listeners: Arc<RwLock<HashMap<String, Vec<(ListenerId, PushHandler)>>>>,
}

impl PushChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `event_name`.
    pub fn on<F>(&self, event_name: &str, handler: F) -> ListenerId
    where
        F: Fn(&PushEvent) + Send + Sync + 'static,
    {
        let id = ListenerId(Uuid::new_v4());
        self.listeners
            .write()
            .entry(event_name.to_string())
            .or_default()
            .push((id, Arc::new(handler)));
        tracing::debug!(event = event_name, listener = %id, "push listener registered");
        id
    }

    /// Deregister exactly one listener. Returns false if it was not registered.
    pub fn off(&self, event_name: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let Some(entries) = listeners.get_mut(event_name) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|(existing, _)| *existing != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            listeners.remove(event_name);
        }
        if removed {
            tracing::debug!(event = event_name, listener = %id, "push listener removed");
        }
        removed
    }

    /// Deliver `event` to every listener registered for `event_name`.
    ///
    /// Handlers are invoked after the registry lock is released, so a handler
    /// may register or remove listeners. Returns the number of deliveries.
    pub fn emit(&self, event_name: &str, event: &PushEvent) -> usize {
        let handlers: Vec<PushHandler> = self
            .listeners
            .read()
            .get(event_name)
            .map(|entries| entries.iter().map(|(_, h)| Arc::clone(h)).collect())
            .unwrap_or_default();

        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    /// Decode a raw `{type, data}` frame from the transport and emit it.
    pub fn emit_json(&self, event_name: &str, frame: &str) -> Result<usize> {
        let event: PushEvent = serde_json::from_str(frame)?;
        Ok(self.emit(event_name, &event))
    }

    pub fn listener_count(&self, event_name: &str) -> usize {
        self.listeners
            .read()
            .get(event_name)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl fmt::Debug for PushChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let listeners = self.listeners.read();
        let counts: HashMap<&str, usize> = listeners
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.len()))
            .collect();
        f.debug_struct("PushChannel")
            .field("listeners", &counts)
            .finish()
    }
}
