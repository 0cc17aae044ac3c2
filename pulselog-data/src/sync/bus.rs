use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};

use tracing::warn;

/// Event name for the same-context broadcast fired after every persist.
pub const CELL_SYNC_EVENT: &str = "store-sync";

/// Event name for changes observed from another context.
pub const EXTERNAL_CHANGE_EVENT: &str = "store-external";

/// Notification delivered through the bus.
#[derive(Debug, Clone)]
pub enum BusEvent {
    /// Some key in this context was persisted. Carries no payload on
    /// purpose: every consumer re-reads its own key and decides for
    /// itself whether anything changed.
    CellSync,

    /// Another context changed a key. `raw` is the new serialized value,
    /// `None` when the key was cleared.
    ExternalChange { key: String, raw: Option<String> },
}

impl BusEvent {
    /// The registry name this event is delivered under.
    pub fn name(&self) -> &'static str {
        match self {
            BusEvent::CellSync => CELL_SYNC_EVENT,
            BusEvent::ExternalChange { .. } => EXTERNAL_CHANGE_EVENT,
        }
    }
}

type Callback = Arc<dyn Fn(&BusEvent) + Send + Sync>;

#[derive(Default)]
struct BusInner {
    listeners: Mutex<HashMap<String, Vec<(u64, Callback)>>>,
    next_id: AtomicU64,
}

impl BusInner {
    fn unsubscribe(&self, event: &str, id: u64) {
        if let Ok(mut listeners) = self.listeners.lock() {
            if let Some(subs) = listeners.get_mut(event) {
                subs.retain(|(sub_id, _)| *sub_id != id);
                if subs.is_empty() {
                    listeners.remove(event);
                }
            }
        }
    }
}

/// Process-wide publish/subscribe registry keyed by event name. Clones
/// share one registry; the registry lives as long as the adapter that
/// owns it, and dropping a [`Subscription`] removes its listener.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Create a new bus with no listeners
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener under one event name.
    pub fn subscribe(
        &self,
        event: &str,
        callback: impl Fn(&BusEvent) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        match self.inner.listeners.lock() {
            Ok(mut listeners) => {
                listeners
                    .entry(event.to_string())
                    .or_default()
                    .push((id, Arc::new(callback)));
            }
            Err(e) => warn!("Event bus lock poisoned during subscribe: {}", e),
        }
        Subscription {
            inner: Arc::downgrade(&self.inner),
            event: event.to_string(),
            id,
        }
    }

    /// Deliver an event to every listener registered under its name, in
    /// subscription order. Listeners run on the caller's stack, outside
    /// the registry lock, so they may publish or subscribe re-entrantly.
    pub fn publish(&self, event: &BusEvent) {
        let callbacks: Vec<Callback> = match self.inner.listeners.lock() {
            Ok(listeners) => listeners
                .get(event.name())
                .map(|subs| subs.iter().map(|(_, cb)| Arc::clone(cb)).collect())
                .unwrap_or_default(),
            Err(e) => {
                warn!("Event bus lock poisoned during publish: {}", e);
                Vec::new()
            }
        };
        for callback in callbacks {
            callback(event);
        }
    }

    /// Number of listeners currently registered under an event name.
    pub fn listener_count(&self, event: &str) -> usize {
        self.inner
            .listeners
            .lock()
            .map(|listeners| listeners.get(event).map_or(0, Vec::len))
            .unwrap_or(0)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let events = self
            .inner
            .listeners
            .lock()
            .map(|listeners| listeners.len())
            .unwrap_or(0);
        f.debug_struct("EventBus").field("events", &events).finish()
    }
}

/// Listener registration; dropping it unsubscribes.
pub struct Subscription {
    inner: Weak<BusInner>,
    event: String,
    id: u64,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.unsubscribe(&self.event, self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.event)
            .field("id", &self.id)
            .finish()
    }
}
