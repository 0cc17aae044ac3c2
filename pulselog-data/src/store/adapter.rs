use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::sync::bus::{BusEvent, EventBus};

use super::backend::StoreBackend;
use super::errors::StoreError;

/// Outcome of a decode-or-default read: the stored value, or the caller's
/// fallback when the key was absent, corrupt, or the store unavailable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<T> {
    /// The persisted value was present and decoded
    Stored(T),

    /// The fallback was used
    Fallback(T),
}

impl<T> Decoded<T> {
    /// Unwrap either way.
    pub fn into_value(self) -> T {
        match self {
            Decoded::Stored(value) | Decoded::Fallback(value) => value,
        }
    }

    /// True when the value came from the store.
    pub fn is_stored(&self) -> bool {
        matches!(self, Decoded::Stored(_))
    }
}

/// Safe read/write wrapper over the durable store. Reads never fail;
/// writes degrade to logged no-ops when no store is attached. Every clone
/// shares the same backend and the same broadcast bus, so consumers built
/// from clones of one adapter notify each other.
#[derive(Clone)]
pub struct StoreAdapter {
    backend: Option<Arc<dyn StoreBackend>>,
    bus: EventBus,
}

impl StoreAdapter {
    /// Adapter over a durable backend.
    pub fn new(backend: Arc<dyn StoreBackend>) -> Self {
        Self {
            backend: Some(backend),
            bus: EventBus::new(),
        }
    }

    /// Adapter for environments without a durable store: reads return the
    /// fallback immediately and writes are dropped with a warning.
    pub fn detached() -> Self {
        Self {
            backend: None,
            bus: EventBus::new(),
        }
    }

    /// The broadcast bus shared by every consumer of this adapter.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Whether a durable backend is attached.
    pub fn is_persistent(&self) -> bool {
        self.backend.is_some()
    }

    /// Read the value stored under `key`, or `fallback` when the store is
    /// unavailable, the key absent, or the stored value corrupt.
    pub fn read<T>(&self, key: &str, fallback: T) -> T
    where
        T: DeserializeOwned,
    {
        self.read_tagged(key, fallback).into_value()
    }

    /// Like [`read`](Self::read), but reports whether the result came
    /// from the store or the fallback was used.
    pub fn read_tagged<T>(&self, key: &str, fallback: T) -> Decoded<T>
    where
        T: DeserializeOwned,
    {
        let Some(backend) = &self.backend else {
            return Decoded::Fallback(fallback);
        };

        let raw = match backend.get_raw(key) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Error reading store key \"{}\": {}", key, e);
                return Decoded::Fallback(fallback);
            }
        };

        match raw {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(value) => Decoded::Stored(value),
                Err(source) => {
                    // Corrupt or foreign-shaped data is treated exactly
                    // like an absent key, never partially merged
                    let e = StoreError::Deserialize {
                        key: key.to_string(),
                        source,
                    };
                    warn!("{}", e);
                    Decoded::Fallback(fallback)
                }
            },
            None => Decoded::Fallback(fallback),
        }
    }

    /// Serialize and persist a value, then notify same-context consumers.
    /// With no backend attached this is a logged no-op; the caller is
    /// never failed for missing a durable store.
    pub fn write<T>(&self, key: &str, value: &T) -> Result<(), StoreError>
    where
        T: Serialize,
    {
        let Some(backend) = &self.backend else {
            warn!(
                "Tried writing store key \"{}\" with no durable store attached",
                key
            );
            return Ok(());
        };

        let raw = serde_json::to_string(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        backend.set_raw(key, &raw)?;
        debug!("Persisted store key \"{}\" ({} bytes)", key, raw.len());

        self.bus.publish(&BusEvent::CellSync);
        Ok(())
    }

    /// Deliver the cross-context signal: poll the backend for keys changed
    /// by other contexts and broadcast one event per changed key. Returns
    /// the number of changes delivered.
    pub fn sync_external(&self) -> usize {
        let Some(backend) = &self.backend else {
            return 0;
        };

        let changes = match backend.poll_external() {
            Ok(changes) => changes,
            Err(e) => {
                warn!("Error polling store for external changes: {}", e);
                return 0;
            }
        };

        let count = changes.len();
        for change in changes {
            debug!("Store key \"{}\" changed externally", change.key);
            self.bus.publish(&BusEvent::ExternalChange {
                key: change.key,
                raw: change.raw,
            });
        }
        count
    }
}

impl fmt::Debug for StoreAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreAdapter")
            .field("persistent", &self.backend.is_some())
            .finish()
    }
}
