use std::fmt;
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, warn};

use crate::store::{Decoded, StoreAdapter};
use crate::sync::bus::{BusEvent, Subscription, CELL_SYNC_EVENT, EXTERNAL_CHANGE_EVENT};

/// Hydration phase of a cell.
///
/// Every cell paints its construction-time initial value first, in every
/// environment, and adopts the persisted value in a single deterministic
/// transition after activation. The two-phase start keeps the first paint
/// identical whether or not a durable store is reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellPhase {
    /// Showing the construction-time initial value
    Uninitialized,

    /// Reconciled with the durable store
    Hydrated,
}

struct CellShared<T> {
    value: T,
    phase: CellPhase,
}

/// Reactive state container bound to one store key.
///
/// Every instance bound to the same key, whether through clones of the
/// same [`StoreAdapter`] in this context or through another context
/// sharing the durable store, observes the same persisted value after one
/// notification round-trip. Writes are last-write-wins; a failed persist
/// degrades the cell to session-only state instead of failing the caller.
pub struct SyncedCell<T> {
    key: String,
    initial: T,
    adapter: StoreAdapter,
    shared: Arc<Mutex<CellShared<T>>>,
    _subscriptions: [Subscription; 2],
}

impl<T> SyncedCell<T>
where
    T: Clone + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// Bind a cell to `key`. The visible value starts as `initial`; call
    /// [`hydrate`](Self::hydrate) after activation to adopt the persisted
    /// value.
    pub fn new(key: impl Into<String>, initial: T, adapter: StoreAdapter) -> Self {
        let key = key.into();
        let shared = Arc::new(Mutex::new(CellShared {
            value: initial.clone(),
            phase: CellPhase::Uninitialized,
        }));

        // Same-context notifications: every cell re-reads its own key, so
        // cells bound to other keys are never falsely invalidated
        let sync_sub = {
            let weak = Arc::downgrade(&shared);
            let listener_adapter = adapter.clone();
            let listener_key = key.clone();
            adapter.bus().subscribe(CELL_SYNC_EVENT, move |_event| {
                if let Some(shared) = weak.upgrade() {
                    Self::reread(&shared, &listener_adapter, &listener_key);
                }
            })
        };

        // Cross-context notifications: adopt the raw payload wholesale,
        // falling back to the initial value on a cleared or corrupt key
        let external_sub = {
            let weak = Arc::downgrade(&shared);
            let listener_key = key.clone();
            let listener_initial = initial.clone();
            adapter.bus().subscribe(EXTERNAL_CHANGE_EVENT, move |event| {
                let BusEvent::ExternalChange { key: changed, raw } = event else {
                    return;
                };
                if *changed != listener_key {
                    return;
                }
                let Some(shared) = weak.upgrade() else {
                    return;
                };
                let value = match raw {
                    Some(raw) => match serde_json::from_str(raw) {
                        Ok(value) => value,
                        Err(e) => {
                            warn!(
                                "Error parsing external value for key \"{}\": {}",
                                listener_key, e
                            );
                            listener_initial.clone()
                        }
                    },
                    None => listener_initial.clone(),
                };
                if let Ok(mut guard) = shared.lock() {
                    if guard.value != value {
                        guard.value = value;
                    }
                };
            })
        };

        Self {
            key,
            initial,
            adapter,
            shared,
            _subscriptions: [sync_sub, external_sub],
        }
    }

    /// The store key this cell is bound to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Current hydration phase.
    pub fn phase(&self) -> CellPhase {
        match self.shared.lock() {
            Ok(guard) => guard.phase,
            Err(_) => CellPhase::Uninitialized,
        }
    }

    /// Clone of the visible value.
    pub fn get(&self) -> T {
        match self.shared.lock() {
            Ok(guard) => guard.value.clone(),
            Err(e) => {
                warn!("Cell state lock poisoned for key \"{}\": {}", self.key, e);
                self.initial.clone()
            }
        }
    }

    /// Adopt the persisted value. The `Uninitialized -> Hydrated`
    /// transition happens once; later calls are no-ops.
    pub fn hydrate(&self) {
        {
            let Ok(guard) = self.shared.lock() else {
                return;
            };
            if guard.phase == CellPhase::Hydrated {
                return;
            }
        }

        let decoded = self.adapter.read_tagged(&self.key, self.initial.clone());
        if let Decoded::Fallback(_) = &decoded {
            debug!("No persisted value for key \"{}\", keeping initial", self.key);
        }

        if let Ok(mut guard) = self.shared.lock() {
            guard.value = decoded.into_value();
            guard.phase = CellPhase::Hydrated;
        }
    }

    /// Replace the value: persist, notify same-context consumers, update
    /// the visible value.
    pub fn set(&self, value: T) {
        self.apply(value);
    }

    /// Functional update against the previous value.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let current = self.get();
        let next = f(&current);
        self.apply(next);
    }

    fn apply(&self, next: T) {
        // The adapter broadcasts to same-context consumers after a
        // successful persist. A failed persist is logged and the visible
        // value still updated, so the caller keeps working with
        // session-only state.
        if let Err(e) = self.adapter.write(&self.key, &next) {
            error!("Error persisting store key \"{}\": {}", self.key, e);
        }
        if let Ok(mut guard) = self.shared.lock() {
            guard.value = next;
        }
    }

    /// Same-context notification: re-read this cell's own key and adopt
    /// the persisted value only if it differs from the cached one.
    fn reread(shared: &Arc<Mutex<CellShared<T>>>, adapter: &StoreAdapter, key: &str) {
        let current = match shared.lock() {
            Ok(guard) => guard.value.clone(),
            Err(e) => {
                warn!("Cell state lock poisoned for key \"{}\": {}", key, e);
                return;
            }
        };

        if let Decoded::Stored(value) = adapter.read_tagged(key, current.clone()) {
            if value != current {
                if let Ok(mut guard) = shared.lock() {
                    guard.value = value;
                }
            }
        }
    }
}

impl<T> fmt::Debug for SyncedCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SyncedCell")
            .field("key", &self.key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::tests::{FailingBackend, ScriptedBackend};
    use crate::store::{MemoryBackend, StoreBackend};

    fn memory_adapter() -> StoreAdapter {
        StoreAdapter::new(Arc::new(MemoryBackend::new()))
    }

    #[test]
    fn test_first_paint_shows_initial_value() {
        let adapter = memory_adapter();
        adapter.write("counter", &41_u32).unwrap();

        let cell = SyncedCell::new("counter", 0_u32, adapter);
        assert_eq!(cell.get(), 0);
        assert_eq!(cell.phase(), CellPhase::Uninitialized);
    }

    #[test]
    fn test_hydrate_adopts_persisted_value() {
        let adapter = memory_adapter();
        adapter.write("counter", &41_u32).unwrap();

        let cell = SyncedCell::new("counter", 0_u32, adapter);
        cell.hydrate();
        assert_eq!(cell.get(), 41);
        assert_eq!(cell.phase(), CellPhase::Hydrated);
    }

    #[test]
    fn test_hydrate_with_empty_store_keeps_initial() {
        let cell = SyncedCell::new("counter", 9_u32, memory_adapter());
        cell.hydrate();
        assert_eq!(cell.get(), 9);
        assert_eq!(cell.phase(), CellPhase::Hydrated);
    }

    #[test]
    fn test_hydrate_transition_happens_once() {
        let adapter = memory_adapter();
        let cell = SyncedCell::new("counter", 0_u32, adapter.clone());
        cell.hydrate();

        cell.set(5);
        // A second hydrate must not re-run the transition
        cell.hydrate();
        assert_eq!(cell.get(), 5);
    }

    #[test]
    fn test_set_persists_value() {
        let adapter = memory_adapter();
        let cell = SyncedCell::new("counter", 0_u32, adapter.clone());
        cell.hydrate();
        cell.set(3);

        assert_eq!(adapter.read("counter", 0_u32), 3);
    }

    #[test]
    fn test_update_applies_functional_semantics() {
        let cell = SyncedCell::new("counter", 10_u32, memory_adapter());
        cell.hydrate();

        cell.update(|prev| prev + 1);
        cell.update(|prev| prev * 2);
        assert_eq!(cell.get(), 22);
    }

    #[test]
    fn test_same_key_cells_converge_after_one_set() {
        let adapter = memory_adapter();
        let a = SyncedCell::new("counter", 0_u32, adapter.clone());
        let b = SyncedCell::new("counter", 0_u32, adapter);
        a.hydrate();
        b.hydrate();

        a.set(17);
        assert_eq!(a.get(), 17);
        assert_eq!(b.get(), 17);
    }

    #[test]
    fn test_other_key_cells_are_not_falsely_invalidated() {
        let adapter = memory_adapter();
        let counter = SyncedCell::new("counter", 0_u32, adapter.clone());
        let label = SyncedCell::new("label", "untouched".to_string(), adapter);
        counter.hydrate();
        label.hydrate();

        counter.set(1);
        // The label cell re-read its own (absent) key and kept its value
        assert_eq!(label.get(), "untouched");
    }

    #[test]
    fn test_external_change_adopts_new_value() {
        let backend = Arc::new(ScriptedBackend::new());
        let adapter = StoreAdapter::new(Arc::clone(&backend) as Arc<dyn StoreBackend>);

        let cell = SyncedCell::new("counter", 0_u32, adapter.clone());
        cell.hydrate();

        backend.push_external("counter", Some("23"));
        assert_eq!(adapter.sync_external(), 1);
        assert_eq!(cell.get(), 23);
    }

    #[test]
    fn test_external_clear_falls_back_to_initial() {
        let backend = Arc::new(ScriptedBackend::new());
        let adapter = StoreAdapter::new(Arc::clone(&backend) as Arc<dyn StoreBackend>);

        let cell = SyncedCell::new("counter", 7_u32, adapter.clone());
        cell.hydrate();
        cell.set(100);

        backend.push_external("counter", None);
        adapter.sync_external();
        assert_eq!(cell.get(), 7);
    }

    #[test]
    fn test_external_parse_failure_falls_back_to_initial() {
        let backend = Arc::new(ScriptedBackend::new());
        let adapter = StoreAdapter::new(Arc::clone(&backend) as Arc<dyn StoreBackend>);

        let cell = SyncedCell::new("counter", 7_u32, adapter.clone());
        cell.hydrate();
        cell.set(100);

        backend.push_external("counter", Some("{broken"));
        adapter.sync_external();
        assert_eq!(cell.get(), 7);
    }

    #[test]
    fn test_external_change_for_other_key_is_ignored() {
        let backend = Arc::new(ScriptedBackend::new());
        let adapter = StoreAdapter::new(Arc::clone(&backend) as Arc<dyn StoreBackend>);

        let cell = SyncedCell::new("counter", 0_u32, adapter.clone());
        cell.hydrate();
        cell.set(4);

        backend.push_external("unrelated", Some("99"));
        adapter.sync_external();
        assert_eq!(cell.get(), 4);
    }

    #[test]
    fn test_failed_persist_still_updates_visible_value() {
        let backend = Arc::new(FailingBackend::new());
        let adapter = StoreAdapter::new(backend as Arc<dyn StoreBackend>);

        let cell = SyncedCell::new("counter", 0_u32, adapter);
        cell.hydrate();
        cell.set(12);
        assert_eq!(cell.get(), 12);
    }

    #[test]
    fn test_detached_adapter_keeps_session_state() {
        let cell = SyncedCell::new("counter", 0_u32, StoreAdapter::detached());
        cell.hydrate();
        cell.set(33);
        assert_eq!(cell.get(), 33);
    }

    #[test]
    fn test_dropped_cell_stops_listening() {
        let adapter = memory_adapter();
        let a = SyncedCell::new("counter", 0_u32, adapter.clone());
        drop(a);

        assert_eq!(adapter.bus().listener_count(CELL_SYNC_EVENT), 0);
        assert_eq!(adapter.bus().listener_count(EXTERNAL_CHANGE_EVENT), 0);
    }
}
