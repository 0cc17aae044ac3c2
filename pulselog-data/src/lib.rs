// PulseLog data
// This crate keeps in-memory application state consistent with a durable
// key-value store across many consumers and across contexts sharing the
// same store document.

// Durable key-value storage
pub mod store;

// State cells and the in-process broadcast bus
pub mod sync;

// Re-export commonly used types
pub use store::{Decoded, FileBackend, KeyChange, MemoryBackend, StoreAdapter, StoreBackend, StoreError};
pub use sync::{BusEvent, CellPhase, EventBus, Subscription, SyncedCell};
