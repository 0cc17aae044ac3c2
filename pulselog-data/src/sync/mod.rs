// Sync module structure
pub mod bus;
mod cell;

// Re-export commonly used types
pub use bus::{BusEvent, EventBus, Subscription, CELL_SYNC_EVENT, EXTERNAL_CHANGE_EVENT};
pub use cell::{CellPhase, SyncedCell};
