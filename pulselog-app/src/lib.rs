// PulseLog app
// This crate wires the synchronized state cells to the callbacks the
// presentation layer consumes.

// Tracker facade
pub mod tracker;

// Re-export the facade types
pub use tracker::{HealthTracker, TrackerConfig, TrackerError};
