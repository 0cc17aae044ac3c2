// PulseLog domain
// This crate contains the data model and the pure services of the tracker:
// entities, request validation, the display projection and the reading summary.

// Domain entities and value objects
pub mod entities;

// Pure services over the record collection
pub mod services;

// Re-export common types for easier imports
pub use entities::{
    validate_create_request, CreateRecordRequest, FilterState, Record, Thresholds,
    ValidationError,
};
pub use services::{exceeds_thresholds, project, summarize, BloodPressureCategory, RecordSummary};
