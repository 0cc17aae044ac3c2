pub mod summary;
pub mod view;

// Pure services over the record collection.
// Nothing in here touches storage; callers pass slices in and get owned
// results back.

// Re-export the projection and summary entry points
pub use summary::{summarize, BloodPressureCategory, RecordSummary};
pub use view::{exceeds_thresholds, project};
