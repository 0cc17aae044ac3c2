use std::sync::{Mutex, MutexGuard};

use chrono::NaiveDate;
use thiserror::Error;
use tracing::debug;

use pulselog_data::{StoreAdapter, SyncedCell};
use pulselog_domain::{
    project, summarize, validate_create_request, CreateRecordRequest, FilterState, Record,
    RecordSummary, Thresholds, ValidationError,
};

/// Store keys used by the tracker. Must be stable across sessions for
/// persistence to work.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Key holding the record collection
    pub records_key: String,

    /// Key holding the threshold configuration
    pub thresholds_key: String,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            records_key: "bp_records".to_string(),
            thresholds_key: "bp_thresholds".to_string(),
        }
    }
}

/// Tracker facade errors
#[derive(Debug, Error)]
pub enum TrackerError {
    /// A request failed validation
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Application facade over the synchronization core: a records cell, a
/// thresholds cell and the transient filter state, exposed to presentation
/// code as plain synchronous callbacks.
#[derive(Debug)]
pub struct HealthTracker {
    records: SyncedCell<Vec<Record>>,
    thresholds: SyncedCell<Thresholds>,
    filter: Mutex<FilterState>,
    adapter: StoreAdapter,
}

impl HealthTracker {
    /// Tracker with the default store keys.
    pub fn new(adapter: StoreAdapter) -> Self {
        Self::with_config(adapter, TrackerConfig::default())
    }

    /// Tracker bound to caller-chosen store keys.
    pub fn with_config(adapter: StoreAdapter, config: TrackerConfig) -> Self {
        let records = SyncedCell::new(config.records_key, Vec::new(), adapter.clone());
        let thresholds = SyncedCell::new(config.thresholds_key, Thresholds::default(), adapter.clone());
        Self {
            records,
            thresholds,
            filter: Mutex::new(FilterState::default()),
            adapter,
        }
    }

    /// Post-activation reconciliation for both cells.
    pub fn hydrate(&self) {
        self.records.hydrate();
        self.thresholds.hydrate();
    }

    /// Whether readings are being persisted or kept session-only.
    pub fn is_persistent(&self) -> bool {
        self.adapter.is_persistent()
    }

    /// Poll the durable store for changes made in other contexts and
    /// deliver them to the cells. Returns the number of changed keys.
    pub fn sync_external(&self) -> usize {
        self.adapter.sync_external()
    }

    /// Validate and save a new reading. The record is prepended to the
    /// collection; display order is recomputed on every projection anyway.
    pub fn save_record(&self, request: CreateRecordRequest) -> Result<Record, TrackerError> {
        validate_create_request(&request)?;
        let record = Record::from_request(request);
        let saved = record.clone();

        self.records.update(move |records| {
            let mut next = Vec::with_capacity(records.len() + 1);
            next.push(record);
            next.extend(records.iter().cloned());
            next
        });

        debug!("Saved record {}", saved.id);
        Ok(saved)
    }

    /// Delete a reading by id. Returns whether a record was removed; the
    /// order of the remaining records is untouched.
    pub fn delete_record(&self, id: &str) -> bool {
        let existed = self.records.get().iter().any(|record| record.id == id);
        if existed {
            self.records.update(|records| {
                records
                    .iter()
                    .filter(|record| record.id != id)
                    .cloned()
                    .collect()
            });
            debug!("Deleted record {}", id);
        }
        existed
    }

    /// Replace the alert thresholds wholesale.
    pub fn update_thresholds(&self, thresholds: Thresholds) -> Result<(), TrackerError> {
        thresholds.validate_update()?;
        self.thresholds.set(thresholds);
        Ok(())
    }

    /// The raw persisted collection, in insertion order.
    pub fn records(&self) -> Vec<Record> {
        self.records.get()
    }

    /// The configured thresholds.
    pub fn thresholds(&self) -> Thresholds {
        self.thresholds.get()
    }

    /// Snapshot of the transient filter state.
    pub fn filter_state(&self) -> FilterState {
        self.filter_guard().clone()
    }

    /// Toggle the over-threshold filter.
    pub fn set_filter_enabled(&self, enabled: bool) {
        self.filter_guard().enabled = enabled;
    }

    /// Set or clear the inclusive start day.
    pub fn set_start_time(&self, start: Option<NaiveDate>) {
        self.filter_guard().start_time = start;
    }

    /// Set or clear the inclusive end day.
    pub fn set_end_time(&self, end: Option<NaiveDate>) {
        self.filter_guard().end_time = end;
    }

    /// Reset every filter to its pass-through state.
    pub fn clear_filters(&self) {
        self.filter_guard().clear();
    }

    /// The filtered, sorted projection the list renders from.
    pub fn visible_records(&self) -> Vec<Record> {
        let records = self.records.get();
        let thresholds = self.thresholds.get();
        let filter = self.filter_state();
        project(&records, &thresholds, &filter)
    }

    /// Aggregate statistics over every stored reading, or `None` when the
    /// collection is empty.
    pub fn summary(&self) -> Option<RecordSummary> {
        let records = self.records.get();
        let thresholds = self.thresholds.get();
        summarize(&records, &thresholds)
    }

    fn filter_guard(&self) -> MutexGuard<'_, FilterState> {
        self.filter
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pulselog_data::MemoryBackend;
    use std::sync::Arc;

    fn memory_tracker() -> HealthTracker {
        let adapter = StoreAdapter::new(Arc::new(MemoryBackend::new()));
        let tracker = HealthTracker::new(adapter);
        tracker.hydrate();
        tracker
    }

    fn request(systolic: u16, diastolic: u16, timestamp: &str) -> CreateRecordRequest {
        CreateRecordRequest {
            systolic,
            diastolic,
            heart_rate: None,
            timestamp: Some(timestamp.to_string()),
        }
    }

    #[test]
    fn test_save_record_prepends_to_collection() {
        let tracker = memory_tracker();
        tracker
            .save_record(request(120, 80, "2024-01-01T08:00:00Z"))
            .unwrap();
        tracker
            .save_record(request(125, 82, "2024-01-02T08:00:00Z"))
            .unwrap();

        let records = tracker.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].systolic, 125);
        assert_eq!(records[1].systolic, 120);
    }

    #[test]
    fn test_save_record_rejects_invalid_request() {
        let tracker = memory_tracker();
        let result = tracker.save_record(request(80, 80, "2024-01-01T08:00:00Z"));
        assert!(result.is_err());
        assert!(tracker.records().is_empty());
    }

    #[test]
    fn test_delete_record_removes_exactly_one() {
        let tracker = memory_tracker();
        let first = tracker
            .save_record(request(120, 80, "2024-01-01T08:00:00Z"))
            .unwrap();
        let second = tracker
            .save_record(request(125, 82, "2024-01-02T08:00:00Z"))
            .unwrap();
        let third = tracker
            .save_record(request(130, 85, "2024-01-03T08:00:00Z"))
            .unwrap();

        assert!(tracker.delete_record(&second.id));

        let remaining: Vec<String> = tracker.records().iter().map(|r| r.id.clone()).collect();
        assert_eq!(remaining, vec![third.id, first.id]);
    }

    #[test]
    fn test_delete_record_unknown_id_is_a_no_op() {
        let tracker = memory_tracker();
        tracker
            .save_record(request(120, 80, "2024-01-01T08:00:00Z"))
            .unwrap();

        assert!(!tracker.delete_record("no-such-id"));
        assert_eq!(tracker.records().len(), 1);
    }

    #[test]
    fn test_default_thresholds_on_first_load() {
        let tracker = memory_tracker();
        assert_eq!(tracker.thresholds(), Thresholds::default());
    }

    #[test]
    fn test_update_thresholds_replaces_wholesale() {
        let tracker = memory_tracker();
        let next = Thresholds {
            systolic: 140,
            diastolic: 90,
            heart_rate: 110,
        };

        tracker.update_thresholds(next.clone()).unwrap();
        assert_eq!(tracker.thresholds(), next);
    }

    #[test]
    fn test_update_thresholds_rejects_invalid() {
        let tracker = memory_tracker();
        let result = tracker.update_thresholds(Thresholds {
            systolic: 0,
            diastolic: 90,
            heart_rate: 110,
        });

        assert!(result.is_err());
        assert_eq!(tracker.thresholds(), Thresholds::default());
    }

    #[test]
    fn test_clear_filters_resets_state() {
        let tracker = memory_tracker();
        tracker.set_filter_enabled(true);
        tracker.set_start_time(NaiveDate::from_ymd_opt(2024, 1, 1));
        tracker.set_end_time(NaiveDate::from_ymd_opt(2024, 1, 31));

        tracker.clear_filters();
        assert_eq!(tracker.filter_state(), FilterState::default());
    }

    #[test]
    fn test_visible_records_apply_threshold_filter() {
        let tracker = memory_tracker();
        tracker
            .save_record(request(140, 70, "2024-01-01T08:00:00Z"))
            .unwrap();
        tracker
            .save_record(request(120, 70, "2024-01-02T08:00:00Z"))
            .unwrap();

        tracker.set_filter_enabled(true);
        let visible = tracker.visible_records();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].systolic, 140);
    }

    #[test]
    fn test_summary_over_all_records() {
        let tracker = memory_tracker();
        assert!(tracker.summary().is_none());

        tracker
            .save_record(request(140, 70, "2024-01-01T08:00:00Z"))
            .unwrap();
        tracker
            .save_record(request(120, 70, "2024-01-02T08:00:00Z"))
            .unwrap();

        let summary = tracker.summary().unwrap();
        assert_eq!(summary.reading_count, 2);
        assert_eq!(summary.over_threshold_count, 1);
    }
}
