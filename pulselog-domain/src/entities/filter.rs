use chrono::NaiveDate;

/// Transient list-filter state. Never persisted.
///
/// Date bounds carry calendar-day precision: the projection widens them to
/// whole local days (00:00:00.000 through 23:59:59.999).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterState {
    /// When set, only readings exceeding the configured thresholds are shown
    pub enabled: bool,

    /// Inclusive lower bound
    pub start_time: Option<NaiveDate>,

    /// Inclusive upper bound
    pub end_time: Option<NaiveDate>,
}

impl FilterState {
    /// Reset every filter to its pass-through state.
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_pass_through() {
        let filter = FilterState::default();
        assert!(!filter.enabled);
        assert!(filter.start_time.is_none());
        assert!(filter.end_time.is_none());
    }

    #[test]
    fn test_clear_resets_all_fields() {
        let mut filter = FilterState {
            enabled: true,
            start_time: NaiveDate::from_ymd_opt(2024, 1, 1),
            end_time: NaiveDate::from_ymd_opt(2024, 1, 31),
        };

        filter.clear();
        assert_eq!(filter, FilterState::default());
    }
}
