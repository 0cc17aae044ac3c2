use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, TimeZone, Utc};

use crate::entities::{FilterState, Record, Thresholds};

/// Compute the display projection of a record collection: a copy sorted by
/// timestamp descending, then narrowed by the date and threshold filters.
/// The caller's collection is never mutated, and an absent filter is a pure
/// pass-through.
pub fn project(records: &[Record], thresholds: &Thresholds, filter: &FilterState) -> Vec<Record> {
    let mut projected: Vec<(Option<DateTime<Utc>>, Record)> = records
        .iter()
        .map(|record| (record.parsed_timestamp(), record.clone()))
        .collect();

    // Most recent first; unparsable timestamps sink to the end
    projected.sort_by(|a, b| b.0.cmp(&a.0));

    if let Some(day) = filter.start_time {
        let start = local_day_start(day);
        projected.retain(|(ts, _)| ts.map_or(false, |t| t >= start));
    }

    if let Some(day) = filter.end_time {
        let end = local_day_end(day);
        projected.retain(|(ts, _)| ts.map_or(false, |t| t <= end));
    }

    if filter.enabled {
        projected.retain(|(_, record)| exceeds_thresholds(record, thresholds));
    }

    projected.into_iter().map(|(_, record)| record).collect()
}

/// True when a reading exceeds any configured threshold. An absent heart
/// rate never participates in the comparison.
pub fn exceeds_thresholds(record: &Record, thresholds: &Thresholds) -> bool {
    record.systolic > thresholds.systolic
        || record.diastolic > thresholds.diastolic
        || record
            .heart_rate
            .map_or(false, |heart_rate| heart_rate > thresholds.heart_rate)
}

/// 00:00:00.000 of the given day, local time, as a UTC instant.
fn local_day_start(day: NaiveDate) -> DateTime<Utc> {
    let naive = day.and_time(NaiveTime::MIN);
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}

/// 23:59:59.999 of the given day, local time, as a UTC instant.
fn local_day_end(day: NaiveDate) -> DateTime<Utc> {
    let naive = day
        .and_time(NaiveTime::MIN)
        .checked_add_signed(Duration::milliseconds(86_399_999))
        .unwrap_or_else(|| day.and_time(NaiveTime::MIN));
    Local
        .from_local_datetime(&naive)
        .latest()
        .map(|t| t.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.from_utc_datetime(&naive))
}
