use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entities::{Record, Thresholds};
use crate::services::view::exceeds_thresholds;

/// Blood pressure category based on measurements
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum BloodPressureCategory {
    /// Normal blood pressure (systolic < 120 and diastolic < 80)
    Normal,

    /// Elevated blood pressure (systolic 120-129 and diastolic < 80)
    Elevated,

    /// Stage 1 Hypertension (systolic 130-139 or diastolic 80-89)
    Hypertension1,

    /// Stage 2 Hypertension (systolic ≥ 140 or diastolic ≥ 90)
    Hypertension2,

    /// Hypertensive crisis (systolic ≥ 180 and/or diastolic ≥ 120)
    HypertensiveCrisis,
}

impl fmt::Display for BloodPressureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BloodPressureCategory::Normal => "Normal",
            BloodPressureCategory::Elevated => "Elevated",
            BloodPressureCategory::Hypertension1 => "Hypertension Stage 1",
            BloodPressureCategory::Hypertension2 => "Hypertension Stage 2",
            BloodPressureCategory::HypertensiveCrisis => "Hypertensive Crisis",
        };
        f.write_str(label)
    }
}

/// Categorize blood pressure based on measurements
pub fn categorize_blood_pressure(systolic: u16, diastolic: u16) -> BloodPressureCategory {
    if systolic >= 180 || diastolic >= 120 {
        BloodPressureCategory::HypertensiveCrisis
    } else if systolic >= 140 || diastolic >= 90 {
        BloodPressureCategory::Hypertension2
    } else if systolic >= 130 || diastolic >= 80 {
        BloodPressureCategory::Hypertension1
    } else if systolic >= 120 && diastolic < 80 {
        BloodPressureCategory::Elevated
    } else {
        BloodPressureCategory::Normal
    }
}

/// Aggregate statistics over a set of readings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordSummary {
    /// Average systolic reading
    pub avg_systolic: f64,

    /// Average diastolic reading
    pub avg_diastolic: f64,

    /// Average heart rate over the readings that carry one
    pub avg_heart_rate: Option<f64>,

    /// Highest recorded systolic reading
    pub max_systolic: u16,

    /// Highest recorded diastolic reading
    pub max_diastolic: u16,

    /// Lowest recorded systolic reading
    pub min_systolic: u16,

    /// Lowest recorded diastolic reading
    pub min_diastolic: u16,

    /// Category based on the average readings
    pub category: BloodPressureCategory,

    /// Number of readings exceeding the configured thresholds
    pub over_threshold_count: usize,

    /// Number of readings analyzed
    pub reading_count: usize,

    /// Timestamp of the analysis
    pub generated_at: DateTime<Utc>,
}

/// Summarize a record collection against the configured thresholds.
/// Returns `None` when there is nothing to analyze.
pub fn summarize(records: &[Record], thresholds: &Thresholds) -> Option<RecordSummary> {
    if records.is_empty() {
        return None;
    }

    let mut systolic_sum: f64 = 0.0;
    let mut diastolic_sum: f64 = 0.0;
    let mut heart_rate_sum: f64 = 0.0;
    let mut heart_rate_count: usize = 0;
    let mut over_threshold_count: usize = 0;

    let mut max_systolic: u16 = 0;
    let mut max_diastolic: u16 = 0;
    let mut min_systolic: u16 = u16::MAX;
    let mut min_diastolic: u16 = u16::MAX;

    for record in records {
        systolic_sum += record.systolic as f64;
        diastolic_sum += record.diastolic as f64;

        if let Some(heart_rate) = record.heart_rate {
            heart_rate_sum += heart_rate as f64;
            heart_rate_count += 1;
        }

        if exceeds_thresholds(record, thresholds) {
            over_threshold_count += 1;
        }

        max_systolic = max_systolic.max(record.systolic);
        max_diastolic = max_diastolic.max(record.diastolic);
        min_systolic = min_systolic.min(record.systolic);
        min_diastolic = min_diastolic.min(record.diastolic);
    }

    let avg_systolic = systolic_sum / records.len() as f64;
    let avg_diastolic = diastolic_sum / records.len() as f64;
    let avg_heart_rate = if heart_rate_count > 0 {
        Some(heart_rate_sum / heart_rate_count as f64)
    } else {
        None
    };

    let category = categorize_blood_pressure(avg_systolic as u16, avg_diastolic as u16);

    Some(RecordSummary {
        avg_systolic,
        avg_diastolic,
        avg_heart_rate,
        max_systolic,
        max_diastolic,
        min_systolic,
        min_diastolic,
        category,
        over_threshold_count,
        reading_count: records.len(),
        generated_at: Utc::now(),
    })
}
