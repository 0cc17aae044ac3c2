use serde::{Deserialize, Serialize};
use validator::Validate;

use super::ValidationError;

/// Alert thresholds used to flag a reading as abnormal. A singleton
/// configuration value, replaced wholesale on update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Thresholds {
    /// Systolic cutoff in mmHg
    #[validate(range(min = 1, max = 300, message = "Systolic threshold must be between 1 and 300"))]
    pub systolic: u16,

    /// Diastolic cutoff in mmHg
    #[validate(range(min = 1, max = 200, message = "Diastolic threshold must be between 1 and 200"))]
    pub diastolic: u16,

    /// Heart rate cutoff in beats per minute
    #[validate(range(min = 1, max = 250, message = "Heart rate threshold must be between 1 and 250"))]
    pub heart_rate: u16,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            systolic: 130,
            diastolic: 80,
            heart_rate: 100,
        }
    }
}

impl Thresholds {
    /// Validate a threshold update before it replaces the stored value.
    pub fn validate_update(&self) -> Result<(), ValidationError> {
        self.validate()
            .map_err(|errors| super::collect_validation_errors(&errors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_thresholds() {
        let thresholds = Thresholds::default();
        assert_eq!(thresholds.systolic, 130);
        assert_eq!(thresholds.diastolic, 80);
        assert_eq!(thresholds.heart_rate, 100);
    }

    #[test]
    fn test_validate_update_valid() {
        let thresholds = Thresholds {
            systolic: 140,
            diastolic: 90,
            heart_rate: 110,
        };
        assert!(thresholds.validate_update().is_ok());
    }

    #[test]
    fn test_validate_update_rejects_out_of_range() {
        let thresholds = Thresholds {
            systolic: 400, // Too high
            diastolic: 90,
            heart_rate: 110,
        };

        let result = thresholds.validate_update();
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Systolic"));
    }

    #[test]
    fn test_thresholds_serialize_as_flat_camel_case_object() {
        let json = serde_json::to_string(&Thresholds::default()).unwrap();
        assert_eq!(
            json,
            r#"{"systolic":130,"diastolic":80,"heartRate":100}"#
        );
    }
}
