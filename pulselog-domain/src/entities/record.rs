use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::ValidationError;

/// Domain model for a single blood pressure reading
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    /// Unique identifier, derived from creation time
    pub id: String,

    /// Systolic blood pressure (the higher number)
    pub systolic: u16,

    /// Diastolic blood pressure (the lower number)
    pub diastolic: u16,

    /// Optional heart rate in beats per minute
    pub heart_rate: Option<u16>,

    /// When the reading was taken, RFC 3339
    pub timestamp: String,
}

impl Record {
    /// Build a new record from a validated request, generating the id and
    /// defaulting the timestamp to the current time.
    pub fn from_request(request: CreateRecordRequest) -> Self {
        let timestamp = request
            .timestamp
            .unwrap_or_else(|| Utc::now().to_rfc3339());
        Self {
            id: Uuid::now_v7().to_string(),
            systolic: request.systolic,
            diastolic: request.diastolic,
            heart_rate: request.heart_rate,
            timestamp,
        }
    }

    /// Parse the RFC 3339 timestamp, if well-formed.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }
}

/// Request payload for creating a new reading
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRecordRequest {
    /// Systolic blood pressure (the higher number)
    #[validate(range(min = 50, max = 250, message = "Systolic must be between 50 and 250"))]
    pub systolic: u16,

    /// Diastolic blood pressure (the lower number)
    #[validate(range(min = 30, max = 200, message = "Diastolic must be between 30 and 200"))]
    pub diastolic: u16,

    /// Optional heart rate in beats per minute
    #[validate(range(min = 30, max = 250, message = "Heart rate must be between 30 and 250"))]
    pub heart_rate: Option<u16>,

    /// When the reading was taken. Defaults to the current time if not provided.
    pub timestamp: Option<String>,
}

/// Validate a create record request
pub fn validate_create_request(request: &CreateRecordRequest) -> Result<(), ValidationError> {
    if let Err(validation_errors) = request.validate() {
        return Err(super::collect_validation_errors(&validation_errors));
    }

    // Additional validation: systolic must be greater than diastolic
    if request.systolic <= request.diastolic {
        return Err(ValidationError(
            "Systolic pressure must be greater than diastolic pressure".to_string(),
        ));
    }

    if let Some(timestamp) = &request.timestamp {
        if DateTime::parse_from_rfc3339(timestamp).is_err() {
            return Err(ValidationError(format!(
                "Invalid timestamp format: {}",
                timestamp
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn base_request() -> CreateRecordRequest {
        CreateRecordRequest {
            systolic: 120,
            diastolic: 80,
            heart_rate: Some(72),
            timestamp: Some(Utc::now().to_rfc3339()),
        }
    }

    #[test]
    fn test_validate_create_request_valid() {
        assert!(validate_create_request(&base_request()).is_ok());
    }

    #[test]
    fn test_validate_create_request_invalid_systolic() {
        let request = CreateRecordRequest {
            systolic: 300, // Too high
            ..base_request()
        };

        let result = validate_create_request(&request);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Systolic"));
    }

    #[test]
    fn test_validate_create_request_invalid_heart_rate() {
        let request = CreateRecordRequest {
            heart_rate: Some(10), // Too low
            ..base_request()
        };

        let result = validate_create_request(&request);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Heart rate"));
    }

    #[test]
    fn test_validate_create_request_missing_heart_rate_is_valid() {
        let request = CreateRecordRequest {
            heart_rate: None,
            ..base_request()
        };

        assert!(validate_create_request(&request).is_ok());
    }

    #[test]
    fn test_validate_create_request_systolic_not_greater_than_diastolic() {
        let request = CreateRecordRequest {
            systolic: 80,
            diastolic: 80, // Same as systolic
            ..base_request()
        };

        let result = validate_create_request(&request);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("greater than"));
    }

    #[test]
    fn test_validate_create_request_invalid_timestamp() {
        let request = CreateRecordRequest {
            timestamp: Some("2023-05-01 12:30:00".to_string()),
            ..base_request()
        };

        let result = validate_create_request(&request);
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Invalid timestamp format"));
    }

    #[test]
    fn test_from_request_generates_unique_ids() {
        let a = Record::from_request(base_request());
        let b = Record::from_request(base_request());
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_from_request_defaults_timestamp() {
        let request = CreateRecordRequest {
            timestamp: None,
            ..base_request()
        };

        let record = Record::from_request(request);
        assert!(record.parsed_timestamp().is_some());
    }

    #[test]
    fn test_record_serializes_with_camel_case_heart_rate() {
        let record = Record {
            id: "1".to_string(),
            systolic: 120,
            diastolic: 80,
            heart_rate: Some(72),
            timestamp: "2024-01-01T08:00:00Z".to_string(),
        };

        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"heartRate\":72"));
        assert!(!json.contains("heart_rate"));
    }

    #[test]
    fn test_record_round_trips_null_heart_rate() {
        let json = r#"{"id":"1","systolic":131,"diastolic":70,"heartRate":null,"timestamp":"2024-01-01T08:00:00Z"}"#;

        let record: Record = serde_json::from_str(json).unwrap();
        assert_eq!(record.heart_rate, None);

        let back = serde_json::to_string(&record).unwrap();
        let again: Record = serde_json::from_str(&back).unwrap();
        assert_eq!(record, again);
    }
}
