// Domain entities and value objects
pub mod filter;
pub mod record;
pub mod thresholds;

use validator::ValidationErrors;

// Re-export common types for easier imports
pub use filter::FilterState;
pub use record::{validate_create_request, CreateRecordRequest, Record};
pub use thresholds::Thresholds;

/// A request failed field-level validation.
#[derive(Debug, thiserror::Error)]
#[error("Validation error: {0}")]
pub struct ValidationError(pub String);

/// Flatten `validator` errors into one readable message, field by field.
pub(crate) fn collect_validation_errors(errors: &ValidationErrors) -> ValidationError {
    let message = errors
        .field_errors()
        .iter()
        .map(|(field, errors)| {
            let error_msgs: Vec<String> = errors
                .iter()
                .map(|err| match &err.message {
                    Some(msg) => msg.to_string(),
                    None => format!("Invalid {}", field),
                })
                .collect();
            format!("{}: {}", field, error_msgs.join(", "))
        })
        .collect::<Vec<String>>()
        .join("; ");
    ValidationError(message)
}
