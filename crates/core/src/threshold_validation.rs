//! Shared threshold validation helpers.
//!
//! Provides reusable range-checking functions used by multiple domain modules.

use crate::error::CoreError;

/// Validate that a relative score falls within `[0.0, 100.0]`.
///
/// Returns a `CoreError::Validation` naming the field if out of range.
pub fn validate_score_range(value: f64, name: &str) -> Result<(), CoreError> {
    if !(0.0..=100.0).contains(&value) {
        return Err(CoreError::Validation(format!(
            "{name} must be between 0 and 100, got {value}"
        )));
    }
    Ok(())
}

/// Validate that a value is strictly positive (and not NaN).
pub fn validate_positive(value: f64, name: &str) -> Result<(), CoreError> {
    if value.is_nan() || value <= 0.0 {
        return Err(CoreError::Validation(format!(
            "{name} must be > 0, got {value}"
        )));
    }
    Ok(())
}
