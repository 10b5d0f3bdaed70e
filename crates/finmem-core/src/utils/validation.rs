//! Validation Utilities

use thiserror::Error;

use crate::types::{NumericAttributes, RawEvent};

/// Validation error types
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Field required: {0}")]
    Required(String),

    #[error("Value out of range: {0}")]
    OutOfRange(String),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },
}

/// Validate an event before it is embedded.
///
/// Content must be non-blank and every numeric attribute finite. Volumes
/// cannot be negative and sentiment must be a polarity in [-1, 1].
pub fn validate_event(event: &RawEvent) -> Result<(), ValidationError> {
    if event.content.trim().is_empty() {
        return Err(ValidationError::Required("content cannot be empty".into()));
    }

    validate_attributes(&event.attributes)
}

fn validate_attributes(attrs: &NumericAttributes) -> Result<(), ValidationError> {
    let fields = [
        ("dailyReturn", attrs.daily_return),
        ("volume", attrs.volume),
        ("volumeMa", attrs.volume_ma),
        ("rsi", attrs.rsi),
        ("maShort", attrs.ma_short),
        ("maLong", attrs.ma_long),
        ("sentiment", attrs.sentiment),
    ];

    for (name, value) in fields {
        if let Some(v) = value {
            if !v.is_finite() {
                return Err(ValidationError::OutOfRange(format!("{} must be finite", name)));
            }
        }
    }

    if attrs.volume.is_some_and(|v| v < 0.0) || attrs.volume_ma.is_some_and(|v| v < 0.0) {
        return Err(ValidationError::OutOfRange("volume cannot be negative".into()));
    }

    if attrs.sentiment.is_some_and(|s| !(-1.0..=1.0).contains(&s)) {
        return Err(ValidationError::OutOfRange(
            "sentiment must be between -1 and 1".into(),
        ));
    }

    Ok(())
}

/// Validate an embedding against the process-wide dimension.
pub fn validate_embedding(embedding: &[f32], expected: usize) -> Result<(), ValidationError> {
    if embedding.len() != expected {
        return Err(ValidationError::Dimension {
            expected,
            actual: embedding.len(),
        });
    }

    if embedding.iter().any(|v| !v.is_finite()) {
        return Err(ValidationError::OutOfRange(
            "embedding components must be finite".into(),
        ));
    }

    Ok(())
}
