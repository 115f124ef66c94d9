use thiserror::Error;

/// Rejections raised when an impact scenario or a layer is constructed.
///
/// Nothing in the per-frame path returns these: once an `ImpactEvent` and the
/// layers exist, every evaluation is total.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImpactError {
    #[error("{name} must be finite and non-negative, got {value}")]
    NegativeQuantity { name: &'static str, value: f64 },

    #[error("{name} must be finite and strictly positive, got {value}")]
    NonPositiveQuantity { name: &'static str, value: f64 },

    #[error("impact position must be a finite, non-zero vector")]
    DegeneratePosition,

    #[error("pressure thresholds must be finite, positive and strictly descending: {0:?}")]
    UnorderedThresholds(Vec<f32>),

    #[error("layer window must satisfy 0 <= delay < end <= 1, got delay={delay}, end={end}")]
    InvalidWindow { delay: f32, end: f32 },

    #[error("severity color table needs {expected} entries for the given thresholds, got {actual}")]
    SeverityTableSize { expected: usize, actual: usize },
}

pub(crate) fn non_negative(name: &'static str, value: f64) -> Result<f64, ImpactError> {
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(ImpactError::NegativeQuantity { name, value })
    }
}

pub(crate) fn positive(name: &'static str, value: f64) -> Result<f64, ImpactError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ImpactError::NonPositiveQuantity { name, value })
    }
}
