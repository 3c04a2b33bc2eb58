use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum RiskError {
    /// Arrays that must share an axis disagree on its length.
    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A single element violates its domain (negative loss, negative rate, NaN coordinate).
    #[error("invalid {what} at index {index}: {value}")]
    InvalidInput {
        what: &'static str,
        index: usize,
        value: f64,
    },

    /// Percent conversion needs a strictly positive portfolio value.
    #[error("portfolio value must be positive and finite, got {value}")]
    NonPositiveValue { value: f64 },

    #[error("projection failed: {0}")]
    Projection(String),
}

pub type Result<T> = std::result::Result<T, RiskError>;
