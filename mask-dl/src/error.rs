//! Typed failures of the augmentation operators.

use thiserror::Error;

/// Errors raised by the geometric operators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AugError {
    /// An operator was asked to sample its own parameters while a required
    /// bound was left unset.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A sampled or supplied geometry cannot fit the target canvas.
    #[error("validation error: {0}")]
    Validation(String),
}

impl AugError {
    pub fn configuration(reason: impl ToString) -> Self {
        Self::Configuration(reason.to_string())
    }

    pub fn validation(reason: impl ToString) -> Self {
        Self::Validation(reason.to_string())
    }
}
