//! Error types for model construction and evaluation.

use ams_core::AmsError;
use ams_sources::SourceError;
use thiserror::Error;

/// Errors raised by device models.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// A datasheet relation failed at construction. No partially-valid
    /// model value ever exists.
    #[error("Parameter constraint violated for {model}: {what}")]
    ParameterConstraint {
        model: &'static str,
        what: &'static str,
    },

    /// Evaluation hit a state the model has no physical answer for.
    #[error("Non-physical value: {what}")]
    NonPhysical { what: &'static str },

    /// The evaluation context does not match the model's declared shape.
    #[error("Evaluation context mismatch: {what}")]
    ContextMismatch { what: &'static str },

    #[error("Waveform error: {0}")]
    Source(#[from] SourceError),
}

pub type ModelResult<T> = Result<T, ModelError>;

impl From<ModelError> for AmsError {
    fn from(e: ModelError) -> Self {
        match e {
            ModelError::ParameterConstraint { what, .. } => AmsError::InvalidArg { what },
            ModelError::NonPhysical { what } => AmsError::InvalidArg { what },
            ModelError::ContextMismatch { what } => AmsError::Invariant { what },
            ModelError::Source(e) => e.into(),
        }
    }
}
