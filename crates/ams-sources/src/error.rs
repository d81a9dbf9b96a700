//! Error types for waveform definitions.

use ams_core::AmsError;
use thiserror::Error;

/// Errors raised while validating waveform definitions.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SourceError {
    #[error("Invalid waveform parameter: {what}")]
    InvalidArg { what: &'static str },

    #[error("Non-finite waveform parameter: {what}")]
    NonFinite { what: &'static str },
}

pub type SourceResult<T> = Result<T, SourceError>;

impl From<SourceError> for AmsError {
    fn from(e: SourceError) -> Self {
        match e {
            SourceError::InvalidArg { what } => AmsError::InvalidArg { what },
            SourceError::NonFinite { what } => AmsError::InvalidArg { what },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = SourceError::InvalidArg {
            what: "pulse width",
        };
        assert!(err.to_string().contains("pulse width"));
    }
}
