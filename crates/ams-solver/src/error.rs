//! Error types for solver operations.

use ams_core::AmsError;
use ams_models::ModelError;
use ams_net::NetError;
use thiserror::Error;

/// Errors raised while assembling or solving the system.
#[derive(Error, Debug)]
pub enum SolverError {
    /// The problem is incompletely or inconsistently specified.
    #[error("Problem setup error: {what}")]
    ProblemSetup { what: String },

    /// Newton failed to reach the tolerance.
    #[error("Convergence failure: {what}")]
    Nonconvergence { what: String },

    /// A linear algebra operation failed.
    #[error("Numeric error: {what}")]
    Numeric { what: String },

    /// A model rejected its evaluation context, with the owning instance.
    #[error("Model error at instance {instance}: {source}")]
    ModelEval {
        instance: String,
        source: ModelError,
    },

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Network error: {0}")]
    Net(#[from] NetError),
}

impl SolverError {
    /// Whether a transient step may recover by retrying at a smaller size.
    ///
    /// Nonconvergence and model rejections (a state excursion past a
    /// physical limit) shrink away with the step; setup and linear algebra
    /// failures do not.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            SolverError::Nonconvergence { .. }
                | SolverError::ModelEval { .. }
                | SolverError::Model(_)
        )
    }
}

pub type SolverResult<T> = Result<T, SolverError>;

impl From<SolverError> for AmsError {
    fn from(e: SolverError) -> Self {
        match e {
            SolverError::ProblemSetup { .. } => AmsError::InvalidArg {
                what: "problem setup",
            },
            SolverError::Nonconvergence { .. } => AmsError::InvalidArg {
                what: "convergence",
            },
            SolverError::Numeric { .. } => AmsError::InvalidArg { what: "numeric" },
            SolverError::ModelEval { source, .. } => source.into(),
            SolverError::Model(e) => e.into(),
            SolverError::Net(e) => e.into(),
        }
    }
}
