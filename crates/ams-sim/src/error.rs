//! Error types for transient simulation.

use thiserror::Error;

/// Errors encountered while running a transient analysis.
#[derive(Error, Debug)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    /// Retries drove the step size below the floor. `instance` names the
    /// residual site that refused to converge.
    #[error("Step floor exceeded at t = {time:.6e} near {instance}")]
    StepFloorExceeded { time: f64, instance: String },

    #[error("Backend error: {message}")]
    Backend { message: String },
}

pub type SimResult<T> = Result<T, SimError>;

impl From<ams_solver::SolverError> for SimError {
    fn from(e: ams_solver::SolverError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}

impl From<ams_models::ModelError> for SimError {
    fn from(e: ams_models::ModelError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}

impl From<ams_net::NetError> for SimError {
    fn from(e: ams_net::NetError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}

impl From<ams_sources::SourceError> for SimError {
    fn from(e: ams_sources::SourceError) -> Self {
        SimError::Backend {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_floor_message_names_time_and_site() {
        let err = SimError::StepFloorExceeded {
            time: 2.5e-4,
            instance: "equations of instance TEC1".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("2.5"), "message was {msg}");
        assert!(msg.contains("TEC1"), "message was {msg}");
    }

    #[test]
    fn solver_errors_convert_to_backend() {
        let err: SimError = ams_solver::SolverError::Numeric {
            what: "singular Jacobian".to_string(),
        }
        .into();
        assert!(matches!(err, SimError::Backend { .. }));
        assert!(err.to_string().contains("singular Jacobian"));
    }
}
