//! Linear capacitor.

use ams_core::{Capacitance, Real};
use ams_net::Domain;

use crate::error::{ModelError, ModelResult};
use crate::traits::{DeviceModel, EvalContext};

/// Linear capacitive branch: `i = C * dv/dt`.
///
/// Terminals p, n; one electrical branch p->n. In the operating point the
/// derivative is zero, so the branch carries no current.
#[derive(Debug, Clone)]
pub struct Capacitor {
    name: String,
    capacitance: f64,
}

impl Capacitor {
    pub fn new(name: impl Into<String>, capacitance: Capacitance) -> ModelResult<Self> {
        let c = {
            use uom::si::capacitance::farad;
            capacitance.get::<farad>()
        };
        if !c.is_finite() || c <= 0.0 {
            return Err(ModelError::ParameterConstraint {
                model: "capacitor",
                what: "capacitance must be positive and finite",
            });
        }
        Ok(Self {
            name: name.into(),
            capacitance: c,
        })
    }
}

impl DeviceModel for Capacitor {
    fn name(&self) -> &str {
        &self.name
    }

    fn branch_domains(&self) -> Vec<Domain> {
        vec![Domain::Electrical]
    }

    fn evaluate(&self, ctx: &EvalContext<'_>, residuals: &mut [Real]) -> ModelResult<()> {
        let b = ctx.branch(0)?;
        residuals[0] = b.through - self.capacitance * b.across_dot;
        Ok(())
    }

    fn observables(&self, ctx: &EvalContext<'_>) -> Vec<(&'static str, Real)> {
        match ctx.branch(0) {
            Ok(b) => vec![(
                "energy_stored",
                0.5 * self.capacitance * b.across * b.across,
            )],
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::BranchView;
    use ams_core::farad;

    fn ctx(branches: &[BranchView]) -> EvalContext<'_> {
        EvalContext {
            t: 0.0,
            quiescent: false,
            branches,
            frees: &[],
            free_dots: &[],
            mode: &[],
            drives: &[],
        }
    }

    #[test]
    fn current_tracks_voltage_slope() {
        let c = Capacitor::new("C1", farad(1e-6)).unwrap();
        let b = [BranchView {
            across: 2.0,
            through: 1e-6 * 50.0,
            across_dot: 50.0,
            through_dot: 0.0,
        }];
        let mut res = [f64::NAN];
        c.evaluate(&ctx(&b), &mut res).unwrap();
        assert!(res[0].abs() < 1e-15);
    }

    #[test]
    fn stored_energy_observable() {
        let c = Capacitor::new("C1", farad(2e-6)).unwrap();
        let b = [BranchView {
            across: 3.0,
            through: 0.0,
            across_dot: 0.0,
            through_dot: 0.0,
        }];
        let obs = c.observables(&ctx(&b));
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].0, "energy_stored");
        assert!((obs[0].1 - 0.5 * 2e-6 * 9.0).abs() < 1e-18);
    }

    #[test]
    fn rejects_non_positive_capacitance() {
        assert!(Capacitor::new("C1", farad(0.0)).is_err());
    }
}
