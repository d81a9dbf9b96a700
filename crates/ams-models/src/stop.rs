//! Mechanical stop with a contact gap.

use ams_core::{Length, Real};
use ams_net::Domain;

use crate::error::{ModelError, ModelResult};
use crate::traits::{DeviceModel, EvalContext};

/// Hard stop limiting relative travel to `[d_min, d_max]`.
///
/// Terminals attach1, attach2; one mechanical branch whose across is the
/// relative displacement and whose through is the transmitted force. Inside
/// the gap the stop transmits nothing; past either limit it acts as a stiff
/// spring with optional contact damping.
#[derive(Debug, Clone)]
pub struct Stop {
    name: String,
    d_min: f64,
    d_max: f64,
    k_stop: f64,
    damping: f64,
}

impl Stop {
    /// `k_stop` is the contact stiffness in N/m, `damping` the contact
    /// damping in N*s/m.
    pub fn new(
        name: impl Into<String>,
        d_min: Length,
        d_max: Length,
        k_stop: f64,
        damping: f64,
    ) -> ModelResult<Self> {
        let (lo, hi) = {
            use uom::si::length::meter;
            (d_min.get::<meter>(), d_max.get::<meter>())
        };
        fn constraint(what: &'static str) -> ModelError {
            ModelError::ParameterConstraint {
                model: "stop",
                what,
            }
        }
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(constraint("displacement_min must be below displacement_max"));
        }
        if !k_stop.is_finite() || k_stop <= 0.0 {
            return Err(constraint("contact stiffness must be positive"));
        }
        if !damping.is_finite() || damping < 0.0 {
            return Err(constraint("contact damping must be non-negative"));
        }
        Ok(Self {
            name: name.into(),
            d_min: lo,
            d_max: hi,
            k_stop,
            damping,
        })
    }

    fn contact_force(&self, bits: [bool; 2], d: f64, d_dot: f64) -> f64 {
        if bits[0] {
            self.k_stop * (d - self.d_max) + self.damping * d_dot
        } else if bits[1] {
            self.k_stop * (d - self.d_min) + self.damping * d_dot
        } else {
            0.0
        }
    }
}

impl DeviceModel for Stop {
    fn name(&self) -> &str {
        &self.name
    }

    fn branch_domains(&self) -> Vec<Domain> {
        vec![Domain::Mechanical]
    }

    fn evaluate(&self, ctx: &EvalContext<'_>, residuals: &mut [Real]) -> ModelResult<()> {
        let b = ctx.branch(0)?;
        let bits = [ctx.mode_bit(0)?, ctx.mode_bit(1)?];
        residuals[0] = b.through - self.contact_force(bits, b.across, b.across_dot);
        Ok(())
    }

    fn guard_count(&self) -> usize {
        2
    }

    fn guards(&self, ctx: &EvalContext<'_>) -> ModelResult<Vec<bool>> {
        let b = ctx.branch(0)?;
        Ok(vec![b.across > self.d_max, b.across < self.d_min])
    }

    fn observables(&self, ctx: &EvalContext<'_>) -> Vec<(&'static str, Real)> {
        match ctx.branch(0) {
            Ok(b) => vec![("contact_force", b.through)],
            Err(_) => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::BranchView;
    use ams_core::m;

    fn stop() -> Stop {
        Stop::new("S1", m(0.0), m(1.0), 1e6, 0.0).unwrap()
    }

    fn eval(model: &Stop, d: f64, d_dot: f64, mode: [bool; 2]) -> f64 {
        let b = [BranchView {
            across: d,
            through: 0.0,
            across_dot: d_dot,
            through_dot: 0.0,
        }];
        let ctx = EvalContext {
            t: 0.0,
            quiescent: false,
            branches: &b,
            frees: &[],
            free_dots: &[],
            mode: &mode,
            drives: &[],
        };
        let mut res = [f64::NAN];
        model.evaluate(&ctx, &mut res).unwrap();
        // with through = 0 the residual is the negated contact force
        -res[0]
    }

    #[test]
    fn no_force_inside_the_gap() {
        let s = stop();
        for d in [0.0, 0.25, 0.5, 0.99, 1.0] {
            assert_eq!(eval(&s, d, 0.0, [false, false]), 0.0, "free travel at {d}");
        }
    }

    #[test]
    fn hooke_law_past_the_upper_limit() {
        let s = stop();
        for d in [1.0001, 1.01, 1.5] {
            let f = eval(&s, d, 0.0, [true, false]);
            assert!((f - 1e6 * (d - 1.0)).abs() < 1e-6 * f.abs().max(1.0));
        }
    }

    #[test]
    fn hooke_law_past_the_lower_limit() {
        let s = stop();
        let f = eval(&s, -0.01, 0.0, [false, true]);
        assert!((f - (-1e4)).abs() < 1e-6);
    }

    #[test]
    fn damping_acts_only_in_contact() {
        let s = Stop::new("S1", m(0.0), m(1.0), 1e6, 100.0).unwrap();
        assert_eq!(eval(&s, 0.5, 2.0, [false, false]), 0.0);
        let f = eval(&s, 1.1, 2.0, [true, false]);
        assert!((f - (1e6 * 0.1 + 200.0)).abs() < 1e-6);
    }

    #[test]
    fn guards_are_strict_at_the_limits() {
        let s = stop();
        let probe = |d: f64| {
            let b = [BranchView {
                across: d,
                through: 0.0,
                across_dot: 0.0,
                through_dot: 0.0,
            }];
            let ctx = EvalContext {
                t: 0.0,
                quiescent: false,
                branches: &b,
                frees: &[],
                free_dots: &[],
                mode: &[false, false],
                drives: &[],
            };
            s.guards(&ctx).unwrap()
        };
        assert_eq!(probe(0.5), vec![false, false]);
        assert_eq!(probe(1.0), vec![false, false]); // touch is not yet contact
        assert_eq!(probe(1.0 + 1e-12), vec![true, false]);
        assert_eq!(probe(0.0), vec![false, false]);
        assert_eq!(probe(-1e-12), vec![false, true]);
    }

    #[test]
    fn rejects_inverted_gap_and_bad_stiffness() {
        assert!(Stop::new("S1", m(1.0), m(0.0), 1e6, 0.0).is_err());
        assert!(Stop::new("S1", m(0.0), m(1.0), 0.0, 0.0).is_err());
        assert!(Stop::new("S1", m(0.0), m(1.0), 1e6, -1.0).is_err());
    }
}
