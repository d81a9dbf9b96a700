//! Op-amp with saturation rails and a single output pole.

use ams_core::{Real, Resistance, Time, Voltage};
use ams_net::Domain;

use crate::error::{ModelError, ModelResult};
use crate::traits::{DeviceModel, EvalContext};

/// Finite-gain op-amp.
///
/// Terminals in_p, in_n, out, each wired against the electrical reference.
/// Branches in order: in_p, in_n, out. Inputs draw no current. The output
/// follows `gain * (v_p - v_n)` clamped to `[v_min, v_max]` through a
/// first-order pole `tau` and an output resistance; the output branch
/// through is positive from out into the reference rail, so a sourcing
/// amp sees a negative through and the rail droops accordingly.
#[derive(Debug, Clone)]
pub struct OpAmp {
    name: String,
    gain: f64,
    v_min: f64,
    v_max: f64,
    tau: f64,
    r_out: f64,
}

impl OpAmp {
    pub fn new(
        name: impl Into<String>,
        gain: f64,
        v_min: Voltage,
        v_max: Voltage,
        tau: Time,
        r_out: Resistance,
    ) -> ModelResult<Self> {
        let (lo, hi, tau_s, r) = {
            use uom::si::electric_potential::volt;
            use uom::si::electrical_resistance::ohm;
            use uom::si::time::second;
            (
                v_min.get::<volt>(),
                v_max.get::<volt>(),
                tau.get::<second>(),
                r_out.get::<ohm>(),
            )
        };
        fn constraint(what: &'static str) -> ModelError {
            ModelError::ParameterConstraint {
                model: "op-amp",
                what,
            }
        }
        if !gain.is_finite() || gain <= 0.0 {
            return Err(constraint("gain must be positive"));
        }
        if !lo.is_finite() || !hi.is_finite() || lo >= hi {
            return Err(constraint("v_min must be below v_max"));
        }
        if !tau_s.is_finite() || tau_s < 0.0 {
            return Err(constraint("pole time constant must be non-negative"));
        }
        if !r.is_finite() || r < 0.0 {
            return Err(constraint("output resistance must be non-negative"));
        }
        Ok(Self {
            name: name.into(),
            gain,
            v_min: lo,
            v_max: hi,
            tau: tau_s,
            r_out: r,
        })
    }

    fn target(&self, bits: [bool; 2], vd: f64) -> f64 {
        if bits[0] {
            self.v_max
        } else if bits[1] {
            self.v_min
        } else {
            self.gain * vd
        }
    }
}

impl DeviceModel for OpAmp {
    fn name(&self) -> &str {
        &self.name
    }

    fn branch_domains(&self) -> Vec<Domain> {
        vec![Domain::Electrical, Domain::Electrical, Domain::Electrical]
    }

    fn evaluate(&self, ctx: &EvalContext<'_>, residuals: &mut [Real]) -> ModelResult<()> {
        let inp = ctx.branch(0)?;
        let inn = ctx.branch(1)?;
        let out = ctx.branch(2)?;
        let bits = [ctx.mode_bit(0)?, ctx.mode_bit(1)?];
        let vd = inp.across - inn.across;

        residuals[0] = inp.through;
        residuals[1] = inn.through;
        residuals[2] =
            self.tau * out.across_dot + out.across - self.r_out * out.through
                - self.target(bits, vd);
        Ok(())
    }

    fn guard_count(&self) -> usize {
        2
    }

    fn guards(&self, ctx: &EvalContext<'_>) -> ModelResult<Vec<bool>> {
        let inp = ctx.branch(0)?;
        let inn = ctx.branch(1)?;
        let drive = self.gain * (inp.across - inn.across);
        Ok(vec![drive > self.v_max, drive < self.v_min])
    }

    fn observables(&self, ctx: &EvalContext<'_>) -> Vec<(&'static str, Real)> {
        match (ctx.branch(0), ctx.branch(1)) {
            (Ok(inp), Ok(inn)) => vec![("differential_input", inp.across - inn.across)],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::BranchView;
    use ams_core::{ohm, s, volt};

    fn amp() -> OpAmp {
        OpAmp::new("U1", 1e5, volt(-12.0), volt(12.0), s(0.0), ohm(0.0)).unwrap()
    }

    fn views(vp: f64, vn: f64, vout: f64, vout_dot: f64, iout: f64) -> [BranchView; 3] {
        let zero = BranchView {
            across: 0.0,
            through: 0.0,
            across_dot: 0.0,
            through_dot: 0.0,
        };
        [
            BranchView { across: vp, ..zero },
            BranchView { across: vn, ..zero },
            BranchView {
                across: vout,
                through: iout,
                across_dot: vout_dot,
                through_dot: 0.0,
            },
        ]
    }

    fn ctx<'a>(branches: &'a [BranchView], mode: &'a [bool]) -> EvalContext<'a> {
        EvalContext {
            t: 0.0,
            quiescent: false,
            branches,
            frees: &[],
            free_dots: &[],
            mode,
            drives: &[],
        }
    }

    #[test]
    fn linear_region_tracks_the_gain() {
        let a = amp();
        let vd = 50e-6;
        let b = views(vd, 0.0, 1e5 * vd, 0.0, 0.0);
        let mut res = [f64::NAN; 3];
        a.evaluate(&ctx(&b, &[false, false]), &mut res).unwrap();
        assert!(res.iter().all(|r| r.abs() < 1e-12));
    }

    #[test]
    fn saturated_mode_pins_the_rail() {
        let a = amp();
        // Huge drive, committed mode says positive saturation
        let b = views(1.0, 0.0, 12.0, 0.0, 0.0);
        let mut res = [f64::NAN; 3];
        a.evaluate(&ctx(&b, &[true, false]), &mut res).unwrap();
        assert!(res[2].abs() < 1e-12);
    }

    #[test]
    fn input_branches_must_carry_no_current() {
        let a = amp();
        let mut b = views(0.0, 0.0, 0.0, 0.0, 0.0);
        b[0].through = 1e-6;
        let mut res = [f64::NAN; 3];
        a.evaluate(&ctx(&b, &[false, false]), &mut res).unwrap();
        assert_eq!(res[0], 1e-6);
        assert_eq!(res[1], 0.0);
    }

    #[test]
    fn output_resistance_droops_when_sourcing() {
        let a = OpAmp::new("U1", 10.0, volt(-12.0), volt(12.0), s(0.0), ohm(100.0)).unwrap();
        // Drive 1 V, load draws 10 mA: through is -10 mA from out into the
        // rail, so the consistent output sits 1 V below the target
        let b = views(0.1, 0.0, 0.0, 0.0, -10e-3);
        let mut res = [f64::NAN; 3];
        a.evaluate(&ctx(&b, &[false, false]), &mut res).unwrap();
        assert!(res[2].abs() < 1e-12);
    }

    #[test]
    fn pole_balances_slew_against_error() {
        let a = OpAmp::new("U1", 10.0, volt(-12.0), volt(12.0), s(1e-3), ohm(0.0)).unwrap();
        // Target 1 V, output at 0: consistent slew is (target - v) / tau
        let b = views(0.1, 0.0, 0.0, 1000.0, 0.0);
        let mut res = [f64::NAN; 3];
        a.evaluate(&ctx(&b, &[false, false]), &mut res).unwrap();
        assert!(res[2].abs() < 1e-12);
    }

    #[test]
    fn guards_flip_where_the_drive_crosses_the_rails() {
        let a = amp();
        let probe = |vd: f64| {
            let b = views(vd, 0.0, 0.0, 0.0, 0.0);
            a.guards(&ctx(&b, &[false, false])).unwrap()
        };
        assert_eq!(probe(0.0), vec![false, false]);
        assert_eq!(probe(1.0), vec![true, false]); // 1e5 * 1 >> 12
        assert_eq!(probe(-1.0), vec![false, true]);
        assert_eq!(probe(12.0 / 1e5), vec![false, false]); // exactly at the rail
    }

    #[test]
    fn rejects_inverted_rails_and_bad_gain() {
        assert!(OpAmp::new("U1", 0.0, volt(-12.0), volt(12.0), s(0.0), ohm(0.0)).is_err());
        assert!(OpAmp::new("U1", 1e5, volt(12.0), volt(-12.0), s(0.0), ohm(0.0)).is_err());
        assert!(OpAmp::new("U1", 1e5, volt(-12.0), volt(12.0), s(-1.0), ohm(0.0)).is_err());
    }
}
