//! Solar panel with a blended piecewise I-V curve.

use ams_core::{lerp, Current, Power, Real, Resistance, Voltage};
use ams_net::Domain;

use crate::common::{
    hermite_coeffs, hermite_eval, hermite_is_monotone, EPSILON_IRRADIANCE,
};
use crate::error::{ModelError, ModelResult};
use crate::traits::{DeviceModel, EvalContext};

/// Datasheet calibration: the full-sun point and the 20% irradiance point.
#[derive(Debug, Clone)]
pub struct SolarPanelParams {
    pub voc: Voltage,
    pub isc: Current,
    pub pmax: Power,
    pub vmp: Voltage,
    pub voc_20: Voltage,
    pub isc_20: Current,
    pub pmax_20: Power,
    pub vmp_20: Voltage,
    pub rleak: Resistance,
}

/// Active curve segment, one per guard region.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Segment {
    /// Photocurrent plateau with the leak droop, from short circuit.
    Plateau,
    /// Hermite blend from the plateau into the maximum power point.
    KneeLower,
    /// Hermite blend from the maximum power point down to open circuit.
    KneeUpper,
    /// Linear extension past open circuit.
    PastVoc,
}

/// Normalized I-V curve for one irradiance level.
///
/// Coordinates are `x = v / voc`, `y = i / isc`. The two blends meet at the
/// maximum power point with the power-stationary slope `-y/x`, so evaluating
/// the curve at `vmp` returns `imp` exactly and the derivative is continuous
/// at every boundary.
#[derive(Debug, Clone)]
struct Curve {
    voc: f64,
    isc: f64,
    xf: f64,
    xm: f64,
    yf: f64,
    ym: f64,
    g_leak: f64,
    s_m: f64,
    a1: f64,
    b1: f64,
    a2: f64,
    b2: f64,
    s_oc: f64,
}

impl Curve {
    fn build(voc: f64, isc: f64, vmp: f64, imp: f64, rleak: f64) -> Result<Self, &'static str> {
        if !(voc > 0.0 && isc > 0.0 && vmp > 0.0 && imp > 0.0) {
            return Err("effective curve parameters must be positive");
        }
        let xm = vmp / voc;
        let ym = imp / isc;
        if xm >= 1.0 || ym >= 1.0 {
            return Err("maximum power point must lie inside the curve");
        }
        let g_leak = voc / (rleak * isc);
        // The droop line must still clear the mpp current where the blend
        // starts, or no decreasing blend exists
        if 1.0 - g_leak * xm <= ym {
            return Err("leak droop swallows the maximum power point");
        }

        // Power is stationary at the mpp, so dy/dx = -y/x there
        let s_m = -ym / xm;

        // Blend width: capped by the open-circuit span, by the plateau, and
        // by the Fritsch-Carlson bound that keeps the lower blend monotone
        let denom = (ym / (3.0 * xm) - g_leak).max(1e-12);
        let w_fc = (1.0 - ym - g_leak * xm) / denom;
        let w = (0.9 * w_fc).min(1.0 - xm).min(0.75 * xm);
        let xf = xm - w;
        let yf = 1.0 - g_leak * xf;

        let (a1, b1) = hermite_coeffs(xm - xf, yf, -g_leak, ym, s_m);

        // End slope chosen so the cubic term of the upper blend vanishes;
        // the span is then monotone whenever the mpp sits above x = 1/3
        let delta_oc = -ym / (1.0 - xm);
        let s_oc = 2.0 * delta_oc - s_m;
        let (a2, b2) = hermite_coeffs(1.0 - xm, ym, s_m, 0.0, s_oc);

        if !hermite_is_monotone(xm - xf, yf, -g_leak, ym, s_m)
            || !hermite_is_monotone(1.0 - xm, ym, s_m, 0.0, s_oc)
        {
            return Err("piecewise I-V curve is not monotone");
        }

        Ok(Self {
            voc,
            isc,
            xf,
            xm,
            yf,
            ym,
            g_leak,
            s_m,
            a1,
            b1,
            a2,
            b2,
            s_oc,
        })
    }

    fn segment_at(&self, x: f64) -> Segment {
        if x < self.xf {
            Segment::Plateau
        } else if x < self.xm {
            Segment::KneeLower
        } else if x < 1.0 {
            Segment::KneeUpper
        } else {
            Segment::PastVoc
        }
    }

    /// Segment from the committed guard tuple `[x < xf, x < xm, x < 1]`.
    fn segment_for(bits: [bool; 3]) -> Segment {
        if bits[0] {
            Segment::Plateau
        } else if bits[1] {
            Segment::KneeLower
        } else if bits[2] {
            Segment::KneeUpper
        } else {
            Segment::PastVoc
        }
    }

    fn y(&self, x: f64, segment: Segment) -> f64 {
        match segment {
            Segment::Plateau => 1.0 - self.g_leak * x,
            Segment::KneeLower => {
                hermite_eval(self.yf, -self.g_leak, self.a1, self.b1, x - self.xf)
            }
            Segment::KneeUpper => hermite_eval(self.ym, self.s_m, self.a2, self.b2, x - self.xm),
            Segment::PastVoc => self.s_oc * (x - 1.0),
        }
    }
}

/// Calibration values as raw SI floats.
struct CalPoints {
    voc: f64,
    isc: f64,
    vmp: f64,
    imp: f64,
    voc_20: f64,
    isc_20: f64,
    vmp_20: f64,
    imp_20: f64,
}

struct EffPoint {
    voc: f64,
    isc: f64,
    vmp: f64,
    imp: f64,
}

impl CalPoints {
    /// Effective curve parameters at irradiance `g`. Currents interpolate
    /// linearly between the calibration points and proportionally below the
    /// 20% point; voltages follow the logarithmic dependence through both.
    fn at(&self, g: f64) -> EffPoint {
        let (isc, imp) = if g >= 0.2 {
            let u = (g - 0.2) / 0.8;
            (lerp(self.isc_20, self.isc, u), lerp(self.imp_20, self.imp, u))
        } else {
            let u = g / 0.2;
            (self.isc_20 * u, self.imp_20 * u)
        };
        // ln(g)/ln(5) is 0 at full sun and -1 at the 20% point
        let lg = g.ln() / 5f64.ln();
        EffPoint {
            voc: self.voc + (self.voc - self.voc_20) * lg,
            isc,
            vmp: self.vmp + (self.vmp - self.vmp_20) * lg,
            imp,
        }
    }
}

/// Photovoltaic panel at a fixed relative irradiance.
///
/// Terminals p, n; one electrical branch p->n. The branch through is the
/// negated output current, so a generating panel pushes current out of p.
/// Below [`EPSILON_IRRADIANCE`] (or when leakage swallows the effective
/// curve) the panel is dark and only the leak path remains.
#[derive(Debug, Clone)]
pub struct SolarPanel {
    name: String,
    rleak: f64,
    irradiance: f64,
    curve: Option<Curve>,
}

impl SolarPanel {
    pub fn new(
        name: impl Into<String>,
        params: &SolarPanelParams,
        relative_irradiance: f64,
    ) -> ModelResult<Self> {
        let (voc, isc, pmax, vmp, voc_20, isc_20, pmax_20, vmp_20, rleak) = {
            use uom::si::electric_current::ampere;
            use uom::si::electric_potential::volt;
            use uom::si::electrical_resistance::ohm;
            use uom::si::power::watt;
            (
                params.voc.get::<volt>(),
                params.isc.get::<ampere>(),
                params.pmax.get::<watt>(),
                params.vmp.get::<volt>(),
                params.voc_20.get::<volt>(),
                params.isc_20.get::<ampere>(),
                params.pmax_20.get::<watt>(),
                params.vmp_20.get::<volt>(),
                params.rleak.get::<ohm>(),
            )
        };

        fn constraint(what: &'static str) -> ModelError {
            ModelError::ParameterConstraint {
                model: "solar panel",
                what,
            }
        }

        let g = relative_irradiance;
        if !g.is_finite() || !(0.0..=1.0).contains(&g) {
            return Err(constraint("relative irradiance must be within [0, 1]"));
        }
        for v in [voc, isc, pmax, vmp, voc_20, isc_20, pmax_20, vmp_20, rleak] {
            if !v.is_finite() || v <= 0.0 {
                return Err(constraint("datasheet values must be positive and finite"));
            }
        }
        if vmp >= voc || vmp_20 >= voc_20 {
            return Err(constraint("vmp must be below voc"));
        }
        let imp = pmax / vmp;
        let imp_20 = pmax_20 / vmp_20;
        if imp >= isc || imp_20 >= isc_20 {
            return Err(constraint("pmax / vmp must be below isc"));
        }
        if voc_20 >= voc || isc_20 >= isc {
            return Err(constraint("20% irradiance values must be below full-sun values"));
        }

        let cal = CalPoints {
            voc,
            isc,
            vmp,
            imp,
            voc_20,
            isc_20,
            vmp_20,
            imp_20,
        };

        // Both calibration points must yield a monotone curve before any
        // instance is accepted
        for g_check in [1.0, 0.2] {
            let eff = cal.at(g_check);
            Curve::build(eff.voc, eff.isc, eff.vmp, eff.imp, rleak).map_err(constraint)?;
        }

        let curve = if g <= EPSILON_IRRADIANCE {
            None
        } else {
            let eff = cal.at(g);
            // A degenerate instance curve (leak dominating at low light)
            // falls back to dark rather than failing construction
            Curve::build(eff.voc, eff.isc, eff.vmp, eff.imp, rleak).ok()
        };

        Ok(Self {
            name: name.into(),
            rleak,
            irradiance: g,
            curve,
        })
    }

    /// Output current at terminal voltage `v`, segment chosen by position.
    /// Positive current flows out of the p terminal.
    pub fn output_current(&self, v: Real) -> Real {
        match &self.curve {
            Some(curve) => {
                let x = v / curve.voc;
                curve.isc * curve.y(x, curve.segment_at(x))
            }
            None => -v / self.rleak,
        }
    }

    /// True when irradiance or leakage leaves no generating curve.
    pub fn is_dark(&self) -> bool {
        self.curve.is_none()
    }

    pub fn relative_irradiance(&self) -> f64 {
        self.irradiance
    }

    /// Effective open-circuit voltage at this irradiance.
    pub fn voc_effective(&self) -> Option<Real> {
        self.curve.as_ref().map(|c| c.voc)
    }

    /// Effective short-circuit current at this irradiance.
    pub fn isc_effective(&self) -> Option<Real> {
        self.curve.as_ref().map(|c| c.isc)
    }
}

impl DeviceModel for SolarPanel {
    fn name(&self) -> &str {
        &self.name
    }

    fn branch_domains(&self) -> Vec<Domain> {
        vec![Domain::Electrical]
    }

    fn evaluate(&self, ctx: &EvalContext<'_>, residuals: &mut [Real]) -> ModelResult<()> {
        let b = ctx.branch(0)?;
        let i_out = match &self.curve {
            Some(curve) => {
                let bits = [ctx.mode_bit(0)?, ctx.mode_bit(1)?, ctx.mode_bit(2)?];
                let x = b.across / curve.voc;
                curve.isc * curve.y(x, Curve::segment_for(bits))
            }
            None => -b.across / self.rleak,
        };
        residuals[0] = b.through + i_out;
        Ok(())
    }

    fn guard_count(&self) -> usize {
        3
    }

    fn guards(&self, ctx: &EvalContext<'_>) -> ModelResult<Vec<bool>> {
        let b = ctx.branch(0)?;
        match &self.curve {
            Some(curve) => {
                let x = b.across / curve.voc;
                Ok(vec![x < curve.xf, x < curve.xm, x < 1.0])
            }
            None => Ok(vec![true, true, true]),
        }
    }

    fn observables(&self, ctx: &EvalContext<'_>) -> Vec<(&'static str, Real)> {
        match ctx.branch(0) {
            Ok(b) => vec![("power_output", b.across * self.output_current(b.across))],
            Err(_) => Vec::new(),
        }
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use ams_core::{amp, ohm, volt, watt};
    use proptest::prelude::*;

    fn panel() -> SolarPanel {
        SolarPanel::new(
            "PV1",
            &SolarPanelParams {
                voc: volt(22.0),
                isc: amp(5.0),
                pmax: watt(80.0),
                vmp: volt(18.0),
                voc_20: volt(20.0),
                isc_20: amp(1.0),
                pmax_20: watt(15.0),
                vmp_20: volt(16.4),
                rleak: ohm(200.0),
            },
            1.0,
        )
        .unwrap()
    }

    proptest! {
        #[test]
        fn current_never_increases_with_voltage(v1 in 0.0..22.0f64, v2 in 0.0..22.0f64) {
            let p = panel();
            let (lo, hi) = if v1 <= v2 { (v1, v2) } else { (v2, v1) };
            prop_assert!(p.output_current(hi) <= p.output_current(lo) + 1e-9);
        }

        #[test]
        fn current_stays_within_physical_range(v in 0.0..22.0f64) {
            let p = panel();
            let i = p.output_current(v);
            prop_assert!(i >= -1e-9 && i <= 5.0 + 1e-9);
        }
    }
}
