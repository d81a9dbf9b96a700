//! Waveform-driven source.

use ams_core::Real;
use ams_net::Domain;
use ams_sources::{NoiseGenerator, Waveform};
use tracing::warn;

use crate::error::ModelResult;
use crate::traits::{DeviceModel, EvalContext};

/// Flat parameter block for selector-driven construction.
///
/// `select_function` picks the interpretation: 1 constant, 2 pulse, 3 sine,
/// 4 ramp, 5 pwl, 6 noise. Only the fields of the selected shape are read
/// and validated. Out-of-range selectors fall back to a constant source at
/// `level` (logged, not an error).
#[derive(Debug, Clone, PartialEq)]
pub struct VSourceSpec {
    pub select_function: i32,
    pub level: f64,
    pub initial_value: f64,
    pub pulse_value: f64,
    pub delay: f64,
    pub rise: f64,
    pub width: f64,
    pub fall: f64,
    pub period: f64,
    pub offset: f64,
    pub amplitude: f64,
    pub freq_hz: f64,
    pub phase_deg: f64,
    pub final_value: f64,
    pub start: f64,
    pub duration: f64,
    pub pwl_points: Vec<(f64, f64)>,
    pub sigma: f64,
    pub noise_bw: f64,
    pub seed: u64,
}

impl Default for VSourceSpec {
    fn default() -> Self {
        Self {
            select_function: 1,
            level: 0.0,
            initial_value: 0.0,
            pulse_value: 0.0,
            delay: 0.0,
            rise: 0.0,
            width: 0.0,
            fall: 0.0,
            period: 0.0,
            offset: 0.0,
            amplitude: 0.0,
            freq_hz: 0.0,
            phase_deg: 0.0,
            final_value: 0.0,
            start: 0.0,
            duration: 0.0,
            pwl_points: Vec::new(),
            sigma: 0.0,
            noise_bw: 0.0,
            seed: 0,
        }
    }
}

/// Source that pins its branch's across quantity to a waveform level.
///
/// Terminals p, n; one branch p->n whose through is the delivered flow.
/// The domain follows the wiring: in an electrical net this is a voltage
/// source, in a thermal net a temperature source, in a mechanical net a
/// position source.
#[derive(Debug, Clone)]
pub struct VSource {
    name: String,
    domain: Domain,
    waveform: Waveform,
    noise: Option<NoiseGenerator>,
}

impl VSource {
    /// Source from an explicit waveform, wired into `domain`.
    pub fn new(
        name: impl Into<String>,
        domain: Domain,
        waveform: Waveform,
    ) -> ModelResult<Self> {
        waveform.validate()?;
        let noise = match &waveform {
            Waveform::Noise { sigma, seed, .. } => Some(NoiseGenerator::new(*sigma, *seed)),
            _ => None,
        };
        Ok(Self {
            name: name.into(),
            domain,
            waveform,
            noise,
        })
    }

    /// Electrical source from an explicit waveform.
    pub fn electrical(name: impl Into<String>, waveform: Waveform) -> ModelResult<Self> {
        Self::new(name, Domain::Electrical, waveform)
    }

    /// Source from a flat selector-driven parameter block.
    pub fn from_spec(
        name: impl Into<String>,
        domain: Domain,
        spec: &VSourceSpec,
    ) -> ModelResult<Self> {
        let name = name.into();
        let waveform = match spec.select_function {
            1 => Waveform::constant(spec.level)?,
            2 => Waveform::pulse(
                spec.initial_value,
                spec.pulse_value,
                spec.delay,
                spec.rise,
                spec.width,
                spec.fall,
                spec.period,
            )?,
            3 => Waveform::sine(
                spec.offset,
                spec.amplitude,
                spec.freq_hz,
                spec.delay,
                spec.phase_deg,
            )?,
            4 => Waveform::ramp(
                spec.initial_value,
                spec.final_value,
                spec.start,
                spec.duration,
            )?,
            5 => Waveform::pwl(spec.pwl_points.clone())?,
            6 => Waveform::noise(spec.sigma, spec.noise_bw, spec.seed)?,
            other => {
                warn!(
                    source = %name,
                    select_function = other,
                    "unsupported select_function, falling back to constant drive"
                );
                Waveform::constant(spec.level)?
            }
        };
        Self::new(name, domain, waveform)
    }

    pub fn waveform(&self) -> &Waveform {
        &self.waveform
    }

    fn level(&self, ctx: &EvalContext<'_>) -> ModelResult<Real> {
        if ctx.quiescent {
            return Ok(self.waveform.dc_value());
        }
        match &self.waveform {
            Waveform::Noise { .. } => ctx.drive(0),
            w => Ok(w.value_at(ctx.t)),
        }
    }
}

impl DeviceModel for VSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn branch_domains(&self) -> Vec<Domain> {
        vec![self.domain]
    }

    fn evaluate(&self, ctx: &EvalContext<'_>, residuals: &mut [Real]) -> ModelResult<()> {
        let b = ctx.branch(0)?;
        residuals[0] = b.across - self.level(ctx)?;
        Ok(())
    }

    fn drive_count(&self) -> usize {
        1
    }

    fn initial_drives(&self) -> Vec<Real> {
        vec![self.waveform.dc_value()]
    }

    fn next_drive_event(&self, _slot: usize, after: Real) -> Option<Real> {
        self.waveform.next_corner_after(after)
    }

    fn apply_drive_event(&mut self, _slot: usize, _t: Real) -> Option<Real> {
        self.noise.as_mut().map(|noise| noise.next_sample())
    }
}
