//! Stimulus waveform definitions.
//!
//! A [`Waveform`] is plain config data: it can be evaluated at a time point,
//! queried for its DC (quiescent) value, and asked for upcoming corner times
//! so the transient engine can land a step exactly on each discontinuity.
//!
//! Noise is the exception: its value is a held sample owned by the engine's
//! drive table and refreshed on the waveform's sample cadence, so direct
//! evaluation yields the mean.

use ams_core::lerp;
use serde::{Deserialize, Serialize};

use crate::error::{SourceError, SourceResult};

/// A time-varying stimulus specification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Waveform {
    /// Constant level, time-independent.
    Constant { level: f64 },

    /// Trapezoidal pulse train.
    ///
    /// Holds `initial_value` until `delay`, then per cycle: rise over
    /// `rise`, hold `pulse_value` for `width`, fall over `fall`, hold
    /// `initial_value` for the rest of `period`. `period = 0` means a
    /// single pulse.
    Pulse {
        initial_value: f64,
        pulse_value: f64,
        delay: f64,
        rise: f64,
        width: f64,
        fall: f64,
        period: f64,
    },

    /// Sinusoid `offset + amplitude * sin(2*pi*freq_hz*(t - delay) + phase)`,
    /// holding `offset` before `delay`.
    Sine {
        offset: f64,
        amplitude: f64,
        freq_hz: f64,
        delay: f64,
        phase_deg: f64,
    },

    /// Single linear ramp from `initial_value` to `final_value` over
    /// `[start, start + duration]`, holding each end outside.
    Ramp {
        initial_value: f64,
        final_value: f64,
        start: f64,
        duration: f64,
    },

    /// Piecewise linear table: interpolate between (time, value) points,
    /// hold the end values outside the table.
    Pwl { points: Vec<(f64, f64)> },

    /// Band-limited white noise: zero-mean gaussian samples of standard
    /// deviation `sigma`, held between resamples at `1/(2*noise_bw)`.
    Noise {
        sigma: f64,
        noise_bw: f64,
        seed: u64,
    },
}

impl Waveform {
    pub fn constant(level: f64) -> SourceResult<Self> {
        let w = Waveform::Constant { level };
        w.validate()?;
        Ok(w)
    }

    pub fn pulse(
        initial_value: f64,
        pulse_value: f64,
        delay: f64,
        rise: f64,
        width: f64,
        fall: f64,
        period: f64,
    ) -> SourceResult<Self> {
        let w = Waveform::Pulse {
            initial_value,
            pulse_value,
            delay,
            rise,
            width,
            fall,
            period,
        };
        w.validate()?;
        Ok(w)
    }

    pub fn sine(
        offset: f64,
        amplitude: f64,
        freq_hz: f64,
        delay: f64,
        phase_deg: f64,
    ) -> SourceResult<Self> {
        let w = Waveform::Sine {
            offset,
            amplitude,
            freq_hz,
            delay,
            phase_deg,
        };
        w.validate()?;
        Ok(w)
    }

    pub fn ramp(
        initial_value: f64,
        final_value: f64,
        start: f64,
        duration: f64,
    ) -> SourceResult<Self> {
        let w = Waveform::Ramp {
            initial_value,
            final_value,
            start,
            duration,
        };
        w.validate()?;
        Ok(w)
    }

    pub fn pwl(points: Vec<(f64, f64)>) -> SourceResult<Self> {
        let w = Waveform::Pwl { points };
        w.validate()?;
        Ok(w)
    }

    pub fn noise(sigma: f64, noise_bw: f64, seed: u64) -> SourceResult<Self> {
        let w = Waveform::Noise {
            sigma,
            noise_bw,
            seed,
        };
        w.validate()?;
        Ok(w)
    }

    /// Check the definition; deserialized configs go through this too.
    pub fn validate(&self) -> SourceResult<()> {
        fn finite(v: f64, what: &'static str) -> SourceResult<()> {
            if v.is_finite() {
                Ok(())
            } else {
                Err(SourceError::NonFinite { what })
            }
        }

        match self {
            Waveform::Constant { level } => finite(*level, "constant level"),
            Waveform::Pulse {
                initial_value,
                pulse_value,
                delay,
                rise,
                width,
                fall,
                period,
            } => {
                finite(*initial_value, "pulse initial_value")?;
                finite(*pulse_value, "pulse pulse_value")?;
                finite(*delay, "pulse delay")?;
                finite(*rise, "pulse rise")?;
                finite(*width, "pulse width")?;
                finite(*fall, "pulse fall")?;
                finite(*period, "pulse period")?;
                if *delay < 0.0 || *rise < 0.0 || *width < 0.0 || *fall < 0.0 || *period < 0.0 {
                    return Err(SourceError::InvalidArg {
                        what: "pulse times must be non-negative",
                    });
                }
                if *period > 0.0 && rise + width + fall > *period {
                    return Err(SourceError::InvalidArg {
                        what: "pulse rise + width + fall exceeds period",
                    });
                }
                Ok(())
            }
            Waveform::Sine {
                offset,
                amplitude,
                freq_hz,
                delay,
                phase_deg,
            } => {
                finite(*offset, "sine offset")?;
                finite(*amplitude, "sine amplitude")?;
                finite(*freq_hz, "sine freq_hz")?;
                finite(*delay, "sine delay")?;
                finite(*phase_deg, "sine phase_deg")?;
                if *freq_hz <= 0.0 {
                    return Err(SourceError::InvalidArg {
                        what: "sine freq_hz must be positive",
                    });
                }
                if *delay < 0.0 {
                    return Err(SourceError::InvalidArg {
                        what: "sine delay must be non-negative",
                    });
                }
                Ok(())
            }
            Waveform::Ramp {
                initial_value,
                final_value,
                start,
                duration,
            } => {
                finite(*initial_value, "ramp initial_value")?;
                finite(*final_value, "ramp final_value")?;
                finite(*start, "ramp start")?;
                finite(*duration, "ramp duration")?;
                if *start < 0.0 || *duration < 0.0 {
                    return Err(SourceError::InvalidArg {
                        what: "ramp start and duration must be non-negative",
                    });
                }
                Ok(())
            }
            Waveform::Pwl { points } => {
                if points.is_empty() {
                    return Err(SourceError::InvalidArg {
                        what: "pwl table is empty",
                    });
                }
                for (t, v) in points {
                    finite(*t, "pwl time")?;
                    finite(*v, "pwl value")?;
                    if *t < 0.0 {
                        return Err(SourceError::InvalidArg {
                            what: "pwl times must be non-negative",
                        });
                    }
                }
                for pair in points.windows(2) {
                    if pair[1].0 <= pair[0].0 {
                        return Err(SourceError::InvalidArg {
                            what: "pwl times must be strictly increasing",
                        });
                    }
                }
                Ok(())
            }
            Waveform::Noise {
                sigma, noise_bw, ..
            } => {
                finite(*sigma, "noise sigma")?;
                finite(*noise_bw, "noise noise_bw")?;
                if *sigma < 0.0 {
                    return Err(SourceError::InvalidArg {
                        what: "noise sigma must be non-negative",
                    });
                }
                if *noise_bw <= 0.0 {
                    return Err(SourceError::InvalidArg {
                        what: "noise noise_bw must be positive",
                    });
                }
                Ok(())
            }
        }
    }

    /// Evaluate the waveform at a time point.
    pub fn value_at(&self, t: f64) -> f64 {
        match self {
            Waveform::Constant { level } => *level,
            Waveform::Pulse {
                initial_value,
                pulse_value,
                delay,
                rise,
                width,
                fall,
                period,
            } => eval_pulse(
                *initial_value,
                *pulse_value,
                *delay,
                *rise,
                *width,
                *fall,
                *period,
                t,
            ),
            Waveform::Sine {
                offset,
                amplitude,
                freq_hz,
                delay,
                phase_deg,
            } => eval_sine(*offset, *amplitude, *freq_hz, *delay, *phase_deg, t),
            Waveform::Ramp {
                initial_value,
                final_value,
                start,
                duration,
            } => eval_ramp(*initial_value, *final_value, *start, *duration, t),
            Waveform::Pwl { points } => eval_pwl(points, t),
            // Held samples come from the engine's drive table
            Waveform::Noise { .. } => 0.0,
        }
    }

    /// Quiescent value for the operating point.
    pub fn dc_value(&self) -> f64 {
        match self {
            Waveform::Constant { level } => *level,
            Waveform::Pulse { initial_value, .. } => *initial_value,
            Waveform::Sine { offset, .. } => *offset,
            Waveform::Ramp { initial_value, .. } => *initial_value,
            Waveform::Pwl { points } => points.first().map(|(_, v)| *v).unwrap_or(0.0),
            Waveform::Noise { .. } => 0.0,
        }
    }

    /// Next corner (slope discontinuity or resample time) strictly after `t`.
    ///
    /// The transient engine clamps its step to land exactly on these.
    /// `t` may be `-inf` to ask for the first corner.
    pub fn next_corner_after(&self, t: f64) -> Option<f64> {
        match self {
            Waveform::Constant { .. } | Waveform::Sine { .. } => None,
            Waveform::Pulse {
                delay,
                rise,
                width,
                fall,
                period,
                ..
            } => {
                let offsets = [0.0, *rise, rise + width, rise + width + fall];
                if *period > 0.0 {
                    let base = if t < *delay {
                        0.0
                    } else {
                        ((t - delay) / period).floor() * period
                    };
                    for cycle in [base, base + period] {
                        for off in offsets {
                            let c = delay + cycle + off;
                            if c > t {
                                return Some(c);
                            }
                        }
                    }
                    None
                } else {
                    offsets.iter().map(|off| delay + off).find(|&c| c > t)
                }
            }
            Waveform::Ramp {
                start, duration, ..
            } => [*start, start + duration].into_iter().find(|&c| c > t),
            Waveform::Pwl { points } => points.iter().map(|(tp, _)| *tp).find(|&tp| tp > t),
            Waveform::Noise { noise_bw, .. } => {
                let dt_s = 0.5 / noise_bw;
                let k = if t < 0.0 { 0.0 } else { (t / dt_s).floor() + 1.0 };
                let c = k * dt_s;
                // A quotient that rounds low would re-issue the corner
                // just handled
                if c > t { Some(c) } else { Some((k + 1.0) * dt_s) }
            }
        }
    }

    /// Noise resample interval, if this is a noise waveform.
    pub fn sample_interval(&self) -> Option<f64> {
        match self {
            Waveform::Noise { noise_bw, .. } => Some(0.5 / noise_bw),
            _ => None,
        }
    }
}

/// Linear transition from `from` at `t0` to `to` at `t1`.
///
/// A falling transition swaps the endpoint order and walks the ramp
/// backwards; the traced line is the same.
fn transition(from: f64, to: f64, t0: f64, t1: f64, t: f64) -> f64 {
    let u = ((t - t0) / (t1 - t0)).clamp(0.0, 1.0);
    if to >= from {
        lerp(from, to, u)
    } else {
        lerp(to, from, 1.0 - u)
    }
}

#[allow(clippy::too_many_arguments)]
fn eval_pulse(
    initial: f64,
    pulse: f64,
    delay: f64,
    rise: f64,
    width: f64,
    fall: f64,
    period: f64,
    t: f64,
) -> f64 {
    if t < delay {
        return initial;
    }

    // Time within the cycle (or from the delay if single-shot)
    let t_rel = if period > 0.0 {
        (t - delay) % period
    } else {
        t - delay
    };

    if t_rel < rise {
        transition(initial, pulse, 0.0, rise, t_rel)
    } else if t_rel < rise + width {
        pulse
    } else if t_rel < rise + width + fall {
        transition(pulse, initial, rise + width, rise + width + fall, t_rel)
    } else {
        initial
    }
}

fn eval_sine(offset: f64, amplitude: f64, freq_hz: f64, delay: f64, phase_deg: f64, t: f64) -> f64 {
    use std::f64::consts::PI;
    if t < delay {
        return offset;
    }
    let phase_rad = phase_deg * PI / 180.0;
    offset + amplitude * (2.0 * PI * freq_hz * (t - delay) + phase_rad).sin()
}

fn eval_ramp(initial: f64, final_value: f64, start: f64, duration: f64, t: f64) -> f64 {
    if t < start {
        return initial;
    }
    if duration <= 0.0 || t >= start + duration {
        return final_value;
    }
    lerp(initial, final_value, (t - start) / duration)
}

fn eval_pwl(points: &[(f64, f64)], t: f64) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    if t <= points[0].0 {
        return points[0].1;
    }
    let last = points[points.len() - 1];
    if t >= last.0 {
        return last.1;
    }
    for pair in points.windows(2) {
        let (t0, v0) = pair[0];
        let (t1, v1) = pair[1];
        if t < t1 {
            return lerp(v0, v1, (t - t0) / (t1 - t0));
        }
    }
    last.1
}
