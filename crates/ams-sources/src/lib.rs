//! ams-sources: stimulus waveforms and the discrete event schedule.
//!
//! Provides:
//! - Waveform definitions (constant, pulse, sine, ramp, PWL, noise) with
//!   time evaluation, DC values, and corner times for forced steps
//! - Per-instance random number generation (SplitMix64 + Box-Muller)
//! - A priority queue of pending events ordered by time, with
//!   registration-order tie-breaking

pub mod error;
pub mod noise;
pub mod schedule;
pub mod waveform;

pub use error::{SourceError, SourceResult};
pub use noise::{NoiseGenerator, SplitMix64, SPECTRAL_FLATNESS_CORRECTION};
pub use schedule::{EventSchedule, PendingEvent};
pub use waveform::Waveform;
