//! Transient simulation engine for amsim networks.
//!
//! Provides:
//! - Implicit-Euler time stepping over a solved operating point
//! - Step cutback and retry on rejected solves
//! - Breakpoint detection with bisection onto guard crossings
//! - Scheduled source events (waveform corners, noise resampling)
//! - Decimated recording with observable streams and progress callbacks

pub mod breakpoint;
pub mod error;
pub mod transient;

// Re-exports for public API
pub use breakpoint::{Crossing, ModeTracker};
pub use error::{SimError, SimResult};
pub use transient::{
    CrossingRecord, SimProgressEvent, TranRecord, TransientOptions, run_transient,
    run_transient_with_progress,
};
