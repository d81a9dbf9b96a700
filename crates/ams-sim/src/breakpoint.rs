//! Breakpoint detection against committed mode state.
//!
//! Models evaluate under committed guard outcomes; after each accepted
//! Newton solve the engine recomputes the guards fresh and compares them
//! here. A mismatch is a crossing inside the step. Comparing fresh against
//! committed (never fresh against fresh) is what gives the scheme its
//! hysteresis: a step that starts exactly on a breakpoint does not
//! re-trigger the crossing it just committed.

use ams_models::ModeVector;

/// One guard bit that disagrees with its committed value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Crossing {
    /// Registration index of the owning instance.
    pub instance_index: usize,
    /// Guard index within that instance.
    pub guard: usize,
}

/// Committed guard outcomes of every instance, plus the flip count.
///
/// Only [`ModeTracker::flip`] rewrites the committed table, and the engine
/// calls it exactly once per located crossing.
#[derive(Clone, Debug)]
pub struct ModeTracker {
    committed: Vec<ModeVector>,
    flips: usize,
}

impl ModeTracker {
    /// Start from the operating point's settled outcomes.
    pub fn new(committed: Vec<ModeVector>) -> Self {
        Self {
            committed,
            flips: 0,
        }
    }

    pub fn committed(&self) -> &[ModeVector] {
        &self.committed
    }

    /// First guard whose fresh outcome differs from its committed value,
    /// in instance order then guard order.
    pub fn first_crossing(&self, fresh: &[ModeVector]) -> Option<Crossing> {
        for (instance_index, (have, want)) in self.committed.iter().zip(fresh).enumerate() {
            for (guard, (a, b)) in have.iter().zip(want).enumerate() {
                if a != b {
                    return Some(Crossing {
                        instance_index,
                        guard,
                    });
                }
            }
        }
        None
    }

    /// Commit one crossing by toggling its bit.
    pub fn flip(&mut self, crossing: &Crossing) {
        let bit = &mut self.committed[crossing.instance_index][crossing.guard];
        *bit = !*bit;
        self.flips += 1;
    }

    pub fn flip_count(&self) -> usize {
        self.flips
    }
}
