//! Discrete event schedule for the transient engine.
//!
//! Pending events (waveform corners, noise resamples) sit in a priority
//! queue keyed by trigger time. Simultaneous events pop in registration
//! order, so re-armed periodic events keep a stable relative order.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use ams_core::InstanceId;

/// One scheduled event: a drive slot of an instance fires at `time`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingEvent {
    pub time: f64,
    /// Registration sequence number, the tie-break for equal times.
    pub seq: u64,
    pub instance: InstanceId,
    pub slot: usize,
}

/// Heap adapter: earliest time ranks highest; equal times rank by
/// registration order.
#[derive(Debug, Clone, Copy, PartialEq)]
struct HeapEntry(PendingEvent);

impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap pops the max, we want the earliest
        other
            .0
            .time
            .total_cmp(&self.0.time)
            .then_with(|| other.0.seq.cmp(&self.0.seq))
    }
}

/// Priority queue of pending events.
#[derive(Debug, Default)]
pub struct EventSchedule {
    heap: BinaryHeap<HeapEntry>,
    next_seq: u64,
}

impl EventSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an event; returns its sequence number.
    pub fn schedule(&mut self, time: f64, instance: InstanceId, slot: usize) -> u64 {
        assert!(time.is_finite(), "event time must be finite");
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(HeapEntry(PendingEvent {
            time,
            seq,
            instance,
            slot,
        }));
        seq
    }

    /// Trigger time of the earliest pending event.
    pub fn next_time(&self) -> Option<f64> {
        self.heap.peek().map(|e| e.0.time)
    }

    /// Pop the earliest event if it is due at or before `t`.
    pub fn pop_due(&mut self, t: f64) -> Option<PendingEvent> {
        if self.heap.peek().is_some_and(|e| e.0.time <= t) {
            self.heap.pop().map(|e| e.0)
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }
}
