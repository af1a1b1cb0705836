//! Pending delay/skip counters shared between producers and the audio callback
//!
//! Producers (start alignment, clock monitor) add whole-frame adjustments;
//! the audio callback takes everything pending at the start of a buffer,
//! consumes what it can, and hands the remainder back at the end. Every
//! operation is a single atomic RMW or a short CAS loop, so the callback
//! never blocks on a producer.

use std::sync::atomic::{AtomicI64, Ordering};

/// Result of adding an adjustment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Adjustment {
    /// Pending value after the addition
    pub pending: i64,
    /// True when the sum exceeded the limit and was clamped
    pub clamped: bool,
}

/// Two pending-adjustment counters in frame units.
///
/// - `pending_delay` (≥ 0): frames to hold the current frame without advancing
/// - `pending_skip` (signed): extra positions to jump at the next advance
///
/// Both accumulators are bounded by the loop length: a correction larger
/// than one loop has no meaning for a cyclic buffer.
#[derive(Debug)]
pub struct DriftCorrector {
    pending_delay: AtomicI64,
    pending_skip: AtomicI64,
    limit: i64,
}

impl DriftCorrector {
    /// Create zeroed counters bounded by `loop_frames`.
    pub fn new(loop_frames: usize) -> Self {
        Self {
            pending_delay: AtomicI64::new(0),
            pending_skip: AtomicI64::new(0),
            limit: i64::try_from(loop_frames).unwrap_or(i64::MAX),
        }
    }

    /// Reset both counters to zero (stream start)
    pub fn reset(&self) {
        self.pending_delay.store(0, Ordering::Relaxed);
        self.pending_skip.store(0, Ordering::Relaxed);
    }

    /// Add frames to the pending hold. Negative input is ignored.
    pub fn add_delay_frames(&self, frames: i64) -> Adjustment {
        if frames <= 0 {
            return Adjustment {
                pending: self.pending_delay(),
                clamped: false,
            };
        }
        Self::add_bounded(&self.pending_delay, frames, 0, self.limit)
    }

    /// Add a signed jump: positive skips forward, negative repeats frames.
    pub fn add_skip_frames(&self, frames: i64) -> Adjustment {
        Self::add_bounded(&self.pending_skip, frames, -self.limit, self.limit)
    }

    /// Take everything pending, leaving both counters at zero.
    ///
    /// Called by the audio callback at the start of each buffer.
    #[inline]
    pub fn take(&self) -> (i64, i64) {
        (
            self.pending_delay.swap(0, Ordering::AcqRel),
            self.pending_skip.swap(0, Ordering::AcqRel),
        )
    }

    /// Hand back what the callback did not consume.
    ///
    /// Producer additions made while the callback ran are preserved because
    /// this is an addition, not a store. The sum is bounded like any other
    /// addition; returns true when it had to be clamped.
    #[inline]
    pub fn restore(&self, delay: i64, skip: i64) -> bool {
        let mut clamped = false;
        if delay > 0 {
            clamped |= Self::add_bounded(&self.pending_delay, delay, 0, self.limit).clamped;
        }
        if skip != 0 {
            clamped |= Self::add_bounded(&self.pending_skip, skip, -self.limit, self.limit).clamped;
        }
        clamped
    }

    pub fn pending_delay(&self) -> i64 {
        self.pending_delay.load(Ordering::Acquire)
    }

    pub fn pending_skip(&self) -> i64 {
        self.pending_skip.load(Ordering::Acquire)
    }

    fn add_bounded(counter: &AtomicI64, frames: i64, min: i64, max: i64) -> Adjustment {
        let mut clamped = false;
        let previous = counter
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let sum = current.saturating_add(frames);
                let bounded = sum.clamp(min, max);
                clamped = bounded != sum;
                Some(bounded)
            })
            .unwrap_or_else(|current| current);

        Adjustment {
            pending: previous.saturating_add(frames).clamp(min, max),
            clamped,
        }
    }
}
