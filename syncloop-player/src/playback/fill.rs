//! Real-time buffer fill
//!
//! The function the audio driver calls for every output buffer. It copies
//! frames from the cyclic [`SampleBuffer`], applying any pending hold or
//! jump from the [`DriftCorrector`](super::drift::DriftCorrector).
//!
//! **REAL-TIME SAFE**: no allocation, no locks, no logging, no I/O. Errors
//! are reported through [`FillStatus::Abort`] and the shared statistics.

use super::state::SyncState;
use crate::audio::SampleBuffer;
use crate::error::{Error, Result};
use cpal::Sample;
use std::sync::Arc;
use syncloop_common::time::seconds_to_frames;

/// Outcome of one fill
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStatus {
    /// Buffer filled, keep streaming
    Continue,
    /// Fatal precondition violation; buffer holds silence and the stream must stop
    Abort,
}

/// Audio callback state: the loop, the cursor into it and the shared counters.
pub struct FillCallback<T> {
    buffer: SampleBuffer<T>,
    state: Arc<SyncState>,
    cursor: usize,
    period_frames: usize,
    aborted: bool,
}

impl<T: Sample> FillCallback<T> {
    /// Create a callback that always produces `period_frames` frames per call.
    ///
    /// The period is fixed here once; every call compares the requested
    /// length against it and aborts on mismatch rather than padding or
    /// truncating, which would silently shift phase.
    pub fn new(buffer: SampleBuffer<T>, state: Arc<SyncState>, period_frames: usize) -> Result<Self> {
        if period_frames == 0 {
            return Err(Error::AudioOutput(
                "buffer size must be at least one frame".to_string(),
            ));
        }
        Ok(Self {
            buffer,
            state,
            cursor: 0,
            period_frames,
            aborted: false,
        })
    }

    /// Current cursor (frame index into the loop)
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Fill `out` (interleaved, `period_frames * channels` samples).
    ///
    /// `output_dac_time` is the device-clock instant at which the first frame
    /// of `out` reaches the hardware.
    pub fn fill(&mut self, out: &mut [T], output_dac_time: f64) -> FillStatus {
        let width = self.buffer.channels() as usize;

        if self.aborted {
            out.fill(T::EQUILIBRIUM);
            return FillStatus::Abort;
        }
        if out.len() != self.period_frames * width {
            self.state.stats.record_size_mismatch(out.len() / width);
            self.aborted = true;
            out.fill(T::EQUILIBRIUM);
            return FillStatus::Abort;
        }

        self.state.stats.record_callback();

        // Not armed yet: hold the device with silence, cursor untouched
        if self.state.start.is_waiting() {
            out.fill(T::EQUILIBRIUM);
            return FillStatus::Continue;
        }

        if let Some(target_instant) = self.state.start.disarm() {
            let delay_time = target_instant - output_dac_time;
            let mut frames = seconds_to_frames(delay_time, self.buffer.sample_rate());
            let loop_frames = self.buffer.frames() as i64;
            // A hold of whole loops lands on the same phase
            if frames >= loop_frames {
                self.state.stats.record_overflow();
                frames = frames.rem_euclid(loop_frames);
            }
            if frames > 0 {
                let adjustment = self.state.drift.add_delay_frames(frames);
                if adjustment.clamped {
                    self.state.stats.record_overflow();
                }
                self.state.stats.record_start_delay(adjustment.pending as u64);
            } else if frames < 0 {
                self.state.stats.record_late_start(frames.unsigned_abs());
            }
        }

        let (mut delay, mut skip) = self.state.drift.take();
        let loop_frames = self.buffer.frames();

        for slot in out.chunks_exact_mut(width) {
            slot.copy_from_slice(self.buffer.frame(self.cursor));

            if delay > 0 {
                delay -= 1;
                continue;
            }

            if skip != 0 {
                if skip.unsigned_abs() >= loop_frames as u64 {
                    self.state.stats.record_overflow();
                }
                self.cursor = (self.cursor as i64 + skip).rem_euclid(loop_frames as i64) as usize;
                skip = 0;
            }

            self.cursor += 1;
            if self.cursor == loop_frames {
                self.cursor = 0;
            }
        }

        if self.state.drift.restore(delay, skip) {
            self.state.stats.record_overflow();
        }
        self.state.publish_position(self.cursor);
        FillStatus::Continue
    }
}
