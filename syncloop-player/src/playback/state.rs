//! Shared state between the supervisory side and the audio callback
//!
//! Everything here is atomics: the audio callback reads and writes it on a
//! real-time thread where a lock would risk priority inversion.

use super::drift::DriftCorrector;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};

const START_WAITING: u8 = 0;
const START_ARMED: u8 = 1;
const START_RUNNING: u8 = 2;

/// One-shot start alignment flag.
///
/// States: waiting (not armed yet, callback outputs silence) → armed (target
/// device-clock instant stored) → running (first callback consumed the target).
#[derive(Debug)]
pub struct StartFlag {
    state: AtomicU8,
    target_bits: AtomicU64,
}

impl StartFlag {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(START_WAITING),
            target_bits: AtomicU64::new(0),
        }
    }

    /// Store the device-clock instant at which frame 0 should reach the DAC
    pub fn arm(&self, target_instant: f64) {
        self.target_bits
            .store(target_instant.to_bits(), Ordering::Relaxed);
        self.state.store(START_ARMED, Ordering::Release);
    }

    /// Start without alignment: the next callback plays immediately
    pub fn release(&self) {
        self.state.store(START_RUNNING, Ordering::Release);
    }

    /// Consume the armed target. Returns it exactly once.
    #[inline]
    pub fn disarm(&self) -> Option<f64> {
        self.state
            .compare_exchange(START_ARMED, START_RUNNING, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| f64::from_bits(self.target_bits.load(Ordering::Relaxed)))
    }

    /// True until the flag has been armed or released
    #[inline]
    pub fn is_waiting(&self) -> bool {
        self.state.load(Ordering::Acquire) == START_WAITING
    }

    pub fn is_armed(&self) -> bool {
        self.state.load(Ordering::Acquire) == START_ARMED
    }
}

impl Default for StartFlag {
    fn default() -> Self {
        Self::new()
    }
}

/// Counters written by the audio callback and read by the clock monitor.
///
/// **REAL-TIME SAFE**: Only atomic stores/increments, no logging, no events.
/// The monitor compares snapshots and does the logging.
#[derive(Debug, Default)]
pub struct CallbackStats {
    callback_count: AtomicU64,
    overflow_count: AtomicU64,
    start_delay_frames: AtomicU64,
    late_start_frames: AtomicU64,
    /// Frames requested by the device in a mismatching callback (0 = none)
    size_mismatch_frames: AtomicU64,
    stream_errors: AtomicU64,
    device_lost: AtomicBool,
}

impl CallbackStats {
    #[inline]
    pub fn record_callback(&self) {
        self.callback_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_overflow(&self) {
        self.overflow_count.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_start_delay(&self, frames: u64) {
        self.start_delay_frames.store(frames, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_late_start(&self, frames: u64) {
        self.late_start_frames.store(frames, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_size_mismatch(&self, frames: usize) {
        // Keep a non-zero marker even for an empty request
        let marker = (frames as u64).max(1);
        let _ = self.size_mismatch_frames.compare_exchange(
            0,
            marker,
            Ordering::Release,
            Ordering::Relaxed,
        );
    }

    pub fn record_stream_error(&self) {
        self.stream_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_device_lost(&self) {
        self.device_lost.store(true, Ordering::Release);
    }

    /// True once the stream can no longer produce aligned audio
    pub fn is_faulted(&self) -> bool {
        self.size_mismatch_frames.load(Ordering::Acquire) != 0
            || self.device_lost.load(Ordering::Acquire)
    }

    /// Get current statistics
    pub fn snapshot(&self) -> CallbackStatsSnapshot {
        CallbackStatsSnapshot {
            callback_count: self.callback_count.load(Ordering::Relaxed),
            overflow_count: self.overflow_count.load(Ordering::Relaxed),
            start_delay_frames: self.start_delay_frames.load(Ordering::Relaxed),
            late_start_frames: self.late_start_frames.load(Ordering::Relaxed),
            size_mismatch_frames: self.size_mismatch_frames.load(Ordering::Acquire),
            stream_errors: self.stream_errors.load(Ordering::Relaxed),
            device_lost: self.device_lost.load(Ordering::Acquire),
        }
    }
}

/// Callback statistics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallbackStatsSnapshot {
    pub callback_count: u64,
    pub overflow_count: u64,
    pub start_delay_frames: u64,
    pub late_start_frames: u64,
    pub size_mismatch_frames: u64,
    pub stream_errors: u64,
    pub device_lost: bool,
}

/// State shared by the start synchronizer, clock monitor and audio callback.
#[derive(Debug)]
pub struct SyncState {
    pub drift: DriftCorrector,
    pub start: StartFlag,
    pub stats: CallbackStats,
    /// Last cursor position published by the callback
    position: AtomicUsize,
}

impl SyncState {
    /// Create state for a loop of `loop_frames` frames.
    pub fn new(loop_frames: usize) -> Self {
        Self {
            drift: DriftCorrector::new(loop_frames),
            start: StartFlag::new(),
            stats: CallbackStats::default(),
            position: AtomicUsize::new(0),
        }
    }

    #[inline]
    pub fn publish_position(&self, cursor: usize) {
        self.position.store(cursor, Ordering::Relaxed);
    }

    /// Cursor position after the most recent callback
    pub fn position(&self) -> usize {
        self.position.load(Ordering::Relaxed)
    }
}
