//! Clock drift monitor
//!
//! Re-measures the wall/device offset once per interval and converts any
//! change beyond the tolerance into a skip correction for the audio
//! callback. Also drains the callback statistics and does the logging the
//! real-time thread is not allowed to do.

use super::clock::{DeviceClock, WallClock};
use super::state::{CallbackStatsSnapshot, SyncState};
use crate::error::{Error, Result};
use std::sync::Arc;
use std::time::Duration;
use syncloop_common::time::{frames_to_seconds, seconds_to_frames};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// How often the monitor task checks the callback for a fault between ticks
pub const FAULT_POLL: Duration = Duration::from_millis(10);

/// What a single monitor tick did
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Offset within tolerance, nothing pushed
    Steady { offset: f64 },
    /// A skip correction was pushed
    Corrected { delta_secs: f64, frames: i64 },
    /// A clock could not be read; tick skipped
    ClockUnavailable,
    /// The stream can no longer play; monitor should stop
    Fault(String),
}

/// Fixed parameters of a monitor
#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig {
    pub sample_rate: u32,
    /// Frames per audio callback
    pub period_frames: usize,
    /// Offset changes at or below this are ignored
    pub tolerance_secs: f64,
    pub interval: Duration,
}

/// Periodic drift supervisor.
///
/// Owned by a tokio task; all shared state it touches is in [`SyncState`].
pub struct ClockMonitor {
    state: Arc<SyncState>,
    wall: Arc<dyn WallClock>,
    device: Arc<dyn DeviceClock>,
    config: MonitorConfig,
    previous_offset: f64,
    last_stats: CallbackStatsSnapshot,
}

impl ClockMonitor {
    /// Create a monitor whose baseline is the offset measured at arming time.
    pub fn new(
        state: Arc<SyncState>,
        wall: Arc<dyn WallClock>,
        device: Arc<dyn DeviceClock>,
        config: MonitorConfig,
        initial_offset: f64,
    ) -> Self {
        Self {
            state,
            wall,
            device,
            config,
            previous_offset: initial_offset,
            last_stats: CallbackStatsSnapshot::default(),
        }
    }

    /// Offset the next tick compares against
    pub fn previous_offset(&self) -> f64 {
        self.previous_offset
    }

    /// Run one supervision step.
    pub fn tick(&mut self) -> TickOutcome {
        if let Some(fault) = self.check_stats() {
            return TickOutcome::Fault(fault);
        }

        let offset = match self.measure() {
            Ok(offset) => offset,
            Err(e) => {
                warn!("Clock read failed, skipping drift check: {}", e);
                return TickOutcome::ClockUnavailable;
            }
        };

        debug!(
            "Status: position {}, {} callbacks, offset {:.6}s",
            self.state.position(),
            self.last_stats.callback_count,
            offset
        );

        let delta = offset - self.previous_offset;
        if delta.abs() <= self.config.tolerance_secs {
            return TickOutcome::Steady { offset };
        }

        info!("Adjusting stream by {:.3} milliseconds", delta * 1000.0);
        let frames = seconds_to_frames(delta, self.config.sample_rate);
        let adjustment = self.state.drift.add_skip_frames(frames);
        if adjustment.clamped {
            warn!(
                "Drift correction of {} frames clamped; pending skip is {} frames",
                frames, adjustment.pending
            );
        }
        self.previous_offset = offset;

        TickOutcome::Corrected {
            delta_secs: delta,
            frames,
        }
    }

    fn measure(&self) -> Result<f64> {
        let wall = self.wall.now()?;
        let device = self.device.now()?;
        Ok(wall - device)
    }

    /// Log what changed since the last tick; returns a fault description
    /// when the stream cannot continue.
    fn check_stats(&mut self) -> Option<String> {
        let stats = self.state.stats.snapshot();
        let last = self.last_stats;
        self.last_stats = stats;

        if stats.start_delay_frames != last.start_delay_frames && stats.start_delay_frames > 0 {
            info!(
                "Holding first frame for {} frames to align start",
                stats.start_delay_frames
            );
        }
        if self.state.start.is_armed() && stats.callback_count == last.callback_count {
            warn!("No audio callback since the start was armed");
        }
        if stats.late_start_frames != last.late_start_frames && stats.late_start_frames > 0 {
            warn!(
                "Stream started {:.3} milliseconds late",
                frames_to_seconds(stats.late_start_frames as i64, self.config.sample_rate) * 1000.0
            );
        }
        if stats.overflow_count > last.overflow_count {
            warn!(
                "Drift correction exceeded the loop length {} time(s) (+{} since last check)",
                stats.overflow_count,
                stats.overflow_count - last.overflow_count
            );
        }
        if stats.stream_errors > last.stream_errors {
            warn!(
                "Audio stream reported {} error(s) (+{} since last check)",
                stats.stream_errors,
                stats.stream_errors - last.stream_errors
            );
        }

        if stats.size_mismatch_frames != 0 {
            let fault = Error::PreconditionViolation {
                expected: self.config.period_frames,
                actual: stats.size_mismatch_frames as usize,
            };
            error!("{}", fault);
            return Some(fault.to_string());
        }
        if stats.device_lost {
            error!("Output device no longer available");
            return Some("output device no longer available".to_string());
        }
        None
    }

    /// Run the monitor on the tokio runtime until `shutdown` flips to true
    /// or the stream faults.
    ///
    /// The first tick happens one interval after spawning. A fault raised by
    /// the callback ends the task within [`FAULT_POLL`], not at the next tick.
    pub fn spawn(mut self, mut shutdown: watch::Receiver<bool>) -> JoinHandle<Result<()>> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Consume the immediate first tick
            interval.tick().await;

            let mut fault_poll = tokio::time::interval(FAULT_POLL);
            fault_poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

            debug!("Clock monitor started (interval {:?})", self.config.interval);

            loop {
                tokio::select! {
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                    _ = interval.tick() => {
                        if let TickOutcome::Fault(reason) = self.tick() {
                            info!("Clock monitor stopped on stream fault");
                            return Err(Error::StreamFault(reason));
                        }
                    }
                    _ = fault_poll.tick() => {
                        if !self.state.stats.is_faulted() {
                            continue;
                        }
                        if let Some(reason) = self.check_stats() {
                            info!("Clock monitor stopped on stream fault");
                            return Err(Error::StreamFault(reason));
                        }
                    }
                }
            }

            info!("Clock monitor stopped");
            Ok(())
        })
    }
}
