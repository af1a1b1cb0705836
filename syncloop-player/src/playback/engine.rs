//! Playback engine orchestration
//!
//! Ties the pieces together for one run: open the device, bring the loop
//! into a format it accepts, build the stream, wait for the shared start
//! boundary, arm the start flag and play, then supervise drift until
//! shutdown or a stream fault.

use crate::audio::{AudioOutput, LoadedAudio, SampleBuffer};
use crate::error::{Error, Result};
use crate::playback::clock::{DeviceClock, SampleClock, SystemWallClock, WallClock};
use crate::playback::clock_monitor::{ClockMonitor, MonitorConfig};
use crate::playback::fill::FillCallback;
use crate::playback::start_sync::StartSynchronizer;
use crate::playback::state::SyncState;
use cpal::{SampleFormat, SizedSample};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use syncloop_common::Settings;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// How long before the start boundary the stream is armed and started.
///
/// The callback holds the first frame for the remainder, so this bounds
/// the start hold rather than the alignment precision.
pub const START_LEAD: Duration = Duration::from_millis(500);

/// Playback engine - one looped playback session
pub struct PlaybackEngine {
    settings: Settings,
    audio: LoadedAudio,
    wall: Arc<dyn WallClock>,
}

impl PlaybackEngine {
    pub fn new(settings: Settings, audio: LoadedAudio) -> Self {
        Self {
            settings,
            audio,
            wall: Arc::new(SystemWallClock),
        }
    }

    /// Play until `shutdown` resolves or the stream faults.
    ///
    /// Always runs the stop sequence (stop monitor, pause stream, close
    /// device) before returning.
    pub async fn run<S>(self, shutdown: S) -> Result<()>
    where
        S: Future<Output = ()>,
    {
        let output = AudioOutput::open(self.settings.device.as_deref())?;
        let format = output.negotiate(
            self.audio.channels(),
            self.audio.sample_rate(),
            self.audio.sample_format(),
        )?;

        let samples = &self.audio.samples;
        match format {
            SampleFormat::F32 => self.play(output, samples.to_buffer::<f32>(), shutdown).await,
            SampleFormat::I32 => self.play(output, samples.to_buffer::<i32>(), shutdown).await,
            SampleFormat::I16 => self.play(output, samples.to_buffer::<i16>(), shutdown).await,
            SampleFormat::I8 => self.play(output, samples.to_buffer::<i8>(), shutdown).await,
            other => Err(Error::UnsupportedFormat(format!(
                "no conversion to {:?}",
                other
            ))),
        }
    }

    async fn play<T, S>(&self, mut output: AudioOutput, buffer: SampleBuffer<T>, shutdown: S) -> Result<()>
    where
        T: SizedSample + Send + Sync + 'static,
        S: Future<Output = ()>,
    {
        let rate = buffer.sample_rate();
        let channels = buffer.channels();
        let buffer_frames = self.settings.buffer_frames;
        let loop_frames = buffer.frames();

        let state = Arc::new(SyncState::new(loop_frames));
        let clock = Arc::new(SampleClock::new(rate));
        let callback = FillCallback::new(buffer, Arc::clone(&state), buffer_frames as usize)?;

        let sync = StartSynchronizer::new(self.settings.round_to_secs)?;
        let target_wall = sync.target_wall(self.wall.as_ref())?;

        output.build(
            callback,
            Arc::clone(&clock),
            Arc::clone(&state),
            channels,
            rate,
            buffer_frames,
        )?;

        tokio::pin!(shutdown);

        if let Some(wait) = start_wait(target_wall, self.wall.now()?, START_LEAD) {
            debug!("Waiting {:.3}s before arming start", wait.as_secs_f64());
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown requested before start");
                    return output.stop();
                }
                _ = tokio::time::sleep(wait) => {}
            }
        }

        state.drift.reset();
        let plan = match sync.arm(target_wall, self.wall.as_ref(), clock.as_ref(), &state.start) {
            Ok(plan) => plan,
            Err(e) => {
                output.stop()?;
                return Err(e);
            }
        };
        if let Err(e) = output.play() {
            output.stop()?;
            return Err(e);
        }
        info!("Looping {} frames on {}", loop_frames, output.device_name());

        let (stop_tx, stop_rx) = watch::channel(false);
        let monitor = ClockMonitor::new(
            Arc::clone(&state),
            Arc::clone(&self.wall),
            clock as Arc<dyn DeviceClock>,
            MonitorConfig {
                sample_rate: rate,
                period_frames: buffer_frames as usize,
                tolerance_secs: self.settings.drift_tolerance_secs(),
                interval: self.settings.monitor_interval,
            },
            plan.offset,
        );
        let mut handle = monitor.spawn(stop_rx);

        let outcome = tokio::select! {
            _ = &mut shutdown => {
                info!("Shutdown requested");
                let _ = stop_tx.send(true);
                (&mut handle).await
            }
            joined = &mut handle => joined,
        };

        let result = match outcome {
            Ok(result) => result,
            Err(e) => Err(Error::StreamFault(format!("clock monitor task failed: {}", e))),
        };
        if let Err(e) = &result {
            warn!("Playback ending: {}", e);
        }

        output.stop()?;
        info!(
            "Playback stopped at frame {} after {} callbacks",
            state.position(),
            state.stats.snapshot().callback_count
        );
        result
    }
}

/// Time to sleep so arming happens `lead` before `target_wall`; `None`
/// when that moment has already passed.
pub fn start_wait(target_wall: f64, now: f64, lead: Duration) -> Option<Duration> {
    let wait = target_wall - lead.as_secs_f64() - now;
    if wait > 0.0 && wait.is_finite() {
        Some(Duration::from_secs_f64(wait))
    } else {
        None
    }
}
