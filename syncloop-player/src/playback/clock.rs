//! Wall clock and device clock
//!
//! Both clocks report seconds as `f64` so their difference is the offset the
//! start synchronizer and clock monitor work with.
//!
//! The device clock is [`SampleClock`]: the playback position of the output
//! stream in seconds. Each callback pins the frame it delivers to the host
//! instant that frame will play; between callbacks the position is
//! extrapolated with the host monotonic clock. It therefore advances at the
//! device's real sample rate and drifts against the wall clock exactly as
//! the device does, while queue depth and callback scheduling do not move it.

use crate::error::{Error, Result};
use std::sync::atomic::{fence, AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use syncloop_common::time;

/// Host real-time clock
pub trait WallClock: Send + Sync {
    /// Seconds since the Unix epoch
    fn now(&self) -> Result<f64>;
}

/// Audio device playback clock
pub trait DeviceClock: Send + Sync {
    /// Seconds in the device clock domain
    fn now(&self) -> Result<f64>;
}

/// Wall clock backed by the system real-time clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemWallClock;

impl WallClock for SystemWallClock {
    fn now(&self) -> Result<f64> {
        let secs = time::to_epoch_seconds(time::now());
        if secs.is_finite() && secs > 0.0 {
            Ok(secs)
        } else {
            Err(Error::ClockRead(format!("wall clock returned {}", secs)))
        }
    }
}

/// Device clock derived from the stream's playback position.
///
/// Before the first callback the clock follows the host monotonic clock
/// (seconds since construction). The first callback's playback instant
/// becomes the origin, the device time of frame 0, so the reading is
/// continuous across stream start. Frame `n` plays at `origin + n / rate`.
///
/// A reading takes the latest callback's first frame and the host instant
/// it plays at, then extrapolates by host time. Prefill bursts deliver
/// frames early but report a correspondingly later playback instant, and a
/// late callback leaves earlier frames still playing, so neither shows up
/// as drift. The extrapolation stops at the last delivered frame; a stream
/// that has run dry never runs ahead.
///
/// **Writer:** the audio callback via [`SampleClock::on_callback`] (lock-free).
/// **Readers:** any thread via [`DeviceClock::now`]; a sequence counter lets
/// readers retry instead of seeing a half-written anchor.
#[derive(Debug)]
pub struct SampleClock {
    epoch: Instant,
    sample_rate: u32,
    seq: AtomicU64,
    started: AtomicBool,
    /// Host time frame 0 played (ns since `epoch`)
    origin_ns: AtomicU64,
    /// First frame of the latest callback
    anchor_frames: AtomicU64,
    /// Host time that frame plays (ns since `epoch`)
    anchor_play_ns: AtomicU64,
    /// Frames in the latest callback
    anchor_len: AtomicU64,
    /// Frames delivered so far (writer-owned)
    total_frames: AtomicU64,
}

struct Anchor {
    started: bool,
    origin_ns: u64,
    frames: u64,
    play_ns: u64,
    len: u64,
}

impl SampleClock {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            epoch: Instant::now(),
            sample_rate: sample_rate.max(1),
            seq: AtomicU64::new(0),
            started: AtomicBool::new(false),
            origin_ns: AtomicU64::new(0),
            anchor_frames: AtomicU64::new(0),
            anchor_play_ns: AtomicU64::new(0),
            anchor_len: AtomicU64::new(0),
            total_frames: AtomicU64::new(0),
        }
    }

    fn host_ns(&self) -> u64 {
        self.epoch.elapsed().as_nanos() as u64
    }

    /// Record a callback handing `frames` frames to the device.
    ///
    /// `latency` is the delay between the callback and the first frame
    /// reaching the DAC. Returns that frame's output DAC time in this
    /// clock's domain.
    ///
    /// **REAL-TIME SAFE**: atomics only.
    pub fn on_callback(&self, frames: usize, latency: Duration) -> f64 {
        self.on_callback_at(self.host_ns(), frames, latency)
    }

    /// [`SampleClock::on_callback`] at an explicit host time (ns since construction)
    pub(crate) fn on_callback_at(&self, host_ns: u64, frames: usize, latency: Duration) -> f64 {
        let play_ns = host_ns.saturating_add(latency.as_nanos() as u64);
        let delivered = self.total_frames.load(Ordering::Relaxed);

        let seq = self.seq.load(Ordering::Relaxed);
        self.seq.store(seq.wrapping_add(1), Ordering::Relaxed);
        fence(Ordering::Release);

        if !self.started.load(Ordering::Relaxed) {
            self.origin_ns.store(play_ns, Ordering::Relaxed);
            self.started.store(true, Ordering::Relaxed);
        }
        self.anchor_frames.store(delivered, Ordering::Relaxed);
        self.anchor_play_ns.store(play_ns, Ordering::Relaxed);
        self.anchor_len.store(frames as u64, Ordering::Relaxed);

        self.seq.store(seq.wrapping_add(2), Ordering::Release);

        self.total_frames
            .store(delivered + frames as u64, Ordering::Relaxed);

        let origin = self.origin_ns.load(Ordering::Relaxed);
        origin as f64 / 1e9 + delivered as f64 / f64::from(self.sample_rate)
    }

    /// Device time at an explicit host time (ns since construction)
    pub(crate) fn now_at(&self, now_ns: u64) -> f64 {
        let anchor = self.read_anchor();

        if !anchor.started {
            return now_ns as f64 / 1e9;
        }

        let rate = f64::from(self.sample_rate);
        let since_play = (now_ns as f64 - anchor.play_ns as f64) / 1e9;
        let cap = anchor.len as f64 / rate;

        anchor.origin_ns as f64 / 1e9 + anchor.frames as f64 / rate + since_play.min(cap)
    }

    fn read_anchor(&self) -> Anchor {
        loop {
            let before = self.seq.load(Ordering::Acquire);
            if before % 2 == 1 {
                std::hint::spin_loop();
                continue;
            }
            let anchor = Anchor {
                started: self.started.load(Ordering::Relaxed),
                origin_ns: self.origin_ns.load(Ordering::Relaxed),
                frames: self.anchor_frames.load(Ordering::Relaxed),
                play_ns: self.anchor_play_ns.load(Ordering::Relaxed),
                len: self.anchor_len.load(Ordering::Relaxed),
            };
            fence(Ordering::Acquire);
            if self.seq.load(Ordering::Relaxed) == before {
                return anchor;
            }
        }
    }
}

impl DeviceClock for SampleClock {
    fn now(&self) -> Result<f64> {
        Ok(self.now_at(self.host_ns()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: u64 = 1_000_000;

    #[test]
    fn test_system_wall_clock_is_epoch_seconds() {
        let now = SystemWallClock.now().unwrap();
        // Between 2000 and 2100
        assert!(now > 946_684_800.0 && now < 4_102_444_800.0);
    }

    #[test]
    fn test_sample_clock_follows_host_before_first_callback() {
        let clock = SampleClock::new(48_000);
        let a = clock.now().unwrap();
        std::thread::sleep(Duration::from_millis(5));
        let b = clock.now().unwrap();
        assert!(b - a >= 0.004);
    }

    #[test]
    fn test_first_callback_continues_host_time() {
        let clock = SampleClock::new(1_000);
        let before = clock.now_at(2 * MS);
        let dac = clock.on_callback_at(2 * MS, 10, Duration::from_millis(10));

        assert_eq!(before, 0.002);
        assert!((clock.now_at(2 * MS) - 0.002).abs() < 1e-12);
        // Frame 0 plays one latency after the callback
        assert_eq!(dac, 0.012);
    }

    #[test]
    fn test_dac_time_advances_by_buffer_length() {
        let clock = SampleClock::new(1_000);
        let first = clock.on_callback_at(0, 100, Duration::ZERO);
        let second = clock.on_callback_at(100 * MS, 100, Duration::ZERO);
        let third = clock.on_callback_at(200 * MS, 100, Duration::ZERO);

        assert!((second - first - 0.1).abs() < 1e-9);
        assert!((third - second - 0.1).abs() < 1e-9);
    }

    #[test]
    fn test_prefill_burst_does_not_move_clock() {
        let clock = SampleClock::new(1_000);
        clock.on_callback_at(0, 10, Duration::from_millis(10));
        // Back-to-back prefill: the second buffer queues behind the first
        clock.on_callback_at(0, 10, Duration::from_millis(20));
        assert!(clock.now_at(0).abs() < 1e-9);

        // Then paced at the device rate with two periods queued
        for k in 2..10u64 {
            let host = (k - 1) * 10 * MS;
            clock.on_callback_at(host, 10, Duration::from_millis(20));
            assert!((clock.now_at(host) - host as f64 / 1e9).abs() < 1e-9);
        }
    }

    #[test]
    fn test_late_callback_keeps_clock_running() {
        let clock = SampleClock::new(1_000);
        for k in 0..5u64 {
            clock.on_callback_at(k * 10 * MS, 10, Duration::from_millis(10));
        }
        // The next callback is 6 ms late; queued frames are still playing
        let host = 56 * MS;
        assert!((clock.now_at(host) - 0.056).abs() < 1e-9);
    }

    #[test]
    fn test_device_rate_shows_as_drift() {
        // Device consumes 1% slow: callbacks for 10 frames arrive every 10.1 ms
        let clock = SampleClock::new(1_000);
        let mut host = 0;
        for _ in 0..100 {
            clock.on_callback_at(host, 10, Duration::from_millis(10));
            host += 10_100_000;
        }
        // 99 periods after the origin callback, each 0.1 ms behind
        let lag = host as f64 / 1e9 - clock.now_at(host);
        assert!((lag - 0.0099).abs() < 1e-9);
    }

    #[test]
    fn test_drained_stream_does_not_run_ahead() {
        let clock = SampleClock::new(1_000);
        let dac = clock.on_callback_at(0, 5, Duration::ZERO);
        let now = clock.now_at(30 * MS);
        assert!((now - dac - 0.005).abs() < 1e-9);
    }
}
