//! Shared helpers for syncloop-player integration tests

#![allow(dead_code)]

use hound::{SampleFormat, WavSpec, WavWriter};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use syncloop_player::playback::{DeviceClock, WallClock};
use syncloop_player::Result;
use tempfile::TempDir;

/// Write a WAV file whose samples are produced by `sample(i)` for each
/// interleaved sample index.
pub fn write_wav<S, F>(dir: &TempDir, name: &str, spec: WavSpec, samples: usize, sample: F) -> PathBuf
where
    S: hound::Sample,
    F: Fn(usize) -> S,
{
    let path = dir.path().join(name);
    let mut writer = WavWriter::create(&path, spec).unwrap();
    for i in 0..samples {
        writer.write_sample(sample(i)).unwrap();
    }
    writer.finalize().unwrap();
    path
}

pub fn int_spec(channels: u16, sample_rate: u32, bits: u16) -> WavSpec {
    WavSpec {
        channels,
        sample_rate,
        bits_per_sample: bits,
        sample_format: SampleFormat::Int,
    }
}

pub fn float_spec(channels: u16, sample_rate: u32) -> WavSpec {
    WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    }
}


/// Clock whose reading the test sets directly
pub struct ManualClock(AtomicU64);

impl ManualClock {
    pub fn new(value: f64) -> Self {
        Self(AtomicU64::new(value.to_bits()))
    }

    pub fn set(&self, value: f64) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.0.load(Ordering::Relaxed))
    }
}

impl WallClock for ManualClock {
    fn now(&self) -> Result<f64> {
        Ok(self.get())
    }
}

impl DeviceClock for ManualClock {
    fn now(&self) -> Result<f64> {
        Ok(self.get())
    }
}
