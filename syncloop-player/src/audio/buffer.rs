//! Cyclic sample buffer
//!
//! Holds the whole loop in RAM as interleaved frames of a single sample type.
//! The buffer is read-only once built and is shared between the loader side
//! and the real-time callback through an `Arc<[T]>`, so cloning it is cheap
//! and never copies samples.

use crate::error::{Error, Result};
use cpal::FromSample;
use std::sync::Arc;
use tracing::warn;

/// Immutable interleaved PCM frames played as an endless loop.
///
/// **Format:**
/// - Interleaved: `[c0, c1, ..., c0, c1, ...]`, one frame per `channels` samples
/// - Invariant: at least one frame
/// - Frame index `i` is read as `i % frames()` by callers that wrap
#[derive(Debug, Clone)]
pub struct SampleBuffer<T> {
    samples: Arc<[T]>,
    channels: u16,
    sample_rate: u32,
    frames: usize,
}

impl<T: Copy> SampleBuffer<T> {
    /// Build a buffer from interleaved samples.
    ///
    /// A trailing partial frame is dropped with a warning.
    ///
    /// # Errors
    /// - `UnsupportedFormat` for zero channels or a zero sample rate
    /// - `EmptySampleBuffer` when no complete frame remains
    pub fn new(mut samples: Vec<T>, channels: u16, sample_rate: u32) -> Result<Self> {
        if channels == 0 {
            return Err(Error::UnsupportedFormat("zero channels".to_string()));
        }
        if sample_rate == 0 {
            return Err(Error::UnsupportedFormat("zero sample rate".to_string()));
        }

        let width = channels as usize;
        let remainder = samples.len() % width;
        if remainder != 0 {
            warn!(
                "Dropping {} trailing samples that do not form a whole {}-channel frame",
                remainder, channels
            );
            samples.truncate(samples.len() - remainder);
        }

        let frames = samples.len() / width;
        if frames == 0 {
            return Err(Error::EmptySampleBuffer);
        }

        Ok(Self {
            samples: samples.into(),
            channels,
            sample_rate,
            frames,
        })
    }

    /// Number of frames N in the loop
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Interleaved channel count
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Frames per second
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// All interleaved samples
    pub fn samples(&self) -> &[T] {
        &self.samples
    }

    /// Samples of frame `index`; `index` must be below `frames()`.
    #[inline]
    pub fn frame(&self, index: usize) -> &[T] {
        let width = self.channels as usize;
        let start = index * width;
        &self.samples[start..start + width]
    }

    /// Convert every sample to another sample type.
    ///
    /// Runs once at load time when the device cannot take the file's native
    /// format; never called from the audio callback.
    pub fn convert<U>(&self) -> SampleBuffer<U>
    where
        U: Copy + FromSample<T>,
    {
        let samples: Arc<[U]> = self.samples.iter().map(|&s| U::from_sample_(s)).collect();
        SampleBuffer {
            samples,
            channels: self.channels,
            sample_rate: self.sample_rate,
            frames: self.frames,
        }
    }
}
