//! WAV loading using hound
//!
//! Reads the whole file into a [`SampleBuffer`] in the file's native sample
//! type so the bytes reaching the device are the bytes in the file.
//!
//! # Sample Format Mapping
//!
//! | WAV encoding        | Buffer type |
//! |---------------------|-------------|
//! | 8-bit integer PCM   | `i8`        |
//! | 16-bit integer PCM  | `i16`       |
//! | 24-bit integer PCM  | `i32` (scaled to full range) |
//! | 32-bit integer PCM  | `i32`       |
//! | 32-bit float        | `f32`       |

use crate::audio::SampleBuffer;
use crate::error::{Error, Result};
use cpal::{FromSample, SampleFormat};
use hound::WavReader;
use std::path::Path;
use tracing::{debug, info};

/// Typed sample buffer as loaded from disk
#[derive(Debug, Clone)]
pub enum LoadedSamples {
    I8(SampleBuffer<i8>),
    I16(SampleBuffer<i16>),
    I32(SampleBuffer<i32>),
    F32(SampleBuffer<f32>),
}

impl LoadedSamples {
    /// The loop as sample type `U`, converting from the stored type.
    pub fn to_buffer<U>(&self) -> SampleBuffer<U>
    where
        U: Copy + FromSample<i8> + FromSample<i16> + FromSample<i32> + FromSample<f32>,
    {
        match self {
            LoadedSamples::I8(b) => b.convert(),
            LoadedSamples::I16(b) => b.convert(),
            LoadedSamples::I32(b) => b.convert(),
            LoadedSamples::F32(b) => b.convert(),
        }
    }
}

/// Decoded file plus the metadata reported to the user
#[derive(Debug, Clone)]
pub struct LoadedAudio {
    pub samples: LoadedSamples,
    /// Bits per sample as stored in the file
    pub bits_per_sample: u16,
}

impl LoadedAudio {
    /// Frames in the loop
    pub fn frames(&self) -> usize {
        match &self.samples {
            LoadedSamples::I8(b) => b.frames(),
            LoadedSamples::I16(b) => b.frames(),
            LoadedSamples::I32(b) => b.frames(),
            LoadedSamples::F32(b) => b.frames(),
        }
    }

    pub fn channels(&self) -> u16 {
        match &self.samples {
            LoadedSamples::I8(b) => b.channels(),
            LoadedSamples::I16(b) => b.channels(),
            LoadedSamples::I32(b) => b.channels(),
            LoadedSamples::F32(b) => b.channels(),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        match &self.samples {
            LoadedSamples::I8(b) => b.sample_rate(),
            LoadedSamples::I16(b) => b.sample_rate(),
            LoadedSamples::I32(b) => b.sample_rate(),
            LoadedSamples::F32(b) => b.sample_rate(),
        }
    }

    /// cpal sample format matching the buffer's sample type
    pub fn sample_format(&self) -> SampleFormat {
        match &self.samples {
            LoadedSamples::I8(_) => SampleFormat::I8,
            LoadedSamples::I16(_) => SampleFormat::I16,
            LoadedSamples::I32(_) => SampleFormat::I32,
            LoadedSamples::F32(_) => SampleFormat::F32,
        }
    }

    /// Loop length in seconds
    pub fn duration_secs(&self) -> f64 {
        self.frames() as f64 / f64::from(self.sample_rate())
    }
}

/// Load a WAV file completely into memory.
///
/// # Errors
/// - `Load` when the file cannot be opened or a sample fails to decode
/// - `UnsupportedFormat` for bit depths other than 8/16/24/32 integer or 32 float
/// - `EmptySampleBuffer` when the file holds no complete frame
pub fn load_wav<P: AsRef<Path>>(path: P) -> Result<LoadedAudio> {
    let path = path.as_ref();
    info!("Loading {}", path.display());

    let reader = WavReader::open(path)?;
    let spec = reader.spec();
    debug!("WAV spec: {:?}", spec);

    let channels = spec.channels;
    let rate = spec.sample_rate;

    let samples = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 8) => {
            let data = reader.into_samples::<i8>().collect::<std::result::Result<Vec<_>, _>>()?;
            LoadedSamples::I8(SampleBuffer::new(data, channels, rate)?)
        }
        (hound::SampleFormat::Int, 16) => {
            let data = reader.into_samples::<i16>().collect::<std::result::Result<Vec<_>, _>>()?;
            LoadedSamples::I16(SampleBuffer::new(data, channels, rate)?)
        }
        (hound::SampleFormat::Int, 24) => {
            // hound yields 24-bit values right-aligned in an i32
            let data = reader
                .into_samples::<i32>()
                .map(|s| s.map(|v| v << 8))
                .collect::<std::result::Result<Vec<_>, _>>()?;
            LoadedSamples::I32(SampleBuffer::new(data, channels, rate)?)
        }
        (hound::SampleFormat::Int, 32) => {
            let data = reader.into_samples::<i32>().collect::<std::result::Result<Vec<_>, _>>()?;
            LoadedSamples::I32(SampleBuffer::new(data, channels, rate)?)
        }
        (hound::SampleFormat::Float, 32) => {
            let data = reader.into_samples::<f32>().collect::<std::result::Result<Vec<_>, _>>()?;
            LoadedSamples::F32(SampleBuffer::new(data, channels, rate)?)
        }
        (format, bits) => {
            return Err(Error::UnsupportedFormat(format!(
                "{:?} samples with {} bits",
                format, bits
            )));
        }
    };

    let loaded = LoadedAudio {
        samples,
        bits_per_sample: spec.bits_per_sample,
    };

    info!(
        "File length: {:.3} seconds and {} frames",
        loaded.duration_secs(),
        loaded.frames()
    );
    info!(
        "Sample rate {}, channels {}, sample width {} bits",
        loaded.sample_rate(),
        loaded.channels(),
        loaded.bits_per_sample
    );

    Ok(loaded)
}
