//! Audio output using cpal
//!
//! Opens the output device, negotiates a sample format for the loaded file
//! and drives a fixed-size output stream with the real-time fill callback.

use crate::error::{Error, Result};
use crate::playback::clock::SampleClock;
use crate::playback::fill::FillCallback;
use crate::playback::state::SyncState;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{BufferSize, Device, SampleFormat, SampleRate, SizedSample, Stream, StreamConfig, StreamError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Formats the loop can be held in, best first
const FORMAT_PREFERENCE: [SampleFormat; 4] = [
    SampleFormat::F32,
    SampleFormat::I32,
    SampleFormat::I16,
    SampleFormat::I8,
];

/// Output device plus the stream playing on it.
pub struct AudioOutput {
    device: Device,
    device_name: String,
    stream: Option<Stream>,
}

impl AudioOutput {
    /// List available audio output devices.
    pub fn list_devices() -> Result<Vec<String>> {
        let host = cpal::default_host();

        let devices: Vec<String> = host
            .output_devices()
            .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?
            .filter_map(|device| device.name().ok())
            .collect();

        debug!("Found {} output devices", devices.len());
        Ok(devices)
    }

    /// Open an output device by name, falling back to the default device
    /// when the name is not found.
    pub fn open(device_name: Option<&str>) -> Result<Self> {
        let host = cpal::default_host();

        let device = match device_name {
            Some(name) => {
                let mut devices = host
                    .output_devices()
                    .map_err(|e| Error::AudioOutput(format!("Failed to enumerate devices: {}", e)))?;

                match devices.find(|d| d.name().ok().as_deref() == Some(name)) {
                    Some(dev) => {
                        info!("Found requested audio device: {}", name);
                        dev
                    }
                    None => {
                        warn!("Requested device '{}' not found, falling back to default device", name);
                        host.default_output_device().ok_or_else(|| {
                            Error::AudioOutput(format!(
                                "Device '{}' not found and no default device available",
                                name
                            ))
                        })?
                    }
                }
            }
            None => host
                .default_output_device()
                .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?,
        };

        let device_name = device.name().unwrap_or_else(|_| "Unknown".to_string());
        info!("Using audio device: {}", device_name);

        Ok(Self {
            device,
            device_name,
            stream: None,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Pick the sample format to stream in.
    ///
    /// The device must support the file's channel count and rate; the rate
    /// is never converted. Among the formats it supports there, `preferred`
    /// (the file's own format) wins, otherwise the best of [`FORMAT_PREFERENCE`].
    pub fn negotiate(&self, channels: u16, sample_rate: u32, preferred: SampleFormat) -> Result<SampleFormat> {
        let supported: Vec<SampleFormat> = self
            .device
            .supported_output_configs()
            .map_err(|e| Error::AudioOutput(format!("Failed to get device configs: {}", e)))?
            .filter(|config| {
                config.channels() == channels
                    && config.min_sample_rate().0 <= sample_rate
                    && config.max_sample_rate().0 >= sample_rate
            })
            .map(|config| config.sample_format())
            .collect();

        let format = choose_format(&supported, preferred).ok_or_else(|| {
            Error::UnsupportedFormat(format!(
                "device '{}' cannot play {} channel(s) at {} Hz",
                self.device_name, channels, sample_rate
            ))
        })?;

        if format != preferred {
            info!(
                "Device does not accept {:?}; converting loop to {:?}",
                preferred, format
            );
        }
        Ok(format)
    }

    /// Build a paused stream that pulls every buffer from `callback`.
    ///
    /// The stream uses a fixed buffer of `buffer_frames` frames. Each data
    /// callback advances `clock` and hands the callback the DAC time of its
    /// first frame. Stream errors land in `state`'s statistics; a lost
    /// device is a fault the clock monitor acts on.
    pub fn build<T>(
        &mut self,
        mut callback: FillCallback<T>,
        clock: Arc<SampleClock>,
        state: Arc<SyncState>,
        channels: u16,
        sample_rate: u32,
        buffer_frames: u32,
    ) -> Result<()>
    where
        T: SizedSample + Send + Sync + 'static,
    {
        let config = StreamConfig {
            channels,
            sample_rate: SampleRate(sample_rate),
            buffer_size: BufferSize::Fixed(buffer_frames),
        };
        let width = usize::from(channels.max(1));

        debug!(
            "Audio config: sample_rate={}, channels={}, format={:?}, buffer_size={:?}",
            config.sample_rate.0,
            config.channels,
            T::FORMAT,
            config.buffer_size
        );

        let stream = self
            .device
            .build_output_stream(
                &config,
                move |data: &mut [T], info: &cpal::OutputCallbackInfo| {
                    let timestamp = info.timestamp();
                    let latency = timestamp
                        .playback
                        .duration_since(&timestamp.callback)
                        .unwrap_or(Duration::ZERO);
                    let dac_time = clock.on_callback(data.len() / width, latency);
                    // An abort is already in the shared stats; the monitor's fault poll stops the stream
                    let _ = callback.fill(data, dac_time);
                },
                move |err| match err {
                    StreamError::DeviceNotAvailable => {
                        error!("Audio stream error: {}", err);
                        state.stats.record_device_lost();
                    }
                    other => {
                        warn!("Audio stream error: {}", other);
                        state.stats.record_stream_error();
                    }
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))?;

        self.stream = Some(stream);
        Ok(())
    }

    /// Start the built stream
    pub fn play(&self) -> Result<()> {
        let stream = self
            .stream
            .as_ref()
            .ok_or_else(|| Error::AudioOutput("No stream to start".to_string()))?;
        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;
        info!("Audio stream started");
        Ok(())
    }

    /// Stop audio playback.
    ///
    /// Pauses the stream and drops it, which closes the device.
    pub fn stop(&mut self) -> Result<()> {
        if let Some(stream) = self.stream.take() {
            info!("Stopping audio stream");
            stream
                .pause()
                .map_err(|e| Error::AudioOutput(format!("Failed to pause stream: {}", e)))?;
            drop(stream);
        }

        Ok(())
    }
}

impl Drop for AudioOutput {
    fn drop(&mut self) {
        // Ensure stream is stopped on drop
        let _ = self.stop();
    }
}

/// Choose among the formats a device supports at the wanted rate/channels.
pub fn choose_format(supported: &[SampleFormat], preferred: SampleFormat) -> Option<SampleFormat> {
    if supported.contains(&preferred) {
        return Some(preferred);
    }
    FORMAT_PREFERENCE
        .iter()
        .copied()
        .find(|format| supported.contains(format))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_devices() {
        // Depends on audio hardware; must not panic either way
        let result = AudioOutput::list_devices();
        assert!(result.is_ok() || result.is_err());
    }

    #[test]
    fn test_native_format_preferred() {
        let supported = [SampleFormat::F32, SampleFormat::I16];
        assert_eq!(choose_format(&supported, SampleFormat::I16), Some(SampleFormat::I16));
    }

    #[test]
    fn test_falls_back_to_best_supported() {
        let supported = [SampleFormat::I16, SampleFormat::F32];
        assert_eq!(choose_format(&supported, SampleFormat::I8), Some(SampleFormat::F32));

        let supported = [SampleFormat::U16, SampleFormat::I16];
        assert_eq!(choose_format(&supported, SampleFormat::I32), Some(SampleFormat::I16));
    }

    #[test]
    fn test_no_usable_format() {
        assert_eq!(choose_format(&[], SampleFormat::I16), None);
        assert_eq!(choose_format(&[SampleFormat::U8], SampleFormat::I16), None);
    }
}
