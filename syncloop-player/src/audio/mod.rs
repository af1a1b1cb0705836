//! Audio buffer, WAV loading and cpal output

pub mod buffer;
pub mod loader;
pub mod output;

pub use buffer::SampleBuffer;
pub use loader::{load_wav, LoadedAudio, LoadedSamples};
pub use output::AudioOutput;
