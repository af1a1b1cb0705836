//! # syncloop Player Library (syncloop-player)
//!
//! Loops a WAV file through an audio output device, starting on a
//! wall-clock boundary shared by every instance (the next multiple of a
//! configured period) and keeping playback phase-locked to wall time by
//! correcting device-clock drift once per second.
//!
//! **Architecture:** hound loader → cyclic [`audio::SampleBuffer`] →
//! real-time [`playback::FillCallback`] driven by cpal, with
//! [`playback::ClockMonitor`] pushing corrections through the lock-free
//! [`playback::SyncState`].

pub mod audio;
pub mod error;
pub mod playback;

pub use error::{Error, Result};
pub use playback::SyncState;
