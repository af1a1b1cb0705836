//! # syncloop Common Library
//!
//! Shared code for the syncloop workspace:
//! - Configuration file model and setting resolution
//! - Wall-clock helpers (next round time, seconds/frames conversion)
//! - Common error type

pub mod config;
pub mod error;
pub mod time;

pub use config::{Settings, SettingsOverrides, TomlConfig};
pub use error::{Error, Result};
