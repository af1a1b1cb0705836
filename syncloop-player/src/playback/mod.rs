//! Looped playback: real-time fill, start alignment and drift supervision

pub mod clock;
pub mod clock_monitor;
pub mod drift;
pub mod engine;
pub mod fill;
pub mod start_sync;
pub mod state;

pub use clock::{DeviceClock, SampleClock, SystemWallClock, WallClock};
pub use clock_monitor::{ClockMonitor, MonitorConfig, TickOutcome};
pub use drift::DriftCorrector;
pub use engine::PlaybackEngine;
pub use fill::{FillCallback, FillStatus};
pub use start_sync::{StartPlan, StartSynchronizer};
pub use state::{CallbackStats, CallbackStatsSnapshot, StartFlag, SyncState};
