//! Start alignment
//!
//! Independent instances agree on a start instant without talking to each
//! other: each one rounds its wall clock up to the next multiple of the same
//! period. The wall-clock target is translated into the device-clock domain
//! with an offset measured just before the stream starts, and handed to the
//! audio callback through the [`StartFlag`].

use super::clock::{DeviceClock, WallClock};
use super::state::StartFlag;
use crate::error::{Error, Result};
use syncloop_common::time::{format_local, next_round_time};
use tracing::{debug, info};

/// Start instant in both clock domains
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StartPlan {
    /// Wall-clock start instant (epoch seconds)
    pub target_wall: f64,
    /// `wall - device` at arming time
    pub offset: f64,
    /// Device-clock instant stored in the start flag
    pub target_instant: f64,
}

impl StartPlan {
    /// Translate a wall-clock target using a measured offset
    pub fn new(target_wall: f64, offset: f64) -> Self {
        Self {
            target_wall,
            offset,
            target_instant: target_wall - offset,
        }
    }
}

/// Computes and arms the shared start instant.
#[derive(Debug, Clone, Copy)]
pub struct StartSynchronizer {
    period_secs: f64,
}

impl StartSynchronizer {
    pub fn new(period_secs: f64) -> Result<Self> {
        if !period_secs.is_finite() || period_secs <= 0.0 {
            return Err(Error::Config(syncloop_common::Error::InvalidInput(format!(
                "start period must be positive, got {}",
                period_secs
            ))));
        }
        Ok(Self { period_secs })
    }

    /// Next period boundary strictly after the current wall-clock time.
    ///
    /// # Errors
    /// `ClockRead` when the wall clock cannot be read; fatal for startup.
    pub fn target_wall(&self, wall: &dyn WallClock) -> Result<f64> {
        let now = wall.now()?;
        let target = next_round_time(now, self.period_secs);
        info!("Starting to play at {}", format_local(target));
        Ok(target)
    }

    /// Measure the wall/device offset and arm `flag` with the device-clock target.
    ///
    /// Must run before the stream starts delivering audio; divergence between
    /// the clocks after this point shows up as first-frame alignment error
    /// until the clock monitor's first correction.
    ///
    /// # Errors
    /// `ClockRead` when either clock cannot be read; fatal for startup.
    pub fn arm(
        &self,
        target_wall: f64,
        wall: &dyn WallClock,
        device: &dyn DeviceClock,
        flag: &StartFlag,
    ) -> Result<StartPlan> {
        let offset = measure_offset(wall, device)?;
        let plan = StartPlan::new(target_wall, offset);
        flag.arm(plan.target_instant);
        debug!(
            "Start armed: wall target {:.6}, offset {:.6}s, device target {:.6}",
            plan.target_wall, plan.offset, plan.target_instant
        );
        Ok(plan)
    }
}

/// `wall_now - device_now`
pub fn measure_offset(wall: &dyn WallClock, device: &dyn DeviceClock) -> Result<f64> {
    let wall_now = wall.now()?;
    let device_now = device.now()?;
    Ok(wall_now - device_now)
}
