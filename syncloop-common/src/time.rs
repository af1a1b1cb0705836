//! Timestamp utilities
//!
//! Wall-clock instants are carried through the playback core as `f64`
//! seconds since the Unix epoch so they can be subtracted from device-clock
//! readings directly. Conversions between seconds and frame counts live here
//! so every producer rounds the same way.

use chrono::{DateTime, Local, TimeZone, Utc};

/// Get current UTC timestamp
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Convert a UTC timestamp to fractional seconds since the Unix epoch
pub fn to_epoch_seconds(t: DateTime<Utc>) -> f64 {
    t.timestamp() as f64 + f64::from(t.timestamp_subsec_nanos()) / 1_000_000_000.0
}

/// Convert fractional epoch seconds back to a UTC timestamp
///
/// Returns `None` for values chrono cannot represent (NaN, out of range).
pub fn from_epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() {
        return None;
    }
    let whole = secs.floor();
    let nanos = (((secs - whole) * 1_000_000_000.0).round() as u32).min(999_999_999);
    Utc.timestamp_opt(whole as i64, nanos).single()
}

/// Next instant strictly after `now_secs` that is a multiple of `period_secs`
///
/// A `now_secs` that already sits on a multiple waits one full period:
/// with a 10 s period, 14:23:24 gives 14:23:30 and 14:23:30 gives 14:23:40.
pub fn next_round_time(now_secs: f64, period_secs: f64) -> f64 {
    now_secs + (period_secs - now_secs.rem_euclid(period_secs))
}

/// Convert seconds to a whole number of frames, rounding half to even
pub fn seconds_to_frames(seconds: f64, sample_rate: u32) -> i64 {
    (seconds * f64::from(sample_rate)).round_ties_even() as i64
}

/// Convert a frame count to seconds
pub fn frames_to_seconds(frames: i64, sample_rate: u32) -> f64 {
    frames as f64 / f64::from(sample_rate)
}

/// Format epoch seconds as a local-time string with millisecond precision
pub fn format_local(secs: f64) -> String {
    match from_epoch_seconds(secs) {
        Some(t) => t
            .with_timezone(&Local)
            .format("%a %b %e %H:%M:%S%.3f %Y")
            .to_string(),
        None => format!("{:.3}s", secs),
    }
}
