//! Sleep scheduling: converts the server-requested interval and hands it
//! to the power capability. Irrevocable once dispatched.

use log::info;

use crate::platform::PowerControl;
use crate::types::SleepArmed;

/// Fixed retry interval after a degraded cycle, independent of any
/// partially-fetched or previously held descriptor.
pub const FALLBACK_SLEEP_SECS: u32 = 30 * 60;

pub fn secs_from_minutes(minutes: u32) -> u32 {
    minutes.saturating_mul(60)
}

pub fn schedule(power: &mut impl PowerControl, duration_secs: u32) -> SleepArmed {
    info!("scheduling deep sleep for {duration_secs} s");
    power.enter_deep_sleep(duration_secs)
}

pub fn schedule_fallback(power: &mut impl PowerControl) -> SleepArmed {
    schedule(power, FALLBACK_SLEEP_SECS)
}
