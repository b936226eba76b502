//! Hardware seams. The wake-cycle logic only ever talks to these traits;
//! the `display` crate implements them against esp-idf or as a desktop
//! simulator, and the tests implement them as recording doubles.

use core::time::Duration;

use crate::types::{SleepArmed, TransportError, WakeCause};

pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Narrow HTTP surface used by the config fetcher.
pub trait HttpFetch {
    fn get(&mut self, url: &str) -> Result<HttpResponse, TransportError>;

    /// Blocking wait between fetch attempts. Production implementations
    /// sleep the calling thread; doubles record the requested delay.
    fn pause(&mut self, delay: Duration);
}

/// E-paper display collaborator. The boolean returns are the only error
/// signal this layer produces; drawing internals are out of scope here.
pub trait Panel {
    fn clear_frame(&mut self);

    /// Draws the target image into the working frame buffer. False when
    /// the source is unreadable or the format unsupported.
    fn draw_image(&mut self, url: &str) -> bool;

    /// Rebuilds the previously committed frame as a partial-update
    /// baseline. False when no usable baseline could be restored.
    fn restore_prior_frame(&mut self, url: &str) -> bool;

    fn draw_error_banner(&mut self, message: &str);

    /// Fast commit redrawing only changed regions; leaves ghosting behind
    /// over repeated use.
    fn commit_partial(&mut self);

    /// Slow whole-panel commit; clears accumulated ghosting.
    fn commit_full(&mut self);
}

/// Power and clock capability.
pub trait PowerControl {
    /// Reads the hardware wake-cause register for the current boot.
    fn wake_cause(&self) -> WakeCause;

    /// Programs the next wake source (RTC alarm at current epoch plus the
    /// duration, or a hardware timer), arms the external wake pin, and
    /// enters deep low-power mode. Irrevocable: on hardware nothing after
    /// this call executes in the current power cycle. Test implementations
    /// record the call and return the marker instead of suspending.
    fn enter_deep_sleep(&mut self, duration_secs: u32) -> SleepArmed;
}

/// Counter in the low-power retention domain: survives deep sleep, resets
/// to zero only on cold power loss.
pub trait WakeCounter {
    fn get(&self) -> u32;

    /// Adds one and returns the new value.
    fn increment(&mut self) -> u32;

    fn reset(&mut self);
}
