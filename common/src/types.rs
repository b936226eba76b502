use thiserror::Error;

/// Hardware-reported reason the device left deep sleep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakeCause {
    TimerAlarm,
    ExternalPin,
    PowerOn,
    Other,
}

impl WakeCause {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::TimerAlarm => "TIMER_ALARM",
            Self::ExternalPin => "EXTERNAL_PIN",
            Self::PowerOn => "POWER_ON",
            Self::Other => "OTHER",
        }
    }

    /// True when the wake came from a source we armed ourselves before the
    /// last deep-sleep entry (the timer/RTC alarm or the external pin).
    pub fn is_scheduled(self) -> bool {
        matches!(self, Self::TimerAlarm | Self::ExternalPin)
    }
}

/// Remote dashboard descriptor, rebuilt from scratch on every successful
/// fetch. Both URLs are already resolved against the server base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub image_url: String,
    pub archived_image_url: String,
    /// Server-requested sleep interval; strictly positive, validated at
    /// parse time.
    pub time_to_sleep_minutes: u32,
}

/// Per-wake state machine positions. Each wake event walks these once, in
/// order; `Sleeping` ends in hardware deep sleep and the next `Booting`
/// happens only after a physical wake.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Booting,
    ConfigLoaded,
    Rendering,
    Sleeping,
}

impl CycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Booting => "BOOTING",
            Self::ConfigLoaded => "CONFIG_LOADED",
            Self::Rendering => "RENDERING",
            Self::Sleeping => "SLEEPING",
        }
    }
}

/// Terminal marker handed back by
/// [`PowerControl::enter_deep_sleep`](crate::platform::PowerControl::enter_deep_sleep).
///
/// On hardware that call never actually returns; test and simulator
/// implementations record it and return this marker so the scheduled
/// duration can be asserted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SleepArmed {
    pub duration_secs: u32,
}

/// How a cycle ended, short of the deep-sleep entry itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Normal path: the descriptor was fetched and the panel committed.
    Rendered {
        full_update: bool,
        /// False when the target image failed to draw and the error
        /// indicator was committed in its place.
        image_drawn: bool,
    },
    /// Degraded path: fetch failed, the error banner was committed and the
    /// fixed fallback sleep was armed.
    Degraded(FetchError),
}

/// Summary of one wake cycle, returned by the controller for logging and
/// for exercising the state machine without hardware.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub wake_cause: WakeCause,
    pub wakeup_counter: u32,
    pub outcome: CycleOutcome,
    pub sleep: SleepArmed,
}

/// Transport-level failure raised before any HTTP status line was read.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Server unreachable or the connection died mid-request.
    #[error("network error: {0}")]
    Network(String),
    /// Every attempt produced a non-200 status; carries the last one seen.
    #[error("descriptor request failed with HTTP {0}")]
    HttpStatus(u16),
    /// A 200 response whose body is missing or mistypes the named field.
    /// Never retried and never mutates a previously held descriptor.
    #[error("descriptor field `{0}` missing or invalid")]
    Parse(&'static str),
}
