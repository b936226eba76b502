pub mod config;
pub mod cycle;
pub mod fetch;
pub mod platform;
pub mod refresh;
pub mod sleep;
pub mod types;

#[cfg(test)]
pub(crate) mod testutil;

pub use config::{DashboardConfig, NetworkConfig, RuntimeConfig};
pub use cycle::WakeCycleController;
pub use fetch::{resolve_url, ConfigFetcher, FETCH_ATTEMPTS, FETCH_RETRY_DELAY};
pub use platform::{HttpFetch, HttpResponse, Panel, PowerControl, WakeCounter};
pub use refresh::{RefreshDecision, RefreshStrategy, RenderSummary, FULL_REFRESH_EVERY};
pub use sleep::FALLBACK_SLEEP_SECS;
pub use types::{
    CycleOutcome, CycleReport, CycleState, FetchError, RemoteConfig, SleepArmed, TransportError,
    WakeCause,
};
