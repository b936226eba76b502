//! Recording doubles for the platform traits, shared by the unit tests.

use core::time::Duration;

use crate::platform::{HttpFetch, HttpResponse, Panel, PowerControl, WakeCounter};
use crate::types::{SleepArmed, TransportError, WakeCause};

/// Serves a scripted sequence of responses and records all traffic.
pub struct ScriptedHttp {
    script: Vec<Result<HttpResponse, TransportError>>,
    next: usize,
    pub requests: Vec<String>,
    pub pauses: Vec<Duration>,
}

impl ScriptedHttp {
    pub fn new(script: Vec<Result<HttpResponse, TransportError>>) -> Self {
        Self {
            script,
            next: 0,
            requests: Vec::new(),
            pauses: Vec::new(),
        }
    }

    /// One response per status code, each carrying `body`.
    pub fn statuses(statuses: &[u16], body: &str) -> Self {
        Self::new(
            statuses
                .iter()
                .map(|status| {
                    Ok(HttpResponse {
                        status: *status,
                        body: body.as_bytes().to_vec(),
                    })
                })
                .collect(),
        )
    }

    /// `count` transport errors carrying `message`.
    pub fn failing(count: usize, message: &str) -> Self {
        Self::new(
            (0..count)
                .map(|_| Err(TransportError(message.to_string())))
                .collect(),
        )
    }
}

impl HttpFetch for ScriptedHttp {
    fn get(&mut self, url: &str) -> Result<HttpResponse, TransportError> {
        self.requests.push(url.to_string());
        let index = self.next;
        self.next += 1;
        match self.script.get(index) {
            Some(slot) => match slot {
                Ok(response) => Ok(HttpResponse {
                    status: response.status,
                    body: response.body.clone(),
                }),
                Err(err) => Err(err.clone()),
            },
            None => panic!("transport script exhausted after {index} requests"),
        }
    }

    fn pause(&mut self, delay: Duration) {
        self.pauses.push(delay);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PanelOp {
    Restore(String),
    Clear,
    Draw(String),
    ErrorBanner(String),
    CommitPartial,
    CommitFull,
}

#[derive(Default)]
pub struct RecordingPanel {
    pub ops: Vec<PanelOp>,
    pub fail_restore: bool,
    pub fail_draw: bool,
}

impl Panel for RecordingPanel {
    fn clear_frame(&mut self) {
        self.ops.push(PanelOp::Clear);
    }

    fn draw_image(&mut self, url: &str) -> bool {
        self.ops.push(PanelOp::Draw(url.to_string()));
        !self.fail_draw
    }

    fn restore_prior_frame(&mut self, url: &str) -> bool {
        self.ops.push(PanelOp::Restore(url.to_string()));
        !self.fail_restore
    }

    fn draw_error_banner(&mut self, message: &str) {
        self.ops.push(PanelOp::ErrorBanner(message.to_string()));
    }

    fn commit_partial(&mut self) {
        self.ops.push(PanelOp::CommitPartial);
    }

    fn commit_full(&mut self) {
        self.ops.push(PanelOp::CommitFull);
    }
}

/// Records armed sleep durations instead of suspending, so the state
/// machine can be driven all the way through `Sleeping`.
pub struct RecordingPower {
    pub cause: WakeCause,
    pub armed: Vec<u32>,
}

impl RecordingPower {
    pub fn new(cause: WakeCause) -> Self {
        Self {
            cause,
            armed: Vec::new(),
        }
    }
}

impl PowerControl for RecordingPower {
    fn wake_cause(&self) -> WakeCause {
        self.cause
    }

    fn enter_deep_sleep(&mut self, duration_secs: u32) -> SleepArmed {
        self.armed.push(duration_secs);
        SleepArmed { duration_secs }
    }
}

/// In-memory stand-in for the retention-domain counter; lets tests walk
/// multiple cycles without hardware.
#[derive(Default)]
pub struct MemCounter(pub u32);

impl WakeCounter for MemCounter {
    fn get(&self) -> u32 {
        self.0
    }

    fn increment(&mut self) -> u32 {
        self.0 += 1;
        self.0
    }

    fn reset(&mut self) {
        self.0 = 0;
    }
}
