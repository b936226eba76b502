//! Desktop backend: runs wake cycles against simulated collaborators so
//! the whole state machine can be watched without hardware. Deep sleep is
//! compressed to a short beat between cycles.

use std::time::Duration;

use tracing::{info, warn};

use dashboard_common::{
    ConfigFetcher, CycleOutcome, HttpFetch, HttpResponse, Panel, PowerControl, RuntimeConfig,
    SleepArmed, TransportError, WakeCause, WakeCounter, WakeCycleController,
};

/// Backend behavior, selected with `SIM_SCENARIO`.
#[derive(Clone, Copy)]
enum Scenario {
    /// Every request answers 200 with a fresh descriptor.
    Ok,
    /// Two server errors before each successful attempt.
    Flaky,
    /// The server never answers with 200.
    Down,
    /// 200 responses with the image URL missing from the body.
    Garbled,
}

impl Scenario {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "ok" => Some(Self::Ok),
            "flaky" => Some(Self::Flaky),
            "down" => Some(Self::Down),
            "garbled" => Some(Self::Garbled),
            _ => None,
        }
    }
}

struct SimTransport {
    scenario: Scenario,
    attempts: u32,
    sleep_minutes: u32,
}

impl SimTransport {
    fn descriptor(&self) -> HttpResponse {
        ok_response(serde_json::json!({
            "imageUrl": "images/current.png",
            "archivedImageUrl": "images/previous.png",
            "timeToSleep": self.sleep_minutes,
        }))
    }
}

impl HttpFetch for SimTransport {
    fn get(&mut self, url: &str) -> Result<HttpResponse, TransportError> {
        self.attempts += 1;
        info!("GET {url} (attempt {})", self.attempts);

        match self.scenario {
            Scenario::Ok => Ok(self.descriptor()),
            Scenario::Flaky if self.attempts % 3 != 0 => Ok(server_error()),
            Scenario::Flaky => Ok(self.descriptor()),
            Scenario::Down => Ok(server_error()),
            Scenario::Garbled => Ok(ok_response(serde_json::json!({
                "archivedImageUrl": "images/previous.png",
                "timeToSleep": self.sleep_minutes,
            }))),
        }
    }

    fn pause(&mut self, delay: Duration) {
        info!("retry pause of {delay:?} skipped in simulation");
    }
}

fn server_error() -> HttpResponse {
    HttpResponse {
        status: 503,
        body: Vec::new(),
    }
}

fn ok_response(body: serde_json::Value) -> HttpResponse {
    HttpResponse {
        status: 200,
        body: body.to_string().into_bytes(),
    }
}

struct SimPanel;

impl Panel for SimPanel {
    fn clear_frame(&mut self) {
        info!("panel: clear frame");
    }

    fn draw_image(&mut self, url: &str) -> bool {
        info!("panel: draw `{url}`");
        true
    }

    fn restore_prior_frame(&mut self, url: &str) -> bool {
        info!("panel: restore baseline `{url}`");
        true
    }

    fn draw_error_banner(&mut self, message: &str) {
        warn!("panel: error banner `{message}`");
    }

    fn commit_partial(&mut self) {
        info!("panel: partial commit");
    }

    fn commit_full(&mut self) {
        info!("panel: full commit");
    }
}

struct SimPower {
    next_cause: WakeCause,
}

impl PowerControl for SimPower {
    fn wake_cause(&self) -> WakeCause {
        self.next_cause
    }

    fn enter_deep_sleep(&mut self, duration_secs: u32) -> SleepArmed {
        info!("deep sleep armed for {duration_secs} s (simulated)");
        SleepArmed { duration_secs }
    }
}

#[derive(Default)]
struct SimCounter(u32);

impl WakeCounter for SimCounter {
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

pub async fn run() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cycles = env_u32("SIM_CYCLES", 8);
    let sleep_minutes = env_u32("SIM_SLEEP_MINUTES", 15);
    let scenario_name = std::env::var("SIM_SCENARIO").unwrap_or_else(|_| "ok".to_string());
    let scenario = Scenario::parse(&scenario_name)
        .ok_or_else(|| anyhow::anyhow!("unknown SIM_SCENARIO `{scenario_name}`"))?;

    let runtime = RuntimeConfig::default();
    info!(
        "simulator: {cycles} cycle(s), scenario `{scenario_name}`, server `{}`, room `{}`",
        runtime.dashboard.server_url, runtime.dashboard.room
    );

    let mut panel = SimPanel;
    let mut power = SimPower {
        next_cause: WakeCause::PowerOn,
    };
    let mut counter = SimCounter::default();
    let mut controller = WakeCycleController::new(ConfigFetcher::new(
        &runtime.dashboard.server_url,
        &runtime.dashboard.room,
    ));

    for _ in 0..cycles {
        let mut transport = SimTransport {
            scenario,
            attempts: 0,
            sleep_minutes,
        };
        let report = controller.run(&mut transport, &mut panel, &mut power, &mut counter);

        match &report.outcome {
            CycleOutcome::Rendered {
                full_update,
                image_drawn,
            } => info!(
                "cycle {}: rendered (full={full_update}, image_drawn={image_drawn}), sleeping {} s",
                report.wakeup_counter, report.sleep.duration_secs
            ),
            CycleOutcome::Degraded(err) => warn!(
                "cycle {}: degraded ({err}), sleeping {} s",
                report.wakeup_counter, report.sleep.duration_secs
            ),
        }

        // Every later wake is the timer alarm firing.
        power.next_cause = WakeCause::TimerAlarm;
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    Ok(())
}

fn env_u32(name: &str, default: u32) -> u32 {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
