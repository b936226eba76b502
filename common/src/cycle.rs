use log::{debug, info, warn};

use crate::fetch::ConfigFetcher;
use crate::platform::{HttpFetch, Panel, PowerControl, WakeCounter};
use crate::refresh::{RefreshDecision, RefreshStrategy};
use crate::sleep;
use crate::types::{CycleOutcome, CycleReport, CycleState, FetchError, WakeCause};

/// Drives one wake cycle: `Booting → ConfigLoaded → Rendering → Sleeping`.
///
/// There is no loop here. `Sleeping` hands control to the power layer,
/// whose deep-sleep entry is terminal on hardware; the next cycle starts
/// from a fresh boot after the physical wake. Test backends get the
/// [`CycleReport`] back instead.
pub struct WakeCycleController {
    fetcher: ConfigFetcher,
    state: CycleState,
}

impl WakeCycleController {
    pub fn new(fetcher: ConfigFetcher) -> Self {
        Self {
            fetcher,
            state: CycleState::Booting,
        }
    }

    pub fn run(
        &mut self,
        transport: &mut impl HttpFetch,
        panel: &mut impl Panel,
        power: &mut impl PowerControl,
        counter: &mut impl WakeCounter,
    ) -> CycleReport {
        self.state = CycleState::Booting;

        // Counter bump comes first: every decision below reads the value
        // for this cycle, not the previous one.
        let wakeup_counter = counter.increment();
        let wake_cause = power.wake_cause();
        info!(
            "wake cycle {} started, cause {}",
            wakeup_counter,
            wake_cause.as_str()
        );

        let config = match self.fetcher.fetch(transport) {
            Ok(config) => config,
            Err(err) => {
                return self.degrade(err, wake_cause, wakeup_counter, panel, power);
            }
        };
        self.transition(CycleState::ConfigLoaded);
        info!(
            "descriptor: image `{}`, archived `{}`, sleep {} min",
            config.image_url, config.archived_image_url, config.time_to_sleep_minutes
        );

        self.transition(CycleState::Rendering);
        let decision = RefreshDecision::evaluate(wake_cause, wakeup_counter);
        let summary = RefreshStrategy::new(decision).render(panel, &config);

        self.transition(CycleState::Sleeping);
        let armed = sleep::schedule(
            power,
            sleep::secs_from_minutes(config.time_to_sleep_minutes),
        );

        CycleReport {
            wake_cause,
            wakeup_counter,
            outcome: CycleOutcome::Rendered {
                full_update: summary.full_update,
                image_drawn: summary.image_drawn,
            },
            sleep: armed,
        }
    }

    /// Fetch failed (or its 200 body did not parse): skip the normal
    /// rendering logic, commit a visible error banner, and retry after the
    /// fixed fallback interval instead of waiting out a stale
    /// server-specified one.
    fn degrade(
        &mut self,
        err: FetchError,
        wake_cause: WakeCause,
        wakeup_counter: u32,
        panel: &mut impl Panel,
        power: &mut impl PowerControl,
    ) -> CycleReport {
        warn!("degrading cycle {wakeup_counter}: {err}");

        panel.clear_frame();
        panel.draw_error_banner("dashboard unavailable");
        panel.commit_full();

        self.transition(CycleState::Sleeping);
        let armed = sleep::schedule_fallback(power);

        CycleReport {
            wake_cause,
            wakeup_counter,
            outcome: CycleOutcome::Degraded(err),
            sleep: armed,
        }
    }

    fn transition(&mut self, next: CycleState) {
        debug!("cycle {} -> {}", self.state.as_str(), next.as_str());
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::testutil::{MemCounter, PanelOp, RecordingPanel, RecordingPower, ScriptedHttp};
    use crate::types::SleepArmed;

    const BASE: &str = "http://dash.local";

    fn descriptor_body(minutes: u32) -> String {
        serde_json::json!({
            "imageUrl": "images/current.png",
            "archivedImageUrl": "images/previous.png",
            "timeToSleep": minutes,
        })
        .to_string()
    }

    fn controller() -> WakeCycleController {
        WakeCycleController::new(ConfigFetcher::new(BASE, "livingroom"))
    }

    #[test]
    fn successful_cycle_sleeps_for_the_server_specified_interval() {
        let mut transport = ScriptedHttp::statuses(&[200], &descriptor_body(15));
        let mut panel = RecordingPanel::default();
        let mut power = RecordingPower::new(WakeCause::TimerAlarm);
        let mut counter = MemCounter::default();

        let report = controller().run(&mut transport, &mut panel, &mut power, &mut counter);

        assert_eq!(report.sleep, SleepArmed { duration_secs: 900 });
        assert_eq!(power.armed, vec![900]);
        assert_eq!(
            report.outcome,
            CycleOutcome::Rendered {
                full_update: false,
                image_drawn: true,
            }
        );
    }

    #[test]
    fn counter_increments_exactly_once_per_cycle() {
        let mut panel = RecordingPanel::default();
        let mut power = RecordingPower::new(WakeCause::TimerAlarm);
        let mut counter = MemCounter(4);
        let mut controller = controller();

        let mut transport = ScriptedHttp::statuses(&[200], &descriptor_body(15));
        let report = controller.run(&mut transport, &mut panel, &mut power, &mut counter);
        assert_eq!(report.wakeup_counter, 5);
        assert_eq!(counter.get(), 5);

        let mut transport = ScriptedHttp::statuses(&[200], &descriptor_body(15));
        let report = controller.run(&mut transport, &mut panel, &mut power, &mut counter);
        assert_eq!(report.wakeup_counter, 6);
    }

    #[test]
    fn exhausted_fetch_commits_banner_and_arms_the_fallback_sleep() {
        let mut transport = ScriptedHttp::statuses(&[500, 500, 500], "");
        let mut panel = RecordingPanel::default();
        let mut power = RecordingPower::new(WakeCause::TimerAlarm);
        let mut counter = MemCounter::default();

        let report = controller().run(&mut transport, &mut panel, &mut power, &mut counter);

        assert_eq!(
            report.outcome,
            CycleOutcome::Degraded(FetchError::HttpStatus(500))
        );
        assert_eq!(report.sleep.duration_secs, 1800);
        assert_eq!(
            panel.ops,
            vec![
                PanelOp::Clear,
                PanelOp::ErrorBanner("dashboard unavailable".to_string()),
                PanelOp::CommitFull,
            ]
        );
    }

    #[test]
    fn parse_failure_takes_the_same_fallback_path() {
        let body = serde_json::json!({
            "archivedImageUrl": "images/previous.png",
            "timeToSleep": 15,
        })
        .to_string();
        let mut transport = ScriptedHttp::statuses(&[200], &body);
        let mut panel = RecordingPanel::default();
        let mut power = RecordingPower::new(WakeCause::TimerAlarm);
        let mut counter = MemCounter::default();

        let report = controller().run(&mut transport, &mut panel, &mut power, &mut counter);

        assert_eq!(
            report.outcome,
            CycleOutcome::Degraded(FetchError::Parse("imageUrl"))
        );
        assert_eq!(report.sleep.duration_secs, 1800);
        assert_eq!(power.armed, vec![1800]);
    }

    #[test]
    fn power_on_wake_renders_with_a_full_update() {
        let mut transport = ScriptedHttp::statuses(&[200], &descriptor_body(15));
        let mut panel = RecordingPanel::default();
        let mut power = RecordingPower::new(WakeCause::PowerOn);
        let mut counter = MemCounter::default();

        let report = controller().run(&mut transport, &mut panel, &mut power, &mut counter);

        assert_eq!(
            report.outcome,
            CycleOutcome::Rendered {
                full_update: true,
                image_drawn: true,
            }
        );
        assert_eq!(panel.ops.last(), Some(&PanelOp::CommitFull));
    }

    #[test]
    fn sixth_timer_wake_forces_a_full_refresh() {
        let mut panel = RecordingPanel::default();
        let mut power = RecordingPower::new(WakeCause::TimerAlarm);
        let mut counter = MemCounter::default();
        let mut controller = controller();

        let mut last_full = Vec::new();
        for _ in 0..6 {
            let mut transport = ScriptedHttp::statuses(&[200], &descriptor_body(15));
            let report = controller.run(&mut transport, &mut panel, &mut power, &mut counter);
            match report.outcome {
                CycleOutcome::Rendered { full_update, .. } => last_full.push(full_update),
                other => panic!("unexpected outcome {other:?}"),
            }
        }

        assert_eq!(last_full, vec![false, false, false, false, false, true]);
    }
}
