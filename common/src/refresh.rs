use log::{info, warn};

use crate::platform::Panel;
use crate::types::{RemoteConfig, WakeCause};

/// Partial updates accumulate ghosting; every Nth cycle gets a full
/// refresh to clear it.
pub const FULL_REFRESH_EVERY: u32 = 6;

/// Full-vs-partial choice for one cycle. Derived, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshDecision {
    pub full_update: bool,
}

impl RefreshDecision {
    /// Any wake not caused by a source we armed (power-on, unknown) forces
    /// a full refresh for correctness; otherwise every
    /// [`FULL_REFRESH_EVERY`]th cycle does, with partial updates in
    /// between to save time and power.
    pub fn evaluate(cause: WakeCause, wakeup_counter: u32) -> Self {
        Self {
            full_update: !cause.is_scheduled() || wakeup_counter % FULL_REFRESH_EVERY == 0,
        }
    }
}

/// What the render pass actually did, after any mid-cycle demotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    pub full_update: bool,
    pub image_drawn: bool,
}

/// Sequences the panel calls for one cycle.
pub struct RefreshStrategy {
    decision: RefreshDecision,
}

impl RefreshStrategy {
    pub fn new(decision: RefreshDecision) -> Self {
        Self { decision }
    }

    /// Partial mode is only valid with a known-good baseline: a failed
    /// restore of the archived frame promotes this cycle to a full update.
    /// A failed draw of the target image is non-fatal; the error indicator
    /// is committed in its place and the cycle completes normally.
    pub fn render(self, panel: &mut impl Panel, config: &RemoteConfig) -> RenderSummary {
        let mut full_update = self.decision.full_update;

        if !full_update {
            if panel.restore_prior_frame(&config.archived_image_url) {
                info!("prior frame restored as partial-update baseline");
            } else {
                warn!("prior frame restore failed; promoting to full update");
                full_update = true;
            }
        }

        panel.clear_frame();

        let image_drawn = panel.draw_image(&config.image_url);
        if !image_drawn {
            warn!("target image draw failed; rendering error indicator");
            panel.draw_error_banner("image open error");
        }

        if full_update {
            info!("committing full panel update");
            panel.commit_full();
        } else {
            info!("committing partial panel update");
            panel.commit_partial();
        }

        RenderSummary {
            full_update,
            image_drawn,
        }
    }
}
