use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::channel::CommandLink;
use crate::guard::LoopGuard;
use crate::state::SharedState;
use crate::{DispatchConfig, TelemetryConfig};

const SLEEP_QUANTUM: Duration = Duration::from_millis(200);

/// Polls battery and state on a fixed interval and merges them into [`SharedState`].
///
/// A query that times out or returns garbage leaves the previous values in
/// place. Telemetry gaps are expected on this vehicle and are not counted as
/// loop errors.
pub struct TelemetryAggregator<L: CommandLink + ?Sized> {
    link: Arc<L>,
    state: SharedState,
    cfg: TelemetryConfig,
    last_poll: Option<Instant>,
    warned_low: bool,
    guard: LoopGuard,
}

impl<L: CommandLink + ?Sized> TelemetryAggregator<L> {
    pub fn new(link: Arc<L>, state: SharedState, cfg: TelemetryConfig) -> Self {
        let guard = LoopGuard::new("telemetry", &DispatchConfig::default());
        Self { link, state, cfg, last_poll: None, warned_low: false, guard }
    }

    pub fn with_guard(mut self, guard: LoopGuard) -> Self {
        self.guard = guard;
        self
    }

    /// Polls if the interval has elapsed. Returns whether a poll happened.
    pub fn tick(&mut self, now: Instant) -> bool {
        let due = match self.last_poll {
            None => true,
            Some(t) => now.saturating_duration_since(t) >= self.cfg.interval(),
        };
        if !due {
            return false;
        }
        self.last_poll = Some(now);
        self.poll_once(now);
        true
    }

    pub fn poll_once(&mut self, now: Instant) {
        let timeout = self.cfg.response_timeout();

        match self.link.battery(timeout) {
            Ok(pct) => {
                let low = self.state.set_battery(pct, self.cfg.low_battery_pct);
                debug!("battery {}%", pct);
                self.warn_low(low, pct);
            }
            Err(e) => debug!("battery query: {}", e),
        }

        match self.link.state(timeout) {
            Ok(report) => {
                self.state.merge_report(&report, self.cfg.low_battery_pct, now);
                if let Some(pct) = report.battery {
                    self.warn_low(pct <= self.cfg.low_battery_pct, pct);
                }
            }
            Err(e) => debug!("state query: {}", e),
        }
    }

    // once per dip below the threshold
    fn warn_low(&mut self, low: bool, pct: u8) {
        if low && !self.warned_low {
            warn!("battery low: {}%", pct);
        }
        self.warned_low = low;
    }

    pub fn run(mut self, cancel: Arc<AtomicBool>) {
        info!("telemetry started: every {:?}", self.cfg.interval());
        let guard = self.guard.clone();
        let state = self.state.clone();
        while !cancel.load(Ordering::Relaxed) {
            let now = Instant::now();
            guard.run(&state, || self.tick(now));
            std::thread::sleep(SLEEP_QUANTUM);
        }
        info!("telemetry stopped");
    }
}
