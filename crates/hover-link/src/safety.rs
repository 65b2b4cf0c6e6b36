use std::time::{Duration, Instant};

use hover_proto::{Intent, RcCommand};

use crate::DispatchConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RcAction {
    /// Transmit this set-point.
    Send(RcCommand),
    /// Transmit a zero set-point to keep the link alive.
    Heartbeat,
    Idle,
}

/// Decides when the dispatcher may transmit: on change, on idle refresh, or
/// as a heartbeat when nothing else has gone out for a while.
#[derive(Debug)]
pub struct RcGate {
    rc_interval: Duration,
    heartbeat_interval: Duration,
    idle_repeat_cap: u32,

    last_eval: Option<Instant>,
    last_sent: Option<RcCommand>,
    last_tx: Option<Instant>,
    idle_count: u32,
}

impl RcGate {
    pub fn new(cfg: &DispatchConfig) -> Self {
        Self {
            rc_interval: cfg.rc_interval(),
            heartbeat_interval: cfg.heartbeat_interval(),
            idle_repeat_cap: cfg.idle_repeat_cap,
            last_eval: None,
            last_sent: None,
            last_tx: None,
            idle_count: 0,
        }
    }

    /// `active` is flying && rc enabled.
    pub fn decide(&mut self, now: Instant, active: bool, intent: &Intent) -> RcAction {
        if active {
            if !self.due(self.last_eval, self.rc_interval, now) {
                return RcAction::Idle;
            }
            self.last_eval = Some(now);
            let rc = RcCommand::from_intent(intent);
            // a zero heartbeat in flight would cancel the held set-point
            if self.last_sent != Some(rc)
                || self.idle_count >= self.idle_repeat_cap
                || self.due(self.last_tx, self.heartbeat_interval, now)
            {
                return RcAction::Send(rc);
            }
            self.idle_count += 1;
            return RcAction::Idle;
        }
        if self.due(self.last_tx, self.heartbeat_interval, now) {
            return RcAction::Heartbeat;
        }
        RcAction::Idle
    }

    pub fn mark_sent(&mut self, rc: RcCommand, now: Instant) {
        self.last_sent = Some(rc);
        self.last_tx = Some(now);
        self.idle_count = 0;
    }

    pub fn mark_heartbeat(&mut self, now: Instant) {
        self.last_tx = Some(now);
    }

    pub fn last_sent(&self) -> Option<RcCommand> {
        self.last_sent
    }

    fn due(&self, last: Option<Instant>, interval: Duration, now: Instant) -> bool {
        match last {
            None => true,
            Some(t) => now.saturating_duration_since(t) >= interval,
        }
    }
}
