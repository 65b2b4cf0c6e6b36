use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use hover_proto::{Command, RcCommand};

use crate::channel::CommandLink;
use crate::guard::LoopGuard;
use crate::safety::{RcAction, RcGate};
use crate::state::SharedState;
use crate::DispatchConfig;

/// Turns the latest intent in [`SharedState`] into a paced `rc` stream.
pub struct CommandDispatcher<L: CommandLink + ?Sized> {
    link: Arc<L>,
    state: SharedState,
    gate: RcGate,
    cfg: DispatchConfig,
}

impl<L: CommandLink + ?Sized> CommandDispatcher<L> {
    pub fn new(link: Arc<L>, state: SharedState, cfg: DispatchConfig) -> Self {
        let gate = RcGate::new(&cfg);
        Self { link, state, gate, cfg }
    }

    /// One loop iteration without the trailing sleep.
    pub fn tick(&mut self, now: Instant) {
        let (flying, rc_enabled, intent) = self.state.rc_inputs();
        match self.gate.decide(now, flying && rc_enabled, &intent) {
            RcAction::Send(rc) => {
                if self.send_rc(rc) {
                    self.gate.mark_sent(rc, now);
                    self.state.record_rc(rc, now);
                }
            }
            RcAction::Heartbeat => {
                debug!("heartbeat");
                if self.send_rc(RcCommand::ZERO) {
                    self.gate.mark_heartbeat(now);
                }
            }
            RcAction::Idle => {}
        }
    }

    // one immediate retry, then give up until the next interval
    fn send_rc(&self, rc: RcCommand) -> bool {
        let cmd = Command::Rc(rc);
        let wait = self.cfg.rc_wait();
        if self.link.send(&cmd, wait).is_ok() {
            return true;
        }
        match self.link.send(&cmd, wait) {
            Ok(()) => true,
            Err(e) => {
                warn!("{} failed twice: {}", cmd, e);
                self.state.note_error(format!("{}: {}", cmd, e));
                false
            }
        }
    }

    /// Runs until `cancel` is set, then leaves the vehicle with a zero set-point.
    pub fn run(mut self, cancel: Arc<AtomicBool>) {
        info!(
            "dispatcher started: rc every {:?}, heartbeat every {:?}",
            self.cfg.rc_interval(),
            self.cfg.heartbeat_interval()
        );
        let guard = LoopGuard::new("dispatcher", &self.cfg);
        let state = self.state.clone();
        while !cancel.load(Ordering::Relaxed) {
            let now = Instant::now();
            guard.run(&state, || self.tick(now));
            std::thread::sleep(self.cfg.loop_quantum());
        }
        self.shutdown();
    }

    /// Zero set-point burst; the vehicle may be hovering even when `flying` is stale.
    pub fn shutdown(&self) {
        let cmd = Command::Rc(RcCommand::ZERO);
        let repeats = self.cfg.stop_repeats.max(1);
        for i in 0..repeats {
            if let Err(e) = self.link.send(&cmd, self.cfg.rc_wait()) {
                warn!("stop rc {}/{} failed: {}", i + 1, repeats, e);
            }
            if i + 1 < repeats {
                std::thread::sleep(self.cfg.stop_spacing());
            }
        }
        info!("dispatcher stopped");
    }
}
