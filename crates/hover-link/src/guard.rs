use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;
use tracing::{error, warn};

use crate::state::SharedState;
use crate::DispatchConfig;

/// Panic boundary around one iteration of a background loop.
///
/// A panic is counted in [`SharedState`]. Once the count passes the
/// threshold the calling loop sleeps for the recovery pause with
/// `recovery_mode` set, and the count starts over.
#[derive(Debug, Clone)]
pub struct LoopGuard {
    name: &'static str,
    threshold: u32,
    pause: Duration,
}

impl LoopGuard {
    pub fn new(name: &'static str, cfg: &DispatchConfig) -> Self {
        Self { name, threshold: cfg.error_threshold, pause: cfg.recovery_pause() }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Runs `f`; `None` means it panicked.
    pub fn run<R>(&self, state: &SharedState, f: impl FnOnce() -> R) -> Option<R> {
        let panic = match catch_unwind(AssertUnwindSafe(f)) {
            Ok(r) => return Some(r),
            Err(panic) => panic,
        };
        let msg = panic_message(&*panic);
        let count = state.record_error(format!("{}: {}", self.name, msg));
        error!("{} iteration failed ({} so far): {}", self.name, count, msg);
        if count > self.threshold {
            warn!("{}: entering recovery for {:?}", self.name, self.pause);
            state.set_recovery(true);
            std::thread::sleep(self.pause);
            state.set_recovery(false);
        }
        None
    }
}

pub fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn guard(threshold: u32, pause_ms: u64) -> LoopGuard {
        let cfg = DispatchConfig { error_threshold: threshold, recovery_pause_ms: pause_ms, ..DispatchConfig::default() };
        LoopGuard::new("test", &cfg)
    }

    #[test]
    fn passes_results_through() {
        let state = SharedState::new();
        assert_eq!(guard(2, 1).run(&state, || 7), Some(7));
        assert_eq!(state.snapshot().error_count, 0);
    }

    #[test]
    fn recovery_after_threshold_resets_count() {
        let state = SharedState::new();
        let g = guard(2, 50);
        assert_eq!(g.run(&state, || -> u32 { panic!("first") }), None);
        assert_eq!(g.run(&state, || -> u32 { panic!("second") }), None);
        let s = state.snapshot();
        assert_eq!(s.error_count, 2);
        assert!(!s.recovery_mode);

        let t0 = Instant::now();
        assert_eq!(g.run(&state, || -> u32 { panic!("third") }), None);
        assert!(t0.elapsed() >= Duration::from_millis(50));
        let s = state.snapshot();
        assert_eq!(s.error_count, 0);
        assert!(!s.recovery_mode);
        assert_eq!(s.last_error.as_deref(), Some("test: third"));
    }

    #[test]
    fn formatted_panics_keep_their_message() {
        let state = SharedState::new();
        guard(10, 1).run(&state, || -> u32 { panic!("bad value {}", 3) });
        assert_eq!(state.snapshot().last_error.as_deref(), Some("test: bad value 3"));
    }
}
