use std::time::Instant;
use tracing::{debug, info, warn};

use hover_link::SharedState;
use hover_proto::ConnectionStatus;

use crate::{Frame, VideoConfig, VideoError, VideoSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadResult {
    Frame,
    /// Read returned without a frame.
    NoFrame,
    /// The source itself failed.
    Error,
}

/// Owns the reconnect policy for the video channel.
///
/// Reconnects need `failure_threshold` consecutive bad reads, a cooldown since
/// the previous attempt, and room in the attempt budget. Opening the source is
/// not proof of a stream: only `success_threshold` consecutive frames mark the
/// link `Connected` and refill the budget (an operator can refill it too).
/// Once the budget is spent the status stays degraded.
pub struct ConnectionSupervisor {
    cfg: VideoConfig,
    state: SharedState,
    status: ConnectionStatus,
    failures: u32,
    successes: u32,
    attempts: u32,
    total: u32,
    last_attempt: Option<Instant>,
    exhausted: bool,
}

impl ConnectionSupervisor {
    pub fn new(cfg: VideoConfig, state: SharedState) -> Self {
        Self {
            cfg,
            state,
            status: ConnectionStatus::NotConnected,
            failures: 0,
            successes: 0,
            attempts: 0,
            total: 0,
            last_attempt: None,
            exhausted: false,
        }
    }

    pub fn status(&self) -> ConnectionStatus { self.status }
    pub fn attempts(&self) -> u32 { self.attempts }
    pub fn total_reconnects(&self) -> u32 { self.total }

    /// Initial connect. A failure here starts the cooldown like any attempt.
    /// Success leaves the status `NotConnected` until frames arrive.
    pub fn start<S: VideoSource + ?Sized>(&mut self, src: &mut S, now: Instant) -> bool {
        self.last_attempt = Some(now);
        let ok = match src.connect() {
            Ok(()) => {
                info!("video source open, waiting for frames");
                true
            }
            Err(e) => {
                warn!("video connect failed: {}", e);
                self.status = ConnectionStatus::Disconnected;
                false
            }
        };
        self.publish();
        ok
    }

    /// Reads one frame and feeds the outcome to [`Self::on_read`].
    pub fn read<S: VideoSource + ?Sized>(&mut self, src: &mut S, now: Instant) -> Option<Frame> {
        let (result, frame) = match src.read_frame() {
            Ok(Some(f)) => (ReadResult::Frame, Some(f)),
            Ok(None) => (ReadResult::NoFrame, None),
            Err(e) => {
                debug!("video read: {}", e);
                (ReadResult::Error, None)
            }
        };
        self.on_read(src, result, now);
        frame
    }

    pub fn on_read<S: VideoSource + ?Sized>(&mut self, src: &mut S, result: ReadResult, now: Instant) {
        let before = (self.status, self.attempts, self.total);
        match result {
            ReadResult::Frame => self.on_success(),
            ReadResult::NoFrame | ReadResult::Error => self.on_failure(src, result, now),
        }
        if before != (self.status, self.attempts, self.total) {
            self.publish();
        }
    }

    fn on_success(&mut self) {
        self.failures = 0;
        self.successes = self.successes.saturating_add(1);
        if self.successes < self.cfg.success_threshold.max(1) {
            return;
        }
        if self.status != ConnectionStatus::Connected || self.attempts > 0 {
            info!("video stream healthy again");
        }
        self.status = ConnectionStatus::Connected;
        self.attempts = 0;
        self.exhausted = false;
    }

    fn on_failure<S: VideoSource + ?Sized>(&mut self, src: &mut S, result: ReadResult, now: Instant) {
        self.successes = 0;
        self.failures = self.failures.saturating_add(1);
        // a failed connect stays Disconnected until frames flow again
        if self.status != ConnectionStatus::Disconnected {
            self.status = match result {
                ReadResult::Error => ConnectionStatus::ReadError,
                _ => ConnectionStatus::FrameError,
            };
        }

        if self.failures < self.cfg.failure_threshold.max(1) {
            return;
        }
        if self.attempts >= self.cfg.max_reconnect_attempts {
            if !self.exhausted {
                warn!(
                    "video reconnect budget spent ({} attempts); waiting for manual reconnect",
                    self.attempts
                );
                self.exhausted = true;
            }
            return;
        }
        let cooled = match self.last_attempt {
            None => true,
            Some(t) => now.saturating_duration_since(t) >= self.cfg.reconnect_cooldown(),
        };
        if cooled {
            self.reconnect(src, now);
        }
    }

    fn reconnect<S: VideoSource + ?Sized>(&mut self, src: &mut S, now: Instant) {
        self.last_attempt = Some(now);
        self.total += 1;
        self.attempts += 1;
        info!("video reconnect attempt {}/{}", self.attempts, self.cfg.max_reconnect_attempts);
        src.release();
        match src.connect() {
            // status and budget wait for on_success
            Ok(()) => {
                info!("video source reopened, waiting for frames");
                self.failures = 0;
            }
            Err(e) => self.reconnect_failed(e),
        }
    }

    fn reconnect_failed(&mut self, e: VideoError) {
        self.status = ConnectionStatus::Disconnected;
        warn!("video reconnect failed ({}/{}): {}", self.attempts, self.cfg.max_reconnect_attempts, e);
    }

    /// Operator override: refills the budget and reconnects now, ignoring the cooldown.
    pub fn manual_reconnect<S: VideoSource + ?Sized>(&mut self, src: &mut S, now: Instant) {
        info!("manual video reconnect");
        self.attempts = 0;
        self.failures = 0;
        self.exhausted = false;
        self.reconnect(src, now);
        self.publish();
    }

    fn publish(&self) {
        self.state.set_video(self.status, self.attempts, self.total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::ScriptedSource;
    use crate::UdpFrameSource;
    use std::time::Duration;

    fn cfg() -> VideoConfig {
        VideoConfig { failure_threshold: 3, success_threshold: 2, ..VideoConfig::default() }
    }

    fn secs(t0: Instant, s: u64) -> Instant {
        t0 + Duration::from_secs(s)
    }

    #[test]
    fn connected_only_once_frames_flow() {
        let state = SharedState::new();
        let mut sup = ConnectionSupervisor::new(cfg(), state.clone());
        let mut src = ScriptedSource { connect_ok: true, ..Default::default() };
        let t0 = Instant::now();
        assert!(sup.start(&mut src, t0));
        assert_eq!(state.snapshot().video_status, ConnectionStatus::NotConnected);
        sup.on_read(&mut src, ReadResult::Frame, t0);
        sup.on_read(&mut src, ReadResult::Frame, t0);
        assert_eq!(state.snapshot().video_status, ConnectionStatus::Connected);
    }

    #[test]
    fn errors_degrade_status_before_threshold() {
        let state = SharedState::new();
        let mut sup = ConnectionSupervisor::new(cfg(), state.clone());
        let mut src = ScriptedSource { connect_ok: true, ..Default::default() };
        let t0 = Instant::now();
        sup.start(&mut src, t0);
        sup.on_read(&mut src, ReadResult::NoFrame, t0);
        assert_eq!(sup.status(), ConnectionStatus::FrameError);
        sup.on_read(&mut src, ReadResult::Error, t0);
        assert_eq!(state.snapshot().video_status, ConnectionStatus::ReadError);
        assert_eq!(src.releases, 0);
    }

    #[test]
    fn five_failed_reconnects_then_stop() {
        let state = SharedState::new();
        let mut sup = ConnectionSupervisor::new(cfg(), state.clone());
        let mut src = ScriptedSource { connect_ok: true, ..Default::default() };
        let t0 = Instant::now();
        sup.start(&mut src, t0);
        src.connect_ok = false;

        // one failing read every 4s for ten minutes
        for n in 1..=150 {
            sup.on_read(&mut src, ReadResult::Error, secs(t0, 4 * n));
        }
        assert_eq!(src.connects, 1 + 5);
        assert_eq!(sup.attempts(), 5);
        let s = state.snapshot();
        assert_eq!(s.video_status, ConnectionStatus::Disconnected);
        assert_eq!(s.video_reconnects, 5);
        assert_eq!(s.video_reconnect_total, 5);
    }

    #[test]
    fn cooldown_spaces_attempts() {
        let mut sup = ConnectionSupervisor::new(cfg(), SharedState::new());
        let mut src = ScriptedSource::default();
        let t0 = Instant::now();
        sup.start(&mut src, t0);
        // threshold reached at 3s but the start counts as an attempt
        for n in 1..=9 {
            sup.on_read(&mut src, ReadResult::NoFrame, secs(t0, n));
        }
        assert_eq!(src.connects, 1);
        sup.on_read(&mut src, ReadResult::NoFrame, secs(t0, 10));
        assert_eq!(src.connects, 2);
        assert_eq!(src.releases, 1);
        sup.on_read(&mut src, ReadResult::NoFrame, secs(t0, 15));
        assert_eq!(src.connects, 2);
    }

    #[test]
    fn reopened_source_refills_budget_only_after_frames() {
        let cfg = VideoConfig { failure_threshold: 1, ..cfg() };
        let mut sup = ConnectionSupervisor::new(cfg, SharedState::new());
        let mut src = ScriptedSource::default();
        let t0 = Instant::now();
        sup.start(&mut src, t0);
        for n in 1..=4 {
            sup.on_read(&mut src, ReadResult::Error, secs(t0, 10 * n));
        }
        assert_eq!(sup.attempts(), 4);
        src.connect_ok = true;
        sup.on_read(&mut src, ReadResult::Error, secs(t0, 50));
        assert_eq!(sup.attempts(), 5);
        assert_eq!(sup.status(), ConnectionStatus::Disconnected);

        sup.on_read(&mut src, ReadResult::Frame, secs(t0, 51));
        sup.on_read(&mut src, ReadResult::Frame, secs(t0, 51));
        assert_eq!(sup.attempts(), 0);
        assert_eq!(sup.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn silent_udp_source_spends_the_budget() {
        let cfg = VideoConfig { failure_threshold: 1, read_timeout_ms: 1, ..VideoConfig::default() };
        let state = SharedState::new();
        let mut sup = ConnectionSupervisor::new(cfg.clone(), state.clone());
        let mut src = UdpFrameSource::new("127.0.0.1:0".parse().unwrap(), cfg.read_timeout());
        let t0 = Instant::now();
        assert!(sup.start(&mut src, t0));
        // binding always works; nobody ever sends
        for n in 1..=20 {
            assert!(sup.read(&mut src, secs(t0, 11 * n)).is_none());
        }
        assert_eq!(sup.total_reconnects(), 5);
        assert_eq!(sup.attempts(), 5);
        assert_ne!(sup.status(), ConnectionStatus::Connected);
        let s = state.snapshot();
        assert_eq!(s.video_reconnects, 5);
        assert_eq!(s.video_reconnect_total, 5);
    }

    #[test]
    fn sustained_frames_restore_connected() {
        let mut sup = ConnectionSupervisor::new(cfg(), SharedState::new());
        let mut src = ScriptedSource { connect_ok: true, ..Default::default() };
        let t0 = Instant::now();
        sup.start(&mut src, t0);
        sup.on_read(&mut src, ReadResult::NoFrame, t0);
        sup.on_read(&mut src, ReadResult::Frame, t0);
        assert_eq!(sup.status(), ConnectionStatus::FrameError);
        sup.on_read(&mut src, ReadResult::Frame, t0);
        assert_eq!(sup.status(), ConnectionStatus::Connected);
    }

    #[test]
    fn manual_reconnect_ignores_spent_budget() {
        let mut sup = ConnectionSupervisor::new(cfg(), SharedState::new());
        let mut src = ScriptedSource::default();
        let t0 = Instant::now();
        sup.start(&mut src, t0);
        for n in 1..=20 {
            sup.on_read(&mut src, ReadResult::Error, secs(t0, 10 * n));
        }
        assert_eq!(sup.attempts(), 5);

        src.connect_ok = true;
        sup.manual_reconnect(&mut src, secs(t0, 201));
        assert_eq!(sup.attempts(), 1);
        assert_eq!(sup.total_reconnects(), 6);
        sup.on_read(&mut src, ReadResult::Frame, secs(t0, 202));
        sup.on_read(&mut src, ReadResult::Frame, secs(t0, 202));
        assert_eq!(sup.status(), ConnectionStatus::Connected);
        assert_eq!(sup.attempts(), 0);
    }

    #[test]
    fn read_passes_frames_through() {
        let mut sup = ConnectionSupervisor::new(cfg(), SharedState::new());
        let mut src = ScriptedSource { connect_ok: true, ..Default::default() };
        src.reads.push_back(Ok(Some(ScriptedSource::frame(7))));
        src.reads.push_back(Err(VideoError::NotConnected));
        let t0 = Instant::now();
        assert_eq!(sup.read(&mut src, t0).map(|f| f.seq), Some(7));
        assert!(sup.read(&mut src, t0).is_none());
        assert_eq!(sup.status(), ConnectionStatus::ReadError);
    }
}
