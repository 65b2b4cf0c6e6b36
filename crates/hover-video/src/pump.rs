use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::info;

use hover_link::{DispatchConfig, LoopGuard, SharedState};

use crate::{ConnectionSupervisor, FpsMeter, Frame, VideoConfig, VideoSource};

const IDLE_PAUSE: Duration = Duration::from_millis(20);

/// Most recent frame, shared with whoever saves photos.
#[derive(Debug, Clone, Default)]
pub struct LatestFrame(Arc<Mutex<Option<Frame>>>);

impl LatestFrame {
    pub fn get(&self) -> Option<Frame> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set(&self, frame: Frame) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = Some(frame);
    }
}

/// Blocking video loop: read, supervise, count frames. Runs on its own thread
/// so slow reads never stall input handling.
pub struct VideoPump<S: VideoSource> {
    src: S,
    sup: ConnectionSupervisor,
    fps: FpsMeter,
    state: SharedState,
    latest: LatestFrame,
    reconnect: Arc<AtomicBool>,
    guard: LoopGuard,
}

impl<S: VideoSource> VideoPump<S> {
    pub fn new(src: S, cfg: VideoConfig, state: SharedState) -> Self {
        Self {
            src,
            fps: FpsMeter::new(cfg.fps_interval),
            sup: ConnectionSupervisor::new(cfg, state.clone()),
            state,
            latest: LatestFrame::default(),
            reconnect: Arc::new(AtomicBool::new(false)),
            guard: LoopGuard::new("video", &DispatchConfig::default()),
        }
    }

    pub fn with_guard(mut self, guard: LoopGuard) -> Self {
        self.guard = guard;
        self
    }

    pub fn latest(&self) -> LatestFrame {
        self.latest.clone()
    }

    /// Set to request an operator reconnect on the next iteration.
    pub fn reconnect_flag(&self) -> Arc<AtomicBool> {
        self.reconnect.clone()
    }

    pub fn start(&mut self, now: Instant) -> bool {
        self.sup.start(&mut self.src, now)
    }

    /// Returns whether a frame arrived.
    pub fn step(&mut self, now: Instant) -> bool {
        if self.reconnect.swap(false, Ordering::Relaxed) {
            self.sup.manual_reconnect(&mut self.src, now);
        }
        let Some(frame) = self.sup.read(&mut self.src, now) else {
            return false;
        };
        self.latest.set(frame);
        if let Some(fps) = self.fps.frame(now) {
            self.state.set_video_fps(fps);
        }
        true
    }

    pub fn run(mut self, cancel: Arc<AtomicBool>) {
        self.start(Instant::now());
        let guard = self.guard.clone();
        let state = self.state.clone();
        while !cancel.load(Ordering::Relaxed) {
            let now = Instant::now();
            // a released source fails instantly; don't spin on it
            if guard.run(&state, || self.step(now)) != Some(true) {
                std::thread::sleep(IDLE_PAUSE);
            }
        }
        self.src.release();
        info!("video stopped");
    }
}
