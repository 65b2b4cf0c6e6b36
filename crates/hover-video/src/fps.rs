use std::time::Instant;

/// Frames per second, recomputed once every `interval` frames.
#[derive(Debug, Clone)]
pub struct FpsMeter {
    interval: u32,
    count: u32,
    window_start: Option<Instant>,
    fps: f32,
}

impl FpsMeter {
    pub fn new(interval: u32) -> Self {
        Self { interval: interval.max(1), count: 0, window_start: None, fps: 0.0 }
    }

    /// Counts one frame. Returns the new rate when a window closes.
    pub fn frame(&mut self, now: Instant) -> Option<f32> {
        let Some(start) = self.window_start else {
            self.window_start = Some(now);
            return None;
        };
        self.count += 1;
        if self.count < self.interval {
            return None;
        }
        let secs = now.saturating_duration_since(start).as_secs_f32();
        if secs > 0.0 {
            self.fps = self.count as f32 / secs;
        }
        self.count = 0;
        self.window_start = Some(now);
        Some(self.fps)
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }
}
