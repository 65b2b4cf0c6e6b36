pub mod doctor;
pub mod fps;
pub mod pump;
pub mod supervisor;
pub mod udp;

pub use fps::FpsMeter;
pub use pump::{LatestFrame, VideoPump};
pub use supervisor::{ConnectionSupervisor, ReadResult};
pub use udp::UdpFrameSource;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum VideoError {
    #[error("video source not connected")]
    NotConnected,

    #[error("video socket: {0}")]
    Io(#[from] std::io::Error),
}

/// One encoded frame as received; no decoding happens in this crate.
#[derive(Debug, Clone)]
pub struct Frame {
    pub seq: u64,
    pub data: Bytes,
}

/// The capture side the supervisor drives.
pub trait VideoSource: Send {
    fn connect(&mut self) -> Result<(), VideoError>;

    /// `Ok(None)` when no complete frame arrived within the source's own timeout.
    fn read_frame(&mut self) -> Result<Option<Frame>, VideoError>;

    fn release(&mut self);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    pub enable: bool,
    pub reconnect_cooldown_s: u64,
    pub max_reconnect_attempts: u32,
    /// Consecutive failed reads before a reconnect is considered.
    pub failure_threshold: u32,
    /// Consecutive frames before the link counts as healthy again.
    pub success_threshold: u32,
    pub read_timeout_ms: u64,
    pub fps_interval: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            enable: true,
            reconnect_cooldown_s: 10,
            max_reconnect_attempts: 5,
            failure_threshold: 10,
            success_threshold: 5,
            read_timeout_ms: 200,
            fps_interval: 30,
        }
    }
}

impl VideoConfig {
    pub fn reconnect_cooldown(&self) -> Duration { Duration::from_secs(self.reconnect_cooldown_s) }
    pub fn read_timeout(&self) -> Duration { Duration::from_millis(self.read_timeout_ms) }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_overlay() {
        let cfg: VideoConfig = toml::from_str("enable = false\nmax_reconnect_attempts = 2").unwrap();
        assert!(!cfg.enable);
        assert_eq!(cfg.max_reconnect_attempts, 2);
        assert_eq!(cfg.reconnect_cooldown(), Duration::from_secs(10));
    }
}
