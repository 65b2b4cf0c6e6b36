pub mod channel;
pub mod dispatcher;
pub mod doctor;
pub mod error;
pub mod flight;
pub mod guard;
pub mod probe;
pub mod safety;
pub mod state;
pub mod telemetry;

pub use channel::{CommandChannel, CommandLink};
pub use dispatcher::CommandDispatcher;
pub use error::TransportError;
pub use guard::LoopGuard;
pub use state::{DroneState, SharedState};
pub use telemetry::TelemetryAggregator;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DroneConfig {
    /// Vehicle address in AP mode.
    pub ip: String,
    pub command_port: u16,

    /// Local address the per-query reply socket binds to.
    pub response_bind: String,
    pub video_bind: String,

    /// `command` attempts before `run` gives up waiting for an `ok`.
    pub probe_attempts: u32,
}

impl Default for DroneConfig {
    fn default() -> Self {
        Self {
            ip: "192.168.10.1".into(),
            command_port: 8889,
            response_bind: "0.0.0.0:8889".into(),
            video_bind: "0.0.0.0:11111".into(),
            probe_attempts: 3,
        }
    }
}

impl DroneConfig {
    pub fn peer_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.ip, self.command_port)
            .parse()
            .with_context(|| format!("drone.ip {:?} is not an IP address", self.ip))
    }

    pub fn response_addr(&self) -> Result<SocketAddr> {
        self.response_bind
            .parse()
            .with_context(|| format!("drone.response_bind {:?} is not host:port", self.response_bind))
    }

    pub fn video_addr(&self) -> Result<SocketAddr> {
        self.video_bind
            .parse()
            .with_context(|| format!("drone.video_bind {:?} is not host:port", self.video_bind))
    }
}

/// Pacing of the `rc` stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub rc_interval_ms: u64,
    pub heartbeat_interval_ms: u64,
    /// Unchanged evaluations tolerated before the same set-point is re-sent.
    pub idle_repeat_cap: u32,
    pub rc_wait_ms: u64,
    pub loop_quantum_ms: u64,
    pub stop_repeats: u32,
    pub stop_spacing_ms: u64,
    pub error_threshold: u32,
    pub recovery_pause_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            rc_interval_ms: 50,
            heartbeat_interval_ms: 3000,
            idle_repeat_cap: 10,
            rc_wait_ms: 50,
            loop_quantum_ms: 10,
            stop_repeats: 3,
            stop_spacing_ms: 100,
            error_threshold: 10,
            recovery_pause_ms: 1000,
        }
    }
}

impl DispatchConfig {
    pub fn rc_interval(&self) -> Duration { Duration::from_millis(self.rc_interval_ms) }
    pub fn heartbeat_interval(&self) -> Duration { Duration::from_millis(self.heartbeat_interval_ms) }
    pub fn rc_wait(&self) -> Duration { Duration::from_millis(self.rc_wait_ms) }
    pub fn loop_quantum(&self) -> Duration { Duration::from_millis(self.loop_quantum_ms) }
    pub fn stop_spacing(&self) -> Duration { Duration::from_millis(self.stop_spacing_ms) }
    pub fn recovery_pause(&self) -> Duration { Duration::from_millis(self.recovery_pause_ms) }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub interval_s: u64,
    pub response_timeout_ms: u64,
    pub low_battery_pct: u8,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { interval_s: 10, response_timeout_ms: 3000, low_battery_pct: 15 }
    }
}

impl TelemetryConfig {
    pub fn interval(&self) -> Duration { Duration::from_secs(self.interval_s) }
    pub fn response_timeout(&self) -> Duration { Duration::from_millis(self.response_timeout_ms) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drone_addresses_parse() {
        let cfg = DroneConfig::default();
        assert_eq!(cfg.peer_addr().unwrap(), "192.168.10.1:8889".parse().unwrap());
        assert_eq!(cfg.response_addr().unwrap().port(), 8889);
        assert_eq!(cfg.video_addr().unwrap().port(), 11111);

        let bad = DroneConfig { ip: "tello.local".into(), ..DroneConfig::default() };
        assert!(bad.peer_addr().is_err());
    }

    #[test]
    fn dispatch_overlay_keeps_unset_defaults() {
        let cfg: DispatchConfig = toml::from_str("rc_interval_ms = 200\nidle_repeat_cap = 4").unwrap();
        assert_eq!(cfg.rc_interval(), Duration::from_millis(200));
        assert_eq!(cfg.idle_repeat_cap, 4);
        assert_eq!(cfg.heartbeat_interval(), Duration::from_secs(3));
        assert_eq!(cfg.stop_repeats, 3);
    }
}
