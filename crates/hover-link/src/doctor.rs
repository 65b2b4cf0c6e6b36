use anyhow::Result;

use crate::{DispatchConfig, DroneConfig, TelemetryConfig};

pub fn check_drone(cfg: &DroneConfig) -> Result<()> {
    cfg.peer_addr()?;
    cfg.response_addr()?;
    cfg.video_addr()?;
    anyhow::ensure!(cfg.probe_attempts >= 1, "drone.probe_attempts must be >= 1");
    Ok(())
}

pub fn check_dispatch(cfg: &DispatchConfig) -> Result<()> {
    anyhow::ensure!(cfg.rc_interval_ms >= 10, "dispatch.rc_interval_ms below 10 floods the vehicle");
    anyhow::ensure!(
        cfg.heartbeat_interval_ms > cfg.rc_interval_ms,
        "dispatch.heartbeat_interval_ms must exceed rc_interval_ms"
    );
    // the vehicle lands itself after ~15s of silence
    anyhow::ensure!(cfg.heartbeat_interval_ms < 15_000, "dispatch.heartbeat_interval_ms must be < 15000");
    anyhow::ensure!(cfg.stop_repeats >= 3, "dispatch.stop_repeats must be >= 3");
    anyhow::ensure!(cfg.loop_quantum_ms >= 1 && cfg.loop_quantum_ms <= cfg.rc_interval_ms, "dispatch.loop_quantum_ms should be 1..=rc_interval_ms");
    anyhow::ensure!(cfg.error_threshold >= 1, "dispatch.error_threshold must be >= 1");
    Ok(())
}

pub fn check_telemetry(cfg: &TelemetryConfig) -> Result<()> {
    anyhow::ensure!(cfg.interval_s >= 1, "telemetry.interval_s must be >= 1");
    anyhow::ensure!(cfg.response_timeout_ms >= 100, "telemetry.response_timeout_ms too small");
    anyhow::ensure!(cfg.low_battery_pct <= 50, "telemetry.low_battery_pct should be <= 50");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_pass() {
        check_drone(&DroneConfig::default()).unwrap();
        check_dispatch(&DispatchConfig::default()).unwrap();
        check_telemetry(&TelemetryConfig::default()).unwrap();
    }

    #[test]
    fn rejects_bad_values() {
        assert!(check_dispatch(&DispatchConfig { stop_repeats: 1, ..DispatchConfig::default() }).is_err());
        assert!(check_dispatch(&DispatchConfig { heartbeat_interval_ms: 20, ..DispatchConfig::default() }).is_err());
        assert!(check_telemetry(&TelemetryConfig { interval_s: 0, ..TelemetryConfig::default() }).is_err());
        assert!(check_drone(&DroneConfig { response_bind: "nope".into(), ..DroneConfig::default() }).is_err());
    }
}
