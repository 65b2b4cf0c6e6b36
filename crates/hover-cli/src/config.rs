use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use hover_input::InputConfig;
use hover_link::{DispatchConfig, DroneConfig, TelemetryConfig};
use hover_video::VideoConfig;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub drone: DroneConfig,
    pub input: InputConfig,
    pub dispatch: DispatchConfig,
    pub telemetry: TelemetryConfig,
    pub video: VideoConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub tick_ms: u64,
    pub status_every_s: u64,
    pub photo_dir: PathBuf,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self { tick_ms: 33, status_every_s: 2, photo_dir: "photos".into() }
    }
}

impl DisplayConfig {
    pub fn tick(&self) -> Duration { Duration::from_millis(self.tick_ms.max(1)) }
    pub fn status_every(&self) -> Duration { Duration::from_secs(self.status_every_s) }
}

pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        warn!("config {} not found, using defaults", path.display());
        return Ok(Config::default());
    }
    let s = std::fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
    toml::from_str(&s).with_context(|| format!("parse config toml {}", path.display()))
}

pub fn write_config(path: &Path, cfg: &Config, force: bool) -> Result<()> {
    anyhow::ensure!(force || !path.exists(), "{} exists (use --force to overwrite)", path.display());
    let s = toml::to_string_pretty(cfg).context("serialize config")?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    std::fs::write(path, s).with_context(|| format!("write {}", path.display()))?;
    info!("config written: {}", path.display());
    Ok(())
}

/// Runs every section check and reports all failures, not just the first.
pub fn check_all(cfg: &Config) -> Result<()> {
    let checks: [(&str, Result<()>); 7] = [
        ("drone", hover_link::doctor::check_drone(&cfg.drone)),
        ("input", hover_input::doctor::check_input(&cfg.input)),
        ("dispatch", hover_link::doctor::check_dispatch(&cfg.dispatch)),
        ("telemetry", hover_link::doctor::check_telemetry(&cfg.telemetry)),
        ("video", hover_video::doctor::check_video(&cfg.video)),
        ("display", check_display(&cfg.display)),
        ("timing", check_timing(cfg)),
    ];
    let mut failed = 0;
    for (section, res) in checks {
        match res {
            Ok(()) => info!("doctor: {} OK", section),
            Err(e) => {
                warn!("doctor: {}: {:#}", section, e);
                failed += 1;
            }
        }
    }
    anyhow::ensure!(failed == 0, "{} config section(s) failed", failed);
    Ok(())
}

fn check_display(d: &DisplayConfig) -> Result<()> {
    anyhow::ensure!(d.tick_ms >= 5 && d.tick_ms <= 200, "display.tick_ms should be 5..200");
    anyhow::ensure!(!d.photo_dir.as_os_str().is_empty(), "display.photo_dir is empty");
    Ok(())
}

// the blocking telemetry query must finish well inside its polling interval
fn check_timing(cfg: &Config) -> Result<()> {
    anyhow::ensure!(
        cfg.telemetry.response_timeout() * 2 < cfg.telemetry.interval(),
        "telemetry.response_timeout_ms too long for telemetry.interval_s"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("hover-cfg-{}-{}", std::process::id(), name));
        let _ = std::fs::remove_dir_all(&dir);
        dir.join("hover.toml")
    }

    #[test]
    fn partial_file_overlays_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [drone]
            ip = "192.168.10.2"

            [input]
            deadzone = 0.2

            [dispatch]
            idle_repeat_cap = 3
            "#,
        )
        .unwrap();
        assert_eq!(cfg.drone.ip, "192.168.10.2");
        assert_eq!(cfg.drone.command_port, 8889);
        assert_eq!(cfg.input.deadzone, 0.2);
        assert_eq!(cfg.dispatch.idle_repeat_cap, 3);
        assert_eq!(cfg.dispatch.rc_interval_ms, 50);
        assert_eq!(cfg.display.photo_dir, PathBuf::from("photos"));
    }

    #[test]
    fn init_then_load() {
        let path = scratch("init");
        write_config(&path, &Config::default(), false).unwrap();
        assert!(write_config(&path, &Config::default(), false).is_err());
        write_config(&path, &Config::default(), true).unwrap();
        assert_eq!(load_config(&path).unwrap(), Config::default());
        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn missing_file_is_default() {
        let cfg = load_config(&scratch("missing")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn doctor_collects_failures() {
        check_all(&Config::default()).unwrap();

        let mut cfg = Config::default();
        cfg.display.tick_ms = 0;
        cfg.telemetry.interval_s = 2;
        assert!(check_all(&cfg).is_err());
    }
}
