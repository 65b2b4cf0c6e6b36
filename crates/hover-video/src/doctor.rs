use anyhow::Result;

use crate::VideoConfig;

pub fn check_video(cfg: &VideoConfig) -> Result<()> {
    anyhow::ensure!(cfg.max_reconnect_attempts >= 1, "video.max_reconnect_attempts must be >= 1");
    anyhow::ensure!(cfg.reconnect_cooldown_s >= 1, "video.reconnect_cooldown_s must be >= 1");
    anyhow::ensure!(cfg.failure_threshold >= 1, "video.failure_threshold must be >= 1");
    anyhow::ensure!(cfg.success_threshold >= 1, "video.success_threshold must be >= 1");
    anyhow::ensure!(cfg.read_timeout_ms >= 10 && cfg.read_timeout_ms <= 2000, "video.read_timeout_ms should be 10..2000");
    anyhow::ensure!(cfg.fps_interval >= 1, "video.fps_interval must be >= 1");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        check_video(&VideoConfig::default()).unwrap();
        assert!(check_video(&VideoConfig { max_reconnect_attempts: 0, ..VideoConfig::default() }).is_err());
    }
}
