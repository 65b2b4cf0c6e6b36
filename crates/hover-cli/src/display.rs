use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use hover_link::DroneState;
use hover_proto::Intent;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Edges {
    pub takeoff: bool,
    pub land: bool,
    pub emergency: bool,
    pub photo: bool,
}

impl Edges {
    pub fn any(&self) -> bool {
        self.takeoff || self.land || self.emergency || self.photo
    }
}

/// Rising-edge detector for the four action buttons; holding a button fires once.
#[derive(Debug, Default)]
pub struct ButtonEdges {
    prev: Edges,
}

impl ButtonEdges {
    pub fn update(&mut self, intent: &Intent) -> Edges {
        let now = Edges {
            takeoff: intent.takeoff,
            land: intent.land,
            emergency: intent.emergency,
            photo: intent.photo,
        };
        let rising = Edges {
            takeoff: now.takeoff && !self.prev.takeoff,
            land: now.land && !self.prev.land,
            emergency: now.emergency && !self.prev.emergency,
            photo: now.photo && !self.prev.photo,
        };
        self.prev = now;
        rising
    }
}

fn opt(v: Option<f64>) -> String {
    v.map(|v| format!("{:.0}", v)).unwrap_or_else(|| "--".into())
}

pub fn status_line(s: &DroneState) -> String {
    let rc = s.last_rc.map(|rc| rc.to_string()).unwrap_or_else(|| "-".into());
    let mut line = format!(
        "{} bat={} h={} yaw={} vg=({},{},{}) video={} fps={:.1} rc=[{}] sent={}",
        if s.flying { "FLYING" } else { "landed" },
        s.battery_label(),
        opt(s.height),
        opt(s.yaw),
        opt(s.vgx),
        opt(s.vgy),
        opt(s.vgz),
        s.video_status,
        s.video_fps,
        rc,
        s.rc_sent,
    );
    if s.video_reconnects > 0 {
        line.push_str(&format!(" reconnects={}", s.video_reconnects));
    }
    if s.recovery_mode {
        line.push_str(" RECOVERY");
    }
    if let Some(e) = &s.last_error {
        line.push_str(&format!(" errors={} last={:?}", s.error_count, e));
    }
    line
}

pub fn photo_path(dir: &Path) -> PathBuf {
    let ms = time::OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000;
    dir.join(format!("{}.h264", ms))
}

pub async fn save_photo(dir: &Path, data: &[u8]) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await.with_context(|| format!("create {}", dir.display()))?;
    let path = photo_path(dir);
    tokio::fs::write(&path, data).await.with_context(|| format!("write {}", path.display()))?;
    Ok(path)
}
