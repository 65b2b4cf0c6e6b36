use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use hover_proto::telemetry::{StateReport, TelemetryValue};
use hover_proto::{ConnectionStatus, Intent, RcCommand};

/// The live record shared between the display loop and the background loops.
///
/// Field ownership (single writer per field):
/// - display loop: `last_input`, `flying`, `rc_enabled`, `link_status`, `emergency_epoch`
/// - dispatcher: `last_rc`, `last_rc_at`, `rc_sent`
/// - telemetry: `battery`, `low_battery`, `height`..`yaw`, `telemetry_*`
/// - video loop: `video_status`, `video_reconnects`, `video_reconnect_total`, `video_fps`
///
/// `error_count`, `last_error` and `recovery_mode` are written by every loop's
/// [`LoopGuard`](crate::LoopGuard).
///
/// `flying` is written by the display loop and read by the dispatcher, so the
/// whole record sits behind one short-held mutex.
#[derive(Debug, Clone)]
pub struct DroneState {
    pub flying: bool,
    pub rc_enabled: bool,
    pub link_status: ConnectionStatus,
    pub last_input: Intent,
    /// Bumped by every emergency; a takeoff that straddles one must not set `flying`.
    pub emergency_epoch: u64,

    pub battery: Option<u8>,
    pub low_battery: bool,
    pub height: Option<f64>,
    pub vgx: Option<f64>,
    pub vgy: Option<f64>,
    pub vgz: Option<f64>,
    pub pitch: Option<f64>,
    pub roll: Option<f64>,
    pub yaw: Option<f64>,
    pub telemetry_extra: BTreeMap<String, TelemetryValue>,
    pub telemetry_updated: Option<Instant>,

    pub last_rc: Option<RcCommand>,
    pub last_rc_at: Option<Instant>,
    pub rc_sent: u64,

    pub error_count: u32,
    pub last_error: Option<String>,
    pub recovery_mode: bool,

    pub video_status: ConnectionStatus,
    pub video_reconnects: u32,
    pub video_reconnect_total: u32,
    pub video_fps: f32,
}

impl Default for DroneState {
    fn default() -> Self {
        Self {
            flying: false,
            rc_enabled: true,
            link_status: ConnectionStatus::NotConnected,
            last_input: Intent::default(),
            emergency_epoch: 0,
            battery: None,
            low_battery: false,
            height: None,
            vgx: None,
            vgy: None,
            vgz: None,
            pitch: None,
            roll: None,
            yaw: None,
            telemetry_extra: BTreeMap::new(),
            telemetry_updated: None,
            last_rc: None,
            last_rc_at: None,
            rc_sent: 0,
            error_count: 0,
            last_error: None,
            recovery_mode: false,
            video_status: ConnectionStatus::NotConnected,
            video_reconnects: 0,
            video_reconnect_total: 0,
            video_fps: 0.0,
        }
    }
}

impl DroneState {
    pub fn battery_label(&self) -> String {
        match self.battery {
            Some(p) if self.low_battery => format!("{}% LOW", p),
            Some(p) => format!("{}%", p),
            None => "--".into(),
        }
    }
}

/// Cheap-to-clone handle on the one [`DroneState`] of the process.
///
/// Every accessor takes the lock for a single read or write; never hold it
/// across a socket call.
#[derive(Debug, Clone, Default)]
pub struct SharedState(Arc<Mutex<DroneState>>);

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    // a panic mid-update leaves plain data behind, so poisoning is ignored
    fn lock(&self) -> MutexGuard<'_, DroneState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn snapshot(&self) -> DroneState {
        self.lock().clone()
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut DroneState) -> R) -> R {
        f(&mut self.lock())
    }

    pub fn set_intent(&self, intent: Intent) {
        self.lock().last_input = intent;
    }

    pub fn set_flying(&self, flying: bool) {
        self.lock().flying = flying;
    }

    pub fn is_flying(&self) -> bool {
        self.lock().flying
    }

    pub fn set_rc_enabled(&self, enabled: bool) {
        self.lock().rc_enabled = enabled;
    }

    /// Motors cut: grounded, rc off, and any takeoff in flight is void.
    pub fn trip_emergency(&self) {
        let mut s = self.lock();
        s.flying = false;
        s.rc_enabled = false;
        s.emergency_epoch += 1;
    }

    /// Re-enables rc and returns the ticket [`Self::finish_takeoff`] checks.
    pub fn begin_takeoff(&self) -> u64 {
        let mut s = self.lock();
        s.rc_enabled = true;
        s.emergency_epoch
    }

    /// Marks the vehicle flying unless an emergency tripped since `ticket`.
    pub fn finish_takeoff(&self, ticket: u64) -> bool {
        let mut s = self.lock();
        if s.emergency_epoch != ticket {
            return false;
        }
        s.flying = true;
        true
    }

    pub fn set_link_status(&self, status: ConnectionStatus) {
        self.lock().link_status = status;
    }

    /// What the dispatcher needs for one iteration: (flying, rc_enabled, intent).
    pub fn rc_inputs(&self) -> (bool, bool, Intent) {
        let s = self.lock();
        (s.flying, s.rc_enabled, s.last_input)
    }

    pub fn record_rc(&self, rc: RcCommand, at: Instant) {
        let mut s = self.lock();
        s.last_rc = Some(rc);
        s.last_rc_at = Some(at);
        s.rc_sent += 1;
    }

    /// Counts one loop failure and returns the new count.
    pub fn record_error(&self, msg: impl Into<String>) -> u32 {
        let mut s = self.lock();
        s.error_count += 1;
        s.last_error = Some(msg.into());
        s.error_count
    }

    /// Keeps the message without counting it as a loop failure.
    pub fn note_error(&self, msg: impl Into<String>) {
        self.lock().last_error = Some(msg.into());
    }

    pub fn set_recovery(&self, on: bool) {
        let mut s = self.lock();
        s.recovery_mode = on;
        if !on {
            s.error_count = 0;
        }
    }

    /// Returns true when the level is at or below `low_pct`.
    pub fn set_battery(&self, pct: u8, low_pct: u8) -> bool {
        let mut s = self.lock();
        s.battery = Some(pct);
        s.low_battery = pct <= low_pct;
        s.low_battery
    }

    /// Overlays whatever the report carries; absent fields keep their last value.
    pub fn merge_report(&self, report: &StateReport, low_pct: u8, at: Instant) {
        let mut s = self.lock();
        if let Some(v) = report.height { s.height = Some(v); }
        if let Some(v) = report.vgx { s.vgx = Some(v); }
        if let Some(v) = report.vgy { s.vgy = Some(v); }
        if let Some(v) = report.vgz { s.vgz = Some(v); }
        if let Some(v) = report.pitch { s.pitch = Some(v); }
        if let Some(v) = report.roll { s.roll = Some(v); }
        if let Some(v) = report.yaw { s.yaw = Some(v); }
        if let Some(p) = report.battery {
            s.battery = Some(p);
            s.low_battery = p <= low_pct;
        }
        for (k, v) in &report.extra {
            s.telemetry_extra.insert(k.clone(), v.clone());
        }
        s.telemetry_updated = Some(at);
    }

    pub fn set_video(&self, status: ConnectionStatus, reconnects: u32, total: u32) {
        let mut s = self.lock();
        s.video_status = status;
        s.video_reconnects = reconnects;
        s.video_reconnect_total = total;
    }

    pub fn set_video_fps(&self, fps: f32) {
        self.lock().video_fps = fps;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hover_proto::telemetry::parse_state;

    #[test]
    fn starts_unknown() {
        let s = SharedState::new().snapshot();
        assert!(!s.flying);
        assert!(s.rc_enabled);
        assert_eq!(s.battery, None);
        assert_eq!(s.height, None);
        assert_eq!(s.battery_label(), "--");
        assert_eq!(s.video_status, ConnectionStatus::NotConnected);
    }

    #[test]
    fn merge_keeps_previous_values() {
        let st = SharedState::new();
        let t0 = Instant::now();
        st.merge_report(&parse_state("h:50;yaw:10;bat:40;templ:60"), 15, t0);
        st.merge_report(&parse_state("yaw:12;wifi:snr"), 15, t0);
        let s = st.snapshot();
        assert_eq!(s.height, Some(50.0));
        assert_eq!(s.yaw, Some(12.0));
        assert_eq!(s.battery, Some(40));
        assert_eq!(s.telemetry_extra.len(), 2);
        assert_eq!(s.telemetry_updated, Some(t0));
    }

    #[test]
    fn low_battery_flag_follows_threshold() {
        let st = SharedState::new();
        assert!(!st.set_battery(16, 15));
        assert!(st.set_battery(15, 15));
        assert_eq!(st.snapshot().battery_label(), "15% LOW");
        st.merge_report(&parse_state("bat:80"), 15, Instant::now());
        assert!(!st.snapshot().low_battery);
    }

    #[test]
    fn error_counter_resets_after_recovery() {
        let st = SharedState::new();
        assert_eq!(st.record_error("a"), 1);
        assert_eq!(st.record_error("b"), 2);
        st.note_error("c");
        assert_eq!(st.snapshot().error_count, 2);
        st.set_recovery(true);
        assert!(st.snapshot().recovery_mode);
        st.set_recovery(false);
        let s = st.snapshot();
        assert_eq!(s.error_count, 0);
        assert_eq!(s.last_error.as_deref(), Some("c"));
    }

    #[test]
    fn emergency_voids_pending_takeoff() {
        let st = SharedState::new();
        let ticket = st.begin_takeoff();
        st.trip_emergency();
        assert!(!st.finish_takeoff(ticket));
        assert!(!st.is_flying());
        assert!(!st.snapshot().rc_enabled);

        let ticket = st.begin_takeoff();
        assert!(st.finish_takeoff(ticket));
        assert!(st.is_flying());
    }

    #[test]
    fn survives_a_poisoned_lock() {
        let st = SharedState::new();
        let st2 = st.clone();
        let _ = std::thread::spawn(move || {
            st2.update(|s| {
                s.flying = true;
                panic!("boom");
            })
        })
        .join();
        assert!(st.is_flying());
    }
}
