use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryValue {
    Number(f64),
    Text(String),
}

impl TelemetryValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TelemetryValue::Number(n) => Some(*n),
            TelemetryValue::Text(_) => None,
        }
    }
}

impl fmt::Display for TelemetryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryValue::Number(n) => write!(f, "{}", n),
            TelemetryValue::Text(t) => f.write_str(t),
        }
    }
}

/// Reply to `state?`: `pitch:0;roll:-1;yaw:12;vgx:0;...;h:80;bat:67;...`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateReport {
    pub height: Option<f64>, // cm, key "h"
    pub vgx: Option<f64>,
    pub vgy: Option<f64>,
    pub vgz: Option<f64>,
    pub pitch: Option<f64>,
    pub roll: Option<f64>,
    pub yaw: Option<f64>,
    pub battery: Option<u8>, // key "bat"
    pub extra: BTreeMap<String, TelemetryValue>,
}

impl StateReport {
    pub fn is_empty(&self) -> bool {
        self.height.is_none()
            && self.vgx.is_none()
            && self.vgy.is_none()
            && self.vgz.is_none()
            && self.pitch.is_none()
            && self.roll.is_none()
            && self.yaw.is_none()
            && self.battery.is_none()
            && self.extra.is_empty()
    }
}

/// Reply to `battery?`: a bare percentage, usually with a trailing CRLF.
pub fn parse_battery(reply: &str) -> Option<u8> {
    let pct: u8 = reply.trim().parse().ok()?;
    (pct <= 100).then_some(pct)
}

/// Splits `key:value;...` into pairs. Segments without a key or a `:` are skipped.
pub fn parse_pairs(reply: &str) -> BTreeMap<String, TelemetryValue> {
    let mut out = BTreeMap::new();
    for seg in reply.trim().split(';') {
        let Some((k, v)) = seg.split_once(':') else { continue };
        let k = k.trim();
        if k.is_empty() { continue; }
        let v = v.trim();
        let value = match v.parse::<f64>() {
            Ok(n) if n.is_finite() => TelemetryValue::Number(n),
            _ => TelemetryValue::Text(v.to_string()),
        };
        out.insert(k.to_string(), value);
    }
    out
}

pub fn parse_state(reply: &str) -> StateReport {
    let mut report = StateReport::default();
    for (k, v) in parse_pairs(reply) {
        match (k.as_str(), v.as_f64()) {
            ("h", Some(n)) => report.height = Some(n),
            ("vgx", Some(n)) => report.vgx = Some(n),
            ("vgy", Some(n)) => report.vgy = Some(n),
            ("vgz", Some(n)) => report.vgz = Some(n),
            ("pitch", Some(n)) => report.pitch = Some(n),
            ("roll", Some(n)) => report.roll = Some(n),
            ("yaw", Some(n)) => report.yaw = Some(n),
            ("bat", Some(n)) if (0.0..=100.0).contains(&n) => report.battery = Some(n as u8),
            _ => { report.extra.insert(k.clone(), v); }
        }
    }
    report
}
