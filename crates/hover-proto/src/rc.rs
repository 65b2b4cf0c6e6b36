use serde::{Deserialize, Serialize};
use std::fmt;

/// Largest magnitude the vehicle accepts on any `rc` channel.
pub const RC_LIMIT: i32 = 100;

/// Channel values below this magnitude are sent as 0.
pub const RC_NOISE_FLOOR: i32 = 5;

/// Normalized human-control input for one control tick.
///
/// Axes are in [-1, 1] after deadzone correction. A new tick replaces the
/// previous value wholesale; nothing is queued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub rotation: f32,
    pub takeoff: bool,
    pub land: bool,
    pub emergency: bool,
    pub photo: bool,
}

impl Intent {
    pub fn axes(&self) -> [f32; 4] {
        [self.x, self.y, self.z, self.rotation]
    }
}

/// Integer velocity set-point, rendered as `rc <lr> <fb> <ud> <yaw>`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RcCommand {
    pub left_right: i8,
    pub forward_backward: i8,
    pub up_down: i8,
    pub yaw: i8,
}

impl RcCommand {
    pub const ZERO: RcCommand = RcCommand { left_right: 0, forward_backward: 0, up_down: 0, yaw: 0 };

    pub fn from_intent(intent: &Intent) -> Self {
        Self {
            left_right: scale_channel(intent.x),
            forward_backward: scale_channel(intent.y),
            up_down: scale_channel(intent.z),
            yaw: scale_channel(intent.rotation),
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for RcCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rc {} {} {} {}", self.left_right, self.forward_backward, self.up_down, self.yaw)
    }
}

/// x100, truncate, clamp to the channel range, then zero the noise floor.
/// NaN counts as 0.
fn scale_channel(v: f32) -> i8 {
    if v.is_nan() {
        return 0;
    }
    let scaled = (v * 100.0).clamp(-(RC_LIMIT as f32), RC_LIMIT as f32) as i32;
    if scaled.abs() < RC_NOISE_FLOOR { 0 } else { scaled as i8 }
}
