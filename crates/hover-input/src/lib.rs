pub mod calibrate;
pub mod device;
pub mod doctor;
pub mod normalize;
#[cfg(feature = "gamepad")]
pub mod gamepad;

pub use device::{get_normalized_input, InputDevice, NoDevice, RawSample};
pub use normalize::InputNormalizer;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_DEADZONE: f32 = 0.15;

/// Controller settings. Every key is optional in the config file; missing
/// keys keep the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub deadzone: f32,
    pub axis_mapping: AxisMapping,
    pub button_mapping: ButtonMapping,
    pub invert_axis: AxisInversion,
    pub sensitivity: Sensitivity,
    pub calibration: Calibration,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            deadzone: DEFAULT_DEADZONE,
            axis_mapping: AxisMapping::default(),
            button_mapping: ButtonMapping::default(),
            invert_axis: AxisInversion::default(),
            sensitivity: Sensitivity::default(),
            calibration: Calibration::default(),
        }
    }
}

/// Physical axis index feeding each logical axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisMapping {
    pub move_x: usize,   // left stick X: strafe
    pub move_y: usize,   // left stick Y: forward/back
    pub move_z: usize,   // right stick Y: climb/descend
    pub rotation: usize, // right stick X: yaw
}

impl Default for AxisMapping {
    fn default() -> Self {
        Self { move_x: 0, move_y: 1, move_z: 3, rotation: 2 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonMapping {
    pub takeoff: usize,
    pub land: usize,
    pub emergency: usize,
    pub photo: usize,
}

impl Default for ButtonMapping {
    fn default() -> Self {
        Self { takeoff: 0, land: 1, emergency: 2, photo: 3 }
    }
}

/// Stick Y axes report "down" as positive, so forward and climb are flipped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AxisInversion {
    pub move_x: bool,
    pub move_y: bool,
    pub move_z: bool,
    pub rotation: bool,
}

impl Default for AxisInversion {
    fn default() -> Self {
        Self { move_x: false, move_y: true, move_z: true, rotation: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sensitivity {
    pub move_xy: f32,
    pub move_z: f32,
    pub rotation: f32,
}

impl Default for Sensitivity {
    fn default() -> Self {
        Self { move_xy: 1.0, move_z: 0.7, rotation: 0.8 }
    }
}

/// Resting offsets measured per physical axis (keys are axis indices).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    pub axis_offsets: BTreeMap<String, f32>,
}

impl Calibration {
    pub fn offset(&self, axis: usize) -> f32 {
        self.axis_offsets
            .get(&axis.to_string())
            .copied()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }
}
