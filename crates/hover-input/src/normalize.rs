use hover_proto::Intent;

use crate::device::RawSample;
use crate::{InputConfig, DEFAULT_DEADZONE};

#[derive(Debug, Clone, Copy)]
enum AxisClass {
    Horizontal,
    Vertical,
    Yaw,
}

/// Pure mapping from raw device samples to an [`Intent`].
#[derive(Debug, Clone)]
pub struct InputNormalizer {
    cfg: InputConfig,
    deadzone: f32,
}

impl InputNormalizer {
    pub fn new(cfg: InputConfig) -> Self {
        let deadzone = if (0.0..1.0).contains(&cfg.deadzone) { cfg.deadzone } else { DEFAULT_DEADZONE };
        Self { cfg, deadzone }
    }

    pub fn config(&self) -> &InputConfig {
        &self.cfg
    }

    pub fn normalize(&self, sample: &RawSample) -> Intent {
        let map = &self.cfg.axis_mapping;
        let inv = &self.cfg.invert_axis;
        let buttons = &self.cfg.button_mapping;

        Intent {
            x: self.axis(sample, map.move_x, inv.move_x, AxisClass::Horizontal),
            y: self.axis(sample, map.move_y, inv.move_y, AxisClass::Horizontal),
            z: self.axis(sample, map.move_z, inv.move_z, AxisClass::Vertical),
            rotation: self.axis(sample, map.rotation, inv.rotation, AxisClass::Yaw),
            takeoff: sample.button(buttons.takeoff),
            land: sample.button(buttons.land),
            emergency: sample.button(buttons.emergency),
            photo: sample.button(buttons.photo),
        }
    }

    fn axis(&self, sample: &RawSample, index: usize, invert: bool, class: AxisClass) -> f32 {
        let raw = sample.axis(index);
        if raw.is_nan() {
            return 0.0;
        }
        let mut v = raw - self.cfg.calibration.offset(index);
        if invert { v = -v; }
        v *= self.sensitivity(class);
        apply_deadzone(v, self.deadzone)
    }

    fn sensitivity(&self, class: AxisClass) -> f32 {
        let s = &self.cfg.sensitivity;
        let v = match class {
            AxisClass::Horizontal => s.move_xy,
            AxisClass::Vertical => s.move_z,
            AxisClass::Yaw => s.rotation,
        };
        if v.is_finite() { v } else { 1.0 }
    }
}

/// Zero inside the deadzone, then rescale so `deadzone` maps to 0 and ±1 stays ±1.
pub fn apply_deadzone(v: f32, deadzone: f32) -> f32 {
    let mag = v.abs();
    if v.is_nan() || mag < deadzone {
        return 0.0;
    }
    let out = v.signum() * (mag - deadzone) / (1.0 - deadzone);
    out.clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sensitivity;

    fn sample(axes: &[f32], buttons: &[bool]) -> RawSample {
        RawSample { axes: axes.to_vec(), buttons: buttons.to_vec() }
    }

    #[test]
    fn inside_deadzone_is_exactly_zero() {
        for v in [0.0, 0.01, -0.1, 0.149, -0.149] {
            assert_eq!(apply_deadzone(v, 0.15), 0.0);
        }
    }

    #[test]
    fn outside_deadzone_is_monotonic_and_exact_at_one() {
        let mut prev = 0.0f32;
        let mut v = 0.15f32;
        while v <= 1.0 {
            let out = apply_deadzone(v, 0.15);
            assert!((0.0..=1.0).contains(&out));
            assert!(out >= prev);
            assert_eq!(apply_deadzone(-v, 0.15), -out);
            prev = out;
            v += 0.01;
        }
        assert_eq!(apply_deadzone(1.0, 0.15), 1.0);
        assert_eq!(apply_deadzone(-1.0, 0.15), -1.0);
    }

    #[test]
    fn half_deflection_example() {
        let n = InputNormalizer::new(InputConfig::default());
        let intent = n.normalize(&sample(&[0.5, 0.0, 0.0, 0.0], &[]));
        assert!((intent.x - 0.4118).abs() < 1e-3, "x = {}", intent.x);
        assert_eq!(intent.y, 0.0);
    }

    #[test]
    fn inversion_and_sensitivity_apply_before_deadzone() {
        let n = InputNormalizer::new(InputConfig::default());
        // axis 1 (move_y) inverted, axis 3 (move_z) inverted with 0.7 sensitivity
        let intent = n.normalize(&sample(&[0.0, -1.0, 0.0, 1.0], &[]));
        assert_eq!(intent.y, 1.0);
        let expected_z = -(0.7 - 0.15) / 0.85;
        assert!((intent.z - expected_z).abs() < 1e-6);
        // 0.2 * 0.7 = 0.14 falls inside the deadzone
        let intent = n.normalize(&sample(&[0.0, 0.0, 0.0, 0.2], &[]));
        assert_eq!(intent.z, 0.0);
    }

    #[test]
    fn calibration_offset_is_subtracted() {
        let mut cfg = InputConfig::default();
        cfg.calibration.axis_offsets.insert("0".into(), 0.3);
        let n = InputNormalizer::new(cfg);
        assert_eq!(n.normalize(&sample(&[0.4], &[])).x, 0.0);
        let x = n.normalize(&sample(&[0.8], &[])).x;
        assert!((x - (0.5 - 0.15) / 0.85).abs() < 1e-6);
    }

    #[test]
    fn out_of_range_indices_read_as_neutral() {
        let n = InputNormalizer::new(InputConfig::default());
        let intent = n.normalize(&sample(&[0.9], &[true]));
        assert!(intent.x > 0.0);
        assert_eq!(intent.rotation, 0.0);
        assert!(intent.takeoff);
        assert!(!intent.land && !intent.emergency && !intent.photo);

        assert_eq!(n.normalize(&RawSample::default()), Intent::default());
    }

    #[test]
    fn output_stays_bounded_for_wild_input() {
        let mut cfg = InputConfig::default();
        cfg.sensitivity = Sensitivity { move_xy: 3.0, move_z: f32::NAN, rotation: 1.0 };
        let n = InputNormalizer::new(cfg);
        let intent = n.normalize(&sample(&[5.0, f32::NAN, -7.0, f32::INFINITY], &[]));
        for v in intent.axes() {
            assert!((-1.0..=1.0).contains(&v), "{v}");
        }
        assert_eq!(intent.y, 0.0);
    }

    #[test]
    fn bad_deadzone_falls_back_to_default() {
        let mut cfg = InputConfig::default();
        cfg.deadzone = 1.5;
        let n = InputNormalizer::new(cfg);
        assert_eq!(n.normalize(&sample(&[0.1], &[])).x, 0.0);
        assert!(n.normalize(&sample(&[0.2], &[])).x > 0.0);
    }
}
