use anyhow::Result;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::info;

use crate::device::{InputDevice, RawSample};
use crate::InputConfig;

/// Mean resting value of every axis seen across `samples`.
pub fn average_offsets(samples: &[RawSample]) -> BTreeMap<String, f32> {
    let mut sums: BTreeMap<usize, (f32, u32)> = BTreeMap::new();
    for s in samples {
        for (i, v) in s.axes.iter().enumerate() {
            if !v.is_finite() { continue; }
            let e = sums.entry(i).or_insert((0.0, 0));
            e.0 += v;
            e.1 += 1;
        }
    }
    sums.into_iter()
        .map(|(i, (sum, n))| (i.to_string(), sum / n as f32))
        .collect()
}

/// Samples the device with the sticks released and returns a new config
/// carrying the measured offsets. `base` is left untouched.
pub fn calibrate(
    dev: &mut dyn InputDevice,
    base: &InputConfig,
    samples: usize,
    delay: Duration,
) -> Result<InputConfig> {
    anyhow::ensure!(dev.is_available(), "calibration failed: no controller connected");
    anyhow::ensure!(samples > 0, "calibration needs at least one sample");

    info!("calibrating {} ({} samples)", dev.name(), samples);
    let mut collected = Vec::with_capacity(samples);
    for _ in 0..samples {
        if let Some(s) = dev.poll() {
            collected.push(s);
        }
        std::thread::sleep(delay);
    }
    anyhow::ensure!(!collected.is_empty(), "calibration failed: device returned no samples");

    let offsets = average_offsets(&collected);
    info!("axis offsets: {:?}", offsets);

    let mut cfg = base.clone();
    cfg.calibration.axis_offsets = offsets;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::tests::ScriptedDevice;
    use crate::NoDevice;

    fn axes(v: &[f32]) -> RawSample {
        RawSample { axes: v.to_vec(), buttons: vec![] }
    }

    #[test]
    fn averages_per_axis() {
        let offsets = average_offsets(&[axes(&[0.1, -0.2]), axes(&[0.3, -0.4, 0.5]), axes(&[f32::NAN])]);
        assert!((offsets["0"] - 0.2).abs() < 1e-6);
        assert!((offsets["1"] + 0.3).abs() < 1e-6);
        assert!((offsets["2"] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn produces_new_config() {
        let base = InputConfig::default();
        let mut dev = ScriptedDevice { samples: vec![axes(&[0.02, 0.0]), axes(&[0.04, 0.0])] };
        let cfg = calibrate(&mut dev, &base, 2, Duration::ZERO).unwrap();
        assert!((cfg.calibration.offset(0) - 0.03).abs() < 1e-6);
        assert_eq!(cfg.deadzone, base.deadzone);
        assert!(base.calibration.axis_offsets.is_empty());
    }

    #[test]
    fn refuses_without_device() {
        assert!(calibrate(&mut NoDevice, &InputConfig::default(), 5, Duration::ZERO).is_err());
    }
}
