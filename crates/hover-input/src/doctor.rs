use anyhow::Result;
use crate::InputConfig;

/// Highest axis/button index any supported controller reports.
const MAX_INDEX: usize = 31;

pub fn check_input(cfg: &InputConfig) -> Result<()> {
    anyhow::ensure!(cfg.deadzone >= 0.0 && cfg.deadzone < 1.0, "input.deadzone must be in [0, 1)");
    if cfg.deadzone > 0.5 {
        tracing::warn!("input.deadzone {} swallows more than half the stick travel", cfg.deadzone);
    }

    let s = &cfg.sensitivity;
    for (name, v) in [("move_xy", s.move_xy), ("move_z", s.move_z), ("rotation", s.rotation)] {
        anyhow::ensure!(v.is_finite() && v > 0.0 && v <= 2.0, "input.sensitivity.{} should be in (0, 2]", name);
    }

    let a = &cfg.axis_mapping;
    let axes = [a.move_x, a.move_y, a.move_z, a.rotation];
    anyhow::ensure!(axes.iter().all(|i| *i <= MAX_INDEX), "input.axis_mapping index above {}", MAX_INDEX);
    anyhow::ensure!(distinct(&axes), "input.axis_mapping maps two logical axes to one stick");

    let b = &cfg.button_mapping;
    let buttons = [b.takeoff, b.land, b.emergency, b.photo];
    anyhow::ensure!(buttons.iter().all(|i| *i <= MAX_INDEX), "input.button_mapping index above {}", MAX_INDEX);
    anyhow::ensure!(distinct(&buttons), "input.button_mapping assigns one button twice");

    for (k, v) in &cfg.calibration.axis_offsets {
        anyhow::ensure!(k.parse::<usize>().is_ok(), "input.calibration.axis_offsets key {:?} is not an axis index", k);
        anyhow::ensure!(v.is_finite() && v.abs() < 0.5, "input.calibration offset for axis {} is implausible ({})", k, v);
    }
    Ok(())
}

fn distinct(v: &[usize]) -> bool {
    v.iter().enumerate().all(|(i, a)| !v[i + 1..].contains(a))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_passes() {
        check_input(&InputConfig::default()).unwrap();
    }

    #[test]
    fn flags_bad_values() {
        let mut cfg = InputConfig::default();
        cfg.deadzone = 1.0;
        assert!(check_input(&cfg).is_err());

        let mut cfg = InputConfig::default();
        cfg.axis_mapping.rotation = cfg.axis_mapping.move_x;
        assert!(check_input(&cfg).is_err());

        let mut cfg = InputConfig::default();
        cfg.button_mapping.photo = 0;
        assert!(check_input(&cfg).is_err());

        let mut cfg = InputConfig::default();
        cfg.sensitivity.move_z = 0.0;
        assert!(check_input(&cfg).is_err());

        let mut cfg = InputConfig::default();
        cfg.calibration.axis_offsets.insert("left".into(), 0.1);
        assert!(check_input(&cfg).is_err());
    }
}
