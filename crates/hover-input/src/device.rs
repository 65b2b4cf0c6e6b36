use hover_proto::Intent;

use crate::normalize::InputNormalizer;

/// One poll of a controller: axis values (nominally -1..1) and button states,
/// indexed the way the device reports them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSample {
    pub axes: Vec<f32>,
    pub buttons: Vec<bool>,
}

impl RawSample {
    /// Missing axes read as centred.
    pub fn axis(&self, index: usize) -> f32 {
        self.axes.get(index).copied().unwrap_or(0.0)
    }

    /// Missing buttons read as released.
    pub fn button(&self, index: usize) -> bool {
        self.buttons.get(index).copied().unwrap_or(false)
    }
}

/// A polled human-input device.
pub trait InputDevice {
    fn name(&self) -> String;
    fn is_available(&self) -> bool;
    fn poll(&mut self) -> Option<RawSample>;
}

/// Stand-in when no controller backend is compiled in or attached.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDevice;

impl InputDevice for NoDevice {
    fn name(&self) -> String {
        "none".into()
    }

    fn is_available(&self) -> bool {
        false
    }

    fn poll(&mut self) -> Option<RawSample> {
        None
    }
}

pub fn get_normalized_input(dev: &mut dyn InputDevice, normalizer: &InputNormalizer) -> Option<Intent> {
    if !dev.is_available() {
        return None;
    }
    dev.poll().map(|s| normalizer.normalize(&s))
}
