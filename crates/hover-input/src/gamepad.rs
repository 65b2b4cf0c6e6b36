use anyhow::Result;
use gilrs::{Axis, Button, EventType, GamepadId, Gilrs};
use tracing::{info, warn};

use crate::device::{InputDevice, RawSample};

// Index order mirrors the usual joystick layout: sticks first, triggers last.
const AXES: [Axis; 6] = [
    Axis::LeftStickX,
    Axis::LeftStickY,
    Axis::RightStickX,
    Axis::RightStickY,
    Axis::LeftZ,
    Axis::RightZ,
];

const BUTTONS: [Button; 16] = [
    Button::South,
    Button::East,
    Button::West,
    Button::North,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::LeftTrigger2,
    Button::RightTrigger2,
    Button::Select,
    Button::Start,
    Button::LeftThumb,
    Button::RightThumb,
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
];

/// First connected gamepad, re-selected on hot-plug.
pub struct GamepadDevice {
    gilrs: Gilrs,
    active: Option<GamepadId>,
}

impl GamepadDevice {
    pub fn open() -> Result<Self> {
        let gilrs = Gilrs::new().map_err(|e| anyhow::anyhow!("gamepad init failed: {}", e))?;
        let mut dev = Self { gilrs, active: None };
        dev.select_first();
        Ok(dev)
    }

    pub fn list(&self) -> Vec<String> {
        self.gilrs.gamepads().map(|(id, g)| format!("{:?}: {}", id, g.name())).collect()
    }

    fn select_first(&mut self) {
        self.active = self.gilrs.gamepads().map(|(id, _)| id).next();
        match self.active.and_then(|id| self.gilrs.connected_gamepad(id)) {
            Some(g) => info!("gamepad selected: {}", g.name()),
            None => warn!("no gamepad connected"),
        }
    }

    fn pump_events(&mut self) {
        while let Some(ev) = self.gilrs.next_event() {
            match ev.event {
                EventType::Connected => {
                    info!("gamepad connected: {:?}", ev.id);
                    if self.active.is_none() {
                        self.select_first();
                    }
                }
                EventType::Disconnected => {
                    info!("gamepad disconnected: {:?}", ev.id);
                    if self.active == Some(ev.id) {
                        self.select_first();
                    }
                }
                _ => {}
            }
        }
    }
}

impl InputDevice for GamepadDevice {
    fn name(&self) -> String {
        self.active
            .and_then(|id| self.gilrs.connected_gamepad(id))
            .map(|g| g.name().to_string())
            .unwrap_or_else(|| "none".into())
    }

    fn is_available(&self) -> bool {
        self.active.and_then(|id| self.gilrs.connected_gamepad(id)).is_some()
    }

    fn poll(&mut self) -> Option<RawSample> {
        self.pump_events();
        let g = self.gilrs.connected_gamepad(self.active?)?;
        // gilrs reports stick Y as up-positive; flip to the down-positive joystick convention
        let axes = AXES
            .iter()
            .map(|a| match a {
                Axis::LeftStickY | Axis::RightStickY => -g.value(*a),
                _ => g.value(*a),
            })
            .collect();
        let buttons = BUTTONS.iter().map(|b| g.is_pressed(*b)).collect();
        Some(RawSample { axes, buttons })
    }
}
