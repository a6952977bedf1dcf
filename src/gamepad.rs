//! Gamepad input via gilrs, with hotplugging.
//!
//! The first connected controller drives player one. Its left stick X axis (or D-pad)
//! is read every tick; Start or South readies player one on the idle screen.

use gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs};
use tracing::{debug, info, warn};

pub struct GamepadHandler {
    /// `None` when no gamepad backend is available on this system.
    gilrs: Option<Gilrs>,
    active: Option<GamepadId>,
    pub controller_name: Option<String>,
}

impl GamepadHandler {
    pub fn new() -> Self {
        let gilrs = match Gilrs::new() {
            Ok(g) => {
                info!("gamepad support initialized");
                Some(g)
            }
            Err(e) => {
                warn!("gamepad support unavailable, keyboard only: {e}");
                None
            }
        };
        let mut handler = Self {
            gilrs,
            active: None,
            controller_name: None,
        };
        handler.check_connected();
        handler
    }

    /// Pick the first connected controller, if any.
    fn check_connected(&mut self) {
        self.active = None;
        self.controller_name = None;
        if let Some(ref gilrs) = self.gilrs {
            if let Some((id, gamepad)) = gilrs.gamepads().find(|(_, g)| g.is_connected()) {
                info!("gamepad connected: {}", gamepad.name());
                self.active = Some(id);
                self.controller_name = Some(gamepad.name().to_string());
            }
        }
    }

    /// Drain pending events. Returns true if the active controller pressed a start button.
    pub fn poll(&mut self) -> bool {
        let Some(gilrs) = self.gilrs.as_mut() else {
            return false;
        };

        let mut start_pressed = false;
        let mut need_reconnect_check = false;
        while let Some(Event { id, event, .. }) = gilrs.next_event() {
            match event {
                EventType::Connected if self.active.is_none() => {
                    let name = gilrs.gamepad(id).name().to_string();
                    info!("gamepad connected: {name}");
                    self.active = Some(id);
                    self.controller_name = Some(name);
                }
                EventType::Disconnected if self.active == Some(id) => {
                    info!("gamepad disconnected");
                    need_reconnect_check = true;
                }
                EventType::ButtonPressed(button, _) if self.active == Some(id) => {
                    if is_start_button(button) {
                        debug!(?button, "start pressed");
                        start_pressed = true;
                    }
                }
                _ => {}
            }
        }

        if need_reconnect_check {
            self.check_connected();
        }
        start_pressed
    }

    /// Horizontal input of the active controller in -1.0..=1.0, or `None` when no
    /// controller is connected. A held D-pad direction reads as a full deflection.
    pub fn axis_x(&self) -> Option<f32> {
        let gilrs = self.gilrs.as_ref()?;
        let gamepad = gilrs.gamepad(self.active?);
        if gamepad.is_pressed(Button::DPadLeft) {
            return Some(-1.0);
        }
        if gamepad.is_pressed(Button::DPadRight) {
            return Some(1.0);
        }
        Some(gamepad.value(Axis::LeftStickX))
    }
}

fn is_start_button(button: Button) -> bool {
    matches!(button, Button::Start | Button::South)
}
