//! Gamepad stand-in for the VR runtime, built on gilrs.
//!
//! Useful for rigging without a headset: each stick acts as the touchpad of
//! one physical hand, the shoulder buttons and triggers act as grip and
//! trigger, and stick clicks are touchpad presses. A gamepad has no pose, so
//! palm orientation and position streaming stay silent in this mode.

use super::tracking::{
    AxisSample, ButtonEdge, ButtonId, ButtonTransition, PoseSample, PoseSource, Role, SourceError,
    TrackingEvent,
};
use chrono::Local;
use gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs};
use tracing::{debug, info, warn};

/// Fraction of stick travel treated as "finger resting on the pad"
pub const DEFAULT_TOUCH_DEADZONE: f32 = 0.15;

#[derive(Debug, Default, Clone, Copy)]
struct StickState {
    x: f32,
    y: f32,
    touching: bool,
}

pub struct GamepadSource {
    gilrs: Gilrs,
    active_gamepad: Option<GamepadId>,
    touch_deadzone: f32,
    left: StickState,
    right: StickState,
}

impl GamepadSource {
    pub fn create(touch_deadzone: f32) -> Result<Self, SourceError> {
        info!("Initializing gilrs controller interface");
        let gilrs = Gilrs::new().map_err(|e| SourceError::InitializationError(e.to_string()))?;

        let mut source = Self {
            gilrs,
            active_gamepad: None,
            touch_deadzone,
            left: StickState::default(),
            right: StickState::default(),
        };
        source.select_gamepad();
        Ok(source)
    }

    fn select_gamepad(&mut self) {
        let mut gamepads = self.gilrs.gamepads();
        match gamepads.next() {
            Some((id, gamepad)) => {
                info!("Selected gamepad: {} ({})", gamepad.name(), id);
                self.active_gamepad = Some(id);
            }
            None => warn!("No gamepad connected, waiting for one to appear"),
        }
    }

    fn stick_mut(&mut self, role: Role) -> &mut StickState {
        match role {
            Role::Left => &mut self.left,
            Role::Right => &mut self.right,
        }
    }

    fn stick(&self, role: Role) -> StickState {
        match role {
            Role::Left => self.left,
            Role::Right => self.right,
        }
    }

    fn convert_event(&mut self, id: GamepadId, event: EventType) -> Option<TrackingEvent> {
        match event {
            EventType::Connected => {
                if self.active_gamepad.is_none() {
                    info!("Gamepad {} connected, using it", id);
                    self.active_gamepad = Some(id);
                }
                None
            }
            EventType::Disconnected => {
                if self.active_gamepad == Some(id) {
                    warn!("Active gamepad {} disconnected", id);
                    self.active_gamepad = None;
                }
                None
            }
            _ if self.active_gamepad != Some(id) => {
                debug!("Skipping event from non-active gamepad: {:?}", id);
                None
            }
            EventType::AxisChanged(axis, value, _) => self.convert_axis(axis, value),
            EventType::ButtonPressed(Button::Mode, _) => {
                info!("Mode button pressed, quitting");
                Some(TrackingEvent::Quit)
            }
            EventType::ButtonPressed(button, _) => map_button(button)
                .map(|(role, button)| ButtonTransition::new(role, button, ButtonEdge::Press))
                .map(TrackingEvent::Button),
            EventType::ButtonReleased(button, _) => map_button(button)
                .map(|(role, button)| ButtonTransition::new(role, button, ButtonEdge::Unpress))
                .map(TrackingEvent::Button),
            _ => None,
        }
    }

    fn convert_axis(&mut self, axis: Axis, value: f32) -> Option<TrackingEvent> {
        let (role, is_x) = match axis {
            Axis::LeftStickX => (Role::Left, true),
            Axis::LeftStickY => (Role::Left, false),
            Axis::RightStickX => (Role::Right, true),
            Axis::RightStickY => (Role::Right, false),
            _ => {
                debug!("Ignoring unsupported axis: {:?}", axis);
                return None;
            }
        };

        let deadzone = self.touch_deadzone;
        let stick = self.stick_mut(role);
        if is_x {
            stick.x = value;
        } else {
            stick.y = value;
        }

        let touching = (stick.x * stick.x + stick.y * stick.y).sqrt() >= deadzone;
        if touching == stick.touching {
            return None;
        }
        stick.touching = touching;

        let edge = if touching {
            ButtonEdge::Touch
        } else {
            ButtonEdge::Untouch
        };
        Some(TrackingEvent::Button(ButtonTransition::new(
            role,
            ButtonId::Touchpad,
            edge,
        )))
    }
}

impl PoseSource for GamepadSource {
    fn poll_edges(&mut self) -> Vec<TrackingEvent> {
        let mut events = Vec::new();
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            if let Some(tracking_event) = self.convert_event(id, event) {
                debug!(
                    "Gamepad edge {:?} at {}",
                    tracking_event,
                    Local::now().format("%H:%M:%S.%3f")
                );
                events.push(tracking_event);
            }
        }
        events
    }

    fn pose(&mut self, _role: Role) -> Option<PoseSample> {
        None
    }

    fn axis(&mut self, role: Role) -> Option<AxisSample> {
        self.active_gamepad?;
        let stick = self.stick(role);
        Some(AxisSample {
            role,
            x: stick.x,
            y: stick.y,
        })
    }

    fn is_connected(&mut self, _role: Role) -> bool {
        self.active_gamepad
            .and_then(|id| self.gilrs.connected_gamepad(id))
            .is_some()
    }

    fn name(&self) -> &str {
        "gamepad"
    }
}

fn map_button(button: Button) -> Option<(Role, ButtonId)> {
    match button {
        Button::Select => Some((Role::Left, ButtonId::ApplicationMenu)),
        Button::LeftTrigger => Some((Role::Left, ButtonId::Grip)),
        Button::LeftTrigger2 => Some((Role::Left, ButtonId::Trigger)),
        Button::LeftThumb => Some((Role::Left, ButtonId::Touchpad)),
        Button::Start => Some((Role::Right, ButtonId::ApplicationMenu)),
        Button::RightTrigger => Some((Role::Right, ButtonId::Grip)),
        Button::RightTrigger2 => Some((Role::Right, ButtonId::Trigger)),
        Button::RightThumb => Some((Role::Right, ButtonId::Touchpad)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shoulder_buttons_follow_their_side() {
        assert_eq!(
            map_button(Button::LeftTrigger),
            Some((Role::Left, ButtonId::Grip))
        );
        assert_eq!(
            map_button(Button::RightTrigger2),
            Some((Role::Right, ButtonId::Trigger))
        );
        assert_eq!(map_button(Button::South), None);
    }
}
