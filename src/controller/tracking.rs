use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical hand controller as reported by the tracking runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Left,
    Right,
}

impl Role {
    pub const ALL: [Role; 2] = [Role::Left, Role::Right];
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Left => f.pad("Left"),
            Role::Right => f.pad("Right"),
        }
    }
}

/// One 6-DoF sample: a row-major 3x4 matrix, rotation basis plus translation
///
/// ```text
/// | m0 m1 m2  m3  |
/// | m4 m5 m6  m7  |
/// | m8 m9 m10 m11 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    pub role: Role,
    pub matrix: [f32; 12],
    pub connected: bool,
    pub valid: bool,
}

impl PoseSample {
    /// Identity rotation at the origin, connected and valid
    pub fn identity(role: Role) -> Self {
        Self {
            role,
            matrix: [1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            connected: true,
            valid: true,
        }
    }

    /// Only connected samples with a valid pose are classified
    pub fn is_trackable(&self) -> bool {
        self.connected && self.valid
    }

    pub fn position(&self) -> (f32, f32, f32) {
        (self.matrix[3], self.matrix[7], self.matrix[11])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonId {
    ApplicationMenu,
    Grip,
    Touchpad,
    Trigger,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ButtonEdge {
    Press,
    Unpress,
    Touch,
    Untouch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonTransition {
    pub role: Role,
    pub button: ButtonId,
    pub edge: ButtonEdge,
}

impl ButtonTransition {
    pub fn new(role: Role, button: ButtonId, edge: ButtonEdge) -> Self {
        Self { role, button, edge }
    }
}

/// Touchpad or joystick displacement from center, roughly within [-1, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisSample {
    pub role: Role,
    pub x: f32,
    pub y: f32,
}

/// Discrete event drained from the tracking runtime once per tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TrackingEvent {
    Button(ButtonTransition),
    Quit,
}

/// Errors raised while bringing up a tracking source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("Failed to initialize tracking source: {0}")]
    InitializationError(String),
}

/// Everything the frame driver needs from the tracking runtime
///
/// `poll_edges` must be non-blocking and return only the backlog queued since
/// the previous call. Continuous samples are pulled per hand after the drain.
pub trait PoseSource {
    fn poll_edges(&mut self) -> Vec<TrackingEvent>;

    fn pose(&mut self, role: Role) -> Option<PoseSample>;

    fn axis(&mut self, role: Role) -> Option<AxisSample>;

    fn is_connected(&mut self, role: Role) -> bool;

    fn name(&self) -> &str {
        "tracking source"
    }
}

impl<S: PoseSource + ?Sized> PoseSource for Box<S> {
    fn poll_edges(&mut self) -> Vec<TrackingEvent> {
        (**self).poll_edges()
    }

    fn pose(&mut self, role: Role) -> Option<PoseSample> {
        (**self).pose(role)
    }

    fn axis(&mut self, role: Role) -> Option<AxisSample> {
        (**self).axis(role)
    }

    fn is_connected(&mut self, role: Role) -> bool {
        (**self).is_connected(role)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_display_without_padding() {
        assert_eq!(Role::Left.to_string(), "Left");
        assert_eq!(Role::Right.to_string(), "Right");
        assert_eq!(format!("{:<5}|", Role::Left), "Left |");
    }

    #[test]
    fn pose_needs_both_flags() {
        let mut pose = PoseSample::identity(Role::Left);
        assert!(pose.is_trackable());
        pose.valid = false;
        assert!(!pose.is_trackable());
        pose.valid = true;
        pose.connected = false;
        assert!(!pose.is_trackable());
    }

    #[test]
    fn position_reads_translation_column() {
        let mut pose = PoseSample::identity(Role::Right);
        pose.matrix[3] = 0.4;
        pose.matrix[7] = 1.2;
        pose.matrix[11] = -0.3;
        assert_eq!(pose.position(), (0.4, 1.2, -0.3));
    }
}
