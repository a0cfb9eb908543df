//! Synthetic calibration playback.
//!
//! Drives the translator without tracking hardware so a rig can be wired up
//! and checked end to end. A cycle is a fixed schedule of steps, each held for
//! `hold_frames` ticks:
//!
//! ```text
//! Sweep (16 steps)     position walks the calibration box, heading turns
//! Palm (4 steps)       palm faces +Y, -Y, -Z, +Z
//! Touchpad (18 steps)  center + 8 compass zones touched, then pressed
//! ```

use super::tracking::{
    AxisSample, ButtonEdge, ButtonId, ButtonTransition, PoseSample, PoseSource, Role,
    TrackingEvent,
};
use crate::config::Bounds;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;
use tracing::{debug, info};

const SWEEP_STEPS: u64 = 16;
const PALM_STEPS: u64 = 4;
const ZONE_STEPS: u64 = 9;
const TOUCHPAD_STEPS: u64 = ZONE_STEPS * 2;
const TOUCH_RADIUS: f32 = 0.9;

/// Which part of the calibration schedule to play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TestPattern {
    Sweep,
    Palm,
    Touchpad,
    #[default]
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Sweep(u64),
    Palm(u64),
    Touch(u64),
    Press(u64),
}

impl TestPattern {
    fn steps(self) -> u64 {
        match self {
            TestPattern::Sweep => SWEEP_STEPS,
            TestPattern::Palm => PALM_STEPS,
            TestPattern::Touchpad => TOUCHPAD_STEPS,
            TestPattern::All => SWEEP_STEPS + PALM_STEPS + TOUCHPAD_STEPS,
        }
    }

    fn phase(self, step: u64) -> Phase {
        let step = match self {
            TestPattern::Sweep => step,
            TestPattern::Palm => step + SWEEP_STEPS,
            TestPattern::Touchpad => step + SWEEP_STEPS + PALM_STEPS,
            TestPattern::All => step,
        };
        match step {
            s if s < SWEEP_STEPS => Phase::Sweep(s),
            s if s < SWEEP_STEPS + PALM_STEPS => Phase::Palm(s - SWEEP_STEPS),
            s if s < SWEEP_STEPS + PALM_STEPS + ZONE_STEPS => {
                Phase::Touch(s - SWEEP_STEPS - PALM_STEPS)
            }
            s => Phase::Press(s - SWEEP_STEPS - PALM_STEPS - ZONE_STEPS),
        }
    }
}

impl Phase {
    fn touch_flags(self) -> (bool, bool) {
        match self {
            Phase::Touch(_) => (true, false),
            Phase::Press(_) => (true, true),
            _ => (false, false),
        }
    }
}

pub struct TestPatternSource {
    pattern: TestPattern,
    bounds: Bounds,
    hold_frames: u64,
    cycles: Option<u32>,
    frame: u64,
    started: bool,
    finished: bool,
    touching: bool,
    pressing: bool,
}

impl TestPatternSource {
    pub fn new(pattern: TestPattern, bounds: Bounds, hold_frames: u64, cycles: Option<u32>) -> Self {
        info!(
            "Test pattern {:?}: {} steps per cycle, {} frames per step, cycles: {:?}",
            pattern,
            pattern.steps(),
            hold_frames.max(1),
            cycles
        );
        Self {
            pattern,
            bounds,
            hold_frames: hold_frames.max(1),
            cycles,
            frame: 0,
            started: false,
            finished: false,
            touching: false,
            pressing: false,
        }
    }

    fn step(&self) -> u64 {
        self.frame / self.hold_frames
    }

    fn current_phase(&self) -> Phase {
        self.pattern.phase(self.step() % self.pattern.steps())
    }

    fn exhausted(&self) -> bool {
        match self.cycles {
            Some(cycles) => self.step() >= u64::from(cycles) * self.pattern.steps(),
            None => false,
        }
    }

    fn edges_for(&self, touching: bool, pressing: bool) -> Vec<ButtonEdge> {
        let mut edges = Vec::new();
        if touching && !self.touching {
            edges.push(ButtonEdge::Touch);
        }
        if pressing && !self.pressing {
            edges.push(ButtonEdge::Press);
        }
        if !pressing && self.pressing {
            edges.push(ButtonEdge::Unpress);
        }
        if !touching && self.touching {
            edges.push(ButtonEdge::Untouch);
        }
        edges
    }
}

impl PoseSource for TestPatternSource {
    fn poll_edges(&mut self) -> Vec<TrackingEvent> {
        if self.finished {
            return Vec::new();
        }
        if self.started {
            self.frame += 1;
        } else {
            self.started = true;
        }

        let (touching, pressing) = if self.exhausted() {
            (false, false)
        } else {
            self.current_phase().touch_flags()
        };

        let mut events = Vec::new();
        for edge in self.edges_for(touching, pressing) {
            for role in Role::ALL {
                events.push(TrackingEvent::Button(ButtonTransition::new(
                    role,
                    ButtonId::Touchpad,
                    edge,
                )));
            }
        }
        self.touching = touching;
        self.pressing = pressing;

        if self.exhausted() {
            info!("Test pattern finished after {} frames", self.frame);
            self.finished = true;
            events.push(TrackingEvent::Quit);
        } else if self.frame % self.hold_frames == 0 {
            debug!("Test pattern step {} ({:?})", self.step(), self.current_phase());
        }
        events
    }

    fn pose(&mut self, role: Role) -> Option<PoseSample> {
        if self.finished {
            return None;
        }
        let center_x = (self.bounds.min_x + self.bounds.max_x) / 2.0;
        let center_y = (self.bounds.min_y + self.bounds.max_y) / 2.0;

        let matrix = match self.current_phase() {
            Phase::Sweep(step) => {
                let t = step as f32 / (SWEEP_STEPS - 1) as f32;
                let x = self.bounds.min_x + t * (self.bounds.max_x - self.bounds.min_x);
                let y = self.bounds.min_y + t * (self.bounds.max_y - self.bounds.min_y);
                let heading = step as f32 * 2.0 * PI / SWEEP_STEPS as f32;
                pose_matrix([0.0, -1.0, 0.0], heading, (x, y, 0.0))
            }
            Phase::Palm(step) => {
                let palm = match step {
                    0 => [0.0, 1.0, 0.0],
                    1 => [0.0, -1.0, 0.0],
                    2 => [0.0, 0.0, -1.0],
                    _ => [0.0, 0.0, 1.0],
                };
                pose_matrix(palm, PI / 2.0, (center_x, center_y, 0.0))
            }
            Phase::Touch(_) | Phase::Press(_) => {
                pose_matrix([0.0, -1.0, 0.0], 0.0, (center_x, center_y, 0.0))
            }
        };

        Some(PoseSample {
            role,
            matrix,
            connected: true,
            valid: true,
        })
    }

    fn axis(&mut self, role: Role) -> Option<AxisSample> {
        if self.finished {
            return None;
        }
        let (x, y) = match self.current_phase() {
            Phase::Touch(zone_step) | Phase::Press(zone_step) => zone_point(zone_step),
            _ => (0.0, 0.0),
        };
        Some(AxisSample { role, x, y })
    }

    fn is_connected(&mut self, _role: Role) -> bool {
        !self.finished
    }

    fn name(&self) -> &str {
        "test pattern"
    }
}

/// Step 0 rests in the center, steps 1..=8 walk the compass from east
fn zone_point(zone_step: u64) -> (f32, f32) {
    if zone_step == 0 {
        return (0.0, 0.0);
    }
    let angle = (zone_step - 1) as f32 * PI / 4.0;
    (TOUCH_RADIUS * angle.cos(), TOUCH_RADIUS * angle.sin())
}

/// Rotation whose local X axis is `palm` and local Z axis is the heading
/// vector `(sin h, 0, cos h)`; the two must be orthogonal.
fn pose_matrix(palm: [f32; 3], heading: f32, position: (f32, f32, f32)) -> [f32; 12] {
    let z = [heading.sin(), 0.0, heading.cos()];
    let x = palm;
    let y = [
        z[1] * x[2] - z[2] * x[1],
        z[2] * x[0] - z[0] * x[2],
        z[0] * x[1] - z[1] * x[0],
    ];
    [
        x[0], y[0], z[0], position.0, //
        x[1], y[1], z[1], position.1, //
        x[2], y[2], z[2], position.2,
    ]
}
