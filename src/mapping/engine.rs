//! Frame driver with statum state machine for one polling tick
//!
//! Every tick walks the same three phases, enforced at compile time:
//!
//! ```text
//! Polling ──► Classifying(EdgeBatch) ──► Emitting ──► Polling
//!   │               │                       │
//! drain edges   buttons first, then      send buffered
//!               poses and touchpads      messages to sink
//! ```
//!
//! Applying the whole edge batch before any continuous sample is what lets a
//! touch that started mid-tick shape that same tick's zone decision.

use crate::config::{Calibration, Config};
use crate::controller::tracking::{PoseSample, PoseSource, Role, TrackingEvent};
use crate::mapping::buttons::route_button;
use crate::mapping::controller_values::{emit_controller_value, ControllerId};
use crate::mapping::hand_state::{switch_note, Hands};
use crate::mapping::normalize::{degrees_to_controller_value, heading_degrees, normalize_axis, MIDI_MAX};
use crate::mapping::note_table::NoteTable;
use crate::mapping::palm::update_palm;
use crate::mapping::strategy::{PalmStrategy, ZoneStrategy};
use crate::mapping::touchpad::update_touchpad;
use crate::mapping::{MidiMessage, PuppetSide};
use crate::midi::MidiSink;
use chrono::Local;
use statum::{machine, state};
use std::time::Duration;
use tracing::{debug, info};

/// Settings the driver needs at runtime, split out of [`Config`]
#[derive(Debug, Clone)]
pub struct DriverSettings {
    pub fps: u32,
    pub calibration: Calibration,
    pub palm: PalmStrategy,
    pub zone: ZoneStrategy,
    pub release_on_shutdown: bool,
}

impl DriverSettings {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(1000 / u64::from(self.fps.max(1)))
    }

    fn hand_angle(&self, role: Role) -> i32 {
        match role {
            Role::Left => self.calibration.left_hand_angle,
            Role::Right => self.calibration.right_hand_angle,
        }
    }
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for DriverSettings {
    fn from(config: &Config) -> Self {
        Self {
            fps: config.fps,
            calibration: config.calibration.clone(),
            palm: config.classifier.palm,
            zone: config.classifier.zone,
            release_on_shutdown: config.release_on_shutdown,
        }
    }
}

/// Edges drained at the start of a tick
#[derive(Debug, Clone)]
pub struct EdgeBatch {
    pub events: Vec<TrackingEvent>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub ticks: u64,
    pub messages: u64,
}

#[derive(Debug)]
struct TickStats {
    ticks: u64,
    messages: u64,
    window_ticks: u64,
    window_messages: u64,
    window_start: chrono::DateTime<Local>,
}

impl TickStats {
    fn new() -> Self {
        Self {
            ticks: 0,
            messages: 0,
            window_ticks: 0,
            window_messages: 0,
            window_start: Local::now(),
        }
    }

    fn record(&mut self, messages: usize) {
        self.ticks += 1;
        self.messages += messages as u64;
        self.window_ticks += 1;
        self.window_messages += messages as u64;

        let now = Local::now();
        let elapsed = now - self.window_start;
        if elapsed > chrono::Duration::seconds(30) {
            let seconds = elapsed.num_milliseconds() as f64 / 1000.0;
            info!(
                "Driver stats: {} ticks, {} messages in {:.0} seconds ({:.2} ticks/sec, {:.2} messages/sec)",
                self.window_ticks,
                self.window_messages,
                seconds,
                self.window_ticks as f64 / seconds,
                self.window_messages as f64 / seconds
            );
            self.window_ticks = 0;
            self.window_messages = 0;
            self.window_start = now;
        }
    }
}

#[state]
#[derive(Debug, Clone)]
pub enum TickState {
    Polling,
    Classifying(EdgeBatch),
    Emitting,
}

#[machine]
#[derive(Debug)]
pub struct FrameDriver<S: TickState> {
    settings: DriverSettings,
    table: NoteTable,
    hands: Hands,
    // Messages produced this tick, flushed in the Emitting phase
    pending: Vec<MidiMessage>,
    quit_requested: bool,
    stats: TickStats,
}

impl<S: TickState> FrameDriver<S> {
    pub fn settings(&self) -> &DriverSettings {
        &self.settings
    }

    pub fn hands(&self) -> &Hands {
        &self.hands
    }

    pub fn should_quit(&self) -> bool {
        self.quit_requested
    }
}

impl FrameDriver<Polling> {
    pub fn create(settings: DriverSettings, table: NoteTable) -> Self {
        info!(
            "Creating frame driver: {} fps, palm strategy {}, zone strategy {}, controllers {}",
            settings.fps, settings.palm, settings.zone, settings.calibration.controllers
        );
        Self::new(
            settings,
            table,
            Hands::default(),
            Vec::new(),
            false,
            TickStats::new(),
        )
    }

    /// Drains the source's queued edges; never blocks
    pub fn poll(self, source: &mut dyn PoseSource) -> FrameDriver<Classifying> {
        let events = source.poll_edges();
        if !events.is_empty() {
            debug!("Drained {} edges from {}", events.len(), source.name());
        }
        self.transition_with(EdgeBatch { events })
    }

    /// Retires every palm and touchpad note still held and sends the NoteOffs
    pub fn release_held_notes(&mut self, sink: &mut dyn MidiSink) -> usize {
        let mut released = Vec::new();
        for side in PuppetSide::ALL {
            let state = &mut self.hands[side];
            switch_note(&mut state.current_palm_note, None, &mut released);
            switch_note(&mut state.current_touchpad_note, None, &mut released);
        }
        for message in &released {
            sink.send(message);
        }
        if !released.is_empty() {
            info!("Released {} held notes", released.len());
        }
        released.len()
    }
}

impl FrameDriver<Classifying> {
    /// Applies the drained edges, then classifies each connected hand
    pub fn classify(mut self, source: &mut dyn PoseSource) -> FrameDriver<Emitting> {
        let events = self
            .get_state_data()
            .map(|batch| batch.events.clone())
            .unwrap_or_default();

        for event in &events {
            match event {
                TrackingEvent::Button(transition) => {
                    route_button(&mut self.hands, &self.table, transition, &mut self.pending)
                }
                TrackingEvent::Quit => {
                    info!("Quit event received, finishing current tick");
                    self.quit_requested = true;
                }
            }
        }

        for role in Role::ALL {
            if !source.is_connected(role) {
                continue;
            }
            // A pose that is present but untrackable skips the whole hand;
            // sources without poses still classify their axes
            match source.pose(role) {
                Some(pose) if !pose.is_trackable() => {
                    debug!("{} pose not trackable this tick, skipping hand", role);
                    continue;
                }
                Some(pose) => self.process_pose(&pose),
                None => {}
            }
            if let Some(sample) = source.axis(role) {
                let state = &mut self.hands[PuppetSide::for_role(role)];
                update_touchpad(state, &self.table, &sample, self.settings.zone, &mut self.pending);
            }
        }

        self.transition()
    }

    fn process_pose(&mut self, pose: &PoseSample) {
        let side = PuppetSide::for_role(pose.role);
        let state = &mut self.hands[side];
        update_palm(state, &self.table, pose, self.settings.palm, &mut self.pending);

        let bounds = &self.settings.calibration.bounds;
        let (position_x, position_y, _) = pose.position();
        let x = MIDI_MAX as u8 - normalize_axis(position_x, bounds.min_x, bounds.max_x);
        let y = normalize_axis(position_y, bounds.min_y, bounds.max_y);
        let heading = heading_degrees(
            pose.matrix[2],
            pose.matrix[10],
            self.settings.hand_angle(pose.role),
        );
        debug!(
            "{:<5} x: {:.3} {}  y: {:.3} {}  heading: {}",
            pose.role, position_x, x, position_y, y, heading
        );

        let controllers = &self.settings.calibration.controllers;
        for (controller, value) in [
            (ControllerId::x(side), x),
            (ControllerId::y(side), y),
            (ControllerId::heading(side), degrees_to_controller_value(heading)),
        ] {
            emit_controller_value(state, controllers, controller, value, &mut self.pending);
        }
    }
}

impl FrameDriver<Emitting> {
    /// Flushes this tick's messages in the order they were produced
    pub fn emit(mut self, sink: &mut dyn MidiSink) -> FrameDriver<Polling> {
        let count = self.pending.len();
        for message in self.pending.drain(..) {
            sink.send(&message);
        }
        self.stats.record(count);
        self.transition()
    }
}

/// Runs one complete tick
pub fn tick(
    driver: FrameDriver<Polling>,
    source: &mut dyn PoseSource,
    sink: &mut dyn MidiSink,
) -> FrameDriver<Polling> {
    driver.poll(source).classify(source).emit(sink)
}

/// Ticks at the configured rate until a quit event has been processed
pub fn run(
    mut driver: FrameDriver<Polling>,
    source: &mut dyn PoseSource,
    sink: &mut dyn MidiSink,
) -> RunSummary {
    let interval = driver.settings().frame_interval();
    info!(
        "Starting frame loop on {} with {} ms per frame",
        source.name(),
        interval.as_millis()
    );

    loop {
        driver = tick(driver, source, sink);
        if driver.should_quit() {
            break;
        }
        std::thread::sleep(interval);
    }

    if driver.settings().release_on_shutdown {
        driver.release_held_notes(sink);
    } else {
        for (side, state) in driver.hands().iter() {
            let held: Vec<_> = state.active_notes().collect();
            if !held.is_empty() {
                info!("Leaving {} hand notes {:?} held", side, held);
            }
        }
    }

    let summary = RunSummary {
        ticks: driver.stats.ticks,
        messages: driver.stats.messages,
    };
    info!(
        "Frame loop finished after {} ticks, {} messages",
        summary.ticks, summary.messages
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tracking::{
        AxisSample, ButtonEdge, ButtonId, ButtonTransition,
    };
    use crate::mapping::controller_values::ControllerEnablement;
    use crate::mapping::note_table::PalmDirection;
    use crate::mapping::Zone;
    use crate::midi::recording::RecordingSink;
    use std::collections::VecDeque;

    #[derive(Default, Clone)]
    struct Frame {
        edges: Vec<TrackingEvent>,
        poses: Vec<PoseSample>,
        axes: Vec<AxisSample>,
        disconnected: Vec<Role>,
    }

    /// Replays prepared frames, one per drain, and quits when they run out
    struct ScriptedSource {
        frames: VecDeque<Frame>,
        current: Frame,
    }

    impl ScriptedSource {
        fn new(frames: Vec<Frame>) -> Self {
            Self {
                frames: frames.into(),
                current: Frame::default(),
            }
        }
    }

    impl PoseSource for ScriptedSource {
        fn poll_edges(&mut self) -> Vec<TrackingEvent> {
            match self.frames.pop_front() {
                Some(frame) => {
                    self.current = frame;
                    self.current.edges.clone()
                }
                None => {
                    self.current = Frame::default();
                    vec![TrackingEvent::Quit]
                }
            }
        }

        fn pose(&mut self, role: Role) -> Option<PoseSample> {
            self.current.poses.iter().find(|p| p.role == role).copied()
        }

        fn axis(&mut self, role: Role) -> Option<AxisSample> {
            self.current.axes.iter().find(|a| a.role == role).copied()
        }

        fn is_connected(&mut self, role: Role) -> bool {
            !self.current.disconnected.contains(&role)
        }
    }

    fn settings() -> DriverSettings {
        DriverSettings {
            fps: 100,
            ..DriverSettings::default()
        }
    }

    fn notes_only(settings: DriverSettings) -> DriverSettings {
        let mut settings = settings;
        settings.calibration.controllers = ControllerEnablement::none();
        settings
    }

    fn palm_pose(role: Role, vertical: f32, depth: f32) -> PoseSample {
        let mut pose = PoseSample::identity(role);
        pose.matrix[4] = vertical;
        pose.matrix[8] = depth;
        pose
    }

    fn touchpad(role: Role, edge: ButtonEdge) -> TrackingEvent {
        TrackingEvent::Button(ButtonTransition::new(role, ButtonId::Touchpad, edge))
    }

    #[test]
    fn touch_edge_is_seen_by_same_tick_zone_decision() {
        let table = NoteTable::default();
        let center = table.touch_zone_note(PuppetSide::Right, Zone::CENTER);
        let mut source = ScriptedSource::new(vec![Frame {
            edges: vec![touchpad(Role::Left, ButtonEdge::Touch)],
            axes: vec![AxisSample {
                role: Role::Left,
                x: 0.0,
                y: 0.0,
            }],
            ..Frame::default()
        }]);
        let mut sink = RecordingSink::default();

        let driver = FrameDriver::create(notes_only(settings()), table);
        let driver = tick(driver, &mut source, &mut sink);

        assert_eq!(sink.messages, vec![MidiMessage::NoteOn { note: center }]);
        assert!(driver.hands()[PuppetSide::Right].touching);
    }

    #[test]
    fn quit_finishes_the_tick_it_arrives_in() {
        let table = NoteTable::default();
        let grip = table
            .button_note(PuppetSide::Left, ButtonId::Grip)
            .expect("grip note");
        let mut source = ScriptedSource::new(vec![Frame {
            edges: vec![
                TrackingEvent::Quit,
                TrackingEvent::Button(ButtonTransition::new(
                    Role::Right,
                    ButtonId::Grip,
                    ButtonEdge::Press,
                )),
            ],
            ..Frame::default()
        }]);
        let mut sink = RecordingSink::default();

        let summary = run(FrameDriver::create(settings(), table), &mut source, &mut sink);

        assert_eq!(summary.ticks, 1);
        assert_eq!(sink.messages, vec![MidiMessage::NoteOn { note: grip }]);
    }

    #[test]
    fn shutdown_releases_held_notes() {
        let table = NoteTable::default();
        let palm = table.palm_note(PuppetSide::Right, PalmDirection::Down);
        let touch = table.touch_zone_note(PuppetSide::Right, Zone::CENTER);
        let frames = vec![Frame {
            edges: vec![touchpad(Role::Left, ButtonEdge::Touch)],
            poses: vec![palm_pose(Role::Left, 0.8, 0.1)],
            axes: vec![AxisSample {
                role: Role::Left,
                x: 0.0,
                y: 0.0,
            }],
            ..Frame::default()
        }];

        let mut source = ScriptedSource::new(frames.clone());
        let mut sink = RecordingSink::default();
        run(
            FrameDriver::create(notes_only(settings()), table.clone()),
            &mut source,
            &mut sink,
        );
        assert_eq!(
            sink.messages,
            vec![
                MidiMessage::NoteOn { note: palm },
                MidiMessage::NoteOn { note: touch },
                MidiMessage::NoteOff { note: palm },
                MidiMessage::NoteOff { note: touch },
            ]
        );

        let mut held = notes_only(settings());
        held.release_on_shutdown = false;
        let mut source = ScriptedSource::new(frames);
        let mut sink = RecordingSink::default();
        run(FrameDriver::create(held, table), &mut source, &mut sink);
        assert_eq!(sink.messages.len(), 2);
    }

    #[test]
    fn untrackable_pose_skips_touchpad_too() {
        let mut lost = PoseSample::identity(Role::Left);
        lost.valid = false;
        let mut source = ScriptedSource::new(vec![Frame {
            edges: vec![touchpad(Role::Left, ButtonEdge::Touch)],
            poses: vec![lost],
            axes: vec![AxisSample {
                role: Role::Left,
                x: 0.0,
                y: 0.0,
            }],
            ..Frame::default()
        }]);
        let mut sink = RecordingSink::default();

        let driver = FrameDriver::create(settings(), NoteTable::default());
        let driver = tick(driver, &mut source, &mut sink);

        assert!(sink.messages.is_empty());
        let state = &driver.hands()[PuppetSide::Right];
        assert!(state.touching);
        assert_eq!(state.current_touchpad_note, None);
        assert!(state.last_emitted.is_empty());
    }

    #[test]
    fn disconnected_hand_is_skipped_and_keeps_its_note() {
        let table = NoteTable::default();
        let down = table.palm_note(PuppetSide::Right, PalmDirection::Down);
        let mut source = ScriptedSource::new(vec![
            Frame {
                poses: vec![palm_pose(Role::Left, 0.8, 0.1)],
                ..Frame::default()
            },
            Frame {
                poses: vec![palm_pose(Role::Left, -0.8, 0.1)],
                disconnected: vec![Role::Left],
                ..Frame::default()
            },
        ]);
        let mut sink = RecordingSink::default();

        let driver = FrameDriver::create(notes_only(settings()), table);
        let driver = tick(driver, &mut source, &mut sink);
        let driver = tick(driver, &mut source, &mut sink);

        assert_eq!(sink.messages, vec![MidiMessage::NoteOn { note: down }]);
        assert_eq!(driver.hands()[PuppetSide::Right].current_palm_note, Some(down));
    }

    #[test]
    fn position_streams_on_crossed_controllers_without_repeats() {
        let mut settings = settings();
        settings.calibration.controllers =
            ControllerEnablement::only([ControllerId::RightX, ControllerId::RightY]);
        settings.calibration.bounds.min_x = 0.0;
        settings.calibration.bounds.max_x = 1.0;
        settings.calibration.bounds.min_y = 0.0;
        settings.calibration.bounds.max_y = 1.0;

        let mut pose = palm_pose(Role::Left, 0.0, -1.0);
        pose.matrix[3] = 0.0;
        pose.matrix[7] = 1.0;
        let frame = Frame {
            poses: vec![pose],
            ..Frame::default()
        };
        let mut source = ScriptedSource::new(vec![frame.clone(), frame]);
        let mut sink = RecordingSink::default();

        let driver = FrameDriver::create(settings, NoteTable::default());
        let driver = tick(driver, &mut source, &mut sink);
        tick(driver, &mut source, &mut sink);

        let controls: Vec<_> = sink
            .messages
            .iter()
            .filter(|m| matches!(m, MidiMessage::ControlChange { .. }))
            .copied()
            .collect();
        assert_eq!(
            controls,
            vec![
                MidiMessage::ControlChange {
                    controller: 3,
                    value: 127
                },
                MidiMessage::ControlChange {
                    controller: 4,
                    value: 127
                },
            ]
        );
    }

    #[test]
    fn heading_uses_hand_offset() {
        let mut settings = settings();
        settings.calibration.controllers = ControllerEnablement::only([ControllerId::LeftHeading]);
        settings.calibration.right_hand_angle = 90;

        // identity: local Z = (0, 0, 1), atan2(1, 0) = 90, +90, -90 offset = 90 degrees
        let mut source = ScriptedSource::new(vec![Frame {
            poses: vec![PoseSample::identity(Role::Right)],
            ..Frame::default()
        }]);
        let mut sink = RecordingSink::default();
        tick(FrameDriver::create(settings, NoteTable::default()), &mut source, &mut sink);

        let controls: Vec<_> = sink
            .messages
            .iter()
            .filter(|m| matches!(m, MidiMessage::ControlChange { .. }))
            .copied()
            .collect();
        assert_eq!(
            controls,
            vec![MidiMessage::ControlChange {
                controller: 5,
                value: degrees_to_controller_value(90)
            }]
        );
    }
}
