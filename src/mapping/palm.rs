//! Palm direction classification.
//!
//! The palm normal is the controller's local X axis, i.e. the first column
//! of the pose matrix. Its world vertical component is `m4` and its depth
//! component `m8`. The two controllers are mirror images of each other, so
//! the sign of the vertical component means opposite things per hand; depth
//! is not mirrored (forward is -Z for both).

use super::hand_state::{switch_note, HandState};
use super::note_table::{NoteTable, PalmDirection};
use super::strategy::PalmStrategy;
use super::{MidiMessage, PuppetSide};
use crate::controller::tracking::{PoseSample, Role};
use tracing::debug;

const VERTICAL: usize = 4;
const DEPTH: usize = 8;

pub fn classify_palm(pose: &PoseSample, strategy: PalmStrategy) -> PalmDirection {
    let vertical = pose.matrix[VERTICAL];
    let depth = pose.matrix[DEPTH];

    let vertical_wins = match strategy {
        PalmStrategy::DominantAxis => vertical.abs() > depth.abs(),
        PalmStrategy::Threshold { threshold } => vertical.abs() >= threshold,
    };

    if vertical_wins {
        match (pose.role, vertical > 0.0) {
            (Role::Left, true) | (Role::Right, false) => PalmDirection::Down,
            (Role::Left, false) | (Role::Right, true) => PalmDirection::Up,
        }
    } else if depth < 0.0 {
        PalmDirection::Forward
    } else {
        PalmDirection::Backward
    }
}

/// Classifies a pose and moves the hand's palm note if the direction changed.
///
/// Untrackable poses are skipped outright: the previous palm note stays on.
pub fn update_palm(
    state: &mut HandState,
    table: &NoteTable,
    pose: &PoseSample,
    strategy: PalmStrategy,
    out: &mut Vec<MidiMessage>,
) {
    if !pose.is_trackable() {
        return;
    }
    let side = PuppetSide::for_role(pose.role);
    let direction = classify_palm(pose, strategy);
    let note = table.palm_note(side, direction);
    if state.current_palm_note != Some(note) {
        debug!("{} palm now {} (note {})", side, direction, note);
    }
    switch_note(&mut state.current_palm_note, Some(note), out);
}
