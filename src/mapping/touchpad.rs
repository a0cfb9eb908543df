//! Touchpad zone classification.

use super::hand_state::{switch_note, HandState};
use super::note_table::{NoteId, NoteTable};
use super::strategy::ZoneStrategy;
use super::{MidiMessage, PuppetSide, Zone};
use crate::controller::tracking::AxisSample;
use tracing::debug;

/// Zones for the 45 degree sectors, counter-clockwise from east:
/// E, NE, N, NW, W, SW, S, SE
const SECTOR_ZONES: [u8; 8] = [6, 3, 2, 1, 4, 7, 8, 9];

const GRID_EDGE: f32 = 1.0 / 3.0;

pub fn classify_zone(x: f32, y: f32, strategy: ZoneStrategy) -> Zone {
    match strategy {
        ZoneStrategy::Radial { center_radius } => radial_zone(x, y, center_radius),
        ZoneStrategy::Grid => grid_zone(x, y),
    }
}

fn radial_zone(x: f32, y: f32, center_radius: f32) -> Zone {
    let distance = (x * x + y * y).sqrt();
    if distance < center_radius {
        return Zone::CENTER;
    }
    let mut angle = y.atan2(x).to_degrees();
    if angle < 0.0 {
        angle += 360.0;
    }
    let sector = ((angle + 22.5) / 45.0).floor() as usize % 8;
    Zone(SECTOR_ZONES[sector])
}

fn grid_zone(x: f32, y: f32) -> Zone {
    let column = if x < -GRID_EDGE {
        0
    } else if x > GRID_EDGE {
        2
    } else {
        1
    };
    // y points up, keypad rows count down
    let row = if y > GRID_EDGE {
        0
    } else if y < -GRID_EDGE {
        2
    } else {
        1
    };
    Zone(row * 3 + column + 1)
}

/// Note the hand should hold given its flags; pressing beats touching
pub fn effective_note(
    table: &NoteTable,
    side: PuppetSide,
    zone: Zone,
    touching: bool,
    pressing: bool,
) -> Option<NoteId> {
    if pressing {
        Some(table.press_zone_note(side, zone))
    } else if touching {
        Some(table.touch_zone_note(side, zone))
    } else {
        None
    }
}

/// Classifies an axis sample against the hand's current touch and press
/// flags and moves the hand's touchpad note accordingly.
pub fn update_touchpad(
    state: &mut HandState,
    table: &NoteTable,
    sample: &AxisSample,
    strategy: ZoneStrategy,
    out: &mut Vec<MidiMessage>,
) {
    let side = PuppetSide::for_role(sample.role);
    let zone = classify_zone(sample.x, sample.y, strategy);
    let note = effective_note(table, side, zone, state.touching, state.pressing);
    if state.current_touchpad_note != note {
        debug!(
            "{} touchpad zone {} touching={} pressing={} -> {:?}",
            side, zone, state.touching, state.pressing, note
        );
    }
    switch_note(&mut state.current_touchpad_note, note, out);
}
