//! Classification and debounce of tracking input into MIDI messages.
//!
//! Every stage works on one puppet side's [`HandState`] and appends to an
//! output buffer; nothing here talks to a device. The physical controllers
//! are crossed onto the puppet: the physical left hand plays the puppet's
//! right hand and vice versa, through [`PuppetSide::for_role`] only.
//!
//! ```text
//! ButtonTransition ──► buttons ──► HandState flags / NoteOn, NoteOff
//! PoseSample ──► palm ──────────► NoteOff(old), NoteOn(new)
//! AxisSample ──► touchpad ──────► NoteOff(old), NoteOn(new)
//! PoseSample ──► normalize ──► controller_values ──► ControlChange
//! ```

pub mod buttons;
pub mod controller_values;
pub mod engine;
pub mod hand_state;
pub mod normalize;
pub mod note_table;
pub mod palm;
pub mod strategy;
pub mod touchpad;

pub use engine::{DriverSettings, FrameDriver};
pub use hand_state::{HandState, Hands};
pub use note_table::{NoteId, NoteTable, PalmDirection};

use crate::controller::tracking::Role;
use std::fmt;

/// Logical hand of the animated puppet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PuppetSide {
    Left,
    Right,
}

impl PuppetSide {
    pub const ALL: [PuppetSide; 2] = [PuppetSide::Left, PuppetSide::Right];

    /// Physical controllers drive the opposite puppet hand
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Left => PuppetSide::Right,
            Role::Right => PuppetSide::Left,
        }
    }

    fn index(self) -> usize {
        match self {
            PuppetSide::Left => 0,
            PuppetSide::Right => 1,
        }
    }
}

impl fmt::Display for PuppetSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PuppetSide::Left => write!(f, "Left"),
            PuppetSide::Right => write!(f, "Right"),
        }
    }
}

/// One of the nine touchpad regions, numbered like a phone keypad
///
/// ```text
/// 1 2 3
/// 4 5 6
/// 7 8 9
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Zone(u8);

impl Zone {
    pub const CENTER: Zone = Zone(5);

    pub const ALL: [Zone; 9] = [
        Zone(1),
        Zone(2),
        Zone(3),
        Zone(4),
        Zone(5),
        Zone(6),
        Zone(7),
        Zone(8),
        Zone(9),
    ];

    pub fn new(number: u8) -> Option<Self> {
        (1..=9).contains(&number).then_some(Zone(number))
    }

    pub fn number(self) -> u8 {
        self.0
    }

    fn index(self) -> u8 {
        self.0 - 1
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message handed to the MIDI sink; note and value are always 0..=127
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiMessage {
    NoteOn { note: NoteId },
    NoteOff { note: NoteId },
    ControlChange { controller: u8, value: u8 },
}

impl fmt::Display for MidiMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MidiMessage::NoteOn { note } => write!(f, "NoteOn {}", note),
            MidiMessage::NoteOff { note } => write!(f, "NoteOff {}", note),
            MidiMessage::ControlChange { controller, value } => {
                write!(f, "Controller {} = {}", controller, value)
            }
        }
    }
}
