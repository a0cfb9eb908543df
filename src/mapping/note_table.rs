//! Fixed note layout shared with the puppet rig.
//!
//! Each puppet side owns a contiguous block of 29 notes starting at its base:
//!
//! ```text
//! base + 0..=2    application menu, grip, trigger
//! base + 3..=6    palm up, down, forward, backward
//! base + 10..=18  touchpad zone 1..9 touched
//! base + 20..=28  touchpad zone 1..9 pressed
//! ```
//!
//! Downstream rigging binds to these numbers, so the layout only changes
//! through the configured side bases.

use super::{PuppetSide, Zone};
use crate::controller::tracking::ButtonId;
use std::fmt;

pub type NoteId = u8;

const MENU_OFFSET: u8 = 0;
const GRIP_OFFSET: u8 = 1;
const TRIGGER_OFFSET: u8 = 2;
const PALM_OFFSET: u8 = 3;
const TOUCH_OFFSET: u8 = 10;
const PRESS_OFFSET: u8 = 20;

/// Number of notes reserved per side
pub const SIDE_SPAN: u8 = PRESS_OFFSET + 9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PalmDirection {
    Up,
    Down,
    Forward,
    Backward,
}

impl PalmDirection {
    pub const ALL: [PalmDirection; 4] = [
        PalmDirection::Up,
        PalmDirection::Down,
        PalmDirection::Forward,
        PalmDirection::Backward,
    ];

    fn offset(self) -> u8 {
        PALM_OFFSET
            + match self {
                PalmDirection::Up => 0,
                PalmDirection::Down => 1,
                PalmDirection::Forward => 2,
                PalmDirection::Backward => 3,
            }
    }
}

impl fmt::Display for PalmDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PalmDirection::Up => write!(f, "Up"),
            PalmDirection::Down => write!(f, "Down"),
            PalmDirection::Forward => write!(f, "Forward"),
            PalmDirection::Backward => write!(f, "Backward"),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum NoteTableError {
    #[error("{side} note base {base} leaves no room for {span} notes below 128")]
    BaseTooHigh { side: PuppetSide, base: u8, span: u8 },

    #[error("note ranges overlap: left starts at {left}, right at {right}")]
    Overlap { left: u8, right: u8 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEntry {
    pub note: NoteId,
    pub name: String,
    pub description: String,
}

/// Immutable name, note number and description mapping for both sides
#[derive(Debug, Clone)]
pub struct NoteTable {
    left_base: u8,
    right_base: u8,
    entries: Vec<NoteEntry>,
}

impl Default for NoteTable {
    fn default() -> Self {
        Self::build(20, 60)
    }
}

impl NoteTable {
    pub fn with_bases(left_base: u8, right_base: u8) -> Result<Self, NoteTableError> {
        for (side, base) in [(PuppetSide::Left, left_base), (PuppetSide::Right, right_base)] {
            if u16::from(base) + u16::from(SIDE_SPAN) > 128 {
                return Err(NoteTableError::BaseTooHigh {
                    side,
                    base,
                    span: SIDE_SPAN,
                });
            }
        }
        if left_base.abs_diff(right_base) < SIDE_SPAN {
            return Err(NoteTableError::Overlap {
                left: left_base,
                right: right_base,
            });
        }
        Ok(Self::build(left_base, right_base))
    }

    fn build(left_base: u8, right_base: u8) -> Self {
        let mut table = Self {
            left_base,
            right_base,
            entries: Vec::new(),
        };
        let mut entries = Vec::new();
        for side in PuppetSide::ALL {
            for (button, label) in [
                (ButtonId::ApplicationMenu, "Menu"),
                (ButtonId::Grip, "Grip"),
                (ButtonId::Trigger, "Trigger"),
            ] {
                if let Some(note) = table.button_note(side, button) {
                    entries.push(NoteEntry {
                        note,
                        name: format!("{}{}", side, label),
                        description: format!("{} hand {} button", side, label.to_lowercase()),
                    });
                }
            }
            for direction in PalmDirection::ALL {
                entries.push(NoteEntry {
                    note: table.palm_note(side, direction),
                    name: format!("{}Palm{}", side, direction),
                    description: format!("{} hand palm facing {}", side, direction),
                });
            }
            for zone in Zone::ALL {
                entries.push(NoteEntry {
                    note: table.touch_zone_note(side, zone),
                    name: format!("{}Touch{}", side, zone),
                    description: format!("{} hand touchpad zone {} touched", side, zone),
                });
            }
            for zone in Zone::ALL {
                entries.push(NoteEntry {
                    note: table.press_zone_note(side, zone),
                    name: format!("{}Press{}", side, zone),
                    description: format!("{} hand touchpad zone {} pressed", side, zone),
                });
            }
        }
        entries.sort_by_key(|entry| entry.note);
        table.entries = entries;
        table
    }

    pub fn base(&self, side: PuppetSide) -> u8 {
        match side {
            PuppetSide::Left => self.left_base,
            PuppetSide::Right => self.right_base,
        }
    }

    /// Note for a plain button; the touchpad has zone notes instead
    pub fn button_note(&self, side: PuppetSide, button: ButtonId) -> Option<NoteId> {
        let offset = match button {
            ButtonId::ApplicationMenu => MENU_OFFSET,
            ButtonId::Grip => GRIP_OFFSET,
            ButtonId::Trigger => TRIGGER_OFFSET,
            ButtonId::Touchpad => return None,
        };
        Some(self.base(side) + offset)
    }

    pub fn palm_note(&self, side: PuppetSide, direction: PalmDirection) -> NoteId {
        self.base(side) + direction.offset()
    }

    pub fn touch_zone_note(&self, side: PuppetSide, zone: Zone) -> NoteId {
        self.base(side) + TOUCH_OFFSET + zone.index()
    }

    pub fn press_zone_note(&self, side: PuppetSide, zone: Zone) -> NoteId {
        self.base(side) + PRESS_OFFSET + zone.index()
    }

    /// All notes in ascending order
    pub fn entries(&self) -> &[NoteEntry] {
        &self.entries
    }

    pub fn describe(&self, note: NoteId) -> Option<&NoteEntry> {
        self.entries
            .binary_search_by_key(&note, |entry| entry.note)
            .ok()
            .map(|index| &self.entries[index])
    }

    pub fn by_name(&self, name: &str) -> Option<&NoteEntry> {
        self.entries.iter().find(|entry| entry.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_note_is_unique_and_in_range() {
        let table = NoteTable::default();
        assert_eq!(table.entries().len(), 2 * (3 + 4 + 9 + 9));

        let notes: HashSet<_> = table.entries().iter().map(|e| e.note).collect();
        assert_eq!(notes.len(), table.entries().len());
        assert!(notes.iter().all(|note| *note <= 127));
    }

    #[test]
    fn layout_matches_rig() {
        let table = NoteTable::default();
        assert_eq!(table.button_note(PuppetSide::Left, ButtonId::ApplicationMenu), Some(20));
        assert_eq!(table.button_note(PuppetSide::Right, ButtonId::Trigger), Some(62));
        assert_eq!(table.button_note(PuppetSide::Right, ButtonId::Touchpad), None);
        assert_eq!(table.palm_note(PuppetSide::Right, PalmDirection::Down), 64);
        assert_eq!(table.touch_zone_note(PuppetSide::Left, Zone::CENTER), 34);
        assert_eq!(table.press_zone_note(PuppetSide::Left, Zone::CENTER), 44);
    }

    #[test]
    fn names_and_notes_resolve_both_ways() {
        let table = NoteTable::default();
        let entry = table.by_name("RightPalmUp").expect("entry exists");
        assert_eq!(entry.note, 63);
        assert_eq!(table.describe(63).map(|e| e.name.as_str()), Some("RightPalmUp"));
        assert!(table.describe(0).is_none());
    }

    #[test]
    fn rejects_bad_bases() {
        assert_eq!(
            NoteTable::with_bases(20, 40).unwrap_err(),
            NoteTableError::Overlap { left: 20, right: 40 }
        );
        assert!(matches!(
            NoteTable::with_bases(20, 100),
            Err(NoteTableError::BaseTooHigh { .. })
        ));
        assert!(NoteTable::with_bases(60, 20).is_ok());
        assert!(NoteTable::with_bases(0, 99).is_ok());
    }
}
