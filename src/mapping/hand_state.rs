use super::controller_values::ControllerId;
use super::note_table::NoteId;
use super::{MidiMessage, PuppetSide};
use std::collections::HashMap;
use std::ops::{Index, IndexMut};

/// Everything remembered about one puppet hand between ticks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HandState {
    pub current_palm_note: Option<NoteId>,
    pub current_touchpad_note: Option<NoteId>,
    pub touching: bool,
    pub pressing: bool,
    pub last_emitted: HashMap<ControllerId, u8>,
}

impl HandState {
    /// Notes this hand is currently holding on
    pub fn active_notes(&self) -> impl Iterator<Item = NoteId> {
        self.current_palm_note
            .into_iter()
            .chain(self.current_touchpad_note)
    }
}

/// Moves a single-note slot to `next`.
///
/// A change always retires the old note before the new one starts, so the
/// receiver never sees two notes of the same slot held at once. `None`
/// retires without replacement. An unchanged slot emits nothing.
pub fn switch_note(current: &mut Option<NoteId>, next: Option<NoteId>, out: &mut Vec<MidiMessage>) {
    if *current == next {
        return;
    }
    if let Some(note) = current.take() {
        out.push(MidiMessage::NoteOff { note });
    }
    if let Some(note) = next {
        out.push(MidiMessage::NoteOn { note });
    }
    *current = next;
}

/// The two hand states, indexed by puppet side
#[derive(Debug, Clone, Default)]
pub struct Hands {
    states: [HandState; 2],
}

impl Hands {
    pub fn iter(&self) -> impl Iterator<Item = (PuppetSide, &HandState)> {
        PuppetSide::ALL.into_iter().zip(self.states.iter())
    }
}

impl Index<PuppetSide> for Hands {
    type Output = HandState;

    fn index(&self, side: PuppetSide) -> &HandState {
        &self.states[side.index()]
    }
}

impl IndexMut<PuppetSide> for Hands {
    fn index_mut(&mut self, side: PuppetSide) -> &mut HandState {
        &mut self.states[side.index()]
    }
}
