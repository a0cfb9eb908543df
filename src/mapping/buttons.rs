//! Discrete button edges.
//!
//! Menu, grip and trigger map straight to a note. The touchpad never plays a
//! note itself: its edges only flip the hand's touch and press flags, which
//! the zone classifier reads later in the same tick.

use super::hand_state::Hands;
use super::note_table::{NoteId, NoteTable};
use super::{MidiMessage, PuppetSide};
use crate::controller::tracking::{ButtonEdge, ButtonId, ButtonTransition};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonAction {
    NoteOn(NoteId),
    NoteOff(NoteId),
    SetTouching(bool),
    SetPressing(bool),
    Ignore,
}

pub fn action_for(table: &NoteTable, side: PuppetSide, button: ButtonId, edge: ButtonEdge) -> ButtonAction {
    match (button, edge) {
        (ButtonId::Touchpad, ButtonEdge::Touch) => ButtonAction::SetTouching(true),
        (ButtonId::Touchpad, ButtonEdge::Untouch) => ButtonAction::SetTouching(false),
        (ButtonId::Touchpad, ButtonEdge::Press) => ButtonAction::SetPressing(true),
        (ButtonId::Touchpad, ButtonEdge::Unpress) => ButtonAction::SetPressing(false),
        (button, ButtonEdge::Press) => table
            .button_note(side, button)
            .map_or(ButtonAction::Ignore, ButtonAction::NoteOn),
        (button, ButtonEdge::Unpress) => table
            .button_note(side, button)
            .map_or(ButtonAction::Ignore, ButtonAction::NoteOff),
        _ => ButtonAction::Ignore,
    }
}

/// Applies one edge to the crossed puppet side
pub fn route_button(
    hands: &mut Hands,
    table: &NoteTable,
    transition: &ButtonTransition,
    out: &mut Vec<MidiMessage>,
) {
    let side = PuppetSide::for_role(transition.role);
    let action = action_for(table, side, transition.button, transition.edge);
    debug!(
        "Button {:?} {:?} on {} -> {} hand: {:?}",
        transition.button, transition.edge, transition.role, side, action
    );

    let state = &mut hands[side];
    match action {
        ButtonAction::NoteOn(note) => out.push(MidiMessage::NoteOn { note }),
        ButtonAction::NoteOff(note) => out.push(MidiMessage::NoteOff { note }),
        ButtonAction::SetTouching(touching) => state.touching = touching,
        ButtonAction::SetPressing(pressing) => state.pressing = pressing,
        ButtonAction::Ignore => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::tracking::Role;

    #[test]
    fn grip_press_and_release_play_a_note() {
        let table = NoteTable::default();
        let mut hands = Hands::default();
        let mut out = Vec::new();

        route_button(
            &mut hands,
            &table,
            &ButtonTransition::new(Role::Left, ButtonId::Grip, ButtonEdge::Press),
            &mut out,
        );
        route_button(
            &mut hands,
            &table,
            &ButtonTransition::new(Role::Left, ButtonId::Grip, ButtonEdge::Unpress),
            &mut out,
        );

        let grip = table
            .button_note(PuppetSide::Right, ButtonId::Grip)
            .expect("grip note");
        assert_eq!(
            out,
            vec![MidiMessage::NoteOn { note: grip }, MidiMessage::NoteOff { note: grip }]
        );
    }

    #[test]
    fn touchpad_edges_only_set_flags() {
        let table = NoteTable::default();
        let mut hands = Hands::default();
        let mut out = Vec::new();

        for edge in [ButtonEdge::Touch, ButtonEdge::Press] {
            route_button(
                &mut hands,
                &table,
                &ButtonTransition::new(Role::Right, ButtonId::Touchpad, edge),
                &mut out,
            );
        }
        assert!(out.is_empty());
        assert!(hands[PuppetSide::Left].touching);
        assert!(hands[PuppetSide::Left].pressing);
        assert!(!hands[PuppetSide::Right].touching);

        route_button(
            &mut hands,
            &table,
            &ButtonTransition::new(Role::Right, ButtonId::Touchpad, ButtonEdge::Untouch),
            &mut out,
        );
        assert!(!hands[PuppetSide::Left].touching);
        assert!(hands[PuppetSide::Left].pressing);
    }

    #[test]
    fn touch_on_plain_buttons_is_ignored() {
        let table = NoteTable::default();
        for button in [ButtonId::ApplicationMenu, ButtonId::Grip, ButtonId::Trigger] {
            for edge in [ButtonEdge::Touch, ButtonEdge::Untouch] {
                assert_eq!(
                    action_for(&table, PuppetSide::Left, button, edge),
                    ButtonAction::Ignore
                );
            }
        }
    }
}
