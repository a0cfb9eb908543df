//! Control-change streaming with per-hand debounce.
//!
//! Position and heading values are recomputed every tick, but a
//! ControlChange only goes out when the 0..127 value actually moved. The
//! allow-list lets a rigger isolate one controller while binding it.

use super::hand_state::HandState;
use super::MidiMessage;
use super::PuppetSide;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ControllerId {
    LeftX,
    LeftY,
    RightX,
    RightY,
    LeftHeading,
    RightHeading,
}

impl ControllerId {
    pub const ALL: [ControllerId; 6] = [
        ControllerId::LeftX,
        ControllerId::LeftY,
        ControllerId::RightX,
        ControllerId::RightY,
        ControllerId::LeftHeading,
        ControllerId::RightHeading,
    ];

    /// MIDI controller number on the wire
    pub fn number(self) -> u8 {
        match self {
            ControllerId::LeftX => 1,
            ControllerId::LeftY => 2,
            ControllerId::RightX => 3,
            ControllerId::RightY => 4,
            ControllerId::LeftHeading => 5,
            ControllerId::RightHeading => 6,
        }
    }

    pub fn x(side: PuppetSide) -> Self {
        match side {
            PuppetSide::Left => ControllerId::LeftX,
            PuppetSide::Right => ControllerId::RightX,
        }
    }

    pub fn y(side: PuppetSide) -> Self {
        match side {
            PuppetSide::Left => ControllerId::LeftY,
            PuppetSide::Right => ControllerId::RightY,
        }
    }

    pub fn heading(side: PuppetSide) -> Self {
        match side {
            PuppetSide::Left => ControllerId::LeftHeading,
            PuppetSide::Right => ControllerId::RightHeading,
        }
    }

    fn short_name(self) -> &'static str {
        match self {
            ControllerId::LeftX => "lx",
            ControllerId::LeftY => "ly",
            ControllerId::RightX => "rx",
            ControllerId::RightY => "ry",
            ControllerId::LeftHeading => "lh",
            ControllerId::RightHeading => "rh",
        }
    }
}

impl fmt::Display for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.short_name())
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
#[error("unknown controller '{0}', expected all, none or a comma list of lx, ly, rx, ry, lh, rh")]
pub struct ParseEnablementError(String);

/// Set of controllers allowed to stream
///
/// Parses from `all`, `none`, or a comma separated list of short names
/// such as `lx,ry`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ControllerEnablement {
    enabled: BTreeSet<ControllerId>,
}

impl ControllerEnablement {
    pub fn all() -> Self {
        Self {
            enabled: ControllerId::ALL.into_iter().collect(),
        }
    }

    pub fn none() -> Self {
        Self {
            enabled: BTreeSet::new(),
        }
    }

    pub fn only(ids: impl IntoIterator<Item = ControllerId>) -> Self {
        Self {
            enabled: ids.into_iter().collect(),
        }
    }

    pub fn is_enabled(&self, id: ControllerId) -> bool {
        self.enabled.contains(&id)
    }
}

impl Default for ControllerEnablement {
    fn default() -> Self {
        Self::all()
    }
}

impl FromStr for ControllerEnablement {
    type Err = ParseEnablementError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "all" => return Ok(Self::all()),
            "none" | "" => return Ok(Self::none()),
            _ => {}
        }
        s.split(',')
            .map(str::trim)
            .map(|name| {
                ControllerId::ALL
                    .into_iter()
                    .find(|id| id.short_name() == name)
                    .ok_or_else(|| ParseEnablementError(name.to_string()))
            })
            .collect::<Result<BTreeSet<_>, _>>()
            .map(|enabled| Self { enabled })
    }
}

impl TryFrom<String> for ControllerEnablement {
    type Error = ParseEnablementError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ControllerEnablement> for String {
    fn from(value: ControllerEnablement) -> Self {
        value.to_string()
    }
}

impl fmt::Display for ControllerEnablement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.enabled.len() == ControllerId::ALL.len() {
            return write!(f, "all");
        }
        if self.enabled.is_empty() {
            return write!(f, "none");
        }
        let names: Vec<&str> = self.enabled.iter().map(|id| id.short_name()).collect();
        write!(f, "{}", names.join(","))
    }
}

/// Emits `ControlChange(controller, value)` unless it would repeat the last
/// value sent for this hand, or the controller is not enabled.
pub fn emit_controller_value(
    state: &mut HandState,
    enablement: &ControllerEnablement,
    controller: ControllerId,
    value: u8,
    out: &mut Vec<MidiMessage>,
) {
    if !enablement.is_enabled(controller) {
        return;
    }
    let value = value.min(127);
    if state.last_emitted.get(&controller) == Some(&value) {
        return;
    }
    debug!("Controller {} -> {}", controller, value);
    state.last_emitted.insert(controller, value);
    out.push(MidiMessage::ControlChange {
        controller: controller.number(),
        value,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_value_is_sent_once() {
        let mut state = HandState::default();
        let mut out = Vec::new();
        let all = ControllerEnablement::all();

        emit_controller_value(&mut state, &all, ControllerId::LeftX, 64, &mut out);
        emit_controller_value(&mut state, &all, ControllerId::LeftX, 64, &mut out);
        assert_eq!(
            out,
            vec![MidiMessage::ControlChange {
                controller: 1,
                value: 64
            }]
        );

        emit_controller_value(&mut state, &all, ControllerId::LeftX, 65, &mut out);
        assert_eq!(out.len(), 2);
        assert_eq!(
            out[1],
            MidiMessage::ControlChange {
                controller: 1,
                value: 65
            }
        );
    }

    #[test]
    fn cache_is_per_controller() {
        let mut state = HandState::default();
        let mut out = Vec::new();
        let all = ControllerEnablement::all();

        emit_controller_value(&mut state, &all, ControllerId::LeftX, 10, &mut out);
        emit_controller_value(&mut state, &all, ControllerId::LeftY, 10, &mut out);
        assert_eq!(out.len(), 2);
    }

    #[test]
    fn disabled_controller_is_a_no_op() {
        let mut state = HandState::default();
        let mut out = Vec::new();
        let only_ly = ControllerEnablement::only([ControllerId::LeftY]);

        emit_controller_value(&mut state, &only_ly, ControllerId::LeftX, 64, &mut out);
        assert!(out.is_empty());
        assert!(state.last_emitted.is_empty());
    }

    #[test]
    fn parses_cli_forms() {
        assert_eq!("all".parse(), Ok(ControllerEnablement::all()));
        assert_eq!("none".parse(), Ok(ControllerEnablement::none()));
        assert_eq!(
            "lx, rh".parse(),
            Ok(ControllerEnablement::only([
                ControllerId::LeftX,
                ControllerId::RightHeading
            ]))
        );
        assert!("lx,zz".parse::<ControllerEnablement>().is_err());
        assert_eq!(
            ControllerEnablement::only([ControllerId::RightY, ControllerId::LeftX]).to_string(),
            "lx,ry"
        );
    }
}
