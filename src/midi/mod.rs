//! MIDI output
//!
//! The frame driver only knows [`MidiSink`]. Concrete sinks:
//!
//! - [`midir_sink::MidirSink`] - hardware or virtual port through midir
//! - [`log_sink::LogSink`] - dry run, logs every message instead of sending
//!
//! Wire format is three raw bytes per message. A NoteOff goes out as a
//! NoteOn with velocity 0, which every receiver treats as a release.

pub mod log_sink;
pub mod midir_sink;

use crate::mapping::MidiMessage;

pub const NOTE_ON: u8 = 0x90;
pub const CONTROL_CHANGE: u8 = 0xB0;
pub const NOTE_VELOCITY: u8 = 127;
pub const MAX_CHANNEL: u8 = 15;

#[derive(Debug, thiserror::Error)]
pub enum MidiError {
    #[error("Failed to initialize MIDI output: {0}")]
    InitError(#[from] midir::InitError),

    #[error("Failed to read MIDI port name: {0}")]
    PortInfoError(#[from] midir::PortInfoError),

    #[error("No MIDI output port matches '{0}'")]
    NoSuchPort(String),

    #[error("No MIDI output ports available")]
    NoPorts,

    #[error("Failed to connect to MIDI port '{port}': {reason}")]
    ConnectError { port: String, reason: String },

    #[error("MIDI channel {0} out of range 0..=15")]
    InvalidChannel(u8),
}

/// Destination for the driver's messages
///
/// Sending is fire and forget: a failed write is logged by the sink and the
/// frame loop keeps going.
pub trait MidiSink {
    fn send(&mut self, message: &MidiMessage);
}

impl<S: MidiSink + ?Sized> MidiSink for Box<S> {
    fn send(&mut self, message: &MidiMessage) {
        (**self).send(message)
    }
}

impl MidiMessage {
    /// Raw status, data1 and data2 bytes on `channel` (0..=15)
    pub fn encode(&self, channel: u8) -> [u8; 3] {
        let channel = channel & 0x0F;
        match *self {
            MidiMessage::NoteOn { note } => [NOTE_ON | channel, note & 0x7F, NOTE_VELOCITY],
            MidiMessage::NoteOff { note } => [NOTE_ON | channel, note & 0x7F, 0],
            MidiMessage::ControlChange { controller, value } => {
                [CONTROL_CHANGE | channel, controller & 0x7F, value & 0x7F]
            }
        }
    }
}

pub fn check_channel(channel: u8) -> Result<u8, MidiError> {
    if channel > MAX_CHANNEL {
        return Err(MidiError::InvalidChannel(channel));
    }
    Ok(channel)
}
