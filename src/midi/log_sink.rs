use super::MidiSink;
use crate::mapping::{MidiMessage, NoteTable};
use tracing::info;

/// Dry-run sink: logs each message with its rigging name instead of sending
pub struct LogSink {
    table: NoteTable,
    channel: u8,
    sent: u64,
}

impl LogSink {
    pub fn new(table: NoteTable, channel: u8) -> Self {
        info!("MIDI output disabled, logging messages on channel {}", channel);
        Self {
            table,
            channel,
            sent: 0,
        }
    }

    fn label(&self, message: &MidiMessage) -> String {
        match message {
            MidiMessage::NoteOn { note } | MidiMessage::NoteOff { note } => self
                .table
                .describe(*note)
                .map(|entry| format!("{} ({})", message, entry.name))
                .unwrap_or_else(|| message.to_string()),
            MidiMessage::ControlChange { .. } => message.to_string(),
        }
    }
}

impl MidiSink for LogSink {
    fn send(&mut self, message: &MidiMessage) {
        self.sent += 1;
        info!(
            "[ch {}] {} {:02X?}",
            self.channel,
            self.label(message),
            message.encode(self.channel)
        );
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        info!("Dry run logged {} MIDI messages", self.sent);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::{PalmDirection, PuppetSide};

    #[test]
    fn labels_notes_by_name() {
        let table = NoteTable::default();
        let note = table.palm_note(PuppetSide::Right, PalmDirection::Up);
        let sink = LogSink::new(table, 0);

        assert_eq!(
            sink.label(&MidiMessage::NoteOn { note }),
            format!("NoteOn {} (RightPalmUp)", note)
        );
        assert_eq!(
            sink.label(&MidiMessage::ControlChange {
                controller: 1,
                value: 64
            }),
            "Controller 1 = 64"
        );
    }
}
