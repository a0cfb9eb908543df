use super::{check_channel, MidiError, MidiSink};
use crate::mapping::MidiMessage;
use midir::{MidiOutput, MidiOutputConnection, MidiOutputPort};
use tracing::{debug, info, warn};

const CLIENT_NAME: &str = "puppet_midi";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortInfo {
    pub index: usize,
    pub name: String,
}

/// Enumerates the MIDI output ports currently visible to midir
pub fn list_ports() -> Result<Vec<PortInfo>, MidiError> {
    let output = MidiOutput::new(CLIENT_NAME)?;
    port_infos(&output, &output.ports())
}

fn port_infos(output: &MidiOutput, ports: &[MidiOutputPort]) -> Result<Vec<PortInfo>, MidiError> {
    ports
        .iter()
        .enumerate()
        .map(|(index, port)| {
            Ok(PortInfo {
                index,
                name: output.port_name(port)?,
            })
        })
        .collect()
}

/// Picks a port from `selector`: a numeric index, otherwise a case
/// insensitive name substring. Without a selector the first port wins.
pub fn select_port(ports: &[PortInfo], selector: Option<&str>) -> Result<usize, MidiError> {
    let Some(selector) = selector.map(str::trim) else {
        return ports.first().map(|p| p.index).ok_or(MidiError::NoPorts);
    };
    if let Ok(index) = selector.parse::<usize>() {
        return ports
            .iter()
            .find(|p| p.index == index)
            .map(|p| p.index)
            .ok_or_else(|| MidiError::NoSuchPort(selector.to_string()));
    }
    let needle = selector.to_lowercase();
    ports
        .iter()
        .find(|p| p.name.to_lowercase().contains(&needle))
        .map(|p| p.index)
        .ok_or_else(|| MidiError::NoSuchPort(selector.to_string()))
}

/// Sends driver messages to a real MIDI output port
pub struct MidirSink {
    connection: MidiOutputConnection,
    port_name: String,
    channel: u8,
    failures: u64,
}

impl MidirSink {
    pub fn connect(selector: Option<&str>, channel: u8) -> Result<Self, MidiError> {
        let channel = check_channel(channel)?;
        let output = MidiOutput::new(CLIENT_NAME)?;
        let ports = output.ports();
        let infos = port_infos(&output, &ports)?;

        let index = select_port(&infos, selector)?;
        let port_name = infos[index].name.clone();
        let connection = output
            .connect(&ports[index], CLIENT_NAME)
            .map_err(|e| MidiError::ConnectError {
                port: port_name.clone(),
                reason: e.to_string(),
            })?;

        info!("Connected to MIDI port {} ({}) on channel {}", index, port_name, channel);
        Ok(Self {
            connection,
            port_name,
            channel,
            failures: 0,
        })
    }
}

impl MidiSink for MidirSink {
    fn send(&mut self, message: &MidiMessage) {
        let bytes = message.encode(self.channel);
        match self.connection.send(&bytes) {
            Ok(()) => debug!("{} -> {:02X?}", message, bytes),
            Err(e) => {
                self.failures += 1;
                warn!(
                    "Failed to send {} to {} ({} failures so far): {}",
                    message, self.port_name, self.failures, e
                );
            }
        }
    }
}

impl Drop for MidirSink {
    fn drop(&mut self) {
        info!("Closing MIDI port {}", self.port_name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ports() -> Vec<PortInfo> {
        ["Midi Through Port-0", "loopMIDI Port", "USB Keyboard"]
            .into_iter()
            .enumerate()
            .map(|(index, name)| PortInfo {
                index,
                name: name.to_string(),
            })
            .collect()
    }

    #[test]
    fn selects_by_index_or_name() {
        let ports = ports();
        assert_eq!(select_port(&ports, None).ok(), Some(0));
        assert_eq!(select_port(&ports, Some("2")).ok(), Some(2));
        assert_eq!(select_port(&ports, Some("loopmidi")).ok(), Some(1));
        assert_eq!(select_port(&ports, Some(" usb ")).ok(), Some(2));
    }

    #[test]
    fn unknown_selector_is_an_error() {
        let ports = ports();
        assert!(matches!(select_port(&ports, Some("7")), Err(MidiError::NoSuchPort(_))));
        assert!(matches!(select_port(&ports, Some("synth")), Err(MidiError::NoSuchPort(_))));
        assert!(matches!(select_port(&[], None), Err(MidiError::NoPorts)));
    }
}
