// MIDI control input. Optional: if there's no MIDI system or no port, the
// session just never sees a control message.

use crossbeam_channel::Sender;
use log::{debug, info};
use midir::{MidiInput, MidiInputConnection};

use crate::error::ControlInputError;
use crate::shared::ControlMessage;

const CLIENT_NAME: &str = "neonseq";

/// Keeps the port open; dropping it disconnects.
pub struct ControlInput {
    port_name: String,
    _connection: MidiInputConnection<()>,
}

impl ControlInput {
    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

// First port whose name contains `wanted` (case-insensitive), or simply the
// first port.
pub fn pick_port(names: &[String], wanted: Option<&str>) -> Result<usize, ControlInputError> {
    if names.is_empty() {
        return Err(ControlInputError::NoPorts);
    }
    let Some(wanted) = wanted else {
        return Ok(0);
    };
    let needle = wanted.to_lowercase();
    names
        .iter()
        .position(|n| n.to_lowercase().contains(&needle))
        .ok_or_else(|| ControlInputError::PortNotFound(wanted.to_string()))
}

/// Connect and forward every control-change message to `tx`. Everything
/// else on the port is dropped here.
pub fn connect(
    wanted: Option<&str>,
    tx: Sender<ControlMessage>,
) -> Result<ControlInput, ControlInputError> {
    let mut midi_in =
        MidiInput::new(CLIENT_NAME).map_err(|e| ControlInputError::Init(e.to_string()))?;
    midi_in.ignore(midir::Ignore::All);

    let ports = midi_in.ports();
    let names: Vec<String> = ports
        .iter()
        .enumerate()
        .map(|(i, p)| midi_in.port_name(p).unwrap_or_else(|_| format!("MIDI In {i}")))
        .collect();
    let index = pick_port(&names, wanted)?;
    let port_name = names[index].clone();

    info!("connecting to MIDI input: {port_name}");
    let connection = midi_in
        .connect(
            &ports[index],
            "neonseq-control",
            move |_timestamp_us, data, _| {
                if let Some(msg) = ControlMessage::from_midi(data) {
                    debug!("midi in: {msg:?}");
                    // receiver gone means we're shutting down
                    let _ = tx.send(msg);
                }
            },
            (),
        )
        .map_err(|e| ControlInputError::Connect(e.to_string()))?;

    Ok(ControlInput { port_name, _connection: connection })
}
