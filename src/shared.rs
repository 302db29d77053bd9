// Types and constants every layer agrees on.
//
// The rough picture:
//   - `middle::Session` owns the pattern, the tracks, the transport and the
//     control mapper, and is the only thing that mutates them.
//   - Collaborators (audio chains, MIDI input, sample decoding) sit behind
//     the seams in `audio_api.rs`.
//   - Presentation layers never reach into the session's internals; they
//     subscribe to `UiEvent`s and query the session by index or `TrackId`.

use crate::pipeline::mapping::{BindingTarget, ControlKey, LearnMode};
use crate::pipeline::params::ParamKey;

pub const DEFAULT_STEPS: usize = 16;
pub const INITIAL_TRACKS: usize = 4;
pub const STEPS_PER_BEAT: u32 = 4; // one step = one sixteenth note
pub const DEFAULT_BPM: f32 = 120.0;
pub const MIN_BPM: f32 = 1.0;
pub const MAX_BPM: f32 = 999.0;
// Structural ceilings. Every mutation respects them, so a saved session
// always loads back.
pub const MAX_TRACKS: usize = 256;
pub const MAX_STEPS: usize = 1024;
pub const MIDI_MAX: u8 = 127;

// Seconds on the clock collaborator's timeline.
pub type Timestamp = f64;

/// One inbound control-change message, as delivered by the control input.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlMessage {
    pub channel: u8,
    pub control: u8,
    pub value: u8, // 0..=127
}

impl ControlMessage {
    pub fn new(channel: u8, control: u8, value: u8) -> Self {
        Self { channel, control, value }
    }

    pub fn key(&self) -> ControlKey {
        ControlKey { channel: self.channel, control: self.control }
    }

    // Parse a raw MIDI message. Only control change (0xBn) is interesting to us.
    pub fn from_midi(bytes: &[u8]) -> Option<Self> {
        match bytes {
            [status, control, value, ..] if status & 0xF0 == 0xB0 => Some(Self {
                channel: status & 0x0F,
                control: control & 0x7F,
                value: value & 0x7F,
            }),
            _ => None,
        }
    }
}

// What the presentation layer gets told about.
#[derive(Clone, Debug, PartialEq)]
pub enum UiEvent {
    // delivered at or after `at`, never before the audio it belongs to
    StepCursor { step: usize, at: Timestamp },
    CursorCleared,
    // per-track UI must be re-derived, indices may have shifted
    TracksChanged { count: usize },
    ParamChanged { track: usize, key: ParamKey, value: f32 },
    MuteChanged { track: usize, muted: bool },
    LearnModeChanged(LearnMode),
    BindingLearned { key: ControlKey, target: BindingTarget },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_control_change_only() {
        assert_eq!(
            ControlMessage::from_midi(&[0xB3, 7, 100]),
            Some(ControlMessage::new(3, 7, 100))
        );
        assert_eq!(ControlMessage::from_midi(&[0x90, 60, 100]), None); // note on
        assert_eq!(ControlMessage::from_midi(&[0xB0, 7]), None);
    }
}
