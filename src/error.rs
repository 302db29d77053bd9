//! Error types for neonseq.
//!
//! Out-of-range track, step or parameter indices are deliberately absent:
//! those are silent no-ops everywhere, never errors.

use thiserror::Error;

/// Sample decode failure, reported to whoever asked for the decode.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("WAV error: {0}")]
    Wav(#[from] hound::Error),

    #[error("sample contains no frames")]
    Empty,

    #[error("unsupported sample: {0}")]
    Unsupported(String),
}

/// A snapshot document that can't be loaded. Live state is untouched.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unsupported snapshot version {found} (newest known is {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("invalid snapshot: {0}")]
    Invalid(String),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// The control input is optional; these only ever get logged.
#[derive(Error, Debug)]
pub enum ControlInputError {
    #[error("could not open MIDI input: {0}")]
    Init(String),

    #[error("no MIDI input ports available")]
    NoPorts,

    #[error("no MIDI input port matching {0:?}")]
    PortNotFound(String),

    #[error("could not connect to MIDI input: {0}")]
    Connect(String),
}
