//! neonseq: a multi-track step sequencer core.
//!
//! `middle::Session` is the entry point; it owns the pattern grid, the
//! per-track audio chains, the transport and the MIDI learn table.

pub mod audio;
pub mod audio_api;
pub mod config;
pub mod control_input;
pub mod error;
pub mod loader;
pub mod middle;
pub mod pipeline;
pub mod shared;
