// The seams between the sequencer core and the outside world.
//
// Nothing in here renders audio. An `AudioChain` is whatever owns the
// player -> distortion -> delay -> reverb -> panner -> volume chain for one
// track; the core only tells it what to play, when, and with which settings.

use std::sync::Arc;
use std::time::Instant;

use crate::audio::{SampleHandle, SampleId};
use crate::pipeline::params::ParamKey;
use crate::shared::Timestamp;

pub use crate::audio::{ChainId, SampleBuffer};

/// One track's external processing chain. Write-only from the core's side.
pub trait AudioChain: Send {
    fn set_buffer(&mut self, sample: &SampleHandle);
    fn clear_buffer(&mut self);
    // Restart the sample from zero at `at`, cutting any instance still sounding.
    fn trigger(&mut self, at: Timestamp);
    fn set_param(&mut self, key: ParamKey, value: f32);
    fn set_delay_feedback(&mut self, amount: f32);
    fn set_saturation_bypass(&mut self, bypassed: bool);
    fn set_mute(&mut self, muted: bool);
    // Release the chain's resources; no calls may follow.
    fn dispose(&mut self);
}

pub trait AudioBackend: Send {
    fn create_chain(&mut self) -> Box<dyn AudioChain>;
}

// Name lookup against whatever samples are available right now.
pub trait SampleResolver {
    fn resolve(&self, name: &str) -> Option<SampleHandle>;
}

// Resolves nothing; a load with this resolver marks every sample missing.
pub struct NoSamples;

impl SampleResolver for NoSamples {
    fn resolve(&self, _name: &str) -> Option<SampleHandle> {
        None
    }
}

pub trait Clock {
    fn now(&self) -> Timestamp;
}

// Wall clock, in seconds since construction.
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        self.origin.elapsed().as_secs_f64()
    }
}

// What a channel-backed chain sends to whoever actually makes sound.
#[derive(Clone, Debug)]
pub enum AudioCommand {
    // The renderer can't decode files, so buffers arrive already decoded and
    // are referenced by id afterwards.
    RegisterSample { id: SampleId, buffer: Arc<SampleBuffer> },
    CreateChain(ChainId),
    SetBuffer { chain: ChainId, sample: Option<SampleId> },
    Trigger { chain: ChainId, at: Timestamp },
    SetParam { chain: ChainId, key: ParamKey, value: f32 },
    SetDelayFeedback { chain: ChainId, amount: f32 },
    SetSaturationBypass { chain: ChainId, bypassed: bool },
    SetMute { chain: ChainId, muted: bool },
    Dispose(ChainId),
}
