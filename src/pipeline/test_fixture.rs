// Purely for testing: collaborator doubles that record what the core asked for.

use std::sync::{Arc, Mutex};

use crate::audio::{SampleBuffer, SampleHandle, SampleId, SamplePool, StereoFrame};
use crate::audio_api::{AudioBackend, AudioChain};
use crate::pipeline::params::ParamKey;
use crate::shared::Timestamp;

#[derive(Clone, Debug, PartialEq)]
pub enum ChainCall {
    SetBuffer(SampleId),
    ClearBuffer,
    Trigger(Timestamp),
    Param(ParamKey, f32),
    DelayFeedback(f32),
    SaturationBypass(bool),
    Mute(bool),
    Dispose,
}

// Every call from every chain, tagged with the chain's creation order.
#[derive(Clone, Default)]
pub struct RecordingBackend {
    log: Arc<Mutex<Vec<(usize, ChainCall)>>>,
    created: Arc<Mutex<usize>>,
}

impl RecordingBackend {
    pub fn calls(&self) -> Vec<(usize, ChainCall)> {
        self.log.lock().unwrap().clone()
    }

    pub fn calls_for(&self, chain: usize) -> Vec<ChainCall> {
        self.calls()
            .into_iter()
            .filter(|(c, _)| *c == chain)
            .map(|(_, call)| call)
            .collect()
    }

    pub fn triggers(&self) -> Vec<(usize, Timestamp)> {
        self.calls()
            .into_iter()
            .filter_map(|(c, call)| match call {
                ChainCall::Trigger(at) => Some((c, at)),
                _ => None,
            })
            .collect()
    }

    pub fn chains_created(&self) -> usize {
        *self.created.lock().unwrap()
    }

    pub fn clear(&self) {
        self.log.lock().unwrap().clear();
    }
}

impl AudioBackend for RecordingBackend {
    fn create_chain(&mut self) -> Box<dyn AudioChain> {
        let mut created = self.created.lock().unwrap();
        let chain = RecordingChain { index: *created, log: self.log.clone() };
        *created += 1;
        Box::new(chain)
    }
}

struct RecordingChain {
    index: usize,
    log: Arc<Mutex<Vec<(usize, ChainCall)>>>,
}

impl RecordingChain {
    fn record(&self, call: ChainCall) {
        self.log.lock().unwrap().push((self.index, call));
    }
}

impl AudioChain for RecordingChain {
    fn set_buffer(&mut self, sample: &SampleHandle) {
        self.record(ChainCall::SetBuffer(sample.id()));
    }
    fn clear_buffer(&mut self) {
        self.record(ChainCall::ClearBuffer);
    }
    fn trigger(&mut self, at: Timestamp) {
        self.record(ChainCall::Trigger(at));
    }
    fn set_param(&mut self, key: ParamKey, value: f32) {
        self.record(ChainCall::Param(key, value));
    }
    fn set_delay_feedback(&mut self, amount: f32) {
        self.record(ChainCall::DelayFeedback(amount));
    }
    fn set_saturation_bypass(&mut self, bypassed: bool) {
        self.record(ChainCall::SaturationBypass(bypassed));
    }
    fn set_mute(&mut self, muted: bool) {
        self.record(ChainCall::Mute(muted));
    }
    fn dispose(&mut self) {
        self.record(ChainCall::Dispose);
    }
}

fn short_buffer() -> SampleBuffer {
    SampleBuffer {
        data: vec![StereoFrame { left: 0.25, right: 0.25 }; 32],
        sample_rate: 44100,
    }
}

pub fn test_sample() -> SampleHandle {
    SampleHandle::new(short_buffer())
}

// A pool holding one short buffer under each name.
pub fn test_pool(names: &[&str]) -> SamplePool {
    let mut pool = SamplePool::default();
    for name in names {
        pool.insert(name, short_buffer());
    }
    pool
}
