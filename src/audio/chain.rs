// An `AudioChain` that turns every call into an `AudioCommand` on a channel.
// The receiving end owns the actual DSP; we never block on it.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::{Receiver, Sender};
use log::warn;

use super::sample_id::{SampleHandle, SampleId};
use crate::audio_api::{AudioBackend, AudioChain, AudioCommand};
use crate::pipeline::params::ParamKey;
use crate::shared::Timestamp;

static NEXT_CHAIN: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChainId(pub u64);

pub struct ChannelBackend {
    tx: Sender<AudioCommand>,
    registered: Arc<Mutex<HashSet<SampleId>>>,
}

impl ChannelBackend {
    pub fn new(tx: Sender<AudioCommand>) -> Self {
        Self { tx, registered: Arc::new(Mutex::new(HashSet::new())) }
    }

    // Backend plus the receiving end, bounded like an audio command queue.
    pub fn bounded(capacity: usize) -> (Self, Receiver<AudioCommand>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (Self::new(tx), rx)
    }
}

impl AudioBackend for ChannelBackend {
    fn create_chain(&mut self) -> Box<dyn AudioChain> {
        let id = ChainId(NEXT_CHAIN.fetch_add(1, Ordering::Relaxed));
        let chain = ChannelChain {
            id,
            tx: self.tx.clone(),
            registered: self.registered.clone(),
            disposed: false,
        };
        chain.send(AudioCommand::CreateChain(id));
        Box::new(chain)
    }
}

pub struct ChannelChain {
    id: ChainId,
    tx: Sender<AudioCommand>,
    registered: Arc<Mutex<HashSet<SampleId>>>,
    disposed: bool,
}

impl ChannelChain {
    fn send(&self, cmd: AudioCommand) {
        if self.disposed {
            return;
        }
        // a full queue drops the command rather than stalling the scheduler
        if self.tx.try_send(cmd).is_err() {
            warn!("audio command queue full or closed (chain {})", self.id.0);
        }
    }
}

impl AudioChain for ChannelChain {
    fn set_buffer(&mut self, sample: &SampleHandle) {
        let first_use = match self.registered.lock() {
            Ok(mut ids) => ids.insert(sample.id()),
            Err(_) => true,
        };
        if first_use {
            self.send(AudioCommand::RegisterSample {
                id: sample.id(),
                buffer: sample.buffer().clone(),
            });
        }
        self.send(AudioCommand::SetBuffer { chain: self.id, sample: Some(sample.id()) });
    }

    fn clear_buffer(&mut self) {
        self.send(AudioCommand::SetBuffer { chain: self.id, sample: None });
    }

    fn trigger(&mut self, at: Timestamp) {
        self.send(AudioCommand::Trigger { chain: self.id, at });
    }

    fn set_param(&mut self, key: ParamKey, value: f32) {
        self.send(AudioCommand::SetParam { chain: self.id, key, value });
    }

    fn set_delay_feedback(&mut self, amount: f32) {
        self.send(AudioCommand::SetDelayFeedback { chain: self.id, amount });
    }

    fn set_saturation_bypass(&mut self, bypassed: bool) {
        self.send(AudioCommand::SetSaturationBypass { chain: self.id, bypassed });
    }

    fn set_mute(&mut self, muted: bool) {
        self.send(AudioCommand::SetMute { chain: self.id, muted });
    }

    fn dispose(&mut self) {
        self.send(AudioCommand::Dispose(self.id));
        self.disposed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::SampleBuffer;
    use crate::audio::sample_buffer::StereoFrame;

    #[test]
    fn registers_each_sample_once() {
        let (mut backend, rx) = ChannelBackend::bounded(64);
        let mut a = backend.create_chain();
        let mut b = backend.create_chain();
        let sample = SampleHandle::new(SampleBuffer {
            data: vec![StereoFrame::default(); 4],
            sample_rate: 44100,
        });
        a.set_buffer(&sample);
        b.set_buffer(&sample);
        let registrations = rx
            .try_iter()
            .filter(|c| matches!(c, AudioCommand::RegisterSample { .. }))
            .count();
        assert_eq!(registrations, 1);
    }

    #[test]
    fn nothing_is_sent_after_dispose() {
        let (mut backend, rx) = ChannelBackend::bounded(64);
        let mut chain = backend.create_chain();
        chain.dispose();
        chain.trigger(1.0);
        let cmds: Vec<_> = rx.try_iter().collect();
        assert!(matches!(cmds.last(), Some(AudioCommand::Dispose(_))));
        assert!(!cmds.iter().any(|c| matches!(c, AudioCommand::Trigger { .. })));
    }
}
