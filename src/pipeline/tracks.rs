// Track Chain Registry: per track, the authoritative parameter record, the
// assigned sample, and the exclusively-owned external audio chain.
//
// Entries sit in a dense Vec, so a track's index is its position and shifts
// on removal. Each entry also carries a `TrackId` that never changes and is
// never reused; anything that needs to survive a removal holds that instead
// and re-resolves it with `index_of`.

use log::debug;

use crate::audio::SampleHandle;
use crate::audio_api::{AudioBackend, AudioChain};
use crate::pipeline::params::{ChainWrite, ParamKey, TrackParams, route};
use crate::shared::Timestamp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TrackId(pub u64);

#[derive(Clone, Debug, Default, PartialEq)]
pub enum SampleSlot {
    #[default]
    Empty,
    Loaded { name: String, handle: SampleHandle },
    // named in a loaded document but nothing by that name was available
    Missing { name: String },
}

impl SampleSlot {
    pub fn name(&self) -> Option<&str> {
        match self {
            SampleSlot::Empty => None,
            SampleSlot::Loaded { name, .. } | SampleSlot::Missing { name } => Some(name),
        }
    }

    pub fn is_playable(&self) -> bool {
        matches!(self, SampleSlot::Loaded { handle, .. } if handle.is_ready())
    }
}

pub struct TrackEntry {
    id: TrackId,
    params: TrackParams,
    sample: SampleSlot,
    key_binding: Option<char>,
    chain: Box<dyn AudioChain>,
}

impl TrackEntry {
    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn params(&self) -> &TrackParams {
        &self.params
    }

    pub fn sample(&self) -> &SampleSlot {
        &self.sample
    }

    pub fn key_binding(&self) -> Option<char> {
        self.key_binding
    }

    fn apply(&mut self, key: ParamKey, value: f32) {
        for write in route(key, value) {
            match write {
                ChainWrite::Param(k, v) => self.chain.set_param(k, v),
                ChainWrite::DelayFeedback(v) => self.chain.set_delay_feedback(v),
                ChainWrite::SaturationBypass(b) => self.chain.set_saturation_bypass(b),
            }
        }
    }
}

#[derive(Default)]
pub struct TrackRegistry {
    entries: Vec<TrackEntry>,
    next_id: u64,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, track: usize) -> Option<&TrackEntry> {
        self.entries.get(track)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackEntry> {
        self.entries.iter()
    }

    // Allocates a chain and pushes the default parameters onto it.
    pub fn create_track(&mut self, backend: &mut dyn AudioBackend) -> usize {
        let id = TrackId(self.next_id);
        self.next_id += 1;
        let mut entry = TrackEntry {
            id,
            params: TrackParams::default(),
            sample: SampleSlot::Empty,
            key_binding: None,
            chain: backend.create_chain(),
        };
        for key in ParamKey::ALL {
            entry.apply(key, entry.params.get(key));
        }
        self.entries.push(entry);
        debug!("track {} created (id {})", self.entries.len() - 1, id.0);
        self.entries.len() - 1
    }

    // Disposes the chain before the entry leaves the Vec, so the index shift
    // never leaves a live handle behind.
    pub fn destroy_track(&mut self, track: usize) -> bool {
        if track >= self.entries.len() {
            return false;
        }
        self.entries[track].chain.dispose();
        let entry = self.entries.remove(track);
        debug!("track {track} destroyed (id {})", entry.id.0);
        true
    }

    pub(crate) fn destroy_all(&mut self) {
        while !self.entries.is_empty() {
            self.destroy_track(self.entries.len() - 1);
        }
    }

    pub fn id_of(&self, track: usize) -> Option<TrackId> {
        self.entries.get(track).map(|e| e.id)
    }

    pub fn index_of(&self, id: TrackId) -> Option<usize> {
        self.entries.iter().position(|e| e.id == id)
    }

    /// Clamp, store and forward. Returns the stored value, or `None` when the
    /// track doesn't exist (late events racing a removal land here).
    pub fn set_parameter(&mut self, track: usize, key: ParamKey, value: f32) -> Option<f32> {
        let entry = self.entries.get_mut(track)?;
        let stored = entry.params.set(key, value);
        entry.apply(key, stored);
        Some(stored)
    }

    pub fn parameter(&self, track: usize, key: ParamKey) -> Option<f32> {
        self.entries.get(track).map(|e| e.params.get(key))
    }

    pub fn set_sample(&mut self, track: usize, name: &str, handle: SampleHandle) -> bool {
        let Some(entry) = self.entries.get_mut(track) else {
            return false;
        };
        entry.chain.set_buffer(&handle);
        entry.sample = SampleSlot::Loaded { name: name.to_string(), handle };
        true
    }

    pub fn mark_missing(&mut self, track: usize, name: &str) -> bool {
        let Some(entry) = self.entries.get_mut(track) else {
            return false;
        };
        entry.chain.clear_buffer();
        entry.sample = SampleSlot::Missing { name: name.to_string() };
        true
    }

    pub fn clear_sample(&mut self, track: usize) -> bool {
        let Some(entry) = self.entries.get_mut(track) else {
            return false;
        };
        entry.chain.clear_buffer();
        entry.sample = SampleSlot::Empty;
        true
    }

    pub fn sample(&self, track: usize) -> Option<&SampleSlot> {
        self.entries.get(track).map(|e| &e.sample)
    }

    // Retrigger, only if there's something to play.
    pub fn trigger(&mut self, track: usize, at: Timestamp) -> bool {
        match self.entries.get_mut(track) {
            Some(entry) if entry.sample.is_playable() => {
                entry.chain.trigger(at);
                true
            }
            _ => false,
        }
    }

    pub fn set_mute(&mut self, track: usize, muted: bool) -> bool {
        match self.entries.get_mut(track) {
            Some(entry) => {
                entry.chain.set_mute(muted);
                true
            }
            None => false,
        }
    }

    pub fn set_key_binding(&mut self, track: usize, key: Option<char>) -> bool {
        match self.entries.get_mut(track) {
            Some(entry) => {
                entry.key_binding = key.map(|k| k.to_ascii_lowercase());
                true
            }
            None => false,
        }
    }

    // First track bound to `key`, case-insensitive.
    pub fn track_for_key(&self, key: char) -> Option<usize> {
        let key = key.to_ascii_lowercase();
        self.entries.iter().position(|e| e.key_binding == Some(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_fixture::{ChainCall, RecordingBackend, test_sample};

    fn registry_with(n: usize) -> (TrackRegistry, RecordingBackend) {
        let mut backend = RecordingBackend::default();
        let mut reg = TrackRegistry::new();
        for _ in 0..n {
            reg.create_track(&mut backend);
        }
        backend.clear();
        (reg, backend)
    }

    #[test]
    fn set_parameter_clamps_and_forwards() {
        let (mut reg, backend) = registry_with(2);
        assert_eq!(reg.set_parameter(1, ParamKey::Volume, 100.0), Some(6.0));
        assert_eq!(reg.parameter(1, ParamKey::Volume), Some(6.0));
        assert_eq!(reg.set_parameter(1, ParamKey::Volume, -999.0), Some(-40.0));
        assert_eq!(
            backend.calls_for(1),
            vec![
                ChainCall::Param(ParamKey::Volume, 6.0),
                ChainCall::Param(ParamKey::Volume, -40.0)
            ]
        );
    }

    #[test]
    fn repeated_writes_are_idempotent() {
        let (mut reg, backend) = registry_with(1);
        reg.set_parameter(0, ParamKey::Pan, 0.4);
        let once = (reg.parameter(0, ParamKey::Pan), backend.calls_for(0));
        reg.set_parameter(0, ParamKey::Pan, 0.4);
        let calls = backend.calls_for(0);
        assert_eq!(reg.parameter(0, ParamKey::Pan), once.0);
        assert_eq!(calls[0], calls[1]);
        assert_eq!(once.1.len(), 1);
    }

    #[test]
    fn saturation_toggles_bypass() {
        let (mut reg, backend) = registry_with(1);
        reg.set_parameter(0, ParamKey::Saturation, 0.5);
        reg.set_parameter(0, ParamKey::Saturation, 0.0);
        assert_eq!(
            backend.calls_for(0),
            vec![
                ChainCall::Param(ParamKey::Saturation, 0.5),
                ChainCall::SaturationBypass(false),
                ChainCall::Param(ParamKey::Saturation, 0.0),
                ChainCall::SaturationBypass(true),
            ]
        );
    }

    #[test]
    fn out_of_range_track_is_ignored() {
        let (mut reg, backend) = registry_with(1);
        assert_eq!(reg.set_parameter(3, ParamKey::Volume, 1.0), None);
        assert_eq!(reg.parameter(3, ParamKey::Volume), None);
        assert!(!reg.trigger(3, 0.0));
        assert!(backend.calls().is_empty());
    }

    #[test]
    fn destroy_disposes_and_shifts() {
        let (mut reg, backend) = registry_with(3);
        let last = reg.id_of(2).unwrap();
        assert!(reg.destroy_track(0));
        assert_eq!(backend.calls_for(0), vec![ChainCall::Dispose]);
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.index_of(last), Some(1));
        assert_eq!(reg.index_of(TrackId(0)), None);
    }

    #[test]
    fn ids_are_never_reused() {
        let (mut reg, mut backend) = registry_with(2);
        reg.destroy_track(1);
        let idx = reg.create_track(&mut backend);
        assert_eq!(reg.id_of(idx), Some(TrackId(2)));
    }

    #[test]
    fn trigger_needs_a_loaded_sample() {
        let (mut reg, backend) = registry_with(1);
        assert!(!reg.trigger(0, 1.0));
        reg.set_sample(0, "kick.wav", test_sample());
        assert!(reg.trigger(0, 1.0));
        reg.mark_missing(0, "kick.wav");
        assert!(!reg.trigger(0, 2.0));
        assert_eq!(reg.sample(0).and_then(SampleSlot::name), Some("kick.wav"));
        let triggers = backend
            .calls_for(0)
            .into_iter()
            .filter(|c| matches!(c, ChainCall::Trigger(_)))
            .count();
        assert_eq!(triggers, 1);
    }

    #[test]
    fn key_bindings_are_case_insensitive() {
        let (mut reg, _backend) = registry_with(3);
        reg.set_key_binding(2, Some('K'));
        assert_eq!(reg.track_for_key('k'), Some(2));
        assert_eq!(reg.track_for_key('K'), Some(2));
        reg.destroy_track(0);
        assert_eq!(reg.track_for_key('k'), Some(1)); // travels with the track
    }
}
