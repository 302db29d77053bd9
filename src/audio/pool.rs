// Name-addressed pool of decoded samples. Tracks pick samples out of here,
// and snapshots refer to them by name only.

use std::path::Path;

use log::{info, warn};

use super::sample_buffer::SampleBuffer;
use super::sample_id::SampleHandle;
use crate::audio_api::SampleResolver;
use crate::error::DecodeError;

pub const DEFAULT_SAMPLE_RATE: u32 = 44100;

#[derive(Clone, Debug)]
pub struct PoolEntry {
    pub name: String,
    pub handle: SampleHandle,
}

#[derive(Clone, Debug)]
pub struct SamplePool {
    entries: Vec<PoolEntry>,
    sample_rate: u32,
}

impl Default for SamplePool {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE)
    }
}

impl SamplePool {
    pub fn new(sample_rate: u32) -> Self {
        Self { entries: Vec::new(), sample_rate }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[PoolEntry] {
        &self.entries
    }

    // Decode and insert. A name already in the pool is replaced.
    pub fn add_bytes(&mut self, name: &str, bytes: &[u8]) -> Result<SampleHandle, DecodeError> {
        let buffer = SampleBuffer::decode_bytes(bytes, self.sample_rate).inspect_err(|e| {
            warn!("sample pool: could not decode {name}: {e}");
        })?;
        Ok(self.insert(name, buffer))
    }

    pub fn add_file(&mut self, path: &Path) -> Result<SampleHandle, DecodeError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let buffer = SampleBuffer::load_wav(path, self.sample_rate).inspect_err(|e| {
            warn!("sample pool: could not load {}: {e}", path.display());
        })?;
        Ok(self.insert(&name, buffer))
    }

    pub fn insert(&mut self, name: &str, buffer: SampleBuffer) -> SampleHandle {
        let handle = SampleHandle::new(buffer);
        info!(
            "sample pool: {name} ({:.2}s)",
            handle.buffer().duration_secs()
        );
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => entry.handle = handle.clone(),
            None => self.entries.push(PoolEntry { name: name.to_string(), handle: handle.clone() }),
        }
        handle
    }

    pub fn get(&self, name: &str) -> Option<&SampleHandle> {
        self.entries.iter().find(|e| e.name == name).map(|e| &e.handle)
    }
}

impl SampleResolver for SamplePool {
    fn resolve(&self, name: &str) -> Option<SampleHandle> {
        self.get(name).filter(|h| h.is_ready()).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::sample_buffer::wav_bytes;

    #[test]
    fn resolves_by_name() {
        let mut pool = SamplePool::default();
        let kick = pool.add_bytes("kick.wav", &wav_bytes(1, 44100, &[1000; 64])).unwrap();
        assert_eq!(pool.resolve("kick.wav"), Some(kick));
        assert!(pool.resolve("snare.wav").is_none());
    }

    #[test]
    fn same_name_replaces_entry() {
        let mut pool = SamplePool::default();
        pool.add_bytes("hat.wav", &wav_bytes(1, 44100, &[1; 8])).unwrap();
        let second = pool.add_bytes("hat.wav", &wav_bytes(1, 44100, &[2; 8])).unwrap();
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get("hat.wav"), Some(&second));
    }

    #[test]
    fn failed_decode_adds_nothing() {
        let mut pool = SamplePool::default();
        assert!(pool.add_bytes("broken.wav", b"RIFFnope").is_err());
        assert!(pool.is_empty());
    }
}
