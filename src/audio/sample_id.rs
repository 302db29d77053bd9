use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::sample_buffer::SampleBuffer;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SampleId(pub u64);

// atomic counter so the loader can mint ids from any thread
pub fn next_sample_id() -> SampleId {
    SampleId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

/// A decoded sample, cheap to clone and share between the pool and tracks.
#[derive(Clone, Debug)]
pub struct SampleHandle {
    id: SampleId,
    buffer: Arc<SampleBuffer>,
}

impl SampleHandle {
    pub fn new(buffer: SampleBuffer) -> Self {
        Self {
            id: next_sample_id(),
            buffer: Arc::new(buffer),
        }
    }

    pub fn id(&self) -> SampleId {
        self.id
    }

    pub fn buffer(&self) -> &Arc<SampleBuffer> {
        &self.buffer
    }

    // A handle with no frames can't be played.
    pub fn is_ready(&self) -> bool {
        !self.buffer.is_empty()
    }
}

impl PartialEq for SampleHandle {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}
