// Concrete collaborators for the core: decoded samples, the sample pool, and
// a channel-backed audio chain. Rendering itself happens elsewhere.

mod chain;
mod pool;
pub(crate) mod sample_buffer;
mod sample_id;

pub use chain::{ChainId, ChannelBackend, ChannelChain};
pub use pool::{DEFAULT_SAMPLE_RATE, PoolEntry, SamplePool};
pub use sample_buffer::{SampleBuffer, StereoFrame};
pub use sample_id::{SampleHandle, SampleId, next_sample_id};
