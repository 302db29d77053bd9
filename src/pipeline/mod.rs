// The sequencer core. Nothing in here knows about threads, devices or files
// except persistence.rs.
pub mod mapping;
pub mod params;
pub mod pattern;
pub mod persistence;
pub mod scheduler;
pub mod snapshot;
pub mod tracks;

#[cfg(test)]
pub(crate) mod test_fixture;
