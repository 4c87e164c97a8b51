mod file;
mod memory;

pub use self::{file::JsonFileStore, memory::MemoryStore};
use crate::core::accumulator::MeterState;

/// Where the meters keep their state between runs.
///
/// Loading hands out the raw persisted attributes, validating them is up to
/// [`MeterState::restore`]. Saving is fire-and-forget: a store reports its own failures.
pub trait StateStore {
    fn load(&self, meter_key: &str) -> Option<serde_json::Value>;

    fn save(&mut self, meter_key: &str, state: &MeterState);

    /// Make the saved states durable, called once per refresh cycle.
    fn flush(&mut self) {}
}
