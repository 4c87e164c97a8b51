use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use serde_json::Value;

use crate::{
    core::accumulator::MeterState,
    prelude::*,
    store::{MemoryStore, StateStore},
};

/// All meter states in a single JSON object keyed by meter key.
///
/// The file is read once on open and rewritten on flush.
#[must_use]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
    is_dirty: bool,
}

impl JsonFileStore {
    /// Open the store, falling back to the empty one if the file cannot be used.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path) -> Self {
        let entries = Self::read_fallibly_from(path).unwrap_or_else(|error| {
            error!("failed to read the meter states, starting afresh: {error:#}");
            BTreeMap::new()
        });
        info!(n_entries = entries.len(), "opened the state store");
        Self { path: path.to_owned(), entries, is_dirty: false }
    }

    fn read_fallibly_from(path: &Path) -> Result<BTreeMap<String, Value>> {
        if !path.is_file() {
            return Ok(BTreeMap::new());
        }
        let contents = fs::read(path).context("failed to read the file")?;
        serde_json::from_slice(&contents).context("failed to parse the file")
    }

    /// Replace the file through a sibling temporary file, so a failed write keeps the old states.
    fn write(&self) -> Result {
        let contents = serde_json::to_vec_pretty(&self.entries)?;
        let temp_path = self.path.with_extension("tmp");
        fs::write(&temp_path, contents)
            .with_context(|| format!("failed to write `{}`", temp_path.display()))?;
        fs::rename(&temp_path, &self.path).context("failed to replace the state file")
    }

    /// Detach the states from the file, for runs that must not persist anything.
    pub fn into_memory(self) -> MemoryStore {
        MemoryStore::from(self.entries)
    }
}

impl StateStore for JsonFileStore {
    fn load(&self, meter_key: &str) -> Option<Value> {
        self.entries.get(meter_key).cloned()
    }

    fn save(&mut self, meter_key: &str, state: &MeterState) {
        match serde_json::to_value(state) {
            Ok(attributes) => {
                self.entries.insert(meter_key.to_owned(), attributes);
                self.is_dirty = true;
            }
            Err(error) => error!(meter_key, %error, "failed to serialize the meter state"),
        }
    }

    #[instrument(skip_all, fields(path = %self.path.display()))]
    fn flush(&mut self) {
        if !self.is_dirty {
            return;
        }
        match self.write() {
            Ok(()) => {
                debug!(n_entries = self.entries.len(), "saved the meter states");
                self.is_dirty = false;
            }
            Err(error) => error!("failed to save the meter states: {error:#}"),
        }
    }
}
