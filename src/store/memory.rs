use std::collections::BTreeMap;

use serde_json::Value;

use crate::{core::accumulator::MeterState, prelude::*, store::StateStore};

#[must_use]
#[derive(Clone, Debug, Default, derive_more::From)]
pub struct MemoryStore(BTreeMap<String, Value>);

impl StateStore for MemoryStore {
    fn load(&self, meter_key: &str) -> Option<Value> {
        self.0.get(meter_key).cloned()
    }

    fn save(&mut self, meter_key: &str, state: &MeterState) {
        match serde_json::to_value(state) {
            Ok(attributes) => {
                self.0.insert(meter_key.to_owned(), attributes);
            }
            Err(error) => error!(meter_key, %error, "failed to serialize the meter state"),
        }
    }
}
