use chrono::{DateTime, FixedOffset, TimeZone};

use crate::{
    core::accumulator::{MeterState, PeriodAccumulator},
    meter::{Catalog, DerivedSensor, MeterDefinition, Reading},
    prelude::*,
    snapshot::Snapshot,
    store::StateStore,
};

/// All period meters and derived sensors, refreshed together from one snapshot.
#[must_use]
pub struct MeterBank<S> {
    meters: Vec<(MeterDefinition, PeriodAccumulator)>,
    derived: Vec<DerivedSensor>,
    store: S,
}

impl<S: StateStore> MeterBank<S> {
    /// Build the meters and restore their state from the store.
    #[instrument(skip_all, fields(n_meters = catalog.len()))]
    pub fn open(catalog: Catalog, store: S) -> Result<Self> {
        let meters = catalog
            .into_iter()
            .map(|definition| {
                let conversion = definition.conversion()?;
                let state =
                    store.load(&definition.key).map(MeterState::restore).unwrap_or_default();
                if state.baseline.is_none() {
                    debug!(key = %definition.key, "no previous state");
                }
                let accumulator = PeriodAccumulator::new(definition.period, conversion, state);
                Ok((definition, accumulator))
            })
            .collect::<Result<_>>()?;
        Ok(Self { meters, derived: DerivedSensor::all(), store })
    }

    pub fn meters(&self) -> impl Iterator<Item = (&MeterDefinition, &MeterState)> {
        self.meters.iter().map(|(definition, accumulator)| (definition, accumulator.state()))
    }

    /// Run one refresh cycle at the specified wall-clock time.
    ///
    /// Every state produced in this cycle is saved, and the store is flushed once at the end.
    #[instrument(skip_all, fields(at = %at.fixed_offset()))]
    pub fn refresh<Tz: TimeZone>(&mut self, snapshot: &Snapshot, at: &DateTime<Tz>) -> Refresh {
        let mut readings =
            Vec::with_capacity(self.meters.len() + snapshot.data.len() + self.derived.len());

        for (definition, accumulator) in &mut self.meters {
            let value = accumulator.observe(snapshot.value(&definition.source_key), at);
            if value.is_some() {
                self.store.save(&definition.key, accumulator.state());
            } else {
                warn!(key = %definition.key, source_key = %definition.source_key, "unavailable");
            }
            readings.push(Reading {
                key: definition.key.clone(),
                name: definition.name.clone(),
                unit: Some(definition.unit),
                value,
            });
        }
        readings.extend(DerivedSensor::values(snapshot).map(|sensor| sensor.read(snapshot)));
        readings.extend(self.derived.iter().map(|sensor| sensor.read(snapshot)));

        self.store.flush();
        Refresh { at: at.fixed_offset(), readings }
    }

    #[cfg(test)]
    pub fn into_store(self) -> S {
        self.store
    }
}

/// Readings of a single refresh cycle, period meters first.
#[must_use]
pub struct Refresh {
    pub at: DateTime<FixedOffset>,
    pub readings: Vec<Reading>,
}

impl Refresh {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Reading> {
        self.readings.iter().find(|reading| reading.key == key)
    }

    /// Value of the sensor, [`None`] if it is unknown or unavailable.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(|reading| reading.value)
    }
}
