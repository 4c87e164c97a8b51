use std::{fs, path::Path};

use bon::Builder;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::{
    core::{
        period::Period,
        unit::{Conversion, Unit},
    },
    prelude::*,
};

/// Watt-hour counters that get hourly and daily meters: `(key suffix, name, source key)`.
const ENERGY_COUNTERS: [(&str, &str, &str); 6] = [
    ("grid_sell_energy", "Grid Sell Energy", "grid_sell_active_energy"),
    ("grid_buy_energy", "Grid Buy Energy", "grid_buy_active_energy"),
    ("pv_energy", "PV Energy", "pv_active_energy"),
    ("consumption_energy", "Consumption Energy", "consumption_active_energy"),
    ("ess_charge_energy", "ESS Charge Energy", "ess_charge_energy"),
    ("ess_discharge_energy", "ESS Discharge Energy", "ess_discharge_energy"),
];

const SAVINGS_SOURCE_KEY: &str = "optimised_energy_total_savings";

#[must_use]
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize, Builder)]
pub struct MeterDefinition {
    /// Unique meter key, also the key of its persisted state.
    #[builder(into)]
    pub key: String,

    #[builder(into)]
    pub name: String,

    /// Key of the cumulative counter in the snapshot data.
    #[builder(into)]
    pub source_key: String,

    pub source_unit: Unit,

    pub unit: Unit,

    pub period: Period,
}

impl MeterDefinition {
    pub fn conversion(&self) -> Result<Conversion> {
        Conversion::between(self.source_unit, self.unit)
            .with_context(|| format!("meter `{}` has incompatible units", self.key))
    }

    /// Monetary meters only get their device class when there is a currency to report in.
    #[must_use]
    pub fn device_class(&self, currency: Option<&str>) -> Option<DeviceClass> {
        match self.unit {
            unit if unit.is_energy() => Some(DeviceClass::Energy),
            Unit::Currency if currency.is_some() => Some(DeviceClass::Monetary),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, derive_more::Display)]
pub enum DeviceClass {
    #[display("energy")]
    Energy,

    #[display("monetary")]
    Monetary,
}

/// Ordered set of period meters with unique keys.
#[must_use]
#[derive(Clone, Debug, Serialize, Deserialize, derive_more::Deref, derive_more::IntoIterator)]
#[into_iterator(owned, ref)]
pub struct Catalog {
    meters: Vec<MeterDefinition>,
}

impl Catalog {
    /// Meters the Solar Cube integration has always shipped with.
    pub fn builtin() -> Self {
        let energy_and_savings = [Period::Hourly, Period::Daily].into_iter().flat_map(|period| {
            ENERGY_COUNTERS
                .into_iter()
                .map(move |(suffix, name, source_key)| {
                    MeterDefinition::builder()
                        .key(format!("{period}_{suffix}"))
                        .name(format!("{} {name}", period.title()))
                        .source_key(source_key)
                        .source_unit(Unit::WattHours)
                        .unit(Unit::KilowattHours)
                        .period(period)
                        .build()
                })
                .chain([Self::savings(period)])
        });
        let savings = [Period::Weekly, Period::Monthly].into_iter().map(Self::savings);
        Self { meters: energy_and_savings.chain(savings).collect() }
    }

    fn savings(period: Period) -> MeterDefinition {
        MeterDefinition::builder()
            .key(format!("{period}_optimisation_savings"))
            .name(format!("{} Optimisation Savings", period.title()))
            .source_key(SAVINGS_SOURCE_KEY)
            .source_unit(Unit::Currency)
            .unit(Unit::Currency)
            .period(period)
            .build()
    }

    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn read_from(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).context("failed to read the catalog")?;
        let this: Self = toml::from_str(&contents).context("failed to parse the catalog")?;
        this.validate()?;
        info!(n_meters = this.meters.len(), "loaded the catalog");
        Ok(this)
    }

    fn validate(&self) -> Result {
        if let Some(key) = self.meters.iter().map(|meter| meter.key.as_str()).duplicates().next() {
            bail!("duplicate meter key `{key}`");
        }
        for meter in &self.meters {
            meter.conversion()?;
        }
        Ok(())
    }
}
