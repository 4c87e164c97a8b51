use itertools::Itertools;
use serde_json::Value;

use crate::{
    core::{round, unit::Unit},
    meter::Reading,
    quantity::{
        energy::{KilowattHours, WattHours},
        rate::KilowattHourRate,
    },
    snapshot::{Snapshot, parse_number},
};

/// Watt-hour counters exposed in kilowatt-hours: `(key, name, source key)`.
const KILOWATT_HOUR_TOTALS: [(&str, &str, &str); 6] = [
    ("ess_discharged_energy", "ESS Discharged Energy", "ess_discharge_energy"),
    ("ess_charged_energy", "ESS Charged Energy", "ess_charge_energy"),
    ("grid_buy_active_energy_total", "Grid Buy Active Energy Total", "grid_buy_active_energy"),
    ("grid_sell_active_energy_total", "Grid Sell Active Energy Total", "grid_sell_active_energy"),
    ("pv_active_energy_total", "PV Active Energy Total", "pv_active_energy"),
    (
        "consumption_active_energy_total",
        "Consumption Active Energy Total",
        "consumption_active_energy",
    ),
];

/// Energy counters valued at the current price: `(key, name, energy key, price key)`.
const PRICE_TOTALS: [(&str, &str, &str, &str); 2] = [
    (
        "grid_buy_active_energy_total_cost",
        "Grid Buy Active Energy Total Cost",
        "grid_buy_active_energy",
        "buy_energy_price",
    ),
    (
        "grid_sell_active_energy_total_compensation",
        "Grid Sell Active Energy Total Compensation",
        "grid_sell_active_energy",
        "sell_energy_price",
    ),
];

/// Series horizons: `(key suffix, step index)`.
const HORIZONS: [(&str, usize); 2] = [("1h", 3), ("6h", 23)];

/// Forecast series fields: `(key prefix, name prefix, value key)`.
const FORECAST_FIELDS: [(&str, &str, &str); 3] = [
    ("forecasted_production", "Forecasted Production", "pf"),
    ("forecasted_consumption", "Forecasted Consumption", "cf"),
    ("soc_forecast", "SoC Forecast", "sf"),
];

/// Optimal action flows: grid, battery, PV and consumption, pairwise.
const OPTIMAL_ACTION_FIELDS: [&str; 7] = ["gb", "bg", "bc", "gc", "pb", "pc", "pg"];

#[derive(Copy, Clone, Debug)]
enum Series {
    Forecast,
    OptimalActions,
}

impl Series {
    fn of(self, snapshot: &Snapshot) -> &[Value] {
        match self {
            Self::Forecast => &snapshot.forecast,
            Self::OptimalActions => &snapshot.optimal_actions,
        }
    }
}

#[derive(Clone, Debug)]
enum Derivation {
    /// Coordinator value as is, floats rounded.
    Value { source_key: String },

    /// Number of steps in the series, unavailable when there are none.
    SeriesLength { series: Series },

    /// Watt-hour counter in kilowatt-hours, non-positive counters are unavailable.
    KilowattHourTotal { source_key: &'static str },

    /// Watt-hour counter multiplied by the price per kilowatt-hour.
    PriceTotal { energy_key: &'static str, price_key: &'static str },

    ForecastPoint { index: usize, value_key: &'static str },

    OptimalActionPoint { index: usize, value_key: &'static str },
}

/// Stateless sensor computed straight from a snapshot.
#[must_use]
#[derive(Clone, Debug)]
pub struct DerivedSensor {
    pub key: String,
    pub name: String,
    pub unit: Option<Unit>,
    derivation: Derivation,
}

impl DerivedSensor {
    /// One sensor per coordinator value in the snapshot, skipping the `_`-prefixed service keys.
    pub fn values(snapshot: &Snapshot) -> impl Iterator<Item = Self> + '_ {
        snapshot.data.keys().filter(|key| !key.starts_with('_')).map(|key| Self {
            key: key.clone(),
            name: format!("SolarCube {}", title_case(key)),
            unit: None,
            derivation: Derivation::Value { source_key: key.clone() },
        })
    }

    /// Sensors that do not depend on which values the snapshot carries.
    pub fn all() -> Vec<Self> {
        let series_lengths = [
            ("forecast", "SolarCube Energy Forecast", Series::Forecast),
            ("optimal_actions", "SolarCube Optimal Actions", Series::OptimalActions),
        ]
        .into_iter()
        .map(|(key, name, series)| Self {
            key: key.to_owned(),
            name: name.to_owned(),
            unit: None,
            derivation: Derivation::SeriesLength { series },
        });
        let kilowatt_hour_totals =
            KILOWATT_HOUR_TOTALS.into_iter().map(|(key, name, source_key)| Self {
                key: key.to_owned(),
                name: name.to_owned(),
                unit: Some(Unit::KilowattHours),
                derivation: Derivation::KilowattHourTotal { source_key },
            });
        let price_totals =
            PRICE_TOTALS.into_iter().map(|(key, name, energy_key, price_key)| Self {
                key: key.to_owned(),
                name: name.to_owned(),
                unit: Some(Unit::Currency),
                derivation: Derivation::PriceTotal { energy_key, price_key },
            });
        let forecast_points = FORECAST_FIELDS.into_iter().flat_map(|(key, name, value_key)| {
            HORIZONS.into_iter().map(move |(horizon, index)| Self {
                key: format!("{key}_{horizon}"),
                name: format!("SolarCube {name} {}", horizon.to_uppercase()),
                unit: None,
                derivation: Derivation::ForecastPoint { index, value_key },
            })
        });
        let optimal_action_points = HORIZONS.into_iter().flat_map(|(horizon, index)| {
            OPTIMAL_ACTION_FIELDS.into_iter().map(move |value_key| Self {
                key: format!("optimal_{value_key}_{horizon}"),
                name: format!(
                    "SolarCube Optimal {} {}",
                    value_key.to_uppercase(),
                    horizon.to_uppercase(),
                ),
                unit: None,
                derivation: Derivation::OptimalActionPoint { index, value_key },
            })
        });
        series_lengths
            .chain(kilowatt_hour_totals)
            .chain(price_totals)
            .chain(forecast_points)
            .chain(optimal_action_points)
            .collect()
    }

    pub fn read(&self, snapshot: &Snapshot) -> Reading {
        Reading {
            key: self.key.clone(),
            name: self.name.clone(),
            unit: self.unit,
            value: self.evaluate(snapshot),
        }
    }

    fn evaluate(&self, snapshot: &Snapshot) -> Option<f64> {
        match self.derivation {
            Derivation::Value { ref source_key } => snapshot.value(source_key).map(round),
            Derivation::SeriesLength { series } => {
                #[allow(clippy::cast_precision_loss)]
                let length = series.of(snapshot).len() as f64;
                (length > 0.0).then_some(length)
            }
            Derivation::KilowattHourTotal { source_key } => {
                let energy = WattHours(snapshot.value(source_key)?);
                (energy > WattHours::ZERO).then(|| round(KilowattHours::from(energy).0))
            }
            Derivation::PriceTotal { energy_key, price_key } => {
                let energy = WattHours(snapshot.value(energy_key)?);
                let rate = KilowattHourRate(snapshot.value(price_key)?);
                (energy > WattHours::ZERO).then(|| round((KilowattHours::from(energy) * rate).0))
            }
            Derivation::ForecastPoint { index, value_key } => {
                series_point(&snapshot.forecast, index, value_key)
            }
            Derivation::OptimalActionPoint { index, value_key } => {
                series_point(&snapshot.optimal_actions, index, value_key)
            }
        }
    }
}

fn title_case(key: &str) -> String {
    key.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect::<String>()
            })
        })
        .join(" ")
}

fn series_point(series: &[Value], index: usize, value_key: &str) -> Option<f64> {
    series.get(index)?.as_object()?.get(value_key).and_then(parse_number).map(round)
}
