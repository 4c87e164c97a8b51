use serde::{Deserialize, Serialize};

use crate::{
    prelude::*,
    quantity::energy::{KilowattHours, WattHours},
};

/// Unit of a source counter or of a meter reading.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize, derive_more::Display)]
pub enum Unit {
    #[serde(rename = "Wh")]
    #[display("Wh")]
    WattHours,

    #[serde(rename = "kWh")]
    #[display("kWh")]
    KilowattHours,

    /// Whatever currency is configured, the counters carry no code of their own.
    #[serde(rename = "currency")]
    #[display("currency")]
    Currency,
}

impl Unit {
    pub const fn is_energy(self) -> bool {
        matches!(self, Self::WattHours | Self::KilowattHours)
    }

    /// Human-readable label, substituting the configured currency code.
    #[must_use]
    pub fn label(self, currency: Option<&str>) -> &str {
        match self {
            Self::WattHours => "Wh",
            Self::KilowattHours => "kWh",
            Self::Currency => currency.unwrap_or_default(),
        }
    }
}

/// Converts a counter delta from the source unit into the meter unit.
#[must_use]
#[derive(Copy, Clone, Debug)]
pub struct Conversion(fn(f64) -> f64);

impl Conversion {
    pub const IDENTITY: Self = Self(std::convert::identity);

    /// Look up the conversion by the unit pair.
    pub fn between(source: Unit, target: Unit) -> Result<Self> {
        match (source, target) {
            (Unit::WattHours, Unit::KilowattHours) => {
                Ok(Self(|value| KilowattHours::from(WattHours(value)).0))
            }
            (Unit::KilowattHours, Unit::WattHours) => {
                Ok(Self(|value| WattHours::from(KilowattHours(value)).0))
            }
            (source, target) if source == target => Ok(Self::IDENTITY),
            (source, target) => bail!("cannot convert `{source}` into `{target}`"),
        }
    }

    #[must_use]
    pub fn apply(self, value: f64) -> f64 {
        (self.0)(value)
    }
}
