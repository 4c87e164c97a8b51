mod bank;
mod catalog;
mod derived;

pub use self::{
    bank::{MeterBank, Refresh},
    catalog::{Catalog, DeviceClass, MeterDefinition},
    derived::DerivedSensor,
};
use crate::core::unit::Unit;

/// Output of a single sensor in one refresh cycle.
#[must_use]
#[derive(Clone, Debug, PartialEq)]
pub struct Reading {
    pub key: String,
    pub name: String,
    pub unit: Option<Unit>,

    /// [`None`] when the sensor is unavailable this cycle.
    pub value: Option<f64>,
}
