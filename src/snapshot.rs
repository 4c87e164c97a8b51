use std::{
    collections::BTreeMap,
    io::{BufRead, Read},
};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::prelude::*;

/// One refresh of the Solar Cube coordinators.
#[must_use]
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the values were fetched, defaults to the time of ingestion.
    #[serde(default)]
    pub timestamp: Option<DateTime<Local>>,

    /// Latest scalar values by source key, as loosely typed as the backend returns them.
    #[serde(default)]
    pub data: BTreeMap<String, Value>,

    /// Forecast series, one object per step.
    #[serde(default)]
    pub forecast: Vec<Value>,

    /// Optimal action series, one object per step.
    #[serde(default)]
    pub optimal_actions: Vec<Value>,
}

impl Snapshot {
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        serde_json::from_reader(reader).context("failed to parse the snapshot")
    }

    /// Read newline-delimited snapshots, skipping blank lines.
    pub fn from_lines(reader: impl BufRead) -> Result<Vec<Self>> {
        reader
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.as_ref().is_ok_and(|line| line.trim().is_empty()))
            .map(|(index, line)| {
                let line = line.with_context(|| format!("failed to read line #{}", index + 1))?;
                serde_json::from_str(&line)
                    .with_context(|| format!("failed to parse the snapshot on line #{}", index + 1))
            })
            .collect()
    }

    /// Numeric value of the source key, if there is a valid one.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<f64> {
        self.data.get(key).and_then(parse_number)
    }
}

/// Interpret a loosely typed backend value as a finite number.
///
/// Numbers and numeric strings are accepted, anything else is no reading.
#[must_use]
pub fn parse_number(value: &Value) -> Option<f64> {
    let number: Option<f64> = match value {
        Value::Number(number) => number.as_f64(),
        Value::String(string) => string.trim().parse().ok(),
        _ => None,
    };
    number.filter(|number| number.is_finite())
}
