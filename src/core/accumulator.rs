use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};
use serde_with::{DefaultOnError, DisplayFromStr, PickFirst, serde_as};

use crate::{
    core::{
        period::{Period, PeriodKey},
        round,
        unit::Conversion,
    },
    prelude::*,
};

/// Accumulator state that survives restarts.
///
/// The field names match the attributes the meters have always been persisted under, so that
/// existing state keeps being picked up.
#[must_use]
#[serde_as]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MeterState {
    /// Start of the current accounting period.
    #[serde(rename = "_period_key", default)]
    #[serde_as(deserialize_as = "DefaultOnError")]
    pub period_key: Option<PeriodKey>,

    /// Source counter value at the start of the current period, or after the last counter reset.
    #[serde(rename = "_baseline", default)]
    #[serde_as(deserialize_as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub baseline: Option<f64>,

    /// Most recently observed source counter value.
    #[serde(rename = "_last_total", default)]
    #[serde_as(deserialize_as = "DefaultOnError<Option<PickFirst<(_, DisplayFromStr)>>>")]
    pub last_total: Option<f64>,
}

impl MeterState {
    /// Restore the state from previously persisted attributes.
    ///
    /// Every field is validated on its own: numbers must be finite (numeric strings are accepted),
    /// and the period key must be a non-empty string. Whatever does not pass is dropped,
    /// and anything that is not an attribute object restores to the empty state.
    pub fn restore(attributes: serde_json::Value) -> Self {
        match serde_json::from_value::<Self>(attributes) {
            Ok(state) => Self {
                period_key: state.period_key.filter(|period_key| !period_key.is_empty()),
                baseline: state.baseline.filter(|baseline| baseline.is_finite()),
                last_total: state.last_total.filter(|last_total| last_total.is_finite()),
            },
            Err(error) => {
                warn!(%error, "discarding malformed meter state");
                Self::default()
            }
        }
    }
}

/// Turns a monotonically increasing counter into the delta within the current period.
#[must_use]
#[derive(Clone, Debug)]
pub struct PeriodAccumulator {
    period: Period,
    conversion: Conversion,
    state: MeterState,
}

impl PeriodAccumulator {
    pub const fn new(period: Period, conversion: Conversion, state: MeterState) -> Self {
        Self { period, conversion, state }
    }

    pub const fn state(&self) -> &MeterState {
        &self.state
    }

    /// Observe the source counter at the specified wall-clock time.
    ///
    /// Returns [`None`] when there is no valid reading, in which case the state is left untouched.
    pub fn observe<Tz: TimeZone>(&mut self, total: Option<f64>, at: &DateTime<Tz>) -> Option<f64> {
        self.observe_in(total, self.period.key_of(at))
    }

    /// Observe the source counter within the specified period instance.
    pub fn observe_in(&mut self, total: Option<f64>, current_key: PeriodKey) -> Option<f64> {
        let Some(total) = total.filter(|total| total.is_finite()) else {
            debug!(period = %self.period, "no reading");
            return None;
        };

        let baseline = match self.state.baseline {
            Some(baseline) if self.state.period_key.as_ref() == Some(&current_key) => baseline,
            _ => {
                info!(period = %self.period, period_key = %current_key, total, "new period");
                self.state = MeterState {
                    period_key: Some(current_key),
                    baseline: Some(total),
                    last_total: Some(total),
                };
                return Some(0.0);
            }
        };

        let baseline = match self.state.last_total {
            Some(last_total) if total < last_total => {
                info!(period = %self.period, last_total, total, "counter reset, re-baselining");
                total
            }
            _ => baseline,
        };
        self.state.baseline = Some(baseline);
        self.state.last_total = Some(total);

        let delta = self.conversion.apply(total - baseline);
        Some(if delta > 0.0 { round(delta) } else { 0.0 })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDate, Utc};
    use chrono_tz::Europe::Amsterdam;
    use serde_json::json;

    use super::*;
    use crate::core::unit::Unit;

    fn kilowatt_hours(period: Period) -> PeriodAccumulator {
        let conversion = Conversion::between(Unit::WattHours, Unit::KilowattHours).unwrap();
        PeriodAccumulator::new(period, conversion, MeterState::default())
    }

    fn at(day: u32, hour: u32, minute: u32) -> DateTime<FixedOffset> {
        NaiveDate::from_ymd_opt(2025, 6, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
            .and_local_timezone(FixedOffset::east_opt(2 * 3600).unwrap())
            .unwrap()
    }

    #[test]
    fn counter_reset_is_rebaselined() {
        let mut accumulator = kilowatt_hours(Period::Daily);
        let deltas: Vec<_> = [100.0, 150.0, 40.0, 90.0]
            .into_iter()
            .zip(0..)
            .map(|(total, minute)| accumulator.observe(Some(total), &at(3, 10, minute)))
            .collect();
        assert_eq!(deltas, [Some(0.0), Some(0.05), Some(0.0), Some(0.05)]);
        assert_eq!(accumulator.state().baseline, Some(40.0));
        assert_eq!(accumulator.state().last_total, Some(90.0));
    }

    #[test]
    fn rollover_emits_zero_and_rebaselines() {
        let mut accumulator = kilowatt_hours(Period::Hourly);
        assert_eq!(accumulator.observe(Some(1000.0), &at(3, 10, 0)), Some(0.0));
        assert_eq!(accumulator.observe(Some(1500.0), &at(3, 10, 59)), Some(0.5));

        // The counter kept growing, the boundary alone triggers the rollover:
        assert_eq!(accumulator.observe(Some(1600.0), &at(3, 11, 0)), Some(0.0));
        assert_eq!(accumulator.state().baseline, Some(1600.0));
        assert_eq!(accumulator.state().last_total, Some(1600.0));
        assert_eq!(
            accumulator.state().period_key.as_ref().map(PeriodKey::as_str),
            Some("2025-06-03T11:00:00+02:00"),
        );
        assert_eq!(accumulator.observe(Some(1700.0), &at(3, 11, 5)), Some(0.1));
    }

    #[test]
    fn repeated_hour_at_fall_back_rolls_over() {
        // 02:30 CEST and 02:30 CET on 2025-10-26 are different hours.
        let first = Utc.with_ymd_and_hms(2025, 10, 26, 0, 30, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2025, 10, 26, 1, 30, 0).unwrap();
        let (first, second) = (first.with_timezone(&Amsterdam), second.with_timezone(&Amsterdam));

        let mut accumulator = kilowatt_hours(Period::Hourly);
        assert_eq!(accumulator.observe(Some(1000.0), &first), Some(0.0));
        assert_eq!(accumulator.observe(Some(3000.0), &second), Some(0.0));
        assert_eq!(accumulator.state().baseline, Some(3000.0));
    }

    #[test]
    fn rollover_takes_priority_over_reset() {
        let mut accumulator = kilowatt_hours(Period::Daily);
        accumulator.observe(Some(5000.0), &at(3, 23, 0));
        assert_eq!(accumulator.observe(Some(10.0), &at(4, 0, 5)), Some(0.0));
        assert_eq!(accumulator.state().baseline, Some(10.0));
    }

    #[test]
    fn unchanged_total_is_idempotent() {
        let mut accumulator = kilowatt_hours(Period::Daily);
        accumulator.observe(Some(100.0), &at(3, 8, 0));
        let first = accumulator.observe(Some(1334.0), &at(3, 9, 0));
        let state = accumulator.state().clone();
        let second = accumulator.observe(Some(1334.0), &at(3, 9, 1));
        assert_eq!(first, Some(1.234));
        assert_eq!(second, first);
        assert_eq!(accumulator.state(), &state);
    }

    #[test]
    fn missing_reading_leaves_state_untouched() {
        let mut accumulator = kilowatt_hours(Period::Daily);
        accumulator.observe(Some(100.0), &at(3, 8, 0));
        let state = accumulator.state().clone();
        assert_eq!(accumulator.observe(None, &at(4, 8, 0)), None);
        assert_eq!(accumulator.observe(Some(f64::NAN), &at(4, 8, 0)), None);
        assert_eq!(accumulator.observe(Some(f64::INFINITY), &at(4, 8, 0)), None);
        assert_eq!(accumulator.state(), &state);
    }

    #[test]
    fn missing_reading_on_cold_start_keeps_state_empty() {
        let mut accumulator = kilowatt_hours(Period::Daily);
        assert_eq!(accumulator.observe(None, &at(3, 8, 0)), None);
        assert_eq!(accumulator.state(), &MeterState::default());
    }

    #[test]
    fn zero_baseline_counts_from_zero() {
        let mut accumulator = kilowatt_hours(Period::Daily);
        assert_eq!(accumulator.observe(Some(0.0), &at(3, 0, 0)), Some(0.0));
        assert_eq!(accumulator.observe(Some(2500.0), &at(3, 1, 0)), Some(2.5));
    }

    #[test]
    fn currency_passes_through() {
        let mut accumulator =
            PeriodAccumulator::new(Period::Monthly, Conversion::IDENTITY, MeterState::default());
        accumulator.observe(Some(10.5), &at(1, 0, 0));
        assert_eq!(accumulator.observe(Some(12.75), &at(30, 23, 59)), Some(2.25));
    }

    #[test]
    fn delta_is_never_negative() {
        let mut accumulator = kilowatt_hours(Period::Hourly);
        let mut total = 1000.0_f64;
        for step in 0..500_u32 {
            // Grow most of the time, with an occasional reset or a tiny backwards jitter:
            total = match step % 37 {
                0 => 0.0,
                13 => total - 0.000_001,
                _ => total + f64::from(step % 7) * 1.3,
            };
            let at = at(3 + step / 120, (step / 5) % 24, step % 60);
            let delta = accumulator.observe(Some(total), &at);
            assert!(delta.is_some_and(|delta| delta >= 0.0), "step {step}: {delta:?}");
        }
    }

    #[test]
    fn restore_round_trip_ok() -> Result {
        let mut original = kilowatt_hours(Period::Weekly);
        original.observe(Some(100.0), &at(2, 12, 0));
        original.observe(Some(350.0), &at(3, 12, 0));
        let attributes = serde_json::to_value(original.state())?;

        let mut restored = kilowatt_hours(Period::Weekly);
        restored.state = MeterState::restore(attributes);
        assert_eq!(restored.state(), original.state());
        assert_eq!(
            restored.observe(Some(900.0), &at(4, 12, 0)),
            original.observe(Some(900.0), &at(4, 12, 0)),
        );
        Ok(())
    }

    #[test]
    fn persisted_attribute_names_ok() -> Result {
        let state = MeterState {
            period_key: Some(Period::Daily.key_of(&at(3, 12, 0))),
            baseline: Some(100.0),
            last_total: Some(150.0),
        };
        assert_eq!(
            serde_json::to_value(&state)?,
            json!({
                "_period_key": "2025-06-03T00:00:00+02:00",
                "_baseline": 100.0,
                "_last_total": 150.0,
            }),
        );
        Ok(())
    }

    #[test]
    fn restore_accepts_numeric_strings() {
        let state = MeterState::restore(json!({
            "_period_key": "2025-06-03T00:00:00+02:00",
            "_baseline": "100.5",
            "_last_total": 150,
        }));
        assert_eq!(state.baseline, Some(100.5));
        assert_eq!(state.last_total, Some(150.0));
    }

    #[test]
    fn restore_drops_invalid_fields() {
        let state = MeterState::restore(json!({
            "_period_key": "",
            "_baseline": "garbage",
            "_last_total": [1, 2, 3],
        }));
        assert_eq!(state, MeterState::default());

        let state = MeterState::restore(json!({
            "_period_key": 42,
            "_baseline": "NaN",
            "_last_total": "inf",
        }));
        assert_eq!(state, MeterState::default());
    }

    #[test]
    fn restore_non_object_is_empty() {
        assert_eq!(MeterState::restore(json!(null)), MeterState::default());
        assert_eq!(MeterState::restore(json!("state")), MeterState::default());
    }

    #[test]
    fn partial_restore_forces_rollover() {
        let mut accumulator = kilowatt_hours(Period::Daily);
        accumulator.state = MeterState::restore(json!({
            "_period_key": "2025-06-03T00:00:00+02:00",
            "_baseline": null,
            "_last_total": 120.0,
        }));
        assert!(accumulator.state().period_key.is_some());
        assert_eq!(accumulator.observe(Some(900.0), &at(3, 12, 0)), Some(0.0));
        assert_eq!(accumulator.state().baseline, Some(900.0));
    }

    #[test]
    fn restore_without_last_total_continues_period() {
        let mut accumulator = kilowatt_hours(Period::Daily);
        accumulator.state = MeterState::restore(json!({
            "_period_key": "2025-06-03T00:00:00+02:00",
            "_baseline": 100.0,
        }));
        assert_eq!(accumulator.observe(Some(600.0), &at(3, 12, 0)), Some(0.5));
        assert_eq!(accumulator.state().last_total, Some(600.0));
    }
}
