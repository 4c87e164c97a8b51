use std::ops::Mul;

use crate::quantity::{cost::Cost, rate::KilowattHourRate};

quantity!(
    /// Raw counter unit of the Solar Cube backend.
    WattHours,
    "Wh"
);

impl WattHours {
    pub const ZERO: Self = Self(0.0);
}

quantity!(KilowattHours, "kWh");

impl From<WattHours> for KilowattHours {
    fn from(value: WattHours) -> Self {
        Self(value.0 / 1000.0)
    }
}

impl From<KilowattHours> for WattHours {
    fn from(value: KilowattHours) -> Self {
        Self(value.0 * 1000.0)
    }
}

impl Mul<KilowattHourRate> for KilowattHours {
    type Output = Cost;

    fn mul(self, rhs: KilowattHourRate) -> Self::Output {
        Cost(self.0 * rhs.0)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn watt_hours_to_kilowatt_hours_ok() {
        assert_abs_diff_eq!(KilowattHours::from(WattHours(1500.0)).0, 1.5);
        assert_abs_diff_eq!(WattHours::from(KilowattHours(0.25)).0, 250.0);
    }

    #[test]
    fn energy_cost_ok() {
        let cost = KilowattHours(2.5) * KilowattHourRate(0.8);
        assert_abs_diff_eq!(cost.0, 2.0);
    }

    #[test]
    fn ordering_ok() {
        assert!(WattHours(1.0) > WattHours::ZERO);
        assert_eq!(-KilowattHours(1.0), KilowattHours(-1.0));
    }
}
