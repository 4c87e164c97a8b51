quantity!(
    /// Energy price per kilowatt-hour in the configured currency.
    KilowattHourRate,
    "¤/kWh"
);
