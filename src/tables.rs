use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    core::accumulator::MeterState,
    meter::{MeterDefinition, Refresh},
};

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table
}

fn optional_number_cell(value: Option<f64>) -> Cell {
    value
        .map_or_else(|| Cell::new("n/a").fg(Color::DarkGrey), Cell::new)
        .set_alignment(CellAlignment::Right)
}

pub fn build_readings_table(refresh: &Refresh, currency: Option<&str>) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        Cell::new(refresh.at.format("%b %d %H:%M:%S")).add_attribute(Attribute::Bold),
        Cell::new("Name"),
        Cell::new("Value").set_alignment(CellAlignment::Right),
        Cell::new("Unit"),
    ]);
    for reading in &refresh.readings {
        table.add_row(vec![
            Cell::new(&reading.key),
            Cell::new(&reading.name).add_attribute(Attribute::Dim),
            optional_number_cell(reading.value).fg(match reading.value {
                Some(value) if value > 0.0 => Color::Green,
                Some(_) => Color::Reset,
                None => Color::DarkGrey,
            }),
            Cell::new(reading.unit.map_or("", |unit| unit.label(currency))),
        ]);
    }
    table
}

pub fn build_catalog_table<'a>(
    meters: impl IntoIterator<Item = &'a MeterDefinition>,
    currency: Option<&str>,
) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Key", "Name", "Source", "Period", "Unit", "Device class"]);
    for meter in meters {
        table.add_row(vec![
            Cell::new(&meter.key),
            Cell::new(&meter.name),
            Cell::new(format!("{} ({})", meter.source_key, meter.source_unit)),
            Cell::new(meter.period),
            Cell::new(meter.unit.label(currency)),
            Cell::new(
                meter.device_class(currency).map_or_else(String::new, |class| class.to_string()),
            )
            .add_attribute(Attribute::Dim),
        ]);
    }
    table
}

pub fn build_states_table<'a>(
    states: impl IntoIterator<Item = (&'a MeterDefinition, &'a MeterState)>,
) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        Cell::new("Key"),
        Cell::new("Period start"),
        Cell::new("Baseline").set_alignment(CellAlignment::Right),
        Cell::new("Last total").set_alignment(CellAlignment::Right),
    ]);
    for (meter, state) in states {
        table.add_row(vec![
            Cell::new(&meter.key),
            state
                .period_key
                .as_ref()
                .map_or_else(|| Cell::new("n/a").fg(Color::DarkGrey), Cell::new),
            optional_number_cell(state.baseline),
            optional_number_cell(state.last_total),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, TimeZone};

    use super::*;
    use crate::{
        core::unit::Unit,
        meter::{Catalog, Reading},
    };

    #[test]
    fn readings_table_ok() {
        let refresh = Refresh {
            at: FixedOffset::east_opt(3600)
                .unwrap()
                .with_ymd_and_hms(2025, 6, 3, 12, 0, 0)
                .unwrap(),
            readings: vec![
                Reading {
                    key: "daily_optimisation_savings".to_owned(),
                    name: "Daily Optimisation Savings".to_owned(),
                    unit: Some(Unit::Currency),
                    value: Some(1.25),
                },
                Reading {
                    key: "daily_pv_energy".to_owned(),
                    name: "Daily PV Energy".to_owned(),
                    unit: Some(Unit::KilowattHours),
                    value: None,
                },
            ],
        };
        let rendered = build_readings_table(&refresh, Some("PLN")).to_string();
        assert!(rendered.contains("daily_optimisation_savings"));
        assert!(rendered.contains("PLN"));
        assert!(rendered.contains("n/a"));
    }

    #[test]
    fn catalog_table_ok() {
        let catalog = Catalog::builtin();
        let rendered = build_catalog_table(catalog.iter(), None).to_string();
        assert!(rendered.contains("monthly_optimisation_savings"));
        assert!(rendered.contains("grid_buy_active_energy (Wh)"));
    }
}
