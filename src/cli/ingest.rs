use std::{
    fs::File,
    io::{self, BufReader},
    path::PathBuf,
};

use chrono::Local;
use clap::Parser;

use crate::{cli::MeterArgs, prelude::*, snapshot::Snapshot, tables::build_readings_table};

#[derive(Parser)]
pub struct IngestArgs {
    /// Snapshot JSON file, read from the standard input when omitted.
    #[clap(long)]
    snapshot: Option<PathBuf>,
}

impl IngestArgs {
    #[instrument(skip_all)]
    pub fn run(self, meters: &MeterArgs) -> Result {
        let snapshot = match &self.snapshot {
            Some(path) => {
                let file = File::open(path)
                    .with_context(|| format!("failed to open `{}`", path.display()))?;
                Snapshot::from_reader(BufReader::new(file))?
            }
            None => Snapshot::from_reader(io::stdin().lock())?,
        };
        let at = snapshot.timestamp.unwrap_or_else(Local::now);
        info!(%at, n_values = snapshot.data.len(), "ingesting…");

        let mut bank = meters.open_bank()?;
        let refresh = bank.refresh(&snapshot, &at);
        println!("{}", build_readings_table(&refresh, meters.currency()));
        Ok(())
    }
}
