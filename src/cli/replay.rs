use std::{fs::File, io::BufReader, path::PathBuf};

use chrono::{DateTime, Local};
use clap::Parser;

use crate::{
    cli::MeterArgs,
    meter::{MeterBank, Refresh},
    prelude::*,
    snapshot::Snapshot,
    store::{JsonFileStore, StateStore},
    tables::build_readings_table,
};

#[derive(Parser)]
pub struct ReplayArgs {
    /// Newline-delimited JSON snapshots, each with a timestamp.
    path: PathBuf,

    /// Start from the persisted states but do not save anything.
    #[clap(long)]
    dry_run: bool,
}

impl ReplayArgs {
    #[instrument(skip_all, fields(path = %self.path.display(), dry_run = self.dry_run))]
    pub fn run(self, meters: &MeterArgs) -> Result {
        let file = File::open(&self.path)
            .with_context(|| format!("failed to open `{}`", self.path.display()))?;
        let snapshots = Snapshot::from_lines(BufReader::new(file))?;
        let timestamps = timestamps_of(&snapshots)?;
        info!(n_snapshots = snapshots.len(), "replaying…");

        let catalog = meters.catalog()?;
        let store = JsonFileStore::open(&meters.state_path);
        let refresh = if self.dry_run {
            replay(MeterBank::open(catalog, store.into_memory())?, &snapshots, &timestamps)
        } else {
            replay(MeterBank::open(catalog, store)?, &snapshots, &timestamps)
        }
        .context("there are no snapshots to replay")?;
        println!("{}", build_readings_table(&refresh, meters.currency()));
        Ok(())
    }
}

/// Timestamps of the snapshots, which must be present and chronological.
fn timestamps_of(snapshots: &[Snapshot]) -> Result<Vec<DateTime<Local>>> {
    ensure!(!snapshots.is_empty(), "there are no snapshots to replay");
    let timestamps = snapshots
        .iter()
        .enumerate()
        .map(|(index, snapshot)| {
            snapshot.timestamp.with_context(|| format!("snapshot #{} has no timestamp", index + 1))
        })
        .collect::<Result<Vec<_>>>()?;
    ensure!(timestamps.is_sorted(), "snapshots must be in chronological order");
    Ok(timestamps)
}

/// Refresh the bank with every snapshot and return the last refresh.
fn replay<S: StateStore>(
    mut bank: MeterBank<S>,
    snapshots: &[Snapshot],
    timestamps: &[DateTime<Local>],
) -> Option<Refresh> {
    snapshots.iter().zip(timestamps).map(|(snapshot, at)| bank.refresh(snapshot, at)).last()
}
