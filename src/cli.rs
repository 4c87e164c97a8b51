mod ingest;
mod replay;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use self::{ingest::IngestArgs, replay::ReplayArgs};
use crate::{
    meter::{Catalog, MeterBank},
    prelude::*,
    store::JsonFileStore,
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[clap(flatten)]
    pub meters: MeterArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run one refresh cycle with a coordinator snapshot and print the readings.
    #[clap(name = "ingest")]
    Ingest(IngestArgs),

    /// Run recorded snapshots through the meters in chronological order.
    #[clap(name = "replay")]
    Replay(ReplayArgs),

    /// Print the persisted meter states.
    #[clap(name = "state")]
    State,

    /// Print the meter definitions.
    #[clap(name = "catalog")]
    Catalog,
}

#[derive(Parser)]
pub struct MeterArgs {
    /// Where the meter states are kept between runs.
    #[clap(
        long = "state-path",
        env = "SOLAR_CUBE_STATE_PATH",
        default_value = "solar-cube-state.json"
    )]
    pub state_path: PathBuf,

    /// Currency code of the monetary meters, for example `PLN`.
    #[clap(long, env = "SOLAR_CUBE_CURRENCY")]
    currency: Option<String>,

    /// TOML file with meter definitions to use instead of the built-in ones.
    #[clap(long = "catalog", env = "SOLAR_CUBE_CATALOG")]
    pub catalog_path: Option<PathBuf>,
}

impl MeterArgs {
    /// Configured currency code, blank codes count as none.
    #[must_use]
    pub fn currency(&self) -> Option<&str> {
        self.currency.as_deref().map(str::trim).filter(|currency| !currency.is_empty())
    }

    pub fn catalog(&self) -> Result<Catalog> {
        self.catalog_path.as_deref().map_or_else(|| Ok(Catalog::builtin()), Catalog::read_from)
    }

    pub fn open_bank(&self) -> Result<MeterBank<JsonFileStore>> {
        MeterBank::open(self.catalog()?, JsonFileStore::open(&self.state_path))
    }
}
