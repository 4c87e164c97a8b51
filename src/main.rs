#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod cli;
mod core;
mod meter;
mod prelude;
mod quantity;
mod snapshot;
mod store;
mod tables;

use clap::{Parser, crate_version};

use crate::{
    cli::{Args, Command},
    prelude::*,
    tables::{build_catalog_table, build_states_table},
};

fn main() -> Result {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().with_writer(std::io::stderr).init();
    info!(version = crate_version!(), "starting…");

    let args = Args::parse();
    match args.command {
        Command::Ingest(command_args) => command_args.run(&args.meters)?,
        Command::Replay(command_args) => command_args.run(&args.meters)?,
        Command::State => {
            let bank = args.meters.open_bank()?;
            println!("{}", build_states_table(bank.meters()));
        }
        Command::Catalog => {
            let catalog = args.meters.catalog()?;
            println!("{}", build_catalog_table(catalog.iter(), args.meters.currency()));
        }
    }

    info!("done!");
    Ok(())
}
