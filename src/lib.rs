//! Spreadsheet tables in, nested Lua and JSON documents out.
//!
//! Header cells such as `loot_A_1_T_item` describe where each column's value
//! lands in a per-row tree. [`header`] classifies the cells, [`schema`] groups
//! them per field, [`transcode`] builds one tree per row, [`assemble`] turns
//! the rows into a sequence or a keyed mapping, and [`adapters`] move tables
//! between files and memory. [`flatten`] goes the other way.

pub mod adapters;
pub mod assemble;
pub mod cli;
pub mod convert;
pub mod error;
pub mod flatten;
pub mod header;
pub mod inspect;
pub mod io_utils;
pub mod schema;
pub mod table;
pub mod transcode;
pub mod tree;

use std::{env, sync::OnceLock};

use anyhow::Result;
use clap::Parser;
use log::LevelFilter;

pub use adapters::{AdapterOptions, Format, Table, TableAdapter};
pub use assemble::{Rows, TableResult, assemble, parse_table};
pub use error::{AdapterError, Error};
pub use flatten::flatten;
pub use header::{ColumnDescriptor, ColumnKind, classify};
pub use schema::TableSchema;
pub use tree::{Node, PathSegment, Scalar, ScalarFormat};

use crate::cli::{Cli, Commands};

static LOGGER: OnceLock<()> = OnceLock::new();

fn init_logging() {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            builder.filter_module("tabtree", LevelFilter::Info);
        }
        let _ = builder.format_timestamp_millis().try_init();
    });
}

pub fn run() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.command {
        Commands::Convert(args) => convert::execute(&args),
        Commands::Inspect(args) => inspect::execute(&args),
    }
}
