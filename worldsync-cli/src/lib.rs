//! Command-line interface for worldsync.
//!
//! Every command prints one JSON envelope to stdout. Logs go to stderr.
#![forbid(unsafe_code)]

use std::io::{self, Write};

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod error;
mod output;
mod query;
mod sync;

pub use error::CliError;

use query::{DeleteArgs, RandomArgs, ShowArgs};
use sync::{FetchBuilder, HttpFetchBuilder, SyncAllArgs, SyncOneArgs};

const ARG_BATCH_SIZE: &str = "batch-size";
const ARG_CACHE_DIR: &str = "cache-dir";
const ARG_CODE: &str = "code";
const ARG_DATABASE: &str = "database";
const ARG_RESOLUTION: &str = "resolution";
const ARG_SEED: &str = "seed";
const ENV_SYNC_ONE_CODE: &str = "WORLDSYNC_CMDS_SYNC_ONE_CODE";
const ENV_SHOW_CODE: &str = "WORLDSYNC_CMDS_SHOW_CODE";
const ENV_DELETE_CODE: &str = "WORLDSYNC_CMDS_DELETE_CODE";

/// Database used when `--database` is not set.
pub const DEFAULT_DATABASE: &str = "worldsync.db";

/// Run the CLI with the current process arguments and environment.
///
/// Returns whether the printed envelope reports success.
///
/// # Errors
///
/// Returns [`CliError`] when arguments, configuration or logging are invalid,
/// or when the store or output cannot be used.
pub fn run() -> Result<bool, CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    init_logging(cli.log_level)?;
    let mut stdout = io::stdout().lock();
    dispatch(cli.command, &HttpFetchBuilder, &mut stdout)
}

fn init_logging(level: LevelFilter) -> Result<(), CliError> {
    tracing_subscriber::registry()
        .with(level)
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init()
        .map_err(CliError::Logging)
}

pub(crate) fn dispatch(
    command: Command,
    fetch: &dyn FetchBuilder,
    writer: &mut dyn Write,
) -> Result<bool, CliError> {
    match command {
        Command::SyncAll(args) => sync::run_sync_all_with(args, fetch, writer),
        Command::SyncOne(args) => sync::run_sync_one_with(args, fetch, writer),
        Command::Show(args) => query::run_show(args, writer),
        Command::Random(args) => query::run_random(args, writer),
        Command::Delete(args) => query::run_delete(args, writer),
    }
}

#[derive(Debug, Parser)]
#[command(
    name = "worldsync",
    about = "Synchronise and query per-country reference data",
    version
)]
pub(crate) struct Cli {
    /// Most verbose log level written to stderr.
    #[arg(long, global = true, default_value = "info", value_name = "level")]
    pub(crate) log_level: LevelFilter,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Command {
    /// Synchronise every country the upstreams know about.
    SyncAll(SyncAllArgs),
    /// Synchronise a single country.
    SyncOne(SyncOneArgs),
    /// Print everything stored for a country.
    Show(ShowArgs),
    /// Print a stored country drawn by expected births.
    Random(RandomArgs),
    /// Delete a country and its dependent records.
    Delete(DeleteArgs),
}

#[cfg(test)]
mod tests;
