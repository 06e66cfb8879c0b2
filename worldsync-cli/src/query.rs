//! `show`, `random` and `delete` commands.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use worldsync_core::{CountryCode, CountryStore, ErrorBody};
use worldsync_data::{CountryService, QueryError, SqliteCountryStore, StoreError};

use crate::output::{self, INVALID_CODE, NO_ELIGIBLE_COUNTRIES, NOT_FOUND, STORE_ERROR};
use crate::{
    ARG_CODE, ARG_DATABASE, ARG_SEED, CliError, DEFAULT_DATABASE, ENV_DELETE_CODE, ENV_SHOW_CODE,
};

/// CLI arguments for the `show` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(name = "show", about = "Print everything stored for a country")]
#[ortho_config(prefix = "WORLDSYNC")]
pub(crate) struct ShowArgs {
    /// Two-letter country code, e.g. `FR`.
    #[arg(value_name = "code")]
    #[serde(default)]
    pub(crate) code: Option<String>,
    /// SQLite database to read from.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
}

/// CLI arguments for the `random` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "random",
    about = "Print a stored country drawn by expected annual births"
)]
#[ortho_config(prefix = "WORLDSYNC")]
pub(crate) struct RandomArgs {
    /// SQLite database to read from.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Seed for a reproducible draw.
    #[arg(long = ARG_SEED, value_name = "seed")]
    #[serde(default)]
    pub(crate) seed: Option<u64>,
}

/// CLI arguments for the `delete` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "delete",
    about = "Delete a country together with its dependent records"
)]
#[ortho_config(prefix = "WORLDSYNC")]
pub(crate) struct DeleteArgs {
    /// Two-letter country code, e.g. `FR`.
    #[arg(value_name = "code")]
    #[serde(default)]
    pub(crate) code: Option<String>,
    /// SQLite database to modify.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
}

/// Resolved configuration of a command addressing one country.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LookupConfig {
    pub(crate) code: String,
    pub(crate) database: Utf8PathBuf,
}

impl LookupConfig {
    fn resolve(
        code: Option<String>,
        database: Option<Utf8PathBuf>,
        env: &'static str,
    ) -> Result<Self, CliError> {
        let code = code.ok_or(CliError::MissingArgument {
            field: ARG_CODE,
            env,
        })?;
        Ok(Self {
            code,
            database: database_or_default(database),
        })
    }
}

impl TryFrom<ShowArgs> for LookupConfig {
    type Error = CliError;

    fn try_from(args: ShowArgs) -> Result<Self, Self::Error> {
        Self::resolve(args.code, args.database, ENV_SHOW_CODE)
    }
}

impl TryFrom<DeleteArgs> for LookupConfig {
    type Error = CliError;

    fn try_from(args: DeleteArgs) -> Result<Self, Self::Error> {
        Self::resolve(args.code, args.database, ENV_DELETE_CODE)
    }
}

fn database_or_default(database: Option<Utf8PathBuf>) -> Utf8PathBuf {
    database.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE))
}

fn open_store(path: &Utf8Path) -> Result<SqliteCountryStore, CliError> {
    SqliteCountryStore::open(path).map_err(|source| CliError::OpenStore {
        path: path.to_path_buf(),
        source,
    })
}

/// Payload printed by `delete`.
#[derive(Debug, Serialize)]
struct Deletion {
    code: CountryCode,
    deleted: bool,
}

pub(crate) fn run_show(args: ShowArgs, writer: &mut dyn Write) -> Result<bool, CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = LookupConfig::try_from(merged)?;
    let store = open_store(&config.database)?;
    match CountryService::new(&store).get_country(&config.code) {
        Ok(view) => output::success(writer, view),
        Err(err) => output::failure(writer, query_error_body(&err)),
    }
}

pub(crate) fn run_random(args: RandomArgs, writer: &mut dyn Write) -> Result<bool, CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let store = open_store(&database_or_default(merged.database))?;
    let mut rng = merged
        .seed
        .map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64);
    match CountryService::new(&store).random_weighted_country(&mut rng) {
        Ok(view) => output::success(writer, view),
        Err(err) => output::failure(writer, query_error_body(&err)),
    }
}

pub(crate) fn run_delete(args: DeleteArgs, writer: &mut dyn Write) -> Result<bool, CliError> {
    let merged = args.load_and_merge().map_err(CliError::Configuration)?;
    let config = LookupConfig::try_from(merged)?;
    let code = match CountryCode::parse(&config.code) {
        Ok(code) => code,
        Err(err) => {
            return output::failure(
                writer,
                ErrorBody::new(INVALID_CODE, "Invalid country code", err.to_string()),
            );
        }
    };
    let store = open_store(&config.database)?;
    let deleted = store.delete_country(&code).map_err(CliError::Store)?;
    if !deleted {
        return output::failure(
            writer,
            ErrorBody::new(
                NOT_FOUND,
                "Country not found",
                format!("no country stored under {code}"),
            ),
        );
    }
    output::success(writer, Deletion { code, deleted })
}

fn query_error_body(err: &QueryError<StoreError>) -> ErrorBody {
    let details = err.to_string();
    match err {
        QueryError::InvalidCode(_) => ErrorBody::new(INVALID_CODE, "Invalid country code", details),
        QueryError::NotFound { .. } => ErrorBody::new(NOT_FOUND, "Country not found", details),
        QueryError::NoEligibleCountries(_) => ErrorBody::new(
            NO_ELIGIBLE_COUNTRIES,
            "No country has a positive selection weight",
            details,
        ),
        QueryError::Store(source) => {
            ErrorBody::new(STORE_ERROR, "Failed to read country data", source.to_string())
        }
        _ => ErrorBody::new(STORE_ERROR, "Query failed", details),
    }
}
