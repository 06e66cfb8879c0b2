//! `sync-all` and `sync-one` commands.

use std::io::Write;
use std::sync::Arc;

use camino::Utf8PathBuf;
use clap::Parser;
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};
use worldsync_core::{BatchStatus, ErrorBody, SyncStatus};
use worldsync_data::geometry::DEFAULT_CACHE_DIR;
use worldsync_data::sources::{FactsSourceConfig, IndicatorSourceConfig};
use worldsync_data::{
    AdapterSet, Fetch, GeometryConfig, HttpClient, HttpClientConfig, Resolution,
    SqliteCountryStore, SyncConfig, SyncOrchestrator,
};

use crate::output::{self, SYNC_FAILED};
use crate::{
    ARG_BATCH_SIZE, ARG_CACHE_DIR, ARG_CODE, ARG_DATABASE, ARG_RESOLUTION, CliError,
    DEFAULT_DATABASE, ENV_SYNC_ONE_CODE,
};

/// CLI arguments for the `sync-all` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "sync-all",
    about = "Synchronise every country the upstreams know about",
    long_about = "Fetch the country universe from the facts upstream, then \
                 synchronise identity, indicators and boundaries for each \
                 country in batches. The run summary is printed as JSON."
)]
#[ortho_config(prefix = "WORLDSYNC")]
pub(crate) struct SyncAllArgs {
    /// SQLite database to write to.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Directory caching the boundary dataset.
    #[arg(long = ARG_CACHE_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) cache_dir: Option<Utf8PathBuf>,
    /// Boundary tier: 110m, 50m or 10m.
    #[arg(long = ARG_RESOLUTION, value_name = "tier")]
    #[serde(default)]
    pub(crate) resolution: Option<Resolution>,
    /// Countries per batch.
    #[arg(long = ARG_BATCH_SIZE, value_name = "count")]
    #[serde(default)]
    pub(crate) batch_size: Option<usize>,
}

impl SyncAllArgs {
    pub(crate) fn into_config(self) -> Result<SyncAllConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        Ok(SyncAllConfig::from(merged))
    }
}

/// CLI arguments for the `sync-one` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "sync-one",
    about = "Synchronise a single country",
    long_about = "Synchronise one country by ISO 3166-1 alpha-2 code. Each \
                 aspect is written independently; the report lists those \
                 that were updated and those that failed."
)]
#[ortho_config(prefix = "WORLDSYNC")]
pub(crate) struct SyncOneArgs {
    /// Two-letter country code, e.g. `FR`.
    #[arg(value_name = "code")]
    #[serde(default)]
    pub(crate) code: Option<String>,
    /// SQLite database to write to.
    #[arg(long = ARG_DATABASE, value_name = "path")]
    #[serde(default)]
    pub(crate) database: Option<Utf8PathBuf>,
    /// Directory caching the boundary dataset.
    #[arg(long = ARG_CACHE_DIR, value_name = "dir")]
    #[serde(default)]
    pub(crate) cache_dir: Option<Utf8PathBuf>,
    /// Boundary tier: 110m, 50m or 10m.
    #[arg(long = ARG_RESOLUTION, value_name = "tier")]
    #[serde(default)]
    pub(crate) resolution: Option<Resolution>,
}

impl SyncOneArgs {
    pub(crate) fn into_config(self) -> Result<SyncOneConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        SyncOneConfig::try_from(merged)
    }
}

/// Store and geometry settings shared by both sync commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyncTarget {
    pub(crate) database: Utf8PathBuf,
    pub(crate) geometry: GeometryConfig,
}

impl SyncTarget {
    fn resolve(
        database: Option<Utf8PathBuf>,
        cache_dir: Option<Utf8PathBuf>,
        resolution: Option<Resolution>,
    ) -> Self {
        let geometry = GeometryConfig::default()
            .with_cache_dir(cache_dir.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_CACHE_DIR)))
            .with_resolution(resolution.unwrap_or_default());
        Self {
            database: database.unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_DATABASE)),
            geometry,
        }
    }

    fn open_store(&self) -> Result<SqliteCountryStore, CliError> {
        SqliteCountryStore::open(&self.database).map_err(|source| CliError::OpenStore {
            path: self.database.clone(),
            source,
        })
    }

    fn adapters(&self, fetch: &Arc<dyn Fetch>) -> AdapterSet {
        AdapterSet::http(
            fetch,
            FactsSourceConfig::default(),
            IndicatorSourceConfig::default(),
            self.geometry.clone(),
        )
    }
}

/// Resolved `sync-all` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyncAllConfig {
    pub(crate) target: SyncTarget,
    pub(crate) sync: SyncConfig,
}

impl From<SyncAllArgs> for SyncAllConfig {
    fn from(args: SyncAllArgs) -> Self {
        let sync = args
            .batch_size
            .map_or_else(SyncConfig::default, |size| {
                SyncConfig::default().with_batch_size(size)
            });
        Self {
            target: SyncTarget::resolve(args.database, args.cache_dir, args.resolution),
            sync,
        }
    }
}

/// Resolved `sync-one` configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SyncOneConfig {
    pub(crate) code: String,
    pub(crate) target: SyncTarget,
}

impl TryFrom<SyncOneArgs> for SyncOneConfig {
    type Error = CliError;

    fn try_from(args: SyncOneArgs) -> Result<Self, Self::Error> {
        let code = args.code.ok_or(CliError::MissingArgument {
            field: ARG_CODE,
            env: ENV_SYNC_ONE_CODE,
        })?;
        Ok(Self {
            code,
            target: SyncTarget::resolve(args.database, args.cache_dir, args.resolution),
        })
    }
}

/// Builds the outbound client shared by every adapter of one run.
pub(crate) trait FetchBuilder {
    fn build(&self) -> Result<Arc<dyn Fetch>, CliError>;
}

pub(crate) struct HttpFetchBuilder;

impl FetchBuilder for HttpFetchBuilder {
    fn build(&self) -> Result<Arc<dyn Fetch>, CliError> {
        let client = HttpClient::with_config(&HttpClientConfig::default())?;
        Ok(Arc::new(client))
    }
}

pub(crate) fn run_sync_all_with(
    args: SyncAllArgs,
    fetch: &dyn FetchBuilder,
    writer: &mut dyn Write,
) -> Result<bool, CliError> {
    let config = args.into_config()?;
    let store = config.target.open_store()?;
    let adapters = config.target.adapters(&fetch.build()?);
    let result = SyncOrchestrator::new(adapters, &store)
        .with_config(config.sync)
        .sync_all();
    if result.status == BatchStatus::Error {
        let details = result.error.clone().unwrap_or_default();
        return output::partial_failure(
            writer,
            ErrorBody::new(SYNC_FAILED, "Bulk synchronisation failed", details),
            result,
        );
    }
    output::success(writer, result)
}

pub(crate) fn run_sync_one_with(
    args: SyncOneArgs,
    fetch: &dyn FetchBuilder,
    writer: &mut dyn Write,
) -> Result<bool, CliError> {
    let config = args.into_config()?;
    let store = config.target.open_store()?;
    let adapters = config.target.adapters(&fetch.build()?);
    let report = SyncOrchestrator::new(adapters, &store).sync_one(&config.code);
    match report.status {
        SyncStatus::Completed => output::success(writer, report),
        SyncStatus::Error => {
            let details = report.error.clone().unwrap_or_default();
            output::failure(
                writer,
                ErrorBody::new(
                    SYNC_FAILED,
                    format!("Failed to synchronise {}", report.code),
                    details,
                ),
            )
        }
    }
}
