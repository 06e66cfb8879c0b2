//! Error types emitted by the worldsync CLI.
//!
//! Upstream, lookup and sync failures are reported inside the printed
//! envelope; these errors cover what prevents a command from producing one.

use std::sync::Arc;

use camino::Utf8PathBuf;
use thiserror::Error;
use worldsync_data::StoreError;
use worldsync_data::http::ClientBuildError;

/// Errors emitted by the worldsync CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (pass <{field}> or set {env})")]
    MissingArgument {
        field: &'static str,
        env: &'static str,
    },
    /// A global logger was already installed.
    #[error("failed to initialise logging: {0}")]
    Logging(#[source] tracing_subscriber::util::TryInitError),
    /// Constructing the HTTP client failed.
    #[error(transparent)]
    BuildHttpClient(#[from] ClientBuildError),
    /// Opening the country database failed.
    #[error("failed to open country database at {path:?}: {source}")]
    OpenStore {
        path: Utf8PathBuf,
        #[source]
        source: StoreError,
    },
    /// A store operation outside the query service failed.
    #[error("country store failure: {0}")]
    Store(#[source] StoreError),
    /// Serialising the output envelope failed.
    #[error("failed to serialise output: {0}")]
    SerialiseOutput(#[source] serde_json::Error),
    /// Writing the output envelope failed.
    #[error("failed to write output: {0}")]
    WriteOutput(#[source] std::io::Error),
}
