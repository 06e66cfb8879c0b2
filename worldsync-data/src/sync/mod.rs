//! Orchestration of bulk and single-country synchronisation runs.
//!
//! A [`SyncOrchestrator`] owns one [`crate::sources::AdapterSet`] and writes
//! through a borrowed [`worldsync_core::CountryStore`]. Its entry points never
//! fail: every error is folded into the returned
//! [`worldsync_core::BatchResult`] or [`worldsync_core::SyncReport`].

mod config;
mod orchestrator;

pub use config::{DEFAULT_BATCH_SIZE, SyncConfig};
pub use orchestrator::SyncOrchestrator;

#[cfg(test)]
mod tests;
