//! SQLite persistence gateway for country data.
//!
//! - [`schema`] materialises the tables and records the schema version.
//! - [`sqlite`] implements [`worldsync_core::CountryStore`] on top of them.

mod schema;
mod sqlite;

pub use schema::{SCHEMA_VERSION, SchemaError, initialise_schema};
pub use sqlite::{SqliteCountryStore, StoreError};
