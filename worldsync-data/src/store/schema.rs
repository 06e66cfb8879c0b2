//! SQLite schema for the country tables.

use rusqlite::{Connection, Error as SqliteError, OptionalExtension, Transaction};
use thiserror::Error;

/// Version recorded in `worldsync_schema_version`.
pub const SCHEMA_VERSION: i64 = 1;

/// Errors raised when initialising the schema.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// Enabling foreign keys failed.
    #[error("failed to enable SQLite foreign keys")]
    ForeignKeys {
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A migration statement failed.
    #[error("failed to execute migration step '{step}'")]
    Migration {
        /// Migration step label.
        step: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// The database was created by a different schema version.
    #[error("expected schema version {expected} but found {found}; apply migrations before retrying")]
    VersionMismatch {
        /// Version this build understands.
        expected: i64,
        /// Version recorded in the database.
        found: i64,
    },
}

/// Enable foreign keys, create the country tables and record the schema
/// version. Idempotent for databases already at [`SCHEMA_VERSION`].
///
/// # Errors
///
/// Returns [`SchemaError`] when a statement fails or the recorded version
/// differs.
///
/// # Examples
/// ```
/// use rusqlite::Connection;
/// use worldsync_data::store::initialise_schema;
///
/// let mut conn = Connection::open_in_memory().expect("create in-memory database");
/// initialise_schema(&mut conn).expect("create schema");
/// initialise_schema(&mut conn).expect("second run is a no-op");
/// ```
pub fn initialise_schema(connection: &mut Connection) -> Result<(), SchemaError> {
    connection
        .pragma_update(None, "foreign_keys", true)
        .map_err(|source| SchemaError::ForeignKeys { source })?;

    let transaction = connection
        .transaction()
        .map_err(|source| SchemaError::Migration {
            step: "begin schema transaction",
            source,
        })?;
    create_tables(&transaction)?;
    ensure_schema_version(&transaction)?;
    transaction
        .commit()
        .map_err(|source| SchemaError::Migration {
            step: "commit schema transaction",
            source,
        })
}

fn create_tables(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create countries",
        "CREATE TABLE IF NOT EXISTS countries (
            code TEXT PRIMARY KEY CHECK (length(code) = 2),
            name TEXT,
            population INTEGER CHECK (population IS NULL OR population >= 0),
            capital TEXT,
            longitude REAL,
            latitude REAL,
            languages TEXT NOT NULL DEFAULT '[]',
            timezones TEXT NOT NULL DEFAULT '[]',
            gini REAL,
            completeness REAL NOT NULL CHECK (completeness BETWEEN 0.0 AND 1.0),
            updated_at INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create demographics",
        "CREATE TABLE IF NOT EXISTS demographics (
            code TEXT PRIMARY KEY REFERENCES countries(code) ON DELETE CASCADE,
            urban_ratio REAL,
            life_expectancy REAL,
            birth_rate REAL,
            median_age REAL,
            gender_ratio REAL
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create economy",
        "CREATE TABLE IF NOT EXISTS economy (
            code TEXT PRIMARY KEY REFERENCES countries(code) ON DELETE CASCADE,
            gdp_per_capita REAL,
            gdp_growth REAL,
            internet_penetration REAL
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create education",
        "CREATE TABLE IF NOT EXISTS education (
            code TEXT PRIMARY KEY REFERENCES countries(code) ON DELETE CASCADE,
            literacy_rate REAL
        ) WITHOUT ROWID",
    )?;
    run_migration_step(
        transaction,
        "create country_geojson",
        "CREATE TABLE IF NOT EXISTS country_geojson (
            code TEXT PRIMARY KEY REFERENCES countries(code) ON DELETE CASCADE,
            feature_type TEXT NOT NULL,
            geometry_type TEXT NOT NULL CHECK (geometry_type IN ('Polygon', 'MultiPolygon')),
            geojson TEXT NOT NULL
        ) WITHOUT ROWID",
    )
}

fn ensure_schema_version(transaction: &Transaction<'_>) -> Result<(), SchemaError> {
    run_migration_step(
        transaction,
        "create schema version table",
        "CREATE TABLE IF NOT EXISTS worldsync_schema_version (
            version INTEGER PRIMARY KEY CHECK (version > 0),
            applied_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%SZ', 'now'))
        ) WITHOUT ROWID",
    )?;

    let existing: Option<i64> = transaction
        .query_row(
            "SELECT version FROM worldsync_schema_version LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()
        .map_err(|source| SchemaError::Migration {
            step: "read schema version",
            source,
        })?;

    match existing {
        Some(version) if version == SCHEMA_VERSION => Ok(()),
        Some(found) => Err(SchemaError::VersionMismatch {
            expected: SCHEMA_VERSION,
            found,
        }),
        None => transaction
            .execute(
                "INSERT INTO worldsync_schema_version (version) VALUES (?1)",
                [SCHEMA_VERSION],
            )
            .map(|_| ())
            .map_err(|source| SchemaError::Migration {
                step: "record schema version",
                source,
            }),
    }
}

fn run_migration_step(
    transaction: &Transaction<'_>,
    step: &'static str,
    sql: &str,
) -> Result<(), SchemaError> {
    transaction
        .execute(sql, [])
        .map(|_| ())
        .map_err(|source| SchemaError::Migration { step, source })
}
