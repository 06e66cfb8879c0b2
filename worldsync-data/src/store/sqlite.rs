//! `CountryStore` backed by a single SQLite connection.

use std::sync::{Mutex, MutexGuard};

use camino::{Utf8Path, Utf8PathBuf};
use log::debug;
use rusqlite::{Connection, Error as SqliteError, OptionalExtension, Transaction, params};
use thiserror::Error;
use worldsync_core::{
    CountryCode, CountryRecord, CountryStore, CountryView, DemographicRecord, EconomyRecord,
    EducationRecord, FeatureCollection, GeoJsonRecord, GeometryKind, SelectionCandidate,
};

use super::schema::{SchemaError, initialise_schema};

/// Errors raised by [`SqliteCountryStore`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StoreError {
    /// Failed to create the parent directory of the database file.
    #[error("failed to create parent directory for {path}")]
    CreateDirectory {
        /// Database path.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// Opening the database failed.
    #[error("failed to open SQLite database at {path}")]
    Open {
        /// Database path.
        path: Utf8PathBuf,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// Initialising the schema failed.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// A statement failed; the enclosing transaction was rolled back.
    #[error("failed to {operation}")]
    Sqlite {
        /// What was being attempted.
        operation: &'static str,
        /// Source error returned by `rusqlite`.
        #[source]
        source: SqliteError,
    },
    /// A value could not be serialised for storage.
    #[error("failed to encode {field} for {code}")]
    Encode {
        /// Country being written.
        code: CountryCode,
        /// Column being written.
        field: &'static str,
        /// Source error produced by `serde_json`.
        #[source]
        source: serde_json::Error,
    },
    /// A population does not fit SQLite's integer range.
    #[error("population {population} of {code} exceeds the SQLite integer range")]
    PopulationOutOfRange {
        /// Country being written.
        code: CountryCode,
        /// Offending value.
        population: u64,
    },
    /// A stored row could not be mapped back onto the domain model.
    #[error("stored row for {code} is corrupt: {reason}")]
    Corrupt {
        /// Key of the row.
        code: String,
        /// What was wrong.
        reason: String,
    },
    /// A thread panicked while holding the connection.
    #[error("SQLite connection lock poisoned")]
    Poisoned,
}

fn sqlite(operation: &'static str) -> impl FnOnce(SqliteError) -> StoreError {
    move |source| StoreError::Sqlite { operation, source }
}

/// Persistence gateway over one SQLite database.
///
/// Every write runs in its own transaction; a failed write rolls back only
/// that entity. The connection is shared behind a mutex, so the store can be
/// used from several threads.
#[derive(Debug)]
pub struct SqliteCountryStore {
    connection: Mutex<Connection>,
}

impl SqliteCountryStore {
    /// Open (creating if needed) the database at `path` and initialise the
    /// schema. Parent directories are created automatically.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the directory, database or schema cannot
    /// be prepared.
    pub fn open(path: &Utf8Path) -> Result<Self, StoreError> {
        worldsync_fs::ensure_parent_dir(path).map_err(|source| StoreError::CreateDirectory {
            path: path.to_path_buf(),
            source,
        })?;
        let connection =
            Connection::open(path.as_std_path()).map_err(|source| StoreError::Open {
                path: path.to_path_buf(),
                source,
            })?;
        debug!("opened country database at {path}");
        Self::from_connection(connection)
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when SQLite or the schema cannot be initialised.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let connection = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: Utf8PathBuf::from(":memory:"),
            source,
        })?;
        Self::from_connection(connection)
    }

    fn from_connection(mut connection: Connection) -> Result<Self, StoreError> {
        initialise_schema(&mut connection)?;
        Ok(Self {
            connection: Mutex::new(connection),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.connection.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Run `write` in a transaction, committing on success. Dropping the
    /// transaction on failure rolls it back.
    fn write<T>(
        &self,
        write: impl FnOnce(&Transaction<'_>) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let mut connection = self.lock()?;
        let transaction = connection
            .transaction()
            .map_err(sqlite("begin write transaction"))?;
        let value = write(&transaction)?;
        transaction
            .commit()
            .map_err(sqlite("commit write transaction"))?;
        Ok(value)
    }
}

fn encode_list(
    code: &CountryCode,
    field: &'static str,
    values: &[String],
) -> Result<String, StoreError> {
    serde_json::to_string(values).map_err(|source| StoreError::Encode {
        code: code.clone(),
        field,
        source,
    })
}

struct CountryRow {
    code: String,
    name: Option<String>,
    population: Option<i64>,
    capital: Option<String>,
    longitude: Option<f64>,
    latitude: Option<f64>,
    languages: String,
    timezones: String,
    gini: Option<f64>,
    completeness: f64,
}

impl CountryRow {
    const SELECT: &'static str = "SELECT code, name, population, capital, longitude, latitude,
            languages, timezones, gini, completeness
        FROM countries WHERE code = ?1";

    fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            code: row.get(0)?,
            name: row.get(1)?,
            population: row.get(2)?,
            capital: row.get(3)?,
            longitude: row.get(4)?,
            latitude: row.get(5)?,
            languages: row.get(6)?,
            timezones: row.get(7)?,
            gini: row.get(8)?,
            completeness: row.get(9)?,
        })
    }

    fn into_record(self) -> Result<CountryRecord, StoreError> {
        let corrupt = |reason: String| StoreError::Corrupt {
            code: self.code.clone(),
            reason,
        };
        let code = CountryCode::parse(&self.code).map_err(|err| corrupt(err.to_string()))?;
        let population = self
            .population
            .map(u64::try_from)
            .transpose()
            .map_err(|err| corrupt(format!("population: {err}")))?;
        let languages: Vec<String> = serde_json::from_str(&self.languages)
            .map_err(|err| corrupt(format!("languages: {err}")))?;
        let timezones: Vec<String> = serde_json::from_str(&self.timezones)
            .map_err(|err| corrupt(format!("timezones: {err}")))?;
        Ok(CountryRecord {
            code,
            name: self.name,
            population,
            capital: self.capital,
            longitude: self.longitude,
            latitude: self.latitude,
            languages,
            timezones,
            gini: self.gini,
            completeness: self.completeness,
        })
    }
}

fn load_geojson(
    connection: &Connection,
    code: &CountryCode,
) -> Result<Option<GeoJsonRecord>, StoreError> {
    let row: Option<(String, String, String)> = connection
        .query_row(
            "SELECT feature_type, geometry_type, geojson FROM country_geojson WHERE code = ?1",
            [code.as_str()],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .optional()
        .map_err(sqlite("load geojson"))?;
    let Some((feature_type, geometry_type, geojson)) = row else {
        return Ok(None);
    };
    let corrupt = |reason: String| StoreError::Corrupt {
        code: code.to_string(),
        reason,
    };
    let geometry_type = GeometryKind::from_name(&geometry_type)
        .ok_or_else(|| corrupt(format!("unknown geometry type {geometry_type}")))?;
    let collection: FeatureCollection =
        serde_json::from_str(&geojson).map_err(|err| corrupt(format!("geojson: {err}")))?;
    Ok(Some(GeoJsonRecord {
        feature_type,
        geometry_type,
        collection,
    }))
}

impl CountryStore for SqliteCountryStore {
    type Error = StoreError;

    fn upsert_country(&self, record: &CountryRecord) -> Result<(), Self::Error> {
        let code = &record.code;
        let population = record
            .population
            .map(|population| {
                i64::try_from(population).map_err(|_| StoreError::PopulationOutOfRange {
                    code: code.clone(),
                    population,
                })
            })
            .transpose()?;
        let languages = encode_list(code, "languages", &record.languages)?;
        let timezones = encode_list(code, "timezones", &record.timezones)?;
        self.write(|tx| {
            tx.prepare_cached(
                "INSERT INTO countries (code, name, population, capital, longitude, latitude,
                    languages, timezones, gini, completeness, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, strftime('%s', 'now'))
                ON CONFLICT(code) DO UPDATE SET
                    name = excluded.name,
                    population = excluded.population,
                    capital = excluded.capital,
                    longitude = excluded.longitude,
                    latitude = excluded.latitude,
                    languages = excluded.languages,
                    timezones = excluded.timezones,
                    gini = excluded.gini,
                    completeness = excluded.completeness,
                    updated_at = excluded.updated_at",
            )
            .and_then(|mut statement| {
                statement.execute(params![
                    code.as_str(),
                    record.name,
                    population,
                    record.capital,
                    record.longitude,
                    record.latitude,
                    languages,
                    timezones,
                    record.gini,
                    record.completeness,
                ])
            })
            .map(|_| ())
            .map_err(sqlite("upsert country"))
        })
    }

    fn upsert_demographics(
        &self,
        code: &CountryCode,
        record: &DemographicRecord,
    ) -> Result<(), Self::Error> {
        self.write(|tx| {
            tx.execute(
                "INSERT INTO demographics (code, urban_ratio, life_expectancy, birth_rate,
                    median_age, gender_ratio)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ON CONFLICT(code) DO UPDATE SET
                    urban_ratio = excluded.urban_ratio,
                    life_expectancy = excluded.life_expectancy,
                    birth_rate = excluded.birth_rate,
                    median_age = excluded.median_age,
                    gender_ratio = excluded.gender_ratio",
                params![
                    code.as_str(),
                    record.urban_ratio,
                    record.life_expectancy,
                    record.birth_rate,
                    record.median_age,
                    record.gender_ratio,
                ],
            )
            .map(|_| ())
            .map_err(sqlite("upsert demographics"))
        })
    }

    fn upsert_economy(
        &self,
        code: &CountryCode,
        record: &EconomyRecord,
    ) -> Result<(), Self::Error> {
        self.write(|tx| {
            tx.execute(
                "INSERT INTO economy (code, gdp_per_capita, gdp_growth, internet_penetration)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(code) DO UPDATE SET
                    gdp_per_capita = excluded.gdp_per_capita,
                    gdp_growth = excluded.gdp_growth,
                    internet_penetration = excluded.internet_penetration",
                params![
                    code.as_str(),
                    record.gdp_per_capita,
                    record.gdp_growth,
                    record.internet_penetration,
                ],
            )
            .map(|_| ())
            .map_err(sqlite("upsert economy"))
        })
    }

    fn upsert_education(
        &self,
        code: &CountryCode,
        record: &EducationRecord,
    ) -> Result<(), Self::Error> {
        self.write(|tx| {
            tx.execute(
                "INSERT INTO education (code, literacy_rate) VALUES (?1, ?2)
                ON CONFLICT(code) DO UPDATE SET literacy_rate = excluded.literacy_rate",
                params![code.as_str(), record.literacy_rate],
            )
            .map(|_| ())
            .map_err(sqlite("upsert education"))
        })
    }

    fn upsert_geojson(
        &self,
        code: &CountryCode,
        record: &GeoJsonRecord,
    ) -> Result<(), Self::Error> {
        let geojson =
            serde_json::to_string(&record.collection).map_err(|source| StoreError::Encode {
                code: code.clone(),
                field: "geojson",
                source,
            })?;
        self.write(|tx| {
            tx.execute(
                "INSERT INTO country_geojson (code, feature_type, geometry_type, geojson)
                VALUES (?1, ?2, ?3, ?4)
                ON CONFLICT(code) DO UPDATE SET
                    feature_type = excluded.feature_type,
                    geometry_type = excluded.geometry_type,
                    geojson = excluded.geojson",
                params![
                    code.as_str(),
                    record.feature_type,
                    record.geometry_type.as_str(),
                    geojson,
                ],
            )
            .map(|_| ())
            .map_err(sqlite("upsert geojson"))
        })
    }

    fn delete_country(&self, code: &CountryCode) -> Result<bool, Self::Error> {
        self.write(|tx| {
            for (operation, sql) in [
                ("delete geojson", "DELETE FROM country_geojson WHERE code = ?1"),
                ("delete education", "DELETE FROM education WHERE code = ?1"),
                ("delete economy", "DELETE FROM economy WHERE code = ?1"),
                ("delete demographics", "DELETE FROM demographics WHERE code = ?1"),
            ] {
                tx.execute(sql, [code.as_str()]).map_err(sqlite(operation))?;
            }
            let removed = tx
                .execute("DELETE FROM countries WHERE code = ?1", [code.as_str()])
                .map_err(sqlite("delete country"))?;
            Ok(removed > 0)
        })
    }

    fn get_country(&self, code: &CountryCode) -> Result<Option<CountryView>, Self::Error> {
        let connection = self.lock()?;
        let row = connection
            .query_row(CountryRow::SELECT, [code.as_str()], CountryRow::from_row)
            .optional()
            .map_err(sqlite("load country"))?;
        let Some(row) = row else {
            return Ok(None);
        };
        let mut view = CountryView::new(row.into_record()?);

        view.demographics = connection
            .query_row(
                "SELECT urban_ratio, life_expectancy, birth_rate, median_age, gender_ratio
                FROM demographics WHERE code = ?1",
                [code.as_str()],
                |row| {
                    Ok(DemographicRecord {
                        urban_ratio: row.get(0)?,
                        life_expectancy: row.get(1)?,
                        birth_rate: row.get(2)?,
                        median_age: row.get(3)?,
                        gender_ratio: row.get(4)?,
                    })
                },
            )
            .optional()
            .map_err(sqlite("load demographics"))?;
        view.economy = connection
            .query_row(
                "SELECT gdp_per_capita, gdp_growth, internet_penetration
                FROM economy WHERE code = ?1",
                [code.as_str()],
                |row| {
                    Ok(EconomyRecord {
                        gdp_per_capita: row.get(0)?,
                        gdp_growth: row.get(1)?,
                        internet_penetration: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(sqlite("load economy"))?;
        view.education = connection
            .query_row(
                "SELECT literacy_rate FROM education WHERE code = ?1",
                [code.as_str()],
                |row| {
                    Ok(EducationRecord {
                        literacy_rate: row.get(0)?,
                    })
                },
            )
            .optional()
            .map_err(sqlite("load education"))?;
        view.geojson = load_geojson(&connection, code)?;
        Ok(Some(view))
    }

    fn selection_candidates(&self) -> Result<Vec<SelectionCandidate>, Self::Error> {
        let connection = self.lock()?;
        let mut statement = connection
            .prepare_cached(
                "SELECT c.code, c.population, d.birth_rate
                FROM countries AS c
                LEFT JOIN demographics AS d ON d.code = c.code
                WHERE c.population IS NOT NULL
                ORDER BY c.code",
            )
            .map_err(sqlite("prepare selection query"))?;
        let rows = statement
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, i64>(1)?,
                    row.get::<_, Option<f64>>(2)?,
                ))
            })
            .map_err(sqlite("query selection candidates"))?;

        let mut candidates = Vec::new();
        for row in rows {
            let (raw_code, population, birth_rate) =
                row.map_err(sqlite("read selection candidate"))?;
            let corrupt = |reason: String| StoreError::Corrupt {
                code: raw_code.clone(),
                reason,
            };
            let code = CountryCode::parse(&raw_code).map_err(|err| corrupt(err.to_string()))?;
            let population =
                u64::try_from(population).map_err(|err| corrupt(format!("population: {err}")))?;
            candidates.push(SelectionCandidate {
                code,
                population,
                birth_rate,
            });
        }
        Ok(candidates)
    }

    fn country_count(&self) -> Result<usize, Self::Error> {
        let count: i64 = self
            .lock()?
            .query_row("SELECT COUNT(*) FROM countries", [], |row| row.get(0))
            .map_err(sqlite("count countries"))?;
        usize::try_from(count).map_err(|err| StoreError::Corrupt {
            code: "*".to_owned(),
            reason: format!("country count: {err}"),
        })
    }
}
