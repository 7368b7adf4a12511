//! Sleep night repository contract and SQLite implementations.
//!
//! # Responsibility
//! - Provide insert/update/get/latest/list/clear over
//!   `daily_sleep_quality_table`.
//! - Offer a connection-owning variant that can cross thread boundaries.
//!
//! # Invariants
//! - Write paths call `SleepNight::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - "Latest" and list ordering follow `night_id DESC`.

use crate::db::DbError;
use crate::model::night::{
    NightId, NightValidationError, SleepNight, SleepQuality, UNRATED_QUALITY,
};
use rusqlite::{params, Connection, Row};
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;

const NIGHT_SELECT_SQL: &str = "SELECT
    night_id,
    start_time_milli,
    end_time_milli,
    quality_rating
FROM daily_sleep_quality_table";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for night persistence and query operations.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{0}")]
    Validation(#[from] NightValidationError),
    #[error("{0}")]
    Db(#[from] DbError),
    #[error("night not found: {0}")]
    NotFound(NightId),
    #[error("invalid persisted night data: {0}")]
    InvalidData(String),
    #[error("night store connection lock poisoned")]
    Poisoned,
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Store contract for sleep nights.
pub trait NightRepository {
    /// Inserts a night and returns the store-assigned id.
    fn insert_night(&self, night: &SleepNight) -> RepoResult<NightId>;
    /// Replaces the night with the same id.
    fn update_night(&self, night: &SleepNight) -> RepoResult<()>;
    fn get_night(&self, id: NightId) -> RepoResult<Option<SleepNight>>;
    /// Returns the most recently started night, open or not.
    fn get_tonight(&self) -> RepoResult<Option<SleepNight>>;
    /// Lists every night, newest first.
    fn list_nights(&self) -> RepoResult<Vec<SleepNight>>;
    /// Deletes every night and returns the number of removed rows.
    fn clear_nights(&self) -> RepoResult<usize>;
}

/// SQLite-backed night repository over a borrowed connection.
pub struct SqliteNightRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteNightRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl NightRepository for SqliteNightRepository<'_> {
    fn insert_night(&self, night: &SleepNight) -> RepoResult<NightId> {
        night.validate()?;

        self.conn.execute(
            "INSERT INTO daily_sleep_quality_table (
                start_time_milli,
                end_time_milli,
                quality_rating
            ) VALUES (?1, ?2, ?3);",
            params![
                night.start_time_milli,
                night.end_time_milli,
                quality_to_db(night.sleep_quality),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn update_night(&self, night: &SleepNight) -> RepoResult<()> {
        night.validate()?;

        let changed = self.conn.execute(
            "UPDATE daily_sleep_quality_table
             SET
                start_time_milli = ?1,
                end_time_milli = ?2,
                quality_rating = ?3
             WHERE night_id = ?4;",
            params![
                night.start_time_milli,
                night.end_time_milli,
                quality_to_db(night.sleep_quality),
                night.night_id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound(night.night_id));
        }

        Ok(())
    }

    fn get_night(&self, id: NightId) -> RepoResult<Option<SleepNight>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NIGHT_SELECT_SQL} WHERE night_id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_night_row(row)?)),
            None => Ok(None),
        }
    }

    fn get_tonight(&self) -> RepoResult<Option<SleepNight>> {
        let mut stmt = self.conn.prepare(&format!(
            "{NIGHT_SELECT_SQL} ORDER BY night_id DESC LIMIT 1;"
        ))?;
        let mut rows = stmt.query([])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_night_row(row)?)),
            None => Ok(None),
        }
    }

    fn list_nights(&self) -> RepoResult<Vec<SleepNight>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{NIGHT_SELECT_SQL} ORDER BY night_id DESC;"))?;
        let mut rows = stmt.query([])?;
        let mut nights = Vec::new();

        while let Some(row) = rows.next()? {
            nights.push(parse_night_row(row)?);
        }

        Ok(nights)
    }

    fn clear_nights(&self) -> RepoResult<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM daily_sleep_quality_table;", [])?;
        Ok(removed)
    }
}

/// Night repository that owns its connection, shareable across threads.
///
/// Every call locks the connection for the duration of one statement
/// sequence; the tracker runs these calls on the blocking pool.
#[derive(Clone)]
pub struct SharedNightRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SharedNightRepository {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> RepoResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| RepoError::Poisoned)
    }

    fn with_repo<T>(
        &self,
        f: impl FnOnce(&SqliteNightRepository<'_>) -> RepoResult<T>,
    ) -> RepoResult<T> {
        let conn = self.lock()?;
        f(&SqliteNightRepository::new(&conn))
    }
}

impl NightRepository for SharedNightRepository {
    fn insert_night(&self, night: &SleepNight) -> RepoResult<NightId> {
        self.with_repo(|repo| repo.insert_night(night))
    }

    fn update_night(&self, night: &SleepNight) -> RepoResult<()> {
        self.with_repo(|repo| repo.update_night(night))
    }

    fn get_night(&self, id: NightId) -> RepoResult<Option<SleepNight>> {
        self.with_repo(|repo| repo.get_night(id))
    }

    fn get_tonight(&self) -> RepoResult<Option<SleepNight>> {
        self.with_repo(|repo| repo.get_tonight())
    }

    fn list_nights(&self) -> RepoResult<Vec<SleepNight>> {
        self.with_repo(|repo| repo.list_nights())
    }

    fn clear_nights(&self) -> RepoResult<usize> {
        self.with_repo(|repo| repo.clear_nights())
    }
}

impl<R: NightRepository + ?Sized> NightRepository for Arc<R> {
    fn insert_night(&self, night: &SleepNight) -> RepoResult<NightId> {
        (**self).insert_night(night)
    }

    fn update_night(&self, night: &SleepNight) -> RepoResult<()> {
        (**self).update_night(night)
    }

    fn get_night(&self, id: NightId) -> RepoResult<Option<SleepNight>> {
        (**self).get_night(id)
    }

    fn get_tonight(&self) -> RepoResult<Option<SleepNight>> {
        (**self).get_tonight()
    }

    fn list_nights(&self) -> RepoResult<Vec<SleepNight>> {
        (**self).list_nights()
    }

    fn clear_nights(&self) -> RepoResult<usize> {
        (**self).clear_nights()
    }
}

fn parse_night_row(row: &Row<'_>) -> RepoResult<SleepNight> {
    let night_id: NightId = row.get("night_id")?;
    let sleep_quality = match row.get::<_, i64>("quality_rating")? {
        UNRATED_QUALITY => None,
        value => Some(SleepQuality::from_rating(value).map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid quality_rating `{value}` for night {night_id}"
            ))
        })?),
    };

    let night = SleepNight {
        night_id,
        start_time_milli: row.get("start_time_milli")?,
        end_time_milli: row.get("end_time_milli")?,
        sleep_quality,
    };
    night.validate().map_err(|err| {
        RepoError::InvalidData(format!("night {night_id}: {err}"))
    })?;
    Ok(night)
}

fn quality_to_db(quality: Option<SleepQuality>) -> i64 {
    quality.map_or(UNRATED_QUALITY, SleepQuality::rating)
}
