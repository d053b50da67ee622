use std::path::Path;

use chrono::{DateTime, Local, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use tracing::debug;

use crate::provider::TrackPoint;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Sqlite error: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Today's data keeps changing as the vehicle drives; past days are settled.
const TODAY_MAX_AGE_SECS: i64 = 24 * 60 * 60;
const PAST_MAX_AGE_SECS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub count: usize,
    pub approximate_size_bytes: u64,
    pub oldest_fetched_at: Option<DateTime<Utc>>,
    pub newest_fetched_at: Option<DateTime<Utc>>,
}

/// Durable per-device per-day route store, keyed `(device_id, date)`.
///
/// Backed by an embedded sqlite file so cached days survive restarts.
/// Exactly one entry exists per key; `put` upserts. Expired entries read as
/// misses and are lazily evicted on the way out.
pub struct RouteCache {
    db: Connection,
}

impl RouteCache {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, self::Error> {
        let db = Connection::open(path)?;
        Self::init_schema(&db)?;
        Ok(Self { db })
    }

    /// An in-memory store, for tests.
    pub fn in_memory() -> Result<Self, self::Error> {
        let db = Connection::open_in_memory()?;
        Self::init_schema(&db)?;
        Ok(Self { db })
    }

    fn init_schema(db: &Connection) -> Result<(), self::Error> {
        db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS routes (
                device_id INTEGER NOT NULL,
                date TEXT NOT NULL,
                points BLOB NOT NULL,
                fetched_at INTEGER NOT NULL,
                PRIMARY KEY (device_id, date)
            );

            CREATE INDEX IF NOT EXISTS idx_routes_date ON routes(date);
            CREATE INDEX IF NOT EXISTS idx_routes_fetched_at ON routes(fetched_at);
            "#,
        )?;
        Ok(())
    }

    /// Returns the cached points for the key, or None when absent or expired.
    /// Expired entries are deleted before returning.
    pub fn get(
        &self,
        device_id: i64,
        date: NaiveDate,
    ) -> Result<Option<Vec<TrackPoint>>, self::Error> {
        let row: Option<(Vec<u8>, i64)> = self
            .db
            .query_row(
                "SELECT points, fetched_at FROM routes WHERE device_id = ?1 AND date = ?2",
                params![device_id, date.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((blob, fetched_at)) = row else {
            return Ok(None);
        };

        if is_expired(date, fetched_at, Utc::now(), Local::now().date_naive()) {
            debug!(device_id, %date, "evicting expired cache entry");
            self.delete(device_id, date)?;
            return Ok(None);
        }

        let points: Vec<TrackPoint> = serde_json::from_slice(&blob)?;
        Ok(Some(points))
    }

    /// Upserts the points for the key, resetting its fetch time to now.
    /// Empty sequences are not stored.
    pub fn put(
        &self,
        device_id: i64,
        date: NaiveDate,
        points: &[TrackPoint],
    ) -> Result<(), self::Error> {
        self.put_with_fetched_at(device_id, date, points, Utc::now())
    }

    fn put_with_fetched_at(
        &self,
        device_id: i64,
        date: NaiveDate,
        points: &[TrackPoint],
        fetched_at: DateTime<Utc>,
    ) -> Result<(), self::Error> {
        if points.is_empty() {
            return Ok(());
        }
        let blob = serde_json::to_vec(points)?;
        self.db.execute(
            "INSERT INTO routes (device_id, date, points, fetched_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(device_id, date)
             DO UPDATE SET points = excluded.points, fetched_at = excluded.fetched_at",
            params![device_id, date.to_string(), blob, fetched_at.timestamp()],
        )?;
        Ok(())
    }

    fn delete(&self, device_id: i64, date: NaiveDate) -> Result<(), self::Error> {
        self.db.execute(
            "DELETE FROM routes WHERE device_id = ?1 AND date = ?2",
            params![device_id, date.to_string()],
        )?;
        Ok(())
    }

    /// Sweeps the whole store, deleting every expired entry.
    /// Returns how many were evicted.
    pub fn clear_expired(&self) -> Result<usize, self::Error> {
        let now = Utc::now();
        let today = Local::now().date_naive();

        let mut statement = self
            .db
            .prepare("SELECT device_id, date, fetched_at FROM routes")?;
        let rows: Vec<(i64, String, i64)> = statement
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
            .filter_map(|row| row.ok())
            .collect();
        drop(statement);

        let mut evicted = 0;
        for (device_id, date_text, fetched_at) in rows {
            let Ok(date) = date_text.parse::<NaiveDate>() else {
                continue;
            };
            if is_expired(date, fetched_at, now, today) {
                self.delete(device_id, date)?;
                evicted += 1;
            }
        }
        Ok(evicted)
    }

    pub fn clear_all(&self) -> Result<(), self::Error> {
        self.db.execute("DELETE FROM routes", [])?;
        Ok(())
    }

    pub fn stats(&self) -> Result<CacheStats, self::Error> {
        let (count, size, oldest, newest): (i64, i64, Option<i64>, Option<i64>) =
            self.db.query_row(
                "SELECT COUNT(*), COALESCE(SUM(LENGTH(points)), 0),
                        MIN(fetched_at), MAX(fetched_at)
                 FROM routes",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )?;
        Ok(CacheStats {
            count: count as usize,
            approximate_size_bytes: size as u64,
            oldest_fetched_at: oldest.and_then(|secs| DateTime::from_timestamp(secs, 0)),
            newest_fetched_at: newest.and_then(|secs| DateTime::from_timestamp(secs, 0)),
        })
    }
}

fn is_expired(date: NaiveDate, fetched_at: i64, now: DateTime<Utc>, today: NaiveDate) -> bool {
    let max_age = if date == today {
        TODAY_MAX_AGE_SECS
    } else {
        PAST_MAX_AGE_SECS
    };
    now.timestamp() - fetched_at > max_age
}
