//! # Local Ping Store
//!
//! Durable, append-only storage of position samples keyed by session id,
//! backed by SQLite. Storage outlives process restarts: recovery of an
//! in-progress or abandoned session after reload depends on this.
//!
//! The only ordering contract consumers may rely on is the timestamp field.
//! Appends land in delivery order, but queries sort by timestamp explicitly
//! so out-of-order write completions are harmless.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection};

use crate::error::Result;
use crate::GeoSample;

/// Append-only sample log, queryable by session id.
///
/// Each ping is stamped with the UTC calendar date of its capture timestamp,
/// which supports the coarse bulk purge tied to Activity deletion without
/// joining against remote activity state.
pub struct PingStore {
    db: Connection,
}

impl PingStore {
    /// Open (or create) a ping store at the given database path.
    pub fn open(db_path: &str) -> Result<Self> {
        let db = Connection::open(db_path)?;
        Self::init_schema(&db)?;
        Ok(Self { db })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let db = Connection::open_in_memory()?;
        Self::init_schema(&db)?;
        Ok(Self { db })
    }

    /// Initialize the database schema.
    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            -- Append-only sample log
            CREATE TABLE IF NOT EXISTS pings (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_id TEXT NOT NULL,
                latitude REAL NOT NULL,
                longitude REAL NOT NULL,
                accuracy_meters REAL NOT NULL,
                timestamp_ms INTEGER NOT NULL,
                speed_kmh REAL,
                -- UTC calendar date of the capture timestamp (YYYY-MM-DD)
                activity_date TEXT NOT NULL
            );

            -- Indexes
            CREATE INDEX IF NOT EXISTS idx_pings_session ON pings(session_id);
            CREATE INDEX IF NOT EXISTS idx_pings_date ON pings(activity_date);
            "#,
        )?;
        Ok(())
    }

    /// Append one sample. O(1) durable write.
    ///
    /// Callers treat a failure here as non-fatal: the recorder logs it and
    /// keeps sampling.
    pub fn append(&self, sample: &GeoSample) -> Result<()> {
        let date = capture_date(sample.timestamp_ms);
        self.db.execute(
            "INSERT INTO pings
                (session_id, latitude, longitude, accuracy_meters, timestamp_ms, speed_kmh, activity_date)
             VALUES (?, ?, ?, ?, ?, ?, ?)",
            params![
                sample.session_id,
                sample.latitude,
                sample.longitude,
                sample.accuracy_meters,
                sample.timestamp_ms,
                sample.speed_kmh,
                date.to_string(),
            ],
        )?;
        Ok(())
    }

    /// All samples for one session, ordered ascending by timestamp.
    ///
    /// Results are stable until the session is mutated; re-query to restart.
    pub fn query_by_session(&self, session_id: &str) -> Result<Vec<GeoSample>> {
        let mut stmt = self.db.prepare(
            "SELECT session_id, latitude, longitude, accuracy_meters, timestamp_ms, speed_kmh
             FROM pings WHERE session_id = ? ORDER BY timestamp_ms ASC",
        )?;

        let samples = stmt
            .query_map(params![session_id], row_to_sample)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(samples)
    }

    /// All stored samples across every session.
    ///
    /// Supports enumerating orphaned sessions after a crash or app restart.
    pub fn query_all(&self) -> Result<Vec<GeoSample>> {
        let mut stmt = self.db.prepare(
            "SELECT session_id, latitude, longitude, accuracy_meters, timestamp_ms, speed_kmh
             FROM pings ORDER BY session_id, timestamp_ms ASC",
        )?;

        let samples = stmt
            .query_map([], row_to_sample)?
            .filter_map(|r| r.ok())
            .collect();

        Ok(samples)
    }

    /// Distinct session ids currently holding samples.
    pub fn session_ids(&self) -> Result<Vec<String>> {
        let mut stmt = self
            .db
            .prepare("SELECT DISTINCT session_id FROM pings ORDER BY session_id")?;

        let ids = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .filter_map(|r| r.ok())
            .collect();

        Ok(ids)
    }

    /// Number of samples stored for one session.
    pub fn count_for_session(&self, session_id: &str) -> Result<u64> {
        let count: i64 = self.db.query_row(
            "SELECT COUNT(*) FROM pings WHERE session_id = ?",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Remove all samples for one session. Returns the number removed.
    pub fn delete_by_session(&self, session_id: &str) -> Result<usize> {
        let deleted = self.db.execute(
            "DELETE FROM pings WHERE session_id = ?",
            params![session_id],
        )?;
        if deleted > 0 {
            log::info!(
                "[PingStore] Deleted {} samples for session {}",
                deleted,
                session_id
            );
        }
        Ok(deleted)
    }

    /// Coarse bulk purge tied to Activity deletion: removes every sample
    /// captured on the given calendar date, cleaning up orphaned sessions.
    pub fn delete_by_activity_date(&self, date: NaiveDate) -> Result<usize> {
        let deleted = self.db.execute(
            "DELETE FROM pings WHERE activity_date = ?",
            params![date.to_string()],
        )?;
        if deleted > 0 {
            log::info!("[PingStore] Purged {} samples dated {}", deleted, date);
        }
        Ok(deleted)
    }

    /// Remove all samples captured strictly before the given date.
    ///
    /// Housekeeping for long-abandoned sessions; returns the number removed.
    pub fn purge_orphans(&self, before: NaiveDate) -> Result<usize> {
        let deleted = self.db.execute(
            "DELETE FROM pings WHERE activity_date < ?",
            params![before.to_string()],
        )?;
        if deleted > 0 {
            log::info!(
                "[PingStore] Purged {} orphaned samples older than {}",
                deleted,
                before
            );
        }
        Ok(deleted)
    }
}

/// Map a ping row back to a sample.
fn row_to_sample(row: &rusqlite::Row<'_>) -> rusqlite::Result<GeoSample> {
    Ok(GeoSample {
        session_id: row.get(0)?,
        latitude: row.get(1)?,
        longitude: row.get(2)?,
        accuracy_meters: row.get(3)?,
        timestamp_ms: row.get(4)?,
        speed_kmh: row.get(5)?,
    })
}

/// UTC calendar date of a capture timestamp. Falls back to today for
/// timestamps that don't map to a valid instant.
fn capture_date(timestamp_ms: i64) -> NaiveDate {
    DateTime::<Utc>::from_timestamp_millis(timestamp_ms)
        .map(|dt| dt.date_naive())
        .unwrap_or_else(|| Utc::now().date_naive())
}
