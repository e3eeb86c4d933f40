pub mod sample;

pub use sample::{LogOutcome, RateDiff, RateSample};

use crate::core::{LastRates, RATE_EPSILON};
use anyhow::{Context, Result, anyhow};
use chrono::{Local, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const CREATE_TABLE: &str = "
    CREATE TABLE IF NOT EXISTS rate_log (
        id INTEGER PRIMARY KEY,
        consult_date TEXT NOT NULL,
        primary_rate REAL NOT NULL,
        secondary_rate REAL,
        primary_diff REAL,
        secondary_diff REAL
    )";

const SELECT_COLUMNS: &str =
    "SELECT id, consult_date, primary_rate, secondary_rate, primary_diff, secondary_diff FROM rate_log";

/// Append-only log of rate samples backed by SQLite.
pub struct RateStore {
    conn: Mutex<Connection>,
}

impl RateStore {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open rate database: {}", path.display()))?;
        debug!("Opened rate database at {}", path.display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(CREATE_TABLE)
            .context("Failed to create rate_log table")?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| anyhow!("rate store connection lock poisoned"))
    }

    /// Latest stored rates, or zeros when the log is empty or unreadable.
    pub fn get_last_rates(&self) -> LastRates {
        match self.last_sample() {
            Ok(Some(sample)) => LastRates {
                primary: sample.primary_rate,
                secondary: sample.secondary_rate.unwrap_or(0.0),
            },
            Ok(None) => LastRates::default(),
            Err(e) => {
                warn!(error = %e, "Failed to read last rates, assuming empty log");
                LastRates::default()
            }
        }
    }

    pub fn last_sample(&self) -> Result<Option<RateSample>> {
        let conn = self.conn()?;
        let sample = conn
            .query_row(
                &format!("{SELECT_COLUMNS} ORDER BY id DESC LIMIT 1"),
                [],
                sample_from_row,
            )
            .optional()
            .context("Failed to query last sample")?;
        Ok(sample)
    }

    /// Records a reading stamped with the current wall-clock time.
    pub fn log_rates(&self, primary: f64, secondary: Option<f64>) -> LogOutcome {
        self.log_rates_at(primary, secondary, Local::now().naive_local())
    }

    /// Records a reading taken at `at` unless it matches the latest sample.
    ///
    /// A skipped reading reports the latest sample's stored diffs, so callers
    /// keep showing the last known movement.
    pub fn log_rates_at(
        &self,
        primary: f64,
        secondary: Option<f64>,
        at: NaiveDateTime,
    ) -> LogOutcome {
        let last = match self.last_sample() {
            Ok(last) => last,
            Err(e) => {
                warn!(error = %e, "Failed to read last sample, not recording rates");
                return LogOutcome::Failed;
            }
        };

        let diff = match &last {
            None => RateDiff::default(),
            Some(prev) => {
                let diff = RateDiff {
                    primary: primary - prev.primary_rate,
                    secondary: secondary.unwrap_or(0.0) - prev.secondary_rate.unwrap_or(0.0),
                };
                if diff.primary.abs() <= RATE_EPSILON && diff.secondary.abs() <= RATE_EPSILON {
                    debug!("Rates unchanged since sample {}, not recording", prev.id);
                    return LogOutcome::Unchanged(prev.diff());
                }
                diff
            }
        };

        match self.insert(at, primary, secondary, diff) {
            Ok(id) => {
                info!(id, primary, ?secondary, "Recorded rates");
                LogOutcome::Inserted(diff)
            }
            Err(e) => {
                warn!(error = %e, "Failed to record rates");
                LogOutcome::Failed
            }
        }
    }

    fn insert(
        &self,
        at: NaiveDateTime,
        primary: f64,
        secondary: Option<f64>,
        diff: RateDiff,
    ) -> Result<i64> {
        let consult_date = at.format(TIMESTAMP_FORMAT).to_string();
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO rate_log (consult_date, primary_rate, secondary_rate, primary_diff, secondary_diff)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![consult_date, primary, secondary, diff.primary, diff.secondary],
        )
        .context("Failed to insert rate sample")?;
        Ok(conn.last_insert_rowid())
    }

    /// Most recent samples, newest first.
    pub fn recent(&self, limit: usize) -> Result<Vec<RateSample>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id DESC LIMIT ?1"))?;
        let samples = stmt
            .query_map([limit as i64], sample_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to read rate history")?;
        Ok(samples)
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM rate_log", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn sample_from_row(row: &Row<'_>) -> rusqlite::Result<RateSample> {
    let consult_date: String = row.get(1)?;
    let timestamp = NaiveDateTime::parse_from_str(&consult_date, TIMESTAMP_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(RateSample {
        id: row.get(0)?,
        timestamp,
        primary_rate: row.get(2)?,
        secondary_rate: row.get(3)?,
        primary_diff: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
        secondary_diff: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_empty_store_bootstrap() {
        let store = RateStore::open_in_memory().unwrap();
        assert_eq!(store.get_last_rates(), LastRates::default());

        let outcome = store.log_rates(36.5, Some(40.0));
        assert_eq!(outcome, LogOutcome::Inserted(RateDiff::default()));
        assert_eq!(store.count().unwrap(), 1);
        assert_eq!(
            store.get_last_rates(),
            LastRates {
                primary: 36.5,
                secondary: 40.0
            }
        );
    }

    #[test]
    fn test_dedup_returns_last_known_delta() {
        let store = RateStore::open_in_memory().unwrap();
        store.log_rates(36.0, Some(40.0));

        let first = store.log_rates(36.5, Some(39.75));
        let second = store.log_rates(36.5, Some(39.75));

        assert!(matches!(first, LogOutcome::Inserted(_)));
        assert!(matches!(second, LogOutcome::Unchanged(_)));
        assert_eq!(first.diff(), second.diff());
        assert_close(second.diff().unwrap().primary, 0.5);
        assert_close(second.diff().unwrap().secondary, -0.25);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_diffs_follow_previous_sample() {
        let store = RateStore::open_in_memory().unwrap();
        let readings = [
            (36.1, Some(40.2)),
            (36.1, Some(40.9)),
            (36.4, Some(40.3)),
            (37.0, None),
        ];
        for (p, s) in readings {
            store.log_rates(p, s);
        }

        let mut samples = store.recent(10).unwrap();
        samples.reverse();
        assert_eq!(samples.len(), readings.len());
        assert_eq!(samples[0].primary_diff, 0.0);
        assert_eq!(samples[0].secondary_diff, 0.0);
        for i in 1..samples.len() {
            assert!(samples[i].id > samples[i - 1].id);
            assert_close(
                samples[i].primary_diff,
                readings[i].0 - readings[i - 1].0,
            );
            assert_close(
                samples[i].secondary_diff,
                readings[i].1.unwrap_or(0.0) - readings[i - 1].1.unwrap_or(0.0),
            );
        }
        assert_eq!(samples[3].secondary_rate, None);
    }

    #[test]
    fn test_samples_keep_the_supplied_timestamp() {
        let store = RateStore::open_in_memory().unwrap();
        let at = NaiveDateTime::parse_from_str("2025-03-14 05:01:00", TIMESTAMP_FORMAT).unwrap();

        store.log_rates_at(36.5, Some(40.0), at);
        let last = store.last_sample().unwrap().unwrap();
        assert_eq!(last.timestamp, at);
    }

    #[test]
    fn test_small_changes_below_epsilon_are_skipped() {
        let store = RateStore::open_in_memory().unwrap();
        store.log_rates(36.5, Some(40.0));
        let outcome = store.log_rates(36.5 + 1e-12, Some(40.0));
        assert!(matches!(outcome, LogOutcome::Unchanged(_)));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("rates.db");

        {
            let store = RateStore::open(&db_path).unwrap();
            store.log_rates(36.5, Some(40.0));
            store.log_rates(36.6, Some(40.1));
        }

        let store = RateStore::open(&db_path).unwrap();
        assert_eq!(store.count().unwrap(), 2);
        let last = store.get_last_rates();
        assert_close(last.primary, 36.6);
        assert_close(last.secondary, 40.1);
        let latest = store.last_sample().unwrap().unwrap();
        assert_close(latest.primary_diff, 0.1);
    }

    #[test]
    fn test_unreadable_store_degrades_to_defaults() {
        let store = RateStore::open_in_memory().unwrap();
        store
            .conn()
            .unwrap()
            .execute_batch("DROP TABLE rate_log")
            .unwrap();

        assert_eq!(store.get_last_rates(), LastRates::default());
        assert_eq!(store.log_rates(36.5, Some(40.0)), LogOutcome::Failed);
        assert_eq!(LogOutcome::Failed.diff(), None);
    }
}
