//! SQLite storage: the feature store, the vote ledger, and the transaction
//! boundary the vote service uses to mutate both at once.

mod features;
mod schema;
mod votes;

pub(crate) use features::{adjust_vote_count, feature_exists};
pub(crate) use votes::{delete_vote, insert_vote};

use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::VotingResult;

const BUSY_TIMEOUT: Duration = Duration::from_millis(250);

/// Shared SQLite handle.
///
/// File databases hold two connections: `conn` for writes and `reader` for
/// reads, so a writer stuck waiting on another process's lock never stalls
/// listings. WAL lets the reader see every committed write. In-memory
/// databases have one connection serving both.
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    reader: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: PathBuf) -> Result<Self> {
        let parent = path
            .parent()
            .ok_or_else(|| anyhow::anyhow!("Database path has no parent directory"))?;
        std::fs::create_dir_all(parent)?;
        let conn = Connection::open(&path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let reader = Connection::open(&path)?;
        reader.pragma_update(None, "query_only", true)?;
        reader.busy_timeout(BUSY_TIMEOUT)?;

        tracing::debug!("Opened database at {}", path.display());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            reader: Arc::new(Mutex::new(reader)),
        })
    }

    pub fn open_default() -> Result<Self> {
        Self::open(default_path()?)
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;
        let conn = Arc::new(Mutex::new(conn));
        Ok(Self {
            reader: conn.clone(),
            conn,
        })
    }

    pub fn migrate(&self) -> Result<()> {
        let conn = self.lock();
        schema::run_migrations(&conn)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database lock poisoned")
    }

    /// The read connection. Never hold this while taking `lock`.
    pub(crate) fn read(&self) -> MutexGuard<'_, Connection> {
        self.reader.lock().expect("database lock poisoned")
    }

    /// Runs `f` inside an IMMEDIATE transaction.
    ///
    /// Commits when `f` returns `Ok`. On `Err`, or if the caller unwinds, the
    /// transaction is dropped and SQLite rolls back every statement it ran.
    pub fn write_transaction<T, F>(&self, f: F) -> VotingResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> VotingResult<T>,
    {
        let mut conn = self.lock();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Runs `f` against a single read snapshot.
    pub(crate) fn read_snapshot<T, F>(&self, f: F) -> VotingResult<T>
    where
        F: FnOnce(&Transaction<'_>) -> VotingResult<T>,
    {
        let mut conn = self.read();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        f(&tx)
    }
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            conn: self.conn.clone(),
            reader: self.reader.clone(),
        }
    }
}

/// Database file under the platform data directory.
pub fn default_path() -> Result<PathBuf> {
    let dirs = directories::ProjectDirs::from("", "", "upvote")
        .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?;
    Ok(dirs.data_dir().join("upvote.db"))
}

/// Current time at the precision storage keeps.
pub(crate) fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// Fixed-width so that string order matches time order.
pub(crate) fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(idx: usize, s: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}
