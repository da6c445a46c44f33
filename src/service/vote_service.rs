//! Cast and retract votes.
//!
//! # Invariants
//! - A feature's `vote_count` equals its number of ledger rows whenever no
//!   vote on it is in flight.
//! - A ledger row and its counter change commit together or not at all.
//! - Operations on one feature run one at a time; operations on different
//!   features do not wait for each other's gate.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;

use crate::db::{self, Database};
use crate::error::{VotingError, VotingResult};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const RETRY_BACKOFF: Duration = Duration::from_millis(20);

/// Owns the write path for votes and for `Feature::vote_count`.
#[derive(Clone)]
pub struct VoteService {
    db: Database,
    gates: Arc<DashMap<i64, Arc<Mutex<()>>>>,
    max_attempts: u32,
}

impl VoteService {
    pub fn new(db: Database) -> Self {
        Self::with_max_attempts(db, DEFAULT_MAX_ATTEMPTS)
    }

    /// `max_attempts` bounds how many times a storage conflict is tried. Minimum 1.
    pub fn with_max_attempts(db: Database, max_attempts: u32) -> Self {
        Self {
            db,
            gates: Arc::new(DashMap::new()),
            max_attempts: max_attempts.max(1),
        }
    }

    /// Records `user_id`'s vote for `feature_id` and returns the new count.
    ///
    /// # Errors
    /// - `FeatureNotFound` if the feature does not exist.
    /// - `DuplicateVote` if the pair is already in the ledger. The counter is
    ///   left untouched.
    pub async fn cast_vote(&self, user_id: i64, feature_id: i64) -> VotingResult<i64> {
        let result = self
            .serialized(feature_id, || {
                self.db.write_transaction(|tx| {
                    if !db::feature_exists(tx, feature_id)? {
                        return Err(VotingError::FeatureNotFound);
                    }
                    db::insert_vote(tx, user_id, feature_id)?;
                    db::adjust_vote_count(tx, feature_id, 1)
                })
            })
            .await;

        match &result {
            Ok(count) => {
                tracing::debug!(user_id, feature_id, vote_count = *count, "vote cast")
            }
            Err(e) => log_rejection("cast", user_id, feature_id, e),
        }
        result
    }

    /// Removes `user_id`'s vote for `feature_id` and returns the new count.
    ///
    /// # Errors
    /// - `FeatureNotFound` if the feature does not exist.
    /// - `VoteNotFound` if the pair is not in the ledger. The counter is left
    ///   untouched.
    pub async fn retract_vote(&self, user_id: i64, feature_id: i64) -> VotingResult<i64> {
        let result = self
            .serialized(feature_id, || {
                self.db.write_transaction(|tx| {
                    if !db::feature_exists(tx, feature_id)? {
                        return Err(VotingError::FeatureNotFound);
                    }
                    db::delete_vote(tx, user_id, feature_id)?;
                    // Floors at zero
                    db::adjust_vote_count(tx, feature_id, -1)
                })
            })
            .await;

        match &result {
            Ok(count) => {
                tracing::debug!(user_id, feature_id, vote_count = *count, "vote retracted")
            }
            Err(e) => log_rejection("retract", user_id, feature_id, e),
        }
        result
    }

    /// Runs `op` while holding the feature's gate, retrying storage conflicts.
    ///
    /// `op` must be a complete transaction: each attempt either commits or
    /// leaves nothing behind. The gate is awaited before any attempt starts,
    /// so dropping this future while it waits has no effect on storage.
    async fn serialized<T, F>(&self, feature_id: i64, op: F) -> VotingResult<T>
    where
        F: Fn() -> VotingResult<T>,
    {
        let lease = self.lease(feature_id);
        let _held = lease.gate.lock().await;

        let mut attempt = 1;
        loop {
            match op() {
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    tracing::warn!(
                        feature_id,
                        attempt,
                        max_attempts = self.max_attempts,
                        "retrying after storage conflict: {}",
                        e
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    fn lease(&self, feature_id: i64) -> GateLease<'_> {
        let gate = self.gates.entry(feature_id).or_default().value().clone();
        GateLease {
            gates: &self.gates,
            feature_id,
            gate,
        }
    }
}

/// A claim on one feature's gate.
///
/// Dropping the last lease removes the gate from the map, so the map only
/// holds features with an operation waiting or in flight. This also runs
/// when a vote future is dropped while it waits.
struct GateLease<'a> {
    gates: &'a DashMap<i64, Arc<Mutex<()>>>,
    feature_id: i64,
    gate: Arc<Mutex<()>>,
}

impl Drop for GateLease<'_> {
    fn drop(&mut self) {
        // Two holders left means the map and this lease. New leases clone
        // under the same shard lock, so none can appear mid-check.
        self.gates.remove_if(&self.feature_id, |_, gate| {
            Arc::ptr_eq(gate, &self.gate) && Arc::strong_count(gate) == 2
        });
    }
}

fn log_rejection(op: &str, user_id: i64, feature_id: i64, err: &VotingError) {
    match err {
        VotingError::Storage(_) | VotingError::StorageConflict(_) => {
            tracing::error!(user_id, feature_id, "{} failed: {}", op, err)
        }
        _ => tracing::warn!(user_id, feature_id, "{} rejected: {}", op, err),
    }
}
