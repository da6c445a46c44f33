use rusqlite::{Connection, OptionalExtension, Row};

use super::{format_timestamp, now, parse_timestamp, Database};
use crate::error::{is_foreign_key_violation, is_unique_violation, VotingError, VotingResult};
use crate::models::Vote;

fn vote_from_row(row: &Row<'_>) -> rusqlite::Result<Vote> {
    Ok(Vote {
        id: row.get(0)?,
        user_id: row.get(1)?,
        feature_id: row.get(2)?,
        created_at: parse_timestamp(3, row.get(3)?)?,
    })
}

/// Records a vote. The `(user_id, feature_id)` uniqueness constraint decides
/// whether it is new; no prior existence check is made.
pub(crate) fn insert_vote(conn: &Connection, user_id: i64, feature_id: i64) -> VotingResult<Vote> {
    let now = now();
    let id = conn
        .query_row(
            "INSERT INTO votes (user_id, feature_id, created_at) VALUES (?, ?, ?) RETURNING id",
            (user_id, feature_id, format_timestamp(now)),
            |row| row.get(0),
        )
        .map_err(|e| {
            if is_unique_violation(&e) {
                VotingError::DuplicateVote
            } else if is_foreign_key_violation(&e) {
                VotingError::FeatureNotFound
            } else {
                VotingError::from(e)
            }
        })?;

    Ok(Vote {
        id,
        user_id,
        feature_id,
        created_at: now,
    })
}

pub(crate) fn delete_vote(conn: &Connection, user_id: i64, feature_id: i64) -> VotingResult<()> {
    let rows = conn.execute(
        "DELETE FROM votes WHERE user_id = ? AND feature_id = ?",
        (user_id, feature_id),
    )?;
    if rows == 0 {
        return Err(VotingError::VoteNotFound);
    }
    Ok(())
}

impl Database {
    // ============================================================
    // Vote ledger
    // ============================================================

    pub fn vote_exists(&self, user_id: i64, feature_id: i64) -> VotingResult<bool> {
        let conn = self.read();
        let found = conn
            .query_row(
                "SELECT 1 FROM votes WHERE user_id = ? AND feature_id = ?",
                (user_id, feature_id),
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Inserts a ledger row without touching the feature's counter.
    ///
    /// Use `VoteService::cast_vote` to record a vote; this is the raw ledger
    /// primitive it builds on.
    pub fn insert_vote(&self, user_id: i64, feature_id: i64) -> VotingResult<Vote> {
        let conn = self.lock();
        insert_vote(&conn, user_id, feature_id)
    }

    /// Deletes a ledger row without touching the feature's counter.
    pub fn remove_vote(&self, user_id: i64, feature_id: i64) -> VotingResult<()> {
        let conn = self.lock();
        delete_vote(&conn, user_id, feature_id)
    }

    /// All live votes for a feature, oldest first.
    pub fn votes_for_feature(&self, feature_id: i64) -> VotingResult<Vec<Vote>> {
        let conn = self.read();
        let mut stmt = conn.prepare(
            "SELECT id, user_id, feature_id, created_at
             FROM votes WHERE feature_id = ? ORDER BY created_at, id",
        )?;

        let votes = stmt
            .query_map([feature_id], vote_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(votes)
    }

    /// Number of ledger rows for a feature. This is what `vote_count` must equal.
    pub fn count_votes(&self, feature_id: i64) -> VotingResult<i64> {
        let conn = self.read();
        let count = conn.query_row(
            "SELECT COUNT(*) FROM votes WHERE feature_id = ?",
            [feature_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
