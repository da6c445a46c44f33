use rusqlite::{Connection, OptionalExtension, Row};

use super::{format_timestamp, now, parse_timestamp, Database};
use crate::error::{VotingError, VotingResult};
use crate::models::*;

const FEATURE_COLUMNS: &str = "id, title, description, author_id, vote_count, created_at";

fn feature_from_row(row: &Row<'_>) -> rusqlite::Result<Feature> {
    Ok(Feature {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        author_id: row.get(3)?,
        vote_count: row.get(4)?,
        created_at: parse_timestamp(5, row.get(5)?)?,
    })
}

fn select_feature(conn: &Connection, id: i64) -> VotingResult<Option<Feature>> {
    let feature = conn
        .query_row(
            &format!("SELECT {FEATURE_COLUMNS} FROM features WHERE id = ?"),
            [id],
            feature_from_row,
        )
        .optional()?;
    Ok(feature)
}

pub(crate) fn feature_exists(conn: &Connection, id: i64) -> VotingResult<bool> {
    let found = conn
        .query_row("SELECT 1 FROM features WHERE id = ?", [id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

/// Moves the cached counter by `delta` in one statement and returns the new value.
///
/// The arithmetic happens inside SQLite, so there is no read-then-write window.
/// The result is floored at zero.
pub(crate) fn adjust_vote_count(conn: &Connection, id: i64, delta: i64) -> VotingResult<i64> {
    conn.query_row(
        "UPDATE features SET vote_count = MAX(vote_count + ?1, 0)
         WHERE id = ?2 RETURNING vote_count",
        (delta, id),
        |row| row.get(0),
    )
    .optional()?
    .ok_or(VotingError::FeatureNotFound)
}

impl Database {
    // ============================================================
    // Feature store
    // ============================================================

    pub fn create_feature(&self, author_id: i64, input: CreateFeatureInput) -> VotingResult<Feature> {
        let input = input.normalized()?;
        let conn = self.lock();
        let now = now();
        let stamp = format_timestamp(now);

        let id = conn.query_row(
            "INSERT INTO features (title, description, author_id, vote_count, created_at, updated_at)
             VALUES (?, ?, ?, 0, ?, ?) RETURNING id",
            (&input.title, &input.description, author_id, &stamp, &stamp),
            |row| row.get(0),
        )?;

        Ok(Feature {
            id,
            title: input.title,
            description: input.description,
            author_id,
            vote_count: 0,
            created_at: now,
        })
    }

    pub fn get_feature(&self, id: i64) -> VotingResult<Feature> {
        let conn = self.read();
        select_feature(&conn, id)?.ok_or(VotingError::FeatureNotFound)
    }

    /// Applies a partial update to title and description. `vote_count` is never written here.
    pub fn update_feature(&self, id: i64, input: UpdateFeatureInput) -> VotingResult<Feature> {
        let input = input.normalized()?;
        let conn = self.lock();

        let feature = conn
            .query_row(
                &format!(
                    "UPDATE features
                     SET title = COALESCE(?1, title),
                         description = COALESCE(?2, description),
                         updated_at = ?3
                     WHERE id = ?4
                     RETURNING {FEATURE_COLUMNS}"
                ),
                (
                    &input.title,
                    &input.description,
                    format_timestamp(now()),
                    id,
                ),
                feature_from_row,
            )
            .optional()?;

        feature.ok_or(VotingError::FeatureNotFound)
    }

    /// Adjusts one feature's cached counter outside any vote.
    ///
    /// The vote service does not go through here; it calls the same statement
    /// inside its ledger transaction.
    pub fn adjust_vote_count(&self, id: i64, delta: i64) -> VotingResult<i64> {
        let conn = self.lock();
        adjust_vote_count(&conn, id, delta)
    }

    /// One page of features in ranking order, plus the total row count, read
    /// from the same snapshot.
    ///
    /// Order: `vote_count` descending, then `created_at` descending, then `id`
    /// ascending, which makes it total.
    pub fn ranked_features(&self, limit: u32, offset: u64) -> VotingResult<(u64, Vec<Feature>)> {
        self.read_snapshot(|tx| {
            let total: i64 = tx.query_row("SELECT COUNT(*) FROM features", [], |row| row.get(0))?;

            let mut stmt = tx.prepare(&format!(
                "SELECT {FEATURE_COLUMNS} FROM features
                 ORDER BY vote_count DESC, created_at DESC, id ASC
                 LIMIT ? OFFSET ?"
            ))?;
            let offset = i64::try_from(offset).unwrap_or(i64::MAX);
            let items = stmt
                .query_map((i64::from(limit), offset), feature_from_row)?
                .collect::<Result<Vec<_>, _>>()?;

            Ok((total.max(0) as u64, items))
        })
    }

    /// Recomputes every cached counter from the ledger in one transaction.
    ///
    /// Returns the features whose counter had drifted, with the value found
    /// and the value written.
    pub fn reconcile_vote_counts(&self) -> VotingResult<Vec<CountDrift>> {
        self.write_transaction(|tx| {
            let mut stmt = tx.prepare(
                "SELECT id, vote_count, actual FROM (
                     SELECT f.id, f.vote_count,
                            (SELECT COUNT(*) FROM votes v WHERE v.feature_id = f.id) AS actual
                     FROM features f
                 )
                 WHERE vote_count != actual
                 ORDER BY id",
            )?;
            let drifts = stmt
                .query_map([], |row| {
                    Ok(CountDrift {
                        feature_id: row.get(0)?,
                        cached: row.get(1)?,
                        actual: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;

            for drift in &drifts {
                tx.execute(
                    "UPDATE features SET vote_count = ? WHERE id = ?",
                    (drift.actual, drift.feature_id),
                )?;
            }

            Ok(drifts)
        })
    }
}
