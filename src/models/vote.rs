use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single (user, feature) endorsement held in the vote ledger.
///
/// At most one vote exists per `(user_id, feature_id)` pair; storage enforces
/// this with a uniqueness constraint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub id: i64,
    pub user_id: i64,
    pub feature_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Body returned by cast and retract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteResponse {
    pub message: String,
    pub vote_count: i64,
}

impl VoteResponse {
    pub fn added(vote_count: i64) -> Self {
        Self {
            message: "Vote added successfully".to_string(),
            vote_count,
        }
    }

    pub fn removed(vote_count: i64) -> Self {
        Self {
            message: "Vote removed successfully".to_string(),
            vote_count,
        }
    }
}

/// A cached counter that disagreed with the ledger and was repaired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountDrift {
    pub feature_id: i64,
    pub cached: i64,
    pub actual: i64,
}
