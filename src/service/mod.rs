//! Use-case services layered over [`Database`](crate::db::Database).
//!
//! - [`VoteService`] is the only writer of votes and vote counts.
//! - [`RankingReader`] is the read path for the popularity listing.

mod ranking;
mod vote_service;

pub use ranking::RankingReader;
pub use vote_service::{VoteService, DEFAULT_MAX_ATTEMPTS};
