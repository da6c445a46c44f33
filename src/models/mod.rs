//! Domain models for upvote.
//!
//! - [`Feature`]: a proposal with a cached `vote_count`, ranked by popularity.
//! - [`Vote`]: one user's endorsement of one feature. The set of live votes is
//!   the ledger, the source of truth that `vote_count` mirrors.
//! - [`Page`]: the paginated envelope returned by the ranking reader.

mod feature;
mod page;
mod vote;

pub use feature::*;
pub use page::*;
pub use vote::*;
