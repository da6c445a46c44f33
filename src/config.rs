//! Runtime configuration loaded from environment variables.

use std::path::PathBuf;

use crate::service::DEFAULT_MAX_ATTEMPTS;

#[derive(Clone, Debug)]
pub struct Config {
    /// Database file (from UPVOTE_DATABASE). `None` uses the platform data directory.
    pub database_path: Option<PathBuf>,
    /// Allowed CORS origins (from UPVOTE_CORS_ORIGINS, comma-separated). `None` is permissive.
    pub cors_origins: Option<Vec<String>>,
    /// Attempts per vote when storage reports a conflict (from UPVOTE_VOTE_RETRIES).
    pub vote_attempts: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds a config from any key lookup. Invalid values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let database_path = lookup("UPVOTE_DATABASE")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from);

        let cors_origins = lookup("UPVOTE_CORS_ORIGINS").map(|s| {
            s.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        let vote_attempts = match lookup("UPVOTE_VOTE_RETRIES") {
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    tracing::warn!(
                        "Invalid UPVOTE_VOTE_RETRIES value {:?}, using {}",
                        raw,
                        DEFAULT_MAX_ATTEMPTS
                    );
                    DEFAULT_MAX_ATTEMPTS
                }
            },
            None => DEFAULT_MAX_ATTEMPTS,
        };

        Self {
            database_path,
            cors_origins,
            vote_attempts,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: None,
            cors_origins: None,
            vote_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}
