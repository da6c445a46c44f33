use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::VotingError;

pub const TITLE_MIN: usize = 3;
pub const TITLE_MAX: usize = 100;
pub const DESCRIPTION_MIN: usize = 10;
pub const DESCRIPTION_MAX: usize = 1000;

/// A proposed item that callers vote on.
///
/// `vote_count` is a cached counter kept equal to the number of ledger rows
/// for this feature. Only the vote service writes it; feature updates never
/// touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub author_id: i64,
    pub vote_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a new feature. The author comes from the caller identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateFeatureInput {
    pub title: String,
    pub description: String,
}

/// Input for updating an existing feature. Omitted fields keep their value.
///
/// Unknown fields (a client-supplied `vote_count`, for instance) are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateFeatureInput {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CreateFeatureInput {
    /// Trims both fields and checks their length bounds.
    pub fn normalized(self) -> Result<Self, VotingError> {
        let mut errors = Vec::new();
        let title = check_length("title", &self.title, TITLE_MIN, TITLE_MAX, &mut errors);
        let description = check_length(
            "description",
            &self.description,
            DESCRIPTION_MIN,
            DESCRIPTION_MAX,
            &mut errors,
        );

        if errors.is_empty() {
            Ok(Self { title, description })
        } else {
            Err(VotingError::Validation(errors))
        }
    }
}

impl UpdateFeatureInput {
    /// Trims and validates whichever fields are present.
    pub fn normalized(self) -> Result<Self, VotingError> {
        let mut errors = Vec::new();
        let title = self
            .title
            .map(|t| check_length("title", &t, TITLE_MIN, TITLE_MAX, &mut errors));
        let description = self.description.map(|d| {
            check_length("description", &d, DESCRIPTION_MIN, DESCRIPTION_MAX, &mut errors)
        });

        if errors.is_empty() {
            Ok(Self { title, description })
        } else {
            Err(VotingError::Validation(errors))
        }
    }
}

/// Returns the trimmed value, recording a message when it falls outside `[min, max]`.
///
/// Length is counted in chars, not bytes.
fn check_length(field: &str, value: &str, min: usize, max: usize, errors: &mut Vec<String>) -> String {
    let trimmed = value.trim();
    let len = trimmed.chars().count();

    if trimmed.is_empty() {
        errors.push(format!("body -> {field}: must not be blank"));
    } else if len < min {
        errors.push(format!(
            "body -> {field}: must be at least {min} characters (got {len})"
        ));
    } else if len > max {
        errors.push(format!(
            "body -> {field}: must be at most {max} characters (got {len})"
        ));
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str, description: &str) -> CreateFeatureInput {
        CreateFeatureInput {
            title: title.to_string(),
            description: description.to_string(),
        }
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let normalized = input("  Dark mode  ", "\tLet me switch themes\n")
            .normalized()
            .unwrap();
        assert_eq!(normalized.title, "Dark mode");
        assert_eq!(normalized.description, "Let me switch themes");
    }

    #[test]
    fn keeps_interior_whitespace() {
        let normalized = input("Dark\tmode", "Let me\nswitch themes").normalized().unwrap();
        assert_eq!(normalized.title, "Dark\tmode");
        assert_eq!(normalized.description, "Let me\nswitch themes");
    }

    #[test]
    fn accepts_boundary_lengths() {
        assert!(input(&"a".repeat(3), &"b".repeat(10)).normalized().is_ok());
        assert!(input(&"a".repeat(100), &"b".repeat(1000)).normalized().is_ok());
    }

    #[test]
    fn rejects_out_of_bounds_lengths() {
        let err = input("ab", &"b".repeat(1001)).normalized().unwrap_err();
        match err {
            VotingError::Validation(errors) => {
                assert_eq!(errors.len(), 2);
                assert!(errors[0].contains("title"));
                assert!(errors[1].contains("description"));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_whitespace_only_title() {
        assert!(matches!(
            input("     ", "A perfectly fine description").normalized(),
            Err(VotingError::Validation(_))
        ));
    }

    #[test]
    fn counts_chars_not_bytes() {
        // 3 chars, 9 bytes
        assert!(input("🚀🚀🚀", "Description with émojis").normalized().is_ok());
        // 101 chars
        assert!(input(&"é".repeat(101), "Description with émojis")
            .normalized()
            .is_err());
    }

    #[test]
    fn partial_update_validates_only_present_fields() {
        let update = UpdateFeatureInput {
            title: Some("  New title ".to_string()),
            description: None,
        }
        .normalized()
        .unwrap();
        assert_eq!(update.title.as_deref(), Some("New title"));
        assert!(update.description.is_none());

        let bad = UpdateFeatureInput {
            title: None,
            description: Some("short".to_string()),
        };
        assert!(bad.normalized().is_err());
    }
}
