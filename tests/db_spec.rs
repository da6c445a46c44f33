use speculate2::speculate;
use tokio_test::block_on;
use upvote::db::Database;
use upvote::error::VotingError;
use upvote::models::*;
use upvote::service::{RankingReader, VoteService};

fn create_test_feature(db: &Database, title: &str) -> Feature {
    db.create_feature(
        1,
        CreateFeatureInput {
            title: title.to_string(),
            description: "A description that is long enough".to_string(),
        },
    )
    .expect("Failed to create feature")
}

fn assert_count_matches_ledger(db: &Database, feature_id: i64) {
    let cached = db.get_feature(feature_id).expect("Feature missing").vote_count;
    let actual = db.count_votes(feature_id).expect("Count failed");
    assert_eq!(cached, actual, "cached vote_count drifted from ledger");
}

speculate! {
    before {
        let db = Database::open_memory().expect("Failed to create in-memory database");
        db.migrate().expect("Failed to run migrations");
        let votes = VoteService::new(db.clone());
        let ranking = RankingReader::new(db.clone());
    }

    describe "feature store" {
        describe "create_feature" {
            it "creates a feature with zero votes" {
                let feature = db.create_feature(42, CreateFeatureInput {
                    title: "Dark mode".to_string(),
                    description: "Let users switch to a dark theme".to_string(),
                }).expect("Failed to create feature");

                assert!(feature.id > 0);
                assert_eq!(feature.title, "Dark mode");
                assert_eq!(feature.author_id, 42);
                assert_eq!(feature.vote_count, 0);
            }

            it "trims title and description" {
                let feature = db.create_feature(1, CreateFeatureInput {
                    title: "  Valid Title  ".to_string(),
                    description: "  Valid description that is long enough  ".to_string(),
                }).expect("Failed to create feature");

                assert_eq!(feature.title, "Valid Title");
                assert_eq!(feature.description, "Valid description that is long enough");
            }

            it "rejects a short title without writing anything" {
                let result = db.create_feature(1, CreateFeatureInput {
                    title: "Hi".to_string(),
                    description: "A description that is long enough".to_string(),
                });

                assert!(matches!(result, Err(VotingError::Validation(_))));
                assert_eq!(ranking.list(1, 10).unwrap().total_count, 0);
            }

            it "assigns increasing ids" {
                let first = create_test_feature(&db, "First");
                let second = create_test_feature(&db, "Second");
                assert!(second.id > first.id);
            }
        }

        describe "get_feature" {
            it "returns FeatureNotFound for a missing id" {
                assert!(matches!(db.get_feature(999), Err(VotingError::FeatureNotFound)));
            }

            it "round-trips the stored feature" {
                let created = create_test_feature(&db, "Round trip");
                let found = db.get_feature(created.id).expect("Query failed");
                assert_eq!(found, created);
            }
        }

        describe "update_feature" {
            it "updates both fields" {
                let feature = create_test_feature(&db, "Original");
                let updated = db.update_feature(feature.id, UpdateFeatureInput {
                    title: Some("Updated Title".to_string()),
                    description: Some("Updated description that is long enough".to_string()),
                }).expect("Update failed");

                assert_eq!(updated.id, feature.id);
                assert_eq!(updated.title, "Updated Title");
                assert_eq!(updated.description, "Updated description that is long enough");
                assert_eq!(updated.created_at, feature.created_at);
            }

            it "keeps omitted fields" {
                let feature = create_test_feature(&db, "Original");
                let updated = db.update_feature(feature.id, UpdateFeatureInput {
                    title: Some("New Title".to_string()),
                    description: None,
                }).expect("Update failed");

                assert_eq!(updated.title, "New Title");
                assert_eq!(updated.description, feature.description);
            }

            it "never changes the vote count" {
                let feature = create_test_feature(&db, "Voted");
                block_on(votes.cast_vote(7, feature.id)).expect("Vote failed");

                let updated = db.update_feature(feature.id, UpdateFeatureInput {
                    title: Some("Renamed".to_string()),
                    description: None,
                }).expect("Update failed");

                assert_eq!(updated.vote_count, 1);
            }

            it "returns FeatureNotFound for a missing id" {
                let result = db.update_feature(999, UpdateFeatureInput {
                    title: Some("New Title".to_string()),
                    description: None,
                });
                assert!(matches!(result, Err(VotingError::FeatureNotFound)));
            }

            it "validates before looking the feature up" {
                let result = db.update_feature(999, UpdateFeatureInput {
                    title: Some("x".to_string()),
                    description: None,
                });
                assert!(matches!(result, Err(VotingError::Validation(_))));
            }
        }

        describe "adjust_vote_count" {
            it "applies deltas and floors at zero" {
                let feature = create_test_feature(&db, "Counter");
                assert_eq!(db.adjust_vote_count(feature.id, 3).unwrap(), 3);
                assert_eq!(db.adjust_vote_count(feature.id, -1).unwrap(), 2);
                assert_eq!(db.adjust_vote_count(feature.id, -10).unwrap(), 0);
            }

            it "returns FeatureNotFound for a missing id" {
                assert!(matches!(db.adjust_vote_count(999, 1), Err(VotingError::FeatureNotFound)));
            }
        }
    }

    describe "vote ledger" {
        it "reports membership" {
            let feature = create_test_feature(&db, "Ledger");
            assert!(!db.vote_exists(5, feature.id).unwrap());
            db.insert_vote(5, feature.id).expect("Insert failed");
            assert!(db.vote_exists(5, feature.id).unwrap());
        }

        it "rejects a second insert for the same pair" {
            let feature = create_test_feature(&db, "Ledger");
            db.insert_vote(5, feature.id).expect("Insert failed");
            assert!(matches!(db.insert_vote(5, feature.id), Err(VotingError::DuplicateVote)));
            assert_eq!(db.count_votes(feature.id).unwrap(), 1);
        }

        it "allows the same user on different features" {
            let a = create_test_feature(&db, "Feature A");
            let b = create_test_feature(&db, "Feature B");
            db.insert_vote(5, a.id).expect("Insert failed");
            db.insert_vote(5, b.id).expect("Insert failed");
            assert_eq!(db.count_votes(a.id).unwrap(), 1);
            assert_eq!(db.count_votes(b.id).unwrap(), 1);
        }

        it "refuses votes for a missing feature" {
            assert!(matches!(db.insert_vote(5, 999), Err(VotingError::FeatureNotFound)));
        }

        it "removes a vote once" {
            let feature = create_test_feature(&db, "Ledger");
            db.insert_vote(5, feature.id).expect("Insert failed");
            db.remove_vote(5, feature.id).expect("Remove failed");
            assert!(matches!(db.remove_vote(5, feature.id), Err(VotingError::VoteNotFound)));
        }

        it "lists votes oldest first" {
            let feature = create_test_feature(&db, "Ledger");
            db.insert_vote(3, feature.id).unwrap();
            db.insert_vote(1, feature.id).unwrap();
            db.insert_vote(2, feature.id).unwrap();

            let voters: Vec<i64> = db.votes_for_feature(feature.id).unwrap()
                .iter().map(|v| v.user_id).collect();
            assert_eq!(voters, vec![3, 1, 2]);
        }
    }

    describe "vote service" {
        it "casts a vote and bumps the count" {
            let feature = create_test_feature(&db, "Vote me");
            let count = block_on(votes.cast_vote(5, feature.id)).expect("Vote failed");

            assert_eq!(count, 1);
            assert!(db.vote_exists(5, feature.id).unwrap());
            assert_count_matches_ledger(&db, feature.id);
        }

        it "counts a duplicate cast once" {
            let feature = create_test_feature(&db, "Vote me");
            block_on(votes.cast_vote(5, feature.id)).expect("Vote failed");
            let second = block_on(votes.cast_vote(5, feature.id));

            assert!(matches!(second, Err(VotingError::DuplicateVote)));
            assert_eq!(db.get_feature(feature.id).unwrap().vote_count, 1);
            assert_count_matches_ledger(&db, feature.id);
        }

        it "returns to the previous count after cast then retract" {
            let feature = create_test_feature(&db, "Vote me");
            block_on(votes.cast_vote(1, feature.id)).unwrap();
            block_on(votes.cast_vote(2, feature.id)).unwrap();

            let before = db.get_feature(feature.id).unwrap().vote_count;
            block_on(votes.cast_vote(3, feature.id)).unwrap();
            let after = block_on(votes.retract_vote(3, feature.id)).unwrap();

            assert_eq!(after, before);
            assert_count_matches_ledger(&db, feature.id);
        }

        it "decrements once for a double retract" {
            let feature = create_test_feature(&db, "Vote me");
            block_on(votes.cast_vote(1, feature.id)).unwrap();
            block_on(votes.cast_vote(2, feature.id)).unwrap();

            assert_eq!(block_on(votes.retract_vote(1, feature.id)).unwrap(), 1);
            assert!(matches!(
                block_on(votes.retract_vote(1, feature.id)),
                Err(VotingError::VoteNotFound)
            ));
            assert_eq!(db.get_feature(feature.id).unwrap().vote_count, 1);
            assert_count_matches_ledger(&db, feature.id);
        }

        it "rejects votes on a missing feature" {
            assert!(matches!(block_on(votes.cast_vote(1, 999)), Err(VotingError::FeatureNotFound)));
            assert!(matches!(block_on(votes.retract_vote(1, 999)), Err(VotingError::FeatureNotFound)));
            assert!(db.votes_for_feature(999).unwrap().is_empty());
        }

        it "keeps the counter at zero when the cache was already wrong" {
            let feature = create_test_feature(&db, "Corrupt");
            db.insert_vote(1, feature.id).unwrap();
            // Ledger has a row, counter says 0.
            assert_eq!(block_on(votes.retract_vote(1, feature.id)).unwrap(), 0);
        }

        it "walks through the full vote scenario" {
            let feature = create_test_feature(&db, "Scenario");
            assert_eq!(feature.vote_count, 0);

            assert_eq!(block_on(votes.cast_vote(10, feature.id)).unwrap(), 1);
            assert!(matches!(block_on(votes.cast_vote(10, feature.id)), Err(VotingError::DuplicateVote)));
            assert_eq!(db.get_feature(feature.id).unwrap().vote_count, 1);
            assert_eq!(block_on(votes.retract_vote(10, feature.id)).unwrap(), 0);
            assert!(matches!(block_on(votes.retract_vote(10, feature.id)), Err(VotingError::VoteNotFound)));
            assert_count_matches_ledger(&db, feature.id);
        }
    }

    describe "reconcile_vote_counts" {
        it "reports nothing when counts match" {
            let feature = create_test_feature(&db, "Consistent");
            block_on(votes.cast_vote(1, feature.id)).unwrap();
            assert!(db.reconcile_vote_counts().unwrap().is_empty());
        }

        it "repairs drifted counters from the ledger" {
            let a = create_test_feature(&db, "Feature A");
            let b = create_test_feature(&db, "Feature B");
            db.insert_vote(1, a.id).unwrap();
            db.insert_vote(2, a.id).unwrap();
            db.adjust_vote_count(b.id, 5).unwrap();

            let drifts = db.reconcile_vote_counts().unwrap();
            assert_eq!(drifts, vec![
                CountDrift { feature_id: a.id, cached: 0, actual: 2 },
                CountDrift { feature_id: b.id, cached: 5, actual: 0 },
            ]);
            assert_count_matches_ledger(&db, a.id);
            assert_count_matches_ledger(&db, b.id);
        }
    }

    describe "ranking reader" {
        it "returns an empty first page when nothing exists" {
            let page = ranking.list(1, 20).unwrap();
            assert!(page.items.is_empty());
            assert_eq!(page.total_count, 0);
            assert_eq!(page.total_pages, 0);
            assert!(!page.has_next);
            assert!(!page.has_previous);
        }

        it "orders by votes, then newest" {
            let old_popular = create_test_feature(&db, "Old popular");
            let older = create_test_feature(&db, "Older");
            let newer = create_test_feature(&db, "Newer");

            for voter in 1..=3 {
                block_on(votes.cast_vote(voter, old_popular.id)).unwrap();
            }

            let ids: Vec<i64> = ranking.list(1, 10).unwrap().items.iter().map(|f| f.id).collect();
            assert_eq!(ids[0], old_popular.id);
            // Same count: newest first, or lower id first when created together.
            let tail = &ids[1..];
            let newer_first = newer.created_at > older.created_at;
            if newer_first {
                assert_eq!(tail, &[newer.id, older.id]);
            } else {
                assert_eq!(tail, &[older.id, newer.id]);
            }
        }

        it "pages through every feature exactly once" {
            for i in 0..25 {
                create_test_feature(&db, &format!("Feature {i:02}"));
            }

            let first = ranking.list(1, 10).unwrap();
            assert_eq!(first.total_count, 25);
            assert_eq!(first.total_pages, 3);
            assert!(first.has_next);
            assert!(!first.has_previous);

            let mut seen = std::collections::HashSet::new();
            for page in 1..=first.total_pages as u32 {
                let listing = ranking.list(page, 10).unwrap();
                for feature in listing.items {
                    assert!(seen.insert(feature.id), "feature {} listed twice", feature.id);
                }
            }
            assert_eq!(seen.len(), 25);

            let last = ranking.list(3, 10).unwrap();
            assert_eq!(last.items.len(), 5);
            assert!(!last.has_next);
            assert!(last.has_previous);
        }
    }
}

#[test]
fn file_database_persists_votes_across_reopen() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("nested").join("upvote.db");

    let feature_id = {
        let db = Database::open(path.clone()).expect("Failed to open database");
        db.migrate().expect("Failed to migrate");
        let feature = create_test_feature(&db, "Persistent");
        let votes = VoteService::new(db.clone());
        block_on(votes.cast_vote(9, feature.id)).expect("Vote failed");
        feature.id
    };

    let db = Database::open(path).expect("Failed to reopen database");
    db.migrate().expect("Migrations should be idempotent");
    assert_eq!(db.get_feature(feature_id).unwrap().vote_count, 1);
    assert!(db.vote_exists(9, feature_id).unwrap());
}
