//! Integration tests for Polls domain
//!
//! These tests use real MongoDB via testcontainers to ensure:
//! - Documents round-trip through BSON
//! - The unique voter index is enforced under concurrency
//! - Close and delete behave like the in-memory stores
//!
//! Run with `cargo test -p domain_polls -- --ignored` (requires Docker).

use domain_polls::*;
use test_utils::{TestDataBuilder, TestMongo, assertions::*};
use uuid::Uuid;

async fn setup() -> (TestMongo, MongoPollRepository, MongoVoteRepository) {
    let mongo = TestMongo::new().await;
    let db = mongo.database();
    create_indexes(&db).await.unwrap();

    let polls = MongoPollRepository::new(db.clone());
    let votes = MongoVoteRepository::new(db);
    (mongo, polls, votes)
}

fn create(builder: &TestDataBuilder, category: Option<String>) -> CreatePoll {
    CreatePoll {
        question: builder.question("main"),
        options: builder.options(3),
        category,
    }
}

// ============================================================================
// Repository Tests
// ============================================================================

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_insert_and_get_poll() {
    let (_mongo, polls, _) = setup().await;
    let builder = TestDataBuilder::from_test_name("insert_and_get");

    let poll = registry::new_poll(create(&builder, None)).unwrap();
    let created = polls.insert(poll.clone()).await.unwrap();
    assert_uuid_eq(created.id, poll.id, "created poll id");

    let fetched = polls.get(poll.id).await.unwrap();
    assert_eq!(fetched.question, poll.question);
    assert_eq!(fetched.options, poll.options);
    assert_eq!(fetched.category, "General");
    assert_eq!(fetched.status, PollStatus::Active);
    assert_eq!(
        fetched.created_at.timestamp_millis(),
        poll.created_at.timestamp_millis()
    );

    assert!(matches!(
        polls.get(Uuid::now_v7()).await,
        Err(PollError::NotFound(_))
    ));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_list_filters_newest_first() {
    let (_mongo, polls, _) = setup().await;
    let builder = TestDataBuilder::from_test_name("list_filters");
    let category = builder.category("custom");

    let first = polls
        .insert(registry::new_poll(create(&builder, Some(category.clone()))).unwrap())
        .await
        .unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let second = polls
        .insert(registry::new_poll(create(&builder, None)).unwrap())
        .await
        .unwrap();
    polls.close(second.id, chrono::Utc::now()).await.unwrap();

    let all = polls.list(PollFilter::default()).await.unwrap();
    assert_eq!(all.len(), 2);
    assert_uuid_eq(all[0].id, second.id, "newest first");

    let custom = polls
        .list(PollFilter {
            category: Some(category),
            status: None,
        })
        .await
        .unwrap();
    assert_eq!(custom.len(), 1);
    assert_uuid_eq(custom[0].id, first.id, "category filter");

    let closed = polls
        .list(PollFilter {
            category: None,
            status: Some(PollStatus::Closed),
        })
        .await
        .unwrap();
    assert_eq!(closed.len(), 1);
    assert_uuid_eq(closed[0].id, second.id, "status filter");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_close_is_one_way() {
    let (_mongo, polls, _) = setup().await;
    let builder = TestDataBuilder::from_test_name("close_one_way");

    let poll = polls
        .insert(registry::new_poll(create(&builder, None)).unwrap())
        .await
        .unwrap();

    let closed = polls.close(poll.id, chrono::Utc::now()).await.unwrap();
    assert_eq!(closed.status, PollStatus::Closed);
    assert_some(closed.closed_at, "closed_at set");

    assert!(matches!(
        polls.close(poll.id, chrono::Utc::now()).await,
        Err(PollError::AlreadyClosed(_))
    ));
    assert!(matches!(
        polls.close(Uuid::now_v7(), chrono::Utc::now()).await,
        Err(PollError::NotFound(_))
    ));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_unique_voter_index() {
    let (_mongo, polls, votes) = setup().await;
    let builder = TestDataBuilder::from_test_name("unique_voter");

    let poll = polls
        .insert(registry::new_poll(create(&builder, None)).unwrap())
        .await
        .unwrap();
    let voter = builder.voter_id("alice");

    let first = engine::submit_vote(&poll, &[], "Option 1", &voter, chrono::Utc::now()).unwrap();
    votes.append(first).await.unwrap();

    // Bypass the engine check to hit the index directly
    let second = engine::submit_vote(&poll, &[], "Option 2", &voter, chrono::Utc::now()).unwrap();
    let err = votes.append(second).await.unwrap_err();
    assert_eq!(err.to_string(), "Already voted: Option 1");

    let mine = votes.find_by_poll_and_voter(poll.id, &voter).await.unwrap();
    assert_eq!(mine.len(), 1);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_find_by_polls_matches_any_listed_poll() {
    let (_mongo, polls, votes) = setup().await;
    let builder = TestDataBuilder::from_test_name("find_by_polls");
    let voter = builder.voter_id("bob");

    let mut ids = Vec::new();
    for _ in 0..3 {
        let poll = polls
            .insert(registry::new_poll(create(&builder, None)).unwrap())
            .await
            .unwrap();
        let vote = engine::submit_vote(&poll, &[], "Option 3", &voter, chrono::Utc::now()).unwrap();
        votes.append(vote).await.unwrap();
        ids.push(poll.id);
    }

    assert_eq!(votes.find_by_polls(&ids[..2]).await.unwrap().len(), 2);
    assert!(votes.find_by_polls(&[]).await.unwrap().is_empty());

    let service = PollService::new(polls, votes);
    let listed = service.list_polls(PollFilter::default()).await.unwrap();
    assert_eq!(listed.len(), 3);
    assert!(listed.iter().all(|p| p.vote_counts["Option 3"] == 1));
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_concurrent_votes_keep_one_per_voter() {
    let (_mongo, polls, votes) = setup().await;
    let builder = TestDataBuilder::from_test_name("concurrent_votes");

    let poll = polls
        .insert(registry::new_poll(create(&builder, None)).unwrap())
        .await
        .unwrap();
    let service = std::sync::Arc::new(PollService::new(polls, votes));
    let voter = builder.voter_id("racer");

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let service = service.clone();
            let voter = voter.clone();
            tokio::spawn(async move {
                service
                    .vote(
                        poll.id,
                        CastVote {
                            voter_id: voter,
                            option: "Option 1".to_string(),
                        },
                    )
                    .await
            })
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => accepted += 1,
            Err(e) => assert!(matches!(e, PollError::AlreadyVoted { .. })),
        }
    }

    assert_eq!(accepted, 1);
    assert_eq!(service.get_poll(poll.id).await.unwrap().total_votes, 1);
}

// ============================================================================
// Service Tests
// ============================================================================

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_delete_poll_cascades_to_votes() {
    let (_mongo, polls, votes) = setup().await;
    let builder = TestDataBuilder::from_test_name("delete_cascade");
    let service = PollService::new(polls, votes);

    let poll = service.create_poll(create(&builder, None)).await.unwrap();
    for name in ["a", "b", "c"] {
        service
            .vote(
                poll.poll.id,
                CastVote {
                    voter_id: builder.voter_id(name),
                    option: "Option 2".to_string(),
                },
            )
            .await
            .unwrap();
    }

    let summary = service.delete_poll(poll.poll.id).await.unwrap();
    assert_eq!(summary.votes_removed, 3);
    assert!(matches!(
        service.get_poll(poll.poll.id).await,
        Err(PollError::NotFound(_))
    ));
    assert_eq!(service.stats().await.unwrap().total_votes, 0);
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_create_indexes_is_idempotent() {
    let mongo = TestMongo::new().await;
    let db = mongo.database();

    create_indexes(&db).await.unwrap();
    create_indexes(&db).await.unwrap();
}
