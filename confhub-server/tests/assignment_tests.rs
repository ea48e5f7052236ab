//! Integration tests for paper submission and reviewer assignment
//!
//! Engines run against an in-memory SQLite store; selection uses seeded
//! RNGs so every run draws the same reviewers.

mod helpers;

use std::collections::HashSet;
use std::sync::atomic::Ordering;

use rand::rngs::StdRng;
use rand::SeedableRng;

use confhub_common::db::DocumentStore;
use confhub_common::{Decision, Error, Paper, Role};
use confhub_server::engine::assignment::{
    create_paper, reassign, update_status, NewPaper, NOT_ENOUGH_REVIEWERS, REQUIRED_REVIEWERS,
};
use helpers::*;

fn new_paper(title: &str, conference_id: &str) -> NewPaper {
    NewPaper {
        title: title.to_string(),
        conference_id: conference_id.to_string(),
    }
}

// =============================================================================
// Create
// =============================================================================

#[tokio::test]
async fn test_submission_assigns_two_pending_reviewers() {
    let store = memory_store().await;
    let author = seed_user(&store, "u1", "author").await;
    seed_conference(&store, "c1", "o1").await;
    seed_reviewers(&store, &["r1", "r2", "r3"]).await;

    let mut rng = StdRng::seed_from_u64(11);
    let paper = create_paper(&store, &mut rng, &caller_for(&author), new_paper("X", "c1"))
        .await
        .unwrap();

    assert_eq!(paper.reviewer_ids.len(), REQUIRED_REVIEWERS);
    assert_ne!(paper.reviewer_ids[0], paper.reviewer_ids[1]);
    for id in &paper.reviewer_ids {
        assert!(["r1", "r2", "r3"].contains(&id.as_str()));
        assert_eq!(paper.status_of(id), Decision::Pending);
    }
    assert!(paper.reviewers_consistent());
    assert_eq!(paper.created_at, paper.updated_at);

    let stored = store.get_paper(&paper.id).await.unwrap().unwrap();
    assert_eq!(stored, paper);
}

#[tokio::test]
async fn test_submission_writes_back_references() {
    let store = memory_store().await;
    let author = seed_user(&store, "u1", "author").await;
    seed_conference(&store, "c1", "o1").await;
    seed_reviewers(&store, &["r1", "r2", "r3"]).await;

    let mut rng = StdRng::seed_from_u64(3);
    let paper = create_paper(&store, &mut rng, &caller_for(&author), new_paper("X", "c1"))
        .await
        .unwrap();

    let conference = store.get_conference("c1").await.unwrap().unwrap();
    assert_eq!(conference.paper_ids, vec![paper.id.clone()]);

    for id in ["r1", "r2", "r3"] {
        let reviewer = store.get_user(id).await.unwrap().unwrap();
        let assigned = reviewer.assigned_papers.contains(&paper.id);
        assert_eq!(assigned, paper.has_reviewer(id), "reviewer {}", id);
    }
}

#[tokio::test]
async fn test_every_submission_has_two_reviewers() {
    let store = memory_store().await;
    let author = seed_user(&store, "u1", "author").await;
    seed_conference(&store, "c1", "o1").await;
    seed_reviewers(&store, &["r1", "r2", "r3", "r4", "r5"]).await;
    let caller = caller_for(&author);

    for seed in 0..20 {
        let mut rng = StdRng::seed_from_u64(seed);
        let paper = create_paper(&store, &mut rng, &caller, new_paper("X", "c1"))
            .await
            .unwrap();
        assert_eq!(paper.reviewer_ids.len(), 2);
        let keys: HashSet<_> = paper.reviewer_statuses.keys().collect();
        let ids: HashSet<_> = paper.reviewer_ids.iter().collect();
        assert_eq!(keys, ids);
    }

    let conference = store.get_conference("c1").await.unwrap().unwrap();
    assert_eq!(conference.paper_ids.len(), 20);
}

#[tokio::test]
async fn test_author_with_reviewer_profile_never_reviews_own_paper() {
    let store = memory_store().await;
    seed_conference(&store, "c1", "o1").await;
    seed_reviewers(&store, &["r1", "r2", "r3"]).await;
    let r1 = store.get_user("r1").await.unwrap().unwrap();
    let caller = caller_as(&r1, Role::Author);

    for seed in 0..30 {
        let mut rng = StdRng::seed_from_u64(seed);
        let paper = create_paper(&store, &mut rng, &caller, new_paper("Mine", "c1"))
            .await
            .unwrap();
        assert!(!paper.has_reviewer("r1"));
        assert_eq!(paper.author_id, "r1");
    }
}

#[tokio::test]
async fn test_insufficient_pool_persists_nothing() {
    let store = memory_store().await;
    seed_conference(&store, "c1", "o1").await;
    seed_reviewers(&store, &["r1", "r2"]).await;
    let r1 = store.get_user("r1").await.unwrap().unwrap();

    // r1 is excluded as the author, leaving one reviewer
    let mut rng = StdRng::seed_from_u64(1);
    let err = create_paper(&store, &mut rng, &caller_as(&r1, Role::Author), new_paper("X", "c1"))
        .await
        .unwrap_err();

    match err {
        Error::ServiceUnavailable(msg) => assert_eq!(msg, NOT_ENOUGH_REVIEWERS),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(store.collection_counts().await.unwrap().papers, 0);
    assert!(store.get_conference("c1").await.unwrap().unwrap().paper_ids.is_empty());
}

#[tokio::test]
async fn test_empty_pool_is_service_unavailable() {
    let store = memory_store().await;
    let author = seed_user(&store, "u1", "author").await;
    seed_conference(&store, "c1", "o1").await;

    let mut rng = StdRng::seed_from_u64(1);
    let result = create_paper(&store, &mut rng, &caller_for(&author), new_paper("X", "c1")).await;
    assert!(matches!(result, Err(Error::ServiceUnavailable(_))));
}

#[tokio::test]
async fn test_failed_batch_rolls_back_paper() {
    let inner = memory_store().await;
    let author = seed_user(&inner, "u1", "author").await;
    seed_conference(&inner, "c1", "o1").await;
    seed_reviewers(&inner, &["r1", "r2", "r3"]).await;
    let store = FailingBatchStore::new(inner.clone(), 0);

    let mut rng = StdRng::seed_from_u64(5);
    let result = create_paper(&store, &mut rng, &caller_for(&author), new_paper("X", "c1")).await;

    assert!(matches!(result, Err(Error::Internal(_))));
    assert_eq!(inner.collection_counts().await.unwrap().papers, 0);
    assert_eq!(store.delete_attempts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_rollback_retries_failed_deletes() {
    let inner = memory_store().await;
    let author = seed_user(&inner, "u1", "author").await;
    seed_conference(&inner, "c1", "o1").await;
    seed_reviewers(&inner, &["r1", "r2", "r3"]).await;
    let store = FailingBatchStore::new(inner.clone(), 2);

    let mut rng = StdRng::seed_from_u64(5);
    let result = create_paper(&store, &mut rng, &caller_for(&author), new_paper("X", "c1")).await;

    // Original failure is reported, not the compensation's
    assert!(matches!(result, Err(Error::Internal(msg)) if msg.contains("batch")));
    assert_eq!(store.delete_attempts.load(Ordering::SeqCst), 3);
    assert_eq!(inner.collection_counts().await.unwrap().papers, 0);
}

#[tokio::test]
async fn test_submission_requires_author_role() {
    let store = memory_store().await;
    let organizer = seed_user(&store, "o1", "organizer").await;
    seed_conference(&store, "c1", "o1").await;
    seed_reviewers(&store, &["r1", "r2"]).await;

    let mut rng = StdRng::seed_from_u64(1);
    let result =
        create_paper(&store, &mut rng, &caller_for(&organizer), new_paper("X", "c1")).await;
    assert!(matches!(result, Err(Error::Forbidden(_))));
}

#[tokio::test]
async fn test_submission_to_unknown_conference() {
    let store = memory_store().await;
    let author = seed_user(&store, "u1", "author").await;
    seed_reviewers(&store, &["r1", "r2"]).await;

    let mut rng = StdRng::seed_from_u64(1);
    let result =
        create_paper(&store, &mut rng, &caller_for(&author), new_paper("X", "nope")).await;
    assert!(matches!(result, Err(Error::NotFound(_))));
}

#[tokio::test]
async fn test_submission_requires_title() {
    let store = memory_store().await;
    let author = seed_user(&store, "u1", "author").await;
    seed_conference(&store, "c1", "o1").await;
    seed_reviewers(&store, &["r1", "r2"]).await;

    let mut rng = StdRng::seed_from_u64(1);
    let result = create_paper(&store, &mut rng, &caller_for(&author), new_paper("   ", "c1")).await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
}

#[tokio::test]
async fn test_concurrent_submissions_both_recorded() {
    let store = memory_store().await;
    let author = seed_user(&store, "u1", "author").await;
    seed_conference(&store, "c1", "o1").await;
    seed_reviewers(&store, &["r1", "r2", "r3"]).await;
    let caller = caller_for(&author);

    let mut rng_a = StdRng::seed_from_u64(1);
    let mut rng_b = StdRng::seed_from_u64(2);
    let (a, b) = tokio::join!(
        create_paper(&store, &mut rng_a, &caller, new_paper("A", "c1")),
        create_paper(&store, &mut rng_b, &caller, new_paper("B", "c1")),
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    let conference = store.get_conference("c1").await.unwrap().unwrap();
    assert_eq!(conference.paper_ids.len(), 2);
    assert!(conference.paper_ids.contains(&a.id));
    assert!(conference.paper_ids.contains(&b.id));
}

// =============================================================================
// UpdateStatus
// =============================================================================

#[tokio::test]
async fn test_status_update_is_idempotent_and_local() {
    let store = memory_store().await;
    seed_reviewers(&store, &["r1", "r2"]).await;
    seed_conference(&store, "c1", "o1").await;
    seed_paper(&store, "p1", "c1", "u1", &[("r1", Decision::Pending), ("r2", Decision::Declined)])
        .await;
    let r1 = caller_for(&store.get_user("r1").await.unwrap().unwrap());

    for _ in 0..2 {
        let paper = update_status(&store, &r1, "p1", "accepted").await.unwrap();
        assert_eq!(paper.status_of("r1"), Decision::Accepted);
    }

    let stored = store.get_paper("p1").await.unwrap().unwrap();
    assert_eq!(stored.status_of("r1"), Decision::Accepted);
    assert_eq!(stored.status_of("r2"), Decision::Declined);
    assert!(stored.reviewers_consistent());
    assert!(stored.updated_at > stored.created_at);
}

#[tokio::test]
async fn test_status_update_for_uid_with_quote() {
    let store = memory_store().await;
    let author = seed_user(&store, "u1", "author").await;
    seed_conference(&store, "c1", "o1").await;
    seed_reviewers(&store, &[r#"r"1"#, "r2"]).await;

    let mut rng = StdRng::seed_from_u64(5);
    let paper = create_paper(&store, &mut rng, &caller_for(&author), new_paper("X", "c1"))
        .await
        .unwrap();
    assert!(paper.reviewer_ids.iter().any(|id| id == r#"r"1"#));

    let quoted = caller_for(&store.get_user(r#"r"1"#).await.unwrap().unwrap());
    let updated = update_status(&store, &quoted, &paper.id, "accepted").await.unwrap();
    assert_eq!(updated.status_of(r#"r"1"#), Decision::Accepted);

    let stored = store.get_paper(&paper.id).await.unwrap().unwrap();
    assert_eq!(stored.status_of(r#"r"1"#), Decision::Accepted);
    assert_eq!(stored.status_of("r2"), Decision::Pending);
    assert!(stored.reviewers_consistent());
}

#[tokio::test]
async fn test_status_update_by_unassigned_reviewer() {
    let store = memory_store().await;
    seed_reviewers(&store, &["r1", "r2", "r3"]).await;
    seed_conference(&store, "c1", "o1").await;
    seed_paper(&store, "p1", "c1", "u1", &[("r1", Decision::Pending), ("r2", Decision::Pending)])
        .await;
    let r3 = caller_for(&store.get_user("r3").await.unwrap().unwrap());

    let result = update_status(&store, &r3, "p1", "accepted").await;
    assert!(matches!(result, Err(Error::Forbidden(_))));
}

#[tokio::test]
async fn test_status_update_checks() {
    let store = memory_store().await;
    seed_reviewers(&store, &["r1", "r2"]).await;
    let author = seed_user(&store, "u1", "author").await;
    seed_conference(&store, "c1", "o1").await;
    seed_paper(&store, "p1", "c1", "u1", &[("r1", Decision::Pending), ("r2", Decision::Pending)])
        .await;
    let r1 = caller_for(&store.get_user("r1").await.unwrap().unwrap());

    assert!(matches!(
        update_status(&store, &caller_for(&author), "p1", "accepted").await,
        Err(Error::Forbidden(_))
    ));
    assert!(matches!(
        update_status(&store, &r1, "missing", "accepted").await,
        Err(Error::NotFound(_))
    ));
    assert!(matches!(
        update_status(&store, &r1, "p1", "maybe").await,
        Err(Error::InvalidArgument(_))
    ));

    let stored = store.get_paper("p1").await.unwrap().unwrap();
    assert_eq!(stored.status_of("r1"), Decision::Pending);
}

#[tokio::test]
async fn test_status_update_after_removal_conflicts() {
    let store = memory_store().await;
    seed_reviewers(&store, &["r1", "r2", "r3"]).await;
    let organizer = seed_user(&store, "o1", "organizer").await;
    seed_conference(&store, "c1", "o1").await;
    seed_paper(&store, "p1", "c1", "u1", &[("r1", Decision::Pending), ("r2", Decision::Pending)])
        .await;

    // Reviewer r1 loaded their copy of the paper before the reassignment
    let stale = store.get_paper("p1").await.unwrap().unwrap();
    assert!(stale.has_reviewer("r1"));
    reassign(&store, &caller_for(&organizer), "p1", &ids(&["r2", "r3"]))
        .await
        .unwrap();

    let result = store
        .set_reviewer_status("p1", "r1", Decision::Accepted, &timestamp(9))
        .await;
    assert!(matches!(result, Err(Error::Conflict(_))));

    let stored = store.get_paper("p1").await.unwrap().unwrap();
    assert!(stored.reviewers_consistent());
    assert!(!stored.reviewer_statuses.contains_key("r1"));
}

// =============================================================================
// Reassign
// =============================================================================

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn test_reassignment_preserves_retained_decisions() {
    let store = memory_store().await;
    seed_reviewers(&store, &["A", "B", "C"]).await;
    let organizer = seed_user(&store, "o1", "organizer").await;
    seed_conference(&store, "c1", "o1").await;
    seed_paper(&store, "p1", "c1", "u1", &[("A", Decision::Accepted), ("B", Decision::Pending)])
        .await;

    let paper = reassign(&store, &caller_for(&organizer), "p1", &ids(&["B", "C"]))
        .await
        .unwrap();

    assert_eq!(paper.reviewer_ids, ids(&["B", "C"]));
    assert_eq!(paper.reviewer_statuses.len(), 2);
    assert_eq!(paper.status_of("B"), Decision::Pending);
    assert_eq!(paper.status_of("C"), Decision::Pending);

    let stored = store.get_paper("p1").await.unwrap().unwrap();
    assert_eq!(stored, paper);

    let a = store.get_user("A").await.unwrap().unwrap();
    let b = store.get_user("B").await.unwrap().unwrap();
    let c = store.get_user("C").await.unwrap().unwrap();
    assert!(a.assigned_papers.is_empty());
    assert_eq!(b.assigned_papers, vec!["p1"]);
    assert_eq!(c.assigned_papers, vec!["p1"]);
}

#[tokio::test]
async fn test_reassignment_keeps_declined_decision() {
    let store = memory_store().await;
    seed_reviewers(&store, &["r1", "r2"]).await;
    let organizer = seed_user(&store, "o1", "organizer").await;
    seed_conference(&store, "c1", "o1").await;
    seed_paper(&store, "p1", "c1", "u1", &[("r1", Decision::Declined)]).await;

    let paper = reassign(&store, &caller_for(&organizer), "p1", &ids(&["r1", "r2"]))
        .await
        .unwrap();

    assert_eq!(paper.status_of("r1"), Decision::Declined);
    assert_eq!(paper.status_of("r2"), Decision::Pending);
    assert_eq!(paper.reviewer_statuses.len(), 2);
}

#[tokio::test]
async fn test_reassignment_rejects_author() {
    let store = memory_store().await;
    seed_reviewers(&store, &["r1", "r2", "u1"]).await;
    let organizer = seed_user(&store, "o1", "organizer").await;
    seed_conference(&store, "c1", "o1").await;
    let before =
        seed_paper(&store, "p1", "c1", "u1", &[("r1", Decision::Accepted), ("r2", Decision::Pending)])
            .await;

    let result = reassign(&store, &caller_for(&organizer), "p1", &ids(&["r2", "u1"])).await;
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
    assert_eq!(store.get_paper("p1").await.unwrap().unwrap(), before);
}

#[tokio::test]
async fn test_reassignment_with_one_invalid_id_writes_nothing() {
    let store = memory_store().await;
    seed_reviewers(&store, &["r1", "r2", "r3"]).await;
    seed_user(&store, "a9", "author").await;
    let organizer = seed_user(&store, "o1", "organizer").await;
    seed_conference(&store, "c1", "o1").await;
    let before =
        seed_paper(&store, "p1", "c1", "u1", &[("r1", Decision::Accepted), ("r2", Decision::Pending)])
            .await;

    for bad in [ids(&["r3", "a9"]), ids(&["r3", "ghost"])] {
        let result = reassign(&store, &caller_for(&organizer), "p1", &bad).await;
        assert!(matches!(result, Err(Error::InvalidArgument(_))), "{:?}", bad);
    }

    assert_eq!(store.get_paper("p1").await.unwrap().unwrap(), before);
    let r3 = store.get_user("r3").await.unwrap().unwrap();
    assert!(r3.assigned_papers.is_empty());
}

#[tokio::test]
async fn test_reassignment_checks() {
    let store = memory_store().await;
    seed_reviewers(&store, &["r1", "r2"]).await;
    let owner = seed_user(&store, "o1", "organizer").await;
    let other = seed_user(&store, "o2", "organizer").await;
    let author = seed_user(&store, "u1", "author").await;
    seed_conference(&store, "c1", "o1").await;
    seed_paper(&store, "p1", "c1", "u1", &[("r1", Decision::Pending), ("r2", Decision::Pending)])
        .await;

    assert!(matches!(
        reassign(&store, &caller_for(&author), "p1", &ids(&["r1"])).await,
        Err(Error::Forbidden(_))
    ));
    assert!(matches!(
        reassign(&store, &caller_for(&other), "p1", &ids(&["r1"])).await,
        Err(Error::Forbidden(_))
    ));
    assert!(matches!(
        reassign(&store, &caller_for(&owner), "p1", &[]).await,
        Err(Error::InvalidArgument(_))
    ));
    assert!(matches!(
        reassign(&store, &caller_for(&owner), "missing", &ids(&["r1"])).await,
        Err(Error::NotFound(_))
    ));
}

#[tokio::test]
async fn test_reassignment_away_from_reviewer_without_profile() {
    let store = memory_store().await;
    seed_reviewers(&store, &["r1", "r2"]).await;
    let owner = seed_user(&store, "o1", "organizer").await;
    seed_conference(&store, "c1", "o1").await;

    // "gone" is listed on the paper but has no user document
    let paper = Paper {
        id: "p1".to_string(),
        title: "Paper p1".to_string(),
        author_id: "u1".to_string(),
        conference_id: "c1".to_string(),
        reviewer_ids: ids(&["gone", "r1"]),
        reviewer_statuses: [
            ("gone".to_string(), Decision::Declined),
            ("r1".to_string(), Decision::Accepted),
        ]
        .into_iter()
        .collect(),
        created_at: timestamp(3),
        updated_at: timestamp(3),
    };
    store.insert_paper(&paper).await.unwrap();

    let updated = reassign(&store, &caller_for(&owner), "p1", &ids(&["r1", "r2"]))
        .await
        .unwrap();
    assert_eq!(updated.reviewer_ids, vec!["r1", "r2"]);
    assert_eq!(updated.status_of("r1"), Decision::Accepted);
    assert_eq!(updated.status_of("r2"), Decision::Pending);
    assert!(!updated.reviewer_statuses.contains_key("gone"));

    let stored = store.get_paper("p1").await.unwrap().unwrap();
    assert_eq!(stored, updated);
    let r2 = store.get_user("r2").await.unwrap().unwrap();
    assert_eq!(r2.assigned_papers, vec!["p1"]);
    assert!(store.get_user("gone").await.unwrap().is_none());
}

#[tokio::test]
async fn test_reassignment_deduplicates_in_request_order() {
    let store = memory_store().await;
    seed_reviewers(&store, &["r1", "r2", "r3"]).await;
    let organizer = seed_user(&store, "o1", "organizer").await;
    seed_conference(&store, "c1", "o1").await;
    seed_paper(&store, "p1", "c1", "u1", &[("r1", Decision::Pending), ("r2", Decision::Pending)])
        .await;

    let paper = reassign(
        &store,
        &caller_for(&organizer),
        "p1",
        &ids(&["r3", "r1", "r3", "r1"]),
    )
    .await
    .unwrap();

    assert_eq!(paper.reviewer_ids, ids(&["r3", "r1"]));
    assert!(paper.reviewers_consistent());
    let r2 = store.get_user("r2").await.unwrap().unwrap();
    assert!(r2.assigned_papers.is_empty());
}
