//! Request-path tests: reaction toggles and page reads against in-memory ports
//!
//! Run with: cargo test -p tuning-service --test service_tests

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use common::Harness;
use tuning_core::{
    CachedReaction, ReactionKind, ReportCache, ReportId, ReportQuery, ReportSort, UserId,
};
use tuning_service::{ReactionMutator, ReportQueryRouter, RetryPolicy, ServiceError};

const HEART: ReactionKind = ReactionKind::Heart;

// ============================================================================
// Reaction toggle
// ============================================================================

#[tokio::test]
async fn test_toggle_round_trip() {
    let h = Harness::new();
    h.repo.insert(42, Duration::from_secs(60), true).await;
    let mutator = ReactionMutator::new(&h.ctx);

    let first = mutator
        .toggle(ReportId::new(42), UserId::new(7), HEART)
        .await
        .unwrap();
    assert!(first.reacted);
    assert_eq!(first.updated_count, 1);
    assert_eq!(first.report_id, 42);

    let second = mutator
        .toggle(ReportId::new(42), UserId::new(7), HEART)
        .await
        .unwrap();
    assert!(!second.reacted);
    assert_eq!(second.updated_count, 0);

    assert!(!h.repo.has_row(42, 7, HEART).await);
    assert_eq!(h.repo.counts(42).await.heart, 0);
}

#[tokio::test]
async fn test_toggle_updates_cache_and_marks_dirty() {
    let h = Harness::new();
    h.repo.seed(3).await;

    // Populate the canonical page so there is a snapshot to patch
    ReportQueryRouter::new(&h.ctx)
        .fetch_page(ReportQuery::canonical(), UserId::new(1))
        .await
        .unwrap();

    ReactionMutator::new(&h.ctx)
        .toggle(ReportId::new(2), UserId::new(7), ReactionKind::Eyes)
        .await
        .unwrap();

    assert_eq!(h.cache.cached_flag(2, 7, ReactionKind::Eyes), CachedReaction::Reacted);
    assert_eq!(h.cache.snapshot(2).unwrap().counts.eyes, 1);
    assert!(h.cache.is_dirty(2));
    assert!(!h.cache.is_dirty(1));
}

#[tokio::test]
async fn test_late_cache_sync_does_not_overwrite_newer_flag() {
    let h = Harness::new();
    h.repo.seed(2).await;
    let mutator = ReactionMutator::new(&h.ctx);

    let on = mutator.toggle(ReportId::new(1), UserId::new(7), HEART).await.unwrap();
    let off = mutator.toggle(ReportId::new(1), UserId::new(7), HEART).await.unwrap();
    assert!(on.reacted);
    assert!(!off.reacted);

    // The first toggle's sync arriving after the second one's
    let written = h
        .cache
        .set_user_reaction(ReportId::new(1), UserId::new(7), HEART, true, 1)
        .await
        .unwrap();

    assert!(!written);
    assert_eq!(h.cache.cached_flag(1, 7, HEART), CachedReaction::NotReacted);
}

#[tokio::test]
async fn test_toggle_overrides_backfilled_flags() {
    let h = Harness::new();
    h.repo.seed(2).await;

    // The page read caches an unversioned copy of user 7's (empty) reactions
    ReportQueryRouter::new(&h.ctx)
        .fetch_page(ReportQuery::canonical(), UserId::new(7))
        .await
        .unwrap();
    assert_eq!(h.cache.cached_flag(2, 7, HEART), CachedReaction::NotReacted);

    ReactionMutator::new(&h.ctx)
        .toggle(ReportId::new(2), UserId::new(7), HEART)
        .await
        .unwrap();

    assert_eq!(h.cache.cached_flag(2, 7, HEART), CachedReaction::Reacted);
}

#[tokio::test]
async fn test_counters_never_go_negative() {
    let h = Harness::new();
    h.repo.seed(2).await;
    let mutator = ReactionMutator::new(&h.ctx);

    for round in 0..3 {
        for user in 1..=4 {
            for kind in ReactionKind::ALL {
                // Uneven toggle counts leave some users reacted and some not
                if (user + round) % 2 == 0 || kind == HEART {
                    mutator
                        .toggle(ReportId::new(1), UserId::new(user), kind)
                        .await
                        .unwrap();
                }
            }
        }
    }

    let counts = h.repo.counts(1).await;
    for kind in ReactionKind::ALL {
        assert!(counts.get(kind) >= 0);
        assert_eq!(counts.get(kind), h.repo.row_count(1, kind).await as i64);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_toggles_converge() {
    const USERS: i64 = 16;

    let h = Harness::new();
    h.repo.insert(42, Duration::from_secs(60), true).await;

    let tasks: Vec<_> = (1..=USERS)
        .map(|user| {
            let ctx = h.replica();
            tokio::spawn(async move {
                ReactionMutator::new(&ctx)
                    .toggle(ReportId::new(42), UserId::new(user), HEART)
                    .await
            })
        })
        .collect();

    for task in tasks {
        let response = task.await.unwrap().unwrap();
        assert!(response.reacted);
    }

    assert_eq!(h.repo.counts(42).await.heart, USERS);
    assert_eq!(h.repo.row_count(42, HEART).await, USERS as usize);
}

#[tokio::test]
async fn test_toggle_missing_or_hidden_report_is_not_found() {
    let h = Harness::new();
    h.repo.insert(1, Duration::from_secs(60), false).await;
    h.repo.insert(2, Duration::from_secs(60), true).await;
    h.repo.soft_delete(2).await;
    let mutator = ReactionMutator::new(&h.ctx);

    for id in [1, 2, 99] {
        let err = mutator
            .toggle(ReportId::new(id), UserId::new(7), HEART)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), 404);
        assert!(!err.is_retryable());
    }

    // Not-found is not retried
    assert_eq!(h.repo.toggle_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_contention_is_retried() {
    let h = Harness::new();
    h.repo.insert(5, Duration::from_secs(60), true).await;
    h.repo.contend_next(2);

    let response = ReactionMutator::new(&h.ctx)
        .toggle(ReportId::new(5), UserId::new(1), HEART)
        .await
        .unwrap();

    assert!(response.reacted);
    assert_eq!(h.repo.toggle_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_retry_exhaustion_surfaces_conflict() {
    let h = Harness::with_retry(RetryPolicy::new(3, Duration::from_millis(1), 2));
    h.repo.insert(5, Duration::from_secs(60), true).await;
    h.repo.contend_next(10);

    let err = ReactionMutator::new(&h.ctx)
        .toggle(ReportId::new(5), UserId::new(1), HEART)
        .await
        .unwrap_err();

    assert!(matches!(err, ServiceError::RetryableConflict { attempts: 3 }));
    assert_eq!(err.status_code(), 409);
    assert!(err.is_retryable());
    assert_eq!(h.repo.toggle_calls.load(Ordering::SeqCst), 3);
    assert!(!h.repo.has_row(5, 1, HEART).await);
    assert!(!h.cache.is_dirty(5));
}

#[tokio::test]
async fn test_toggle_succeeds_with_cache_down() {
    let h = Harness::new();
    h.repo.insert(8, Duration::from_secs(60), true).await;
    h.cache.set_unavailable(true);

    let response = ReactionMutator::new(&h.ctx)
        .toggle(ReportId::new(8), UserId::new(3), ReactionKind::Laugh)
        .await
        .unwrap();

    assert!(response.reacted);
    assert_eq!(response.updated_count, 1);
    assert!(h.repo.has_row(8, 3, ReactionKind::Laugh).await);
}

// ============================================================================
// Page reads
// ============================================================================

#[tokio::test]
async fn test_cache_miss_then_hit() {
    let h = Harness::new();
    h.repo.seed(12).await;
    let router = ReportQueryRouter::new(&h.ctx);

    let first = router
        .fetch_page(ReportQuery::canonical(), UserId::new(7))
        .await
        .unwrap();
    assert_eq!(h.repo.page_queries.load(Ordering::SeqCst), 1);
    assert_eq!(h.cache.set_page_calls.load(Ordering::SeqCst), 1);
    assert_eq!(first.items.len(), 10);
    assert_eq!(first.items[0].id, 12);
    assert!(first.pagination.has_next);

    let second = router
        .fetch_page(ReportQuery::canonical(), UserId::new(7))
        .await
        .unwrap();
    assert_eq!(h.repo.page_queries.load(Ordering::SeqCst), 1);
    // Flags were backfilled by the first read
    assert_eq!(h.repo.user_reaction_queries.load(Ordering::SeqCst), 1);
    assert_eq!(second.items, first.items);
}

#[tokio::test]
async fn test_enrichment_reads_cached_flags_in_one_call() {
    let h = Harness::new();
    h.repo.seed(12).await;
    let router = ReportQueryRouter::new(&h.ctx);

    for _ in 0..2 {
        router
            .fetch_page(ReportQuery::canonical(), UserId::new(7))
            .await
            .unwrap();
    }

    // One cache read per page of ten, one DB lookup for the first page only
    assert_eq!(h.cache.user_reaction_reads.load(Ordering::SeqCst), 2);
    assert_eq!(h.repo.user_reaction_queries.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_enrichment_reflects_user_reactions() {
    let h = Harness::new();
    h.repo.seed(3).await;

    // Reacted directly in the database with the cache down, so nothing is cached for user 7
    h.cache.set_unavailable(true);
    ReactionMutator::new(&h.ctx)
        .toggle(ReportId::new(2), UserId::new(7), HEART)
        .await
        .unwrap();
    h.cache.set_unavailable(false);

    let page = ReportQueryRouter::new(&h.ctx)
        .fetch_page(ReportQuery::canonical(), UserId::new(7))
        .await
        .unwrap();

    let item = page.items.iter().find(|r| r.id == 2).unwrap();
    assert!(item.my_reactions.heart);
    assert_eq!(item.reactions.heart, 1);
    assert!(page.items.iter().filter(|r| r.id != 2).all(|r| !r.my_reactions.heart));

    // Another user sees the count but not the flag
    let other = ReportQueryRouter::new(&h.ctx)
        .fetch_page(ReportQuery::canonical(), UserId::new(8))
        .await
        .unwrap();
    let item = other.items.iter().find(|r| r.id == 2).unwrap();
    assert!(!item.my_reactions.heart);
    assert_eq!(item.reactions.heart, 1);
}

#[tokio::test]
async fn test_cache_unreachable_falls_back_to_database() {
    let h = Harness::new();
    h.repo.seed(4).await;
    ReactionMutator::new(&h.ctx)
        .toggle(ReportId::new(3), UserId::new(7), ReactionKind::Celebrate)
        .await
        .unwrap();

    h.cache.set_unavailable(true);
    let page = ReportQueryRouter::new(&h.ctx)
        .fetch_page(ReportQuery::canonical(), UserId::new(7))
        .await
        .unwrap();

    assert_eq!(page.items.len(), 4);
    let item = page.items.iter().find(|r| r.id == 3).unwrap();
    assert!(item.my_reactions.celebrate);
    assert_eq!(item.reactions.celebrate, 1);
    assert_eq!(h.repo.page_queries.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_non_canonical_query_bypasses_cache() {
    let h = Harness::new();
    h.repo.seed(25).await;
    let router = ReportQueryRouter::new(&h.ctx);

    let query = ReportQuery::new(1, 10, ReportSort::Latest);
    let page = router.fetch_page(query, UserId::new(7)).await.unwrap();
    router.fetch_page(query, UserId::new(7)).await.unwrap();

    assert_eq!(page.items.len(), 10);
    assert_eq!(page.items[0].id, 15);
    assert_eq!(h.repo.page_queries.load(Ordering::SeqCst), 2);
    assert!(h.cache.cached_page().is_none());

    let oldest = router
        .fetch_page(ReportQuery::new(0, 5, ReportSort::Oldest), UserId::new(7))
        .await
        .unwrap();
    assert_eq!(oldest.items[0].id, 1);
    assert!(h.cache.cached_page().is_none());
}

#[tokio::test]
async fn test_empty_page_is_not_cached() {
    let h = Harness::new();
    let page = ReportQueryRouter::new(&h.ctx)
        .fetch_page(ReportQuery::canonical(), UserId::new(7))
        .await
        .unwrap();

    assert!(page.items.is_empty());
    assert!(!page.pagination.has_next);
    assert!(h.cache.cached_page().is_none());
}
