//! Query cache and mutation executor behaviour
//!
//! Exercised through the scripted data source from `mentor-test-utils`.

use mentor_query::prelude::*;
use mentor_test_utils::{move_card, Card, ScriptedSource};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use std::sync::Arc;
use std::time::Duration;

fn cache_over(source: &Arc<ScriptedSource>) -> QueryCache<ScriptedSource> {
    QueryCache::new(Arc::clone(source))
}

async fn wait_until_settled(cache: &QueryCache<ScriptedSource>) {
    while cache.stats().in_flight > 0 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_tasks_loading_then_success() {
    let source = Arc::new(ScriptedSource::with_board("tasks", 12, "new"));
    source.set_latency(Duration::from_millis(20));
    let cache = cache_over(&source);
    let key = QueryKey::new("tasks");

    let entry = cache.ensure(&key);
    assert_eq!(entry.status, QueryStatus::Loading);
    assert!(entry.data.is_none());

    let before = cache.get_snapshot(&key);
    assert_eq!(before.status, QueryStatus::Loading);
    assert!(before.data.is_none());

    let tasks = cache.fetch(&key).await.unwrap();
    assert_eq!(tasks.len(), 12);

    let after = cache.get_snapshot(&key);
    assert_eq!(after.status, QueryStatus::Success);
    assert_eq!(after.data.map(|cards| cards.len()), Some(12));
    assert!(after.last_fetched_at.is_some());
}

#[tokio::test]
async fn test_concurrent_ensure_issues_one_fetch() {
    let source = Arc::new(ScriptedSource::with_board("tasks", 3, "new"));
    source.pause();
    let cache = cache_over(&source);
    let key = QueryKey::new("tasks");

    cache.ensure(&key);
    cache.ensure(&key);

    let waiters: Vec<_> = (0..4)
        .map(|_| {
            let cache = cache.clone();
            let key = key.clone();
            tokio::spawn(async move { cache.fetch(&key).await })
        })
        .collect();

    source.resume();
    for waiter in waiters {
        assert_eq!(waiter.await.unwrap().unwrap().len(), 3);
    }
    assert_eq!(source.fetch_count(&key), 1);
    assert_eq!(cache.stats().fetches_started, 1);
}

#[tokio::test]
async fn test_invalidate_without_subscriber_refetches_lazily() {
    let source = Arc::new(ScriptedSource::with_board("tasks", 2, "new"));
    let cache = cache_over(&source);
    let key = QueryKey::new("tasks");
    cache.fetch(&key).await.unwrap();

    source.set_board("tasks", vec![Card::new("tasks-1", "done")]);
    assert_eq!(cache.invalidate(&[key.clone()]), 1);

    let entry = cache.get_snapshot(&key);
    assert!(entry.is_stale);
    assert!(!entry.is_fetching);
    assert_eq!(source.fetch_count(&key), 1);

    let entry = cache.ensure(&key);
    assert!(entry.is_fetching);
    cache.ensure(&key);

    let fresh = cache.fetch(&key).await.unwrap();
    assert_eq!(fresh, vec![Card::new("tasks-1", "done")]);
    assert_eq!(source.fetch_count(&key), 2);
}

#[tokio::test]
async fn test_invalidate_with_subscriber_refetches_now() {
    let source = Arc::new(ScriptedSource::with_board("sessions", 1, "scheduled"));
    let cache = cache_over(&source);
    let key = QueryKey::new("sessions");
    cache.fetch(&key).await.unwrap();

    let statuses = Arc::new(Mutex::new(Vec::new()));
    let _subscription = {
        let statuses = Arc::clone(&statuses);
        cache.subscribe(&key, move |entry| {
            statuses.lock().push((entry.status, entry.is_fetching));
        })
    };

    cache.invalidate(&[key.clone()]);
    wait_until_settled(&cache).await;

    assert_eq!(source.fetch_count(&key), 2);
    assert_eq!(
        *statuses.lock(),
        vec![
            (QueryStatus::Success, true),
            (QueryStatus::Success, false),
        ]
    );
    assert!(!cache.get_snapshot(&key).is_stale);
}

#[tokio::test]
async fn test_invalidate_during_fetch_serializes_refetch() {
    let source = Arc::new(ScriptedSource::with_board("messages", 1, "unread"));
    let cache = cache_over(&source);
    let key = QueryKey::new("messages");
    let _subscription = cache.subscribe(&key, |_| {});

    source.pause();
    cache.ensure(&key);
    cache.invalidate(&[key.clone()]);
    cache.invalidate(&[key.clone()]);
    assert_eq!(cache.stats().in_flight, 1);
    assert_eq!(cache.stats().fetches_started, 1);

    source.resume();
    cache.fetch(&key).await.unwrap();
    wait_until_settled(&cache).await;

    // One follow-up fetch for the invalidations made while loading.
    assert_eq!(cache.stats().fetches_started, 2);
    assert_eq!(source.fetch_count(&key), 2);
    assert!(!cache.get_snapshot(&key).is_stale);
}

#[tokio::test]
async fn test_invalidation_is_isolated_per_key() {
    let source = Arc::new(ScriptedSource::new());
    source.set_board("tasks", vec![Card::new("tasks-1", "new")]);
    source.set_board("thread", vec![Card::new("thread-1", "read")]);
    let cache = cache_over(&source);
    let tasks = QueryKey::new("tasks");
    let thread_one = QueryKey::new("thread").with("thread-1");
    let thread_two = QueryKey::new("thread").with("thread-2");

    cache.fetch(&tasks).await.unwrap();
    cache.fetch(&thread_one).await.unwrap();
    cache.fetch(&thread_two).await.unwrap();
    let tasks_before = cache.get_snapshot(&tasks);
    let two_before = cache.get_snapshot(&thread_two);

    cache.invalidate(&[thread_one.clone()]);
    assert!(cache.get_snapshot(&thread_one).is_stale);
    assert_eq!(cache.get_snapshot(&tasks), tasks_before);
    assert_eq!(cache.get_snapshot(&thread_two), two_before);

    assert_eq!(cache.invalidate_prefix(&QueryKey::new("thread")), 2);
    assert!(cache.get_snapshot(&thread_two).is_stale);
    assert_eq!(cache.get_snapshot(&tasks), tasks_before);
}

#[tokio::test]
async fn test_fetch_failure_is_local_to_key() {
    let source = Arc::new(ScriptedSource::with_board("earnings", 1, "paid"));
    source.set_board("resources", vec![Card::new("resources-1", "guide")]);
    let cache = cache_over(&source);
    let earnings = QueryKey::new("earnings");
    let resources = QueryKey::new("resources");

    cache.fetch(&resources).await.unwrap();
    let resources_before = cache.get_snapshot(&resources);

    source.fail_next_fetches(1);
    let err = cache.fetch(&earnings).await.unwrap_err();
    assert!(matches!(err, SourceError::Rejected { .. }));

    let entry = cache.get_snapshot(&earnings);
    assert_eq!(entry.status, QueryStatus::Error);
    assert_eq!(entry.error, Some(err));
    assert_eq!(cache.get_snapshot(&resources), resources_before);

    // Manual retry through ensure.
    cache.ensure(&earnings);
    assert_eq!(cache.fetch(&earnings).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unknown_resource_surfaces_error() {
    let source = Arc::new(ScriptedSource::new());
    let cache = cache_over(&source);

    let err = cache.fetch(&QueryKey::new("nope")).await.unwrap_err();
    assert_eq!(err, SourceError::UnknownResource("nope".to_string()));
}

#[tokio::test]
async fn test_last_unsubscribe_does_not_cancel_fetch() {
    let source = Arc::new(ScriptedSource::with_board("analytics", 2, "ok"));
    source.pause();
    let cache = cache_over(&source);
    let key = QueryKey::new("analytics");

    let subscription = cache.subscribe(&key, |_| {});
    cache.ensure(&key);
    subscription.unsubscribe();
    assert_eq!(cache.subscriber_count(&key), 0);

    source.resume();
    wait_until_settled(&cache).await;

    let entry = cache.get_snapshot(&key);
    assert_eq!(entry.status, QueryStatus::Success);
    assert_eq!(entry.data.map(|cards| cards.len()), Some(2));
}

#[tokio::test]
async fn test_optimistic_move_rolls_back_on_failure() {
    let source = Arc::new(ScriptedSource::with_board("tasks", 12, "new"));
    let cache = cache_over(&source);
    let executor = MutationExecutor::new(cache.clone());
    let key = QueryKey::new("tasks");
    cache.fetch(&key).await.unwrap();
    let before = cache.get_snapshot(&key);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let _subscription = {
        let seen = Arc::clone(&seen);
        cache.subscribe(&key, move |entry| {
            let status = entry
                .data
                .as_ref()
                .and_then(|cards| cards.iter().find(|c| c.id == "tasks-3"))
                .map(|c| c.status.clone());
            seen.lock().push(status);
        })
    };

    source.fail_next_operations(1);
    let err = executor
        .execute(
            MutationRequest::new(key.clone(), "move_card", Card::new("tasks-3", "in-progress"))
                .optimistic(|cards: &Vec<Card>| move_card(cards, "tasks-3", "in-progress")),
        )
        .await
        .unwrap_err();

    assert!(err.rolled_back());
    assert_eq!(cache.get_snapshot(&key), before);
    let status = cache
        .get_snapshot(&key)
        .data
        .unwrap()
        .into_iter()
        .find(|c| c.id == "tasks-3")
        .map(|c| c.status);
    assert_eq!(status.as_deref(), Some("new"));

    // Subscribers saw the optimistic value and then the rollback.
    assert_eq!(
        *seen.lock(),
        vec![Some("in-progress".to_string()), Some("new".to_string())]
    );
    assert_eq!(source.fetch_count(&key), 1);
}

#[tokio::test]
async fn test_optimistic_move_reconciles_with_refetch() {
    let source = Arc::new(ScriptedSource::with_board("tasks", 4, "new"));
    let cache = cache_over(&source);
    let executor = MutationExecutor::new(cache.clone());
    let key = QueryKey::new("tasks");
    cache.fetch(&key).await.unwrap();

    let outcome = executor
        .execute(
            MutationRequest::new(key.clone(), "move_card", Card::new("tasks-2", "done"))
                .also_invalidate(QueryKey::new("overview"))
                .optimistic(|cards: &Vec<Card>| move_card(cards, "tasks-2", "done")),
        )
        .await
        .unwrap();
    assert!(outcome.optimistic);

    let authoritative = cache.fetch(&key).await.unwrap();
    assert_eq!(authoritative, source.board("tasks"));
    assert_eq!(cache.get_snapshot(&key).data, Some(source.board("tasks")));
    assert!(!cache.get_snapshot(&key).is_stale);
}

#[tokio::test]
async fn test_optimistic_waits_for_in_flight_fetch() {
    let source = Arc::new(ScriptedSource::with_board("tasks", 2, "new"));
    let cache = cache_over(&source);
    let executor = MutationExecutor::new(cache.clone());
    let key = QueryKey::new("tasks");
    cache.fetch(&key).await.unwrap();

    source.pause();
    cache.invalidate(&[key.clone()]);
    cache.ensure(&key);

    let mutation = {
        let executor = executor.clone();
        let key = key.clone();
        tokio::spawn(async move {
            executor
                .execute(
                    MutationRequest::new(key, "move_card", Card::new("tasks-1", "done"))
                        .optimistic(|cards: &Vec<Card>| move_card(cards, "tasks-1", "done")),
                )
                .await
        })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(source.executions(), 0);

    source.resume();
    let outcome = mutation.await.unwrap().unwrap();
    assert!(outcome.optimistic);
    assert_eq!(cache.fetch(&key).await.unwrap(), source.board("tasks"));
}

#[tokio::test]
async fn test_failed_mutation_leaves_other_entries_alone() {
    let source = Arc::new(ScriptedSource::with_board("tasks", 2, "new"));
    source.set_board("sessions", vec![Card::new("sessions-1", "scheduled")]);
    let cache = cache_over(&source);
    let executor = MutationExecutor::new(cache.clone());
    cache.fetch(&QueryKey::new("tasks")).await.unwrap();
    cache.fetch(&QueryKey::new("sessions")).await.unwrap();
    let sessions_before = cache.get_snapshot(&QueryKey::new("sessions"));

    source.fail_next_operations(1);
    let err = executor
        .execute(
            MutationRequest::new(QueryKey::new("tasks"), "move_card", Card::new("tasks-1", "done"))
                .also_invalidate(QueryKey::new("sessions")),
        )
        .await
        .unwrap_err();

    assert!(!err.rolled_back());
    assert_eq!(cache.get_snapshot(&QueryKey::new("sessions")), sessions_before);
    assert!(!cache.get_snapshot(&QueryKey::new("tasks")).is_stale);
}

/// Key count and a sequence of indices to invalidate
fn keys_and_invalidations() -> impl Strategy<Value = (usize, Vec<usize>)> {
    (2usize..6).prop_flat_map(|count| (Just(count), prop::collection::vec(0..count, 1..12)))
}

fn board_keys(count: usize) -> Vec<QueryKey> {
    let mut keys = vec![QueryKey::new("tasks")];
    keys.extend((1..count).map(|i| QueryKey::new("thread").with(format!("thread-{i}"))));
    keys
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn test_invalidation_never_touches_other_keys((count, picks) in keys_and_invalidations()) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();

        runtime.block_on(async {
            let source = Arc::new(ScriptedSource::with_board("tasks", 3, "new"));
            source.set_board("thread", vec![Card::new("thread-1", "read")]);
            let cache = cache_over(&source);
            let keys = board_keys(count);
            for key in &keys {
                cache.fetch(key).await.unwrap();
            }

            for pick in picks {
                let target = &keys[pick];
                let others: Vec<_> = keys
                    .iter()
                    .filter(|key| *key != target)
                    .map(|key| cache.get_snapshot(key))
                    .collect();

                prop_assert_eq!(cache.invalidate(std::slice::from_ref(target)), 1);
                prop_assert!(cache.get_snapshot(target).is_stale);

                for before in others {
                    let after = cache.get_snapshot(&before.key);
                    prop_assert_eq!(after.status, before.status);
                    prop_assert_eq!(&after.data, &before.data);
                    prop_assert_eq!(after.last_fetched_at, before.last_fetched_at);
                    prop_assert_eq!(after.is_stale, before.is_stale);
                }
            }
            Ok(())
        })?;
    }
}
