use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use talkforum_backend::cache::keys::POST_KEYS;
use talkforum_backend::cache::{
    CachePolicy, DistributedMutex, FailurePolicy, OwnerToken, ReadThroughCache, SessionStore,
    SlidingWindowRateLimiter,
};
use talkforum_backend::error::CacheError;
use talkforum_backend::store::{KeyValueStore, MemoryStore};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Post {
    id: i64,
    title: String,
}

fn post(id: i64) -> Post {
    Post {
        id,
        title: format!("post {id}"),
    }
}

fn cache_with(store: &Arc<MemoryStore>, policy: CachePolicy) -> ReadThroughCache<Post> {
    ReadThroughCache::new(store.clone(), POST_KEYS, policy)
}

async fn counted_load(
    loads: &AtomicUsize,
    value: Option<Post>,
    delay: Duration,
) -> Result<Option<Post>, std::io::Error> {
    loads.fetch_add(1, Ordering::SeqCst);
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
    Ok(value)
}

#[tokio::test(start_paused = true)]
async fn concurrent_misses_load_once() {
    let store = Arc::new(MemoryStore::new());
    let cache = cache_with(&store, CachePolicy::default());
    let loads = AtomicUsize::new(0);

    let (cache, loads) = (&cache, &loads);
    let callers = (0..20).map(move |_| {
        cache.get("1", move || {
            counted_load(loads, Some(post(1)), Duration::from_millis(120))
        })
    });
    let results = join_all(callers).await;

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    for result in results {
        assert_eq!(result.unwrap(), Some(post(1)));
    }
}

#[tokio::test(start_paused = true)]
async fn concurrent_misses_on_missing_entity_share_one_load() {
    let store = Arc::new(MemoryStore::new());
    let cache = cache_with(&store, CachePolicy::default());
    let loads = AtomicUsize::new(0);

    let (cache, loads) = (&cache, &loads);
    let callers = (0..20).map(move |_| {
        cache.get("404", move || counted_load(loads, None, Duration::from_millis(120)))
    });
    let results = join_all(callers).await;

    assert_eq!(loads.load(Ordering::SeqCst), 1);
    for result in results {
        assert_eq!(result.unwrap(), None);
    }
    assert_eq!(
        store.get("post_cache:404").await.unwrap().as_deref(),
        Some("HIT_NONE")
    );
}

async fn settle_background_tasks() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

async fn crashing_load() -> Result<Option<Post>, std::io::Error> {
    panic!("loader crashed")
}

#[tokio::test(start_paused = true)]
async fn cancelled_rebuild_releases_lock() {
    let store = Arc::new(MemoryStore::new());
    let cache = cache_with(&store, CachePolicy::default());
    let loads = AtomicUsize::new(0);

    let cancelled = tokio::time::timeout(
        Duration::from_millis(100),
        cache.get("1", || counted_load(&loads, Some(post(1)), Duration::from_secs(1))),
    )
    .await;
    assert!(cancelled.is_err());
    settle_background_tasks().await;
    assert_eq!(store.get("post_cache:lock:1").await.unwrap(), None);

    let result = cache
        .get("1", || counted_load(&loads, Some(post(1)), Duration::ZERO))
        .await
        .unwrap();
    assert_eq!(result, Some(post(1)));
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn panicking_loader_releases_lock() {
    let store = Arc::new(MemoryStore::new());
    let cache = Arc::new(cache_with(&store, CachePolicy::default()));

    let task = {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.get("1", crashing_load).await })
    };
    assert!(task.await.unwrap_err().is_panic());
    settle_background_tasks().await;
    assert_eq!(store.get("post_cache:lock:1").await.unwrap(), None);

    let loads = AtomicUsize::new(0);
    let result = cache
        .get("1", || counted_load(&loads, Some(post(1)), Duration::ZERO))
        .await
        .unwrap();
    assert_eq!(result, Some(post(1)));
}

#[tokio::test(start_paused = true)]
async fn missing_entity_is_cached_as_absent() {
    let store = Arc::new(MemoryStore::new());
    let policy = CachePolicy::default();
    let cache = cache_with(&store, policy);
    let loads = AtomicUsize::new(0);

    for _ in 0..3 {
        let result = cache
            .get("404", || counted_load(&loads, None, Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(result, None);
    }
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    assert_eq!(
        store.get("post_cache:404").await.unwrap().as_deref(),
        Some("HIT_NONE")
    );
    assert_eq!(
        store.ttl("post_cache:404").await.unwrap(),
        Some(policy.absent_ttl)
    );

    // 空值标记过期后重新回源
    tokio::time::advance(policy.absent_ttl).await;
    cache
        .get("404", || counted_load(&loads, None, Duration::ZERO))
        .await
        .unwrap();
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn entity_ttls_are_spread_over_jitter_range() {
    let store = Arc::new(MemoryStore::new());
    let policy = CachePolicy::default();
    let cache = cache_with(&store, policy);
    let loads = AtomicUsize::new(0);

    let mut distinct = std::collections::HashSet::new();
    for id in 1..=100 {
        cache
            .get(&id.to_string(), || {
                counted_load(&loads, Some(post(id)), Duration::ZERO)
            })
            .await
            .unwrap();
        let ttl = store
            .ttl(&format!("post_cache:{id}"))
            .await
            .unwrap()
            .unwrap();
        assert!(ttl >= policy.base_ttl, "ttl {ttl:?} below base");
        assert!(ttl <= policy.base_ttl + policy.jitter, "ttl {ttl:?} above range");
        distinct.insert(ttl);
    }
    assert!(distinct.len() > 1);
}

#[tokio::test(start_paused = true)]
async fn crashed_lock_holder_blocks_only_until_lock_expires() {
    let store = Arc::new(MemoryStore::new());
    let policy = CachePolicy {
        max_attempts: 200,
        ..CachePolicy::default()
    };
    let cache = cache_with(&store, policy);
    let mutex = DistributedMutex::new(store.clone());
    let loads = AtomicUsize::new(0);

    // 持有者拿到锁后崩溃，永远不会释放
    let crashed = OwnerToken::generate();
    assert!(
        mutex
            .try_acquire("post_cache:lock:1", &crashed, policy.lock_ttl)
            .await
            .unwrap()
    );

    let started = tokio::time::Instant::now();
    let result = cache
        .get("1", || counted_load(&loads, Some(post(1)), Duration::ZERO))
        .await
        .unwrap();

    assert_eq!(result, Some(post(1)));
    assert!(started.elapsed() >= policy.lock_ttl);
    assert_eq!(loads.load(Ordering::SeqCst), 1);
    // 新持有者已释放，崩溃者的令牌不能再删除任何东西
    assert!(!mutex.release("post_cache:lock:1", &crashed).await.unwrap());
}

#[tokio::test(start_paused = true)]
async fn contention_beyond_attempt_budget_is_unavailable() {
    let store = Arc::new(MemoryStore::new());
    let policy = CachePolicy::default();
    let cache = cache_with(&store, policy);
    let mutex = DistributedMutex::new(store.clone());
    let loads = AtomicUsize::new(0);

    let holder = OwnerToken::generate();
    mutex
        .try_acquire("post_cache:lock:1", &holder, Duration::from_secs(60))
        .await
        .unwrap();

    let err = cache
        .get("1", || counted_load(&loads, Some(post(1)), Duration::ZERO))
        .await
        .unwrap_err();

    match err {
        CacheError::Unavailable { key, attempts } => {
            assert_eq!(key, "post_cache:1");
            assert_eq!(attempts, policy.max_attempts);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(loads.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn loader_failure_releases_lock() {
    let store = Arc::new(MemoryStore::new());
    let cache = cache_with(&store, CachePolicy::default());

    let err = cache
        .get("1", || async {
            Err::<Option<Post>, _>(std::io::Error::other("database down"))
        })
        .await
        .unwrap_err();
    assert!(matches!(err, CacheError::Loader(_)));
    assert_eq!(store.get("post_cache:lock:1").await.unwrap(), None);
    assert_eq!(store.get("post_cache:1").await.unwrap(), None);
}

#[tokio::test]
async fn unreachable_store_degrades_to_direct_load() {
    let store = Arc::new(MemoryStore::new());
    let cache = cache_with(&store, CachePolicy::default());
    let loads = AtomicUsize::new(0);
    store.set_offline(true);

    for _ in 0..2 {
        let result = cache
            .get("1", || counted_load(&loads, Some(post(1)), Duration::ZERO))
            .await
            .unwrap();
        assert_eq!(result, Some(post(1)));
    }
    assert_eq!(loads.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn corrupt_entry_is_replaced() {
    let store = Arc::new(MemoryStore::new());
    let cache = cache_with(&store, CachePolicy::default());
    let loads = AtomicUsize::new(0);
    store
        .set_with_ttl("post_cache:1", "{broken", Duration::from_secs(60))
        .await
        .unwrap();

    let result = cache
        .get("1", || counted_load(&loads, Some(post(1)), Duration::ZERO))
        .await
        .unwrap();
    assert_eq!(result, Some(post(1)));
    assert_eq!(loads.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn refresh_with_absent_entity_removes_entry() {
    let store = Arc::new(MemoryStore::new());
    let cache = cache_with(&store, CachePolicy::default());
    let loads = AtomicUsize::new(0);

    cache
        .get("1", || counted_load(&loads, Some(post(1)), Duration::ZERO))
        .await
        .unwrap();
    let refreshed = cache
        .refresh("1", || counted_load(&loads, None, Duration::ZERO))
        .await
        .unwrap();

    assert_eq!(refreshed, None);
    assert_eq!(store.get("post_cache:1").await.unwrap(), None);
}

#[tokio::test]
async fn new_session_invalidates_previous_token() {
    let sessions = SessionStore::new(Arc::new(MemoryStore::new()));
    let ttl = Duration::from_secs(86_400);

    sessions.issue(42, "token-a", ttl).await.unwrap();
    sessions.issue(42, "token-b", ttl).await.unwrap();

    assert!(!sessions.validate(42, "token-a").await.unwrap());
    assert!(sessions.validate(42, "token-b").await.unwrap());
}

#[tokio::test]
async fn rate_limit_window_scenario() {
    let limiter =
        SlidingWindowRateLimiter::new(Arc::new(MemoryStore::new()), FailurePolicy::Closed);
    let window = Duration::from_millis(1000);
    let t0 = 1_700_000_000_000_i64;
    let id = "ip:203.0.113.5";

    for offset in [0, 50, 100, 150, 200] {
        assert!(limiter.admit_at(id, window, 5, t0 + offset).await);
    }
    assert!(!limiter.admit_at(id, window, 5, t0 + 250).await);
    assert!(limiter.admit_at(id, window, 5, t0 + 1100).await);
}

#[tokio::test]
async fn concurrent_requests_never_exceed_limit() {
    let limiter =
        SlidingWindowRateLimiter::new(Arc::new(MemoryStore::new()), FailurePolicy::Closed);
    let window = Duration::from_millis(1000);

    let limiter = &limiter;
    let admitted = join_all((0..50).map(move |_| limiter.admit_at("ip:198.51.100.1", window, 5, 10)))
        .await
        .into_iter()
        .filter(|admitted| *admitted)
        .count();
    assert_eq!(admitted, 5);
}

#[tokio::test]
async fn rate_limiter_failure_policy() {
    let store = Arc::new(MemoryStore::new());
    store.set_offline(true);
    let window = Duration::from_millis(1000);

    let closed = SlidingWindowRateLimiter::new(store.clone(), FailurePolicy::Closed);
    let open = SlidingWindowRateLimiter::new(store.clone(), FailurePolicy::Open);

    assert!(!closed.admit("ip:203.0.113.5", window, 5).await);
    assert!(open.admit("ip:203.0.113.5", window, 5).await);
}
