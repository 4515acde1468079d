//! Keyed cache of fetch results with freshness, coalescing and a single writer.
//!
//! Each key owns one [`Slot`]: the last good value, when it was stored, the
//! last error, and at most one in-flight request. The rules:
//!
//! - A value younger than `stale_time` is fresh and served without a request.
//! - An older value is still served, and a refetch is started next to it
//!   (stale-while-revalidate).
//! - While a request for a key is in flight, every further request for the
//!   same key joins it instead of issuing another one.
//! - Only the request registered in the slot may write the slot. A request
//!   that was superseded by [`KeyedCache::invalidate`] completes for its own
//!   awaiters but leaves the cache untouched.

use crate::error::{FetchError, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// A request that any number of callers can await.
pub type SharedFetch<V> = Shared<BoxFuture<'static, Result<V>>>;

/// A cache hit, with its age classification.
#[derive(Debug, Clone)]
pub struct Cached<V> {
    pub value: V,
    pub is_stale: bool,
    pub updated_at: Instant,
}

struct Slot<V> {
    value: Option<(V, Instant)>,
    error: Option<FetchError>,
    inflight: Option<(u64, SharedFetch<V>)>,
    touched_at: Instant,
}

impl<V> Slot<V> {
    fn new() -> Self {
        Self {
            value: None,
            error: None,
            inflight: None,
            touched_at: Instant::now(),
        }
    }
}

type Slots<K, V> = Mutex<HashMap<K, Slot<V>>>;

fn lock<K, V>(slots: &Slots<K, V>) -> MutexGuard<'_, HashMap<K, Slot<V>>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct KeyedCache<K, V> {
    slots: Arc<Slots<K, V>>,
    stale_time: Duration,
    tickets: Arc<AtomicU64>,
}

impl<K, V> Clone for KeyedCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            slots: Arc::clone(&self.slots),
            stale_time: self.stale_time,
            tickets: Arc::clone(&self.tickets),
        }
    }
}

impl<K, V> fmt::Debug for KeyedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedCache")
            .field("entries", &lock(&self.slots).len())
            .field("stale_time", &self.stale_time)
            .finish()
    }
}

impl<K, V> KeyedCache<K, V>
where
    K: Eq + Hash + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    pub fn new(stale_time: Duration) -> Self {
        Self {
            slots: Arc::new(Mutex::new(HashMap::new())),
            stale_time,
            tickets: Arc::new(AtomicU64::new(1)),
        }
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    /// The stored value for `key`, if any, without triggering a request.
    pub fn peek(&self, key: &K) -> Option<Cached<V>> {
        let mut slots = lock(&self.slots);
        let slot = slots.get_mut(key)?;
        slot.touched_at = Instant::now();
        let (value, updated_at) = slot.value.as_ref()?;
        Some(Cached {
            value: value.clone(),
            is_stale: updated_at.elapsed() >= self.stale_time,
            updated_at: *updated_at,
        })
    }

    /// The error left by the most recent failed request for `key`.
    pub fn last_error(&self, key: &K) -> Option<FetchError> {
        lock(&self.slots).get(key).and_then(|s| s.error.clone())
    }

    pub fn is_fetching(&self, key: &K) -> bool {
        lock(&self.slots)
            .get(key)
            .is_some_and(|s| s.inflight.is_some())
    }

    /// Start a request for `key`, or join the one already in flight.
    ///
    /// `fetcher` is only invoked when no request is in flight.
    pub fn fetch<F, Fut>(&self, key: K, fetcher: F) -> SharedFetch<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let mut slots = lock(&self.slots);
        let slot = slots.entry(key.clone()).or_insert_with(Slot::new);
        slot.touched_at = Instant::now();

        if let Some((_, inflight)) = &slot.inflight {
            debug!(?key, "Joining in-flight request");
            return inflight.clone();
        }

        let ticket = self.tickets.fetch_add(1, Ordering::Relaxed);
        let slots_ref = Arc::downgrade(&self.slots);
        let request = fetcher();
        let shared = async move {
            let result = request.await;
            complete(&slots_ref, &key, ticket, &result);
            result
        }
        .boxed()
        .shared();

        slot.inflight = Some((ticket, shared.clone()));
        shared
    }

    /// Serve from cache when possible; otherwise wait for the network.
    ///
    /// A stale hit is returned immediately and revalidated in the background.
    pub async fn get<F, Fut>(&self, key: K, fetcher: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        match self.peek(&key) {
            Some(hit) if !hit.is_stale => {
                debug!(?key, "Fresh cache hit");
                Ok(hit.value)
            }
            Some(hit) => {
                debug!(?key, "Stale cache hit; revalidating in background");
                self.revalidate(key, fetcher);
                Ok(hit.value)
            }
            None => self.fetch(key, fetcher).await,
        }
    }

    /// Refresh `key` in the background; the result lands in the cache.
    pub fn revalidate<F, Fut>(&self, key: K, fetcher: F)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>> + Send + 'static,
    {
        let request = self.fetch(key, fetcher);
        tokio::spawn(async move {
            let _ = request.await;
        });
    }

    /// Forget `key`. A request in flight for it will no longer write back.
    pub fn invalidate(&self, key: &K) {
        lock(&self.slots).remove(key);
    }

    pub fn invalidate_where(&self, mut predicate: impl FnMut(&K) -> bool) {
        lock(&self.slots).retain(|k, _| !predicate(k));
    }

    /// Drop idle entries that have nothing in flight.
    pub fn collect_garbage(&self, max_idle: Duration) -> usize {
        let mut slots = lock(&self.slots);
        let before = slots.len();
        slots.retain(|_, slot| slot.inflight.is_some() || slot.touched_at.elapsed() < max_idle);
        let evicted = before - slots.len();
        if evicted > 0 {
            debug!(evicted, remaining = slots.len(), "Collected idle cache entries");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        lock(&self.slots).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write a finished request back, if it is still the slot's writer.
fn complete<K, V>(slots: &Weak<Slots<K, V>>, key: &K, ticket: u64, result: &Result<V>)
where
    K: Eq + Hash + fmt::Debug,
    V: Clone,
{
    let Some(slots) = slots.upgrade() else {
        return;
    };
    let mut slots = lock(&slots);
    let Some(slot) = slots.get_mut(key) else {
        debug!(?key, "Slot evicted while request was in flight; result not cached");
        return;
    };
    if !slot.inflight.as_ref().is_some_and(|(t, _)| *t == ticket) {
        debug!(?key, "Superseded request finished; result not cached");
        return;
    }
    slot.inflight = None;
    match result {
        Ok(value) => {
            slot.value = Some((value.clone(), Instant::now()));
            slot.error = None;
        }
        Err(e) => {
            warn!(?key, error = %e, "Request failed; keeping previous value");
            slot.error = Some(e.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting(calls: &Arc<AtomicUsize>, value: u32) -> impl Future<Output = Result<u32>> + Send + 'static {
        calls.fetch_add(1, Ordering::SeqCst);
        async move { Ok(value) }
    }

    #[tokio::test]
    async fn test_concurrent_requests_coalesce() {
        let cache: KeyedCache<&'static str, u32> = KeyedCache::new(Duration::from_secs(30));
        let calls = Arc::new(AtomicUsize::new(0));

        let a = cache.fetch("k", || counting(&calls, 1));
        let b = cache.fetch("k", || counting(&calls, 2));
        assert!(cache.is_fetching(&"k"));
        let (a, b) = futures::join!(a, b);

        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!cache.is_fetching(&"k"));
        assert_eq!(cache.peek(&"k").unwrap().value, 1);
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_coalesce() {
        let cache: KeyedCache<u32, u32> = KeyedCache::new(Duration::from_secs(30));
        let calls = Arc::new(AtomicUsize::new(0));
        let (a, b) = futures::join!(
            cache.fetch(1, || counting(&calls, 10)),
            cache.fetch(2, || counting(&calls, 20))
        );
        assert_eq!((a.unwrap(), b.unwrap()), (10, 20));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_then_stale_while_revalidate() {
        let cache: KeyedCache<&'static str, u32> = KeyedCache::new(Duration::from_secs(30));
        let calls = Arc::new(AtomicUsize::new(0));

        assert_eq!(cache.get("k", || counting(&calls, 1)).await.unwrap(), 1);
        assert_eq!(cache.get("k", || counting(&calls, 2)).await.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(31)).await;
        assert!(cache.peek(&"k").unwrap().is_stale);

        // Stale value served immediately, refresh happens behind it.
        assert_eq!(cache.get("k", || counting(&calls, 2)).await.unwrap(), 1);
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        let hit = cache.peek(&"k").unwrap();
        assert_eq!(hit.value, 2);
        assert!(!hit.is_stale);
    }

    #[tokio::test]
    async fn test_error_keeps_previous_value() {
        let cache: KeyedCache<&'static str, u32> = KeyedCache::new(Duration::ZERO);
        cache.fetch("k", || async { Ok(7) }).await.unwrap();
        let err = cache
            .fetch("k", || async { Err(FetchError::Status { status: 500 }) })
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 500 }));
        assert_eq!(cache.peek(&"k").unwrap().value, 7);
        assert!(matches!(cache.last_error(&"k"), Some(FetchError::Status { status: 500 })));
    }

    #[tokio::test]
    async fn test_invalidated_request_does_not_write() {
        let cache: KeyedCache<&'static str, u32> = KeyedCache::new(Duration::from_secs(30));
        let (tx, rx) = tokio::sync::oneshot::channel::<u32>();
        let old = cache.fetch("k", move || async move { Ok(rx.await.unwrap_or(0)) });

        cache.invalidate(&"k");
        let new = cache.fetch("k", || async { Ok(2) });
        assert_eq!(new.await.unwrap(), 2);

        tx.send(1).unwrap();
        assert_eq!(old.await.unwrap(), 1);
        assert_eq!(cache.peek(&"k").unwrap().value, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_collect_garbage() {
        let cache: KeyedCache<u32, u32> = KeyedCache::new(Duration::from_secs(30));
        cache.fetch(1, || async { Ok(1) }).await.unwrap();
        tokio::time::advance(Duration::from_secs(200)).await;
        cache.fetch(2, || async { Ok(2) }).await.unwrap();
        tokio::time::advance(Duration::from_secs(200)).await;

        assert_eq!(cache.collect_garbage(Duration::from_secs(300)), 1);
        assert!(cache.peek(&1).is_none());
        assert!(cache.peek(&2).is_some());
    }
}
