//! Read cache with request coalescing and explicit invalidation.
//!
//! # Design
//! Each `QueryKey` maps to one slot: a shared in-flight request, a ready
//! value, or the error of the last attempt. Readers that arrive while a
//! request is in flight await the same shared future, so identical reads
//! produce one remote call. Entries never expire on their own; only
//! `invalidate` discards them.
//!
//! Every started request runs on its own task and is stamped with a
//! generation. A request that completes after its key was invalidated does
//! not write its result back. The lock is never held across an await.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::{BoxFuture, FutureExt, Shared};
use todo_core::{ApiError, TodoId};

/// Identity of a cached read: operation plus parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    /// The full collection.
    Todos,
    /// A single todo by id.
    Todo(TodoId),
}

pub type Fetch<V> = BoxFuture<'static, Result<V, ApiError>>;

enum Slot<V: Clone> {
    Fetching(Shared<Fetch<V>>),
    Ready(V),
    Failed(ApiError),
}

struct Entry<V: Clone> {
    generation: u64,
    slot: Slot<V>,
}

/// Snapshot of one key, for rendering loading and error states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState<V> {
    pub is_loading: bool,
    pub data: Option<V>,
    pub error: Option<ApiError>,
}

impl<V> Default for QueryState<V> {
    fn default() -> Self {
        Self {
            is_loading: false,
            data: None,
            error: None,
        }
    }
}

impl<V> QueryState<V> {
    /// Display text for the last failure, empty when there is none.
    pub fn error_message(&self) -> &str {
        self.error.as_ref().map_or("", ApiError::message)
    }
}

type Entries<V> = Arc<Mutex<HashMap<QueryKey, Entry<V>>>>;

pub struct QueryCache<V: Clone> {
    entries: Entries<V>,
    next_generation: AtomicU64,
}

impl<V: Clone> Default for QueryCache<V> {
    fn default() -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }
}

fn lock<V: Clone>(entries: &Entries<V>) -> MutexGuard<'_, HashMap<QueryKey, Entry<V>>> {
    entries.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Store the outcome of request `generation` unless `key` was invalidated or
/// restarted in the meantime.
fn settle<V: Clone>(entries: &Entries<V>, key: &QueryKey, generation: u64, result: &Result<V, ApiError>) {
    let mut entries = lock(entries);
    let Some(entry) = entries.get_mut(key) else {
        return;
    };
    if entry.generation != generation || !matches!(entry.slot, Slot::Fetching(_)) {
        return;
    }
    entry.slot = match result {
        Ok(value) => Slot::Ready(value.clone()),
        Err(err) => {
            tracing::warn!(?key, error = %err, "query failed");
            Slot::Failed(err.clone())
        }
    };
}

impl<V> QueryCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, join the request already in flight
    /// for it, or start a new one with `fetcher`.
    ///
    /// `fetcher` is only called when a new request is needed. The request
    /// runs on its own task and settles the entry even if every caller gives
    /// up waiting. A failed attempt is remembered for `state` but the next
    /// `fetch` retries. Must be called within a tokio runtime.
    pub async fn fetch<F>(&self, key: QueryKey, fetcher: F) -> Result<V, ApiError>
    where
        F: FnOnce() -> Fetch<V>,
    {
        let request = {
            let mut entries = lock(&self.entries);
            match entries.get(&key) {
                Some(Entry {
                    slot: Slot::Ready(value),
                    ..
                }) => return Ok(value.clone()),
                Some(Entry {
                    slot: Slot::Fetching(request),
                    ..
                }) => {
                    tracing::debug!(?key, "joining in-flight request");
                    request.clone()
                }
                _ => {
                    let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
                    tracing::debug!(?key, generation, "starting request");
                    let request = self.start(key.clone(), generation, fetcher());
                    entries.insert(
                        key,
                        Entry {
                            generation,
                            slot: Slot::Fetching(request.clone()),
                        },
                    );
                    request
                }
            }
        };

        request.await
    }

    fn start(&self, key: QueryKey, generation: u64, fetch: Fetch<V>) -> Shared<Fetch<V>> {
        let entries = Arc::clone(&self.entries);
        let task = tokio::spawn(async move {
            let result = fetch.await;
            settle(&entries, &key, generation, &result);
            result
        });
        async move {
            task.await
                .unwrap_or_else(|err| Err(ApiError::Request(format!("fetch task failed: {err}"))))
        }
        .boxed()
        .shared()
    }

    /// Discard whatever is stored for `key`. Returns whether anything was dropped.
    pub fn invalidate(&self, key: &QueryKey) -> bool {
        let removed = lock(&self.entries).remove(key).is_some();
        if removed {
            tracing::debug!(?key, "invalidated");
        }
        removed
    }

    pub fn state(&self, key: &QueryKey) -> QueryState<V> {
        match lock(&self.entries).get(key).map(|entry| &entry.slot) {
            None => QueryState::default(),
            Some(Slot::Fetching(_)) => QueryState {
                is_loading: true,
                ..QueryState::default()
            },
            Some(Slot::Ready(value)) => QueryState {
                data: Some(value.clone()),
                ..QueryState::default()
            },
            Some(Slot::Failed(err)) => QueryState {
                error: Some(err.clone()),
                ..QueryState::default()
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn counted(calls: &Arc<AtomicUsize>, value: u32) -> impl FnOnce() -> Fetch<u32> {
        let calls = Arc::clone(calls);
        move || {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok(value)
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn concurrent_reads_share_one_request() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            cache.fetch(QueryKey::Todos, counted(&calls, 1)),
            cache.fetch(QueryKey::Todos, counted(&calls, 2)),
        );

        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn different_keys_do_not_coalesce() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (a, b) = tokio::join!(
            cache.fetch(QueryKey::Todo(TodoId::new("1")), counted(&calls, 1)),
            cache.fetch(QueryKey::Todo(TodoId::new("2")), counted(&calls, 2)),
        );

        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn ready_value_is_served_until_invalidated() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        assert_eq!(cache.fetch(QueryKey::Todos, counted(&calls, 1)).await.unwrap(), 1);
        assert_eq!(cache.fetch(QueryKey::Todos, counted(&calls, 2)).await.unwrap(), 1);
        assert_eq!(cache.state(&QueryKey::Todos).data, Some(1));

        assert!(cache.invalidate(&QueryKey::Todos));
        assert_eq!(cache.state(&QueryKey::Todos), QueryState::default());
        assert_eq!(cache.fetch(QueryKey::Todos, counted(&calls, 3)).await.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn loading_flag_while_in_flight() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (value, seen_loading) = tokio::join!(cache.fetch(QueryKey::Todos, counted(&calls, 7)), async {
            cache.state(&QueryKey::Todos).is_loading
        });

        assert_eq!(value.unwrap(), 7);
        assert!(seen_loading);
        assert!(!cache.state(&QueryKey::Todos).is_loading);
    }

    #[tokio::test]
    async fn failures_are_reported_then_retried() {
        let cache: QueryCache<u32> = QueryCache::new();

        let err = cache
            .fetch(QueryKey::Todos, || {
                async { Err(ApiError::Request("connection refused".to_string())) }.boxed()
            })
            .await
            .unwrap_err();
        assert_eq!(err.message(), "connection refused");

        let state = cache.state(&QueryKey::Todos);
        assert!(!state.is_loading);
        assert!(state.data.is_none());
        assert_eq!(state.error_message(), "connection refused");

        let value = cache.fetch(QueryKey::Todos, || async { Ok(5) }.boxed()).await.unwrap();
        assert_eq!(value, 5);
        assert_eq!(cache.state(&QueryKey::Todos).error_message(), "");
    }

    #[tokio::test]
    async fn abandoned_request_still_settles() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let gave_up = tokio::time::timeout(Duration::from_millis(5), cache.fetch(QueryKey::Todos, counted(&calls, 4))).await;
        assert!(gave_up.is_err());
        assert!(cache.state(&QueryKey::Todos).is_loading);

        tokio::time::sleep(Duration::from_millis(100)).await;

        let state = cache.state(&QueryKey::Todos);
        assert!(!state.is_loading);
        assert_eq!(state.data, Some(4));
        assert_eq!(cache.fetch(QueryKey::Todos, counted(&calls, 5)).await.unwrap(), 4);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidated_in_flight_result_is_not_stored() {
        let cache = QueryCache::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let (value, dropped) = tokio::join!(cache.fetch(QueryKey::Todos, counted(&calls, 1)), async {
            cache.invalidate(&QueryKey::Todos)
        });

        assert_eq!(value.unwrap(), 1);
        assert!(dropped);
        assert_eq!(cache.state(&QueryKey::Todos), QueryState::default());
    }
}
