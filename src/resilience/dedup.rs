use crate::{Error, ErrorContext, Result};
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

type SharedResult<T> = Shared<BoxFuture<'static, Result<T>>>;
type PendingTable<T> = Mutex<HashMap<String, Pending<T>>>;

struct Pending<T> {
    /// Distinguishes a registration from a later one under the same key.
    id: u64,
    result: SharedResult<T>,
}

fn lock<T>(table: &PendingTable<T>) -> MutexGuard<'_, HashMap<String, Pending<T>>> {
    table.lock().unwrap_or_else(PoisonError::into_inner)
}

fn evict<T>(table: &PendingTable<T>, key: &str, id: u64) -> bool {
    let mut pending = lock(table);
    if pending.get(key).map(|p| p.id == id).unwrap_or(false) {
        pending.remove(key);
        true
    } else {
        false
    }
}

/// Single-flight execution keyed by string.
///
/// Concurrent calls with the same key share one execution of the operation and
/// all observe its outcome. The operation runs as its own task, so a waiter
/// that gives up (timeout, drop) never cancels it; a detached operation simply
/// finishes with nobody listening.
pub struct Deduplicator<T> {
    pending: Arc<PendingTable<T>>,
    next_id: AtomicU64,
}

impl<T: Clone + Send + Sync + 'static> Deduplicator<T> {
    pub fn new() -> Self {
        Self {
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Run `operation` unless an execution for `key` is already in flight, in
    /// which case its result is awaited instead.
    ///
    /// With a `timeout`, this caller stops waiting once it elapses and gets
    /// `Error::Timeout`; the registration is evicted so the next call starts
    /// fresh, while the original operation keeps running in the background.
    ///
    /// `operation` is invoked without any internal lock held, so it may freely
    /// call back into this deduplicator. If another caller registers the same
    /// key in the meantime, the future it returned is dropped unpolled and the
    /// existing execution is joined.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime, since the operation is
    /// spawned as its own task.
    pub async fn deduplicate<F, Fut>(
        &self,
        key: &str,
        operation: F,
        timeout: Option<Duration>,
    ) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (id, shared) = match self.join(key) {
            Some(joined) => joined,
            None => {
                let fut = operation();
                let mut pending = lock(&self.pending);
                match pending.get(key) {
                    Some(p) => {
                        tracing::debug!(key, "lost registration race; joining in-flight operation");
                        (p.id, p.result.clone())
                    }
                    None => {
                        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                        let shared = self.start(key, id, fut);
                        pending.insert(
                            key.to_string(),
                            Pending {
                                id,
                                result: shared.clone(),
                            },
                        );
                        (id, shared)
                    }
                }
            }
        };

        let Some(limit) = timeout else {
            return shared.await;
        };
        match tokio::time::timeout(limit, shared).await {
            Ok(result) => result,
            Err(_) => {
                evict(&self.pending, key, id);
                tracing::warn!(
                    key,
                    timeout_ms = limit.as_millis() as u64,
                    "deduplicated operation timed out; detaching waiter"
                );
                Err(Error::Timeout {
                    key: key.to_string(),
                    timeout_ms: limit.as_millis() as u64,
                })
            }
        }
    }

    fn join(&self, key: &str) -> Option<(u64, SharedResult<T>)> {
        let pending = lock(&self.pending);
        let p = pending.get(key)?;
        tracing::debug!(key, "joining in-flight operation");
        Some((p.id, p.result.clone()))
    }

    fn start<Fut>(&self, key: &str, id: u64, fut: Fut) -> SharedResult<T>
    where
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let table = Arc::clone(&self.pending);
        let owned_key = key.to_string();
        let task = tokio::spawn(async move {
            let result = fut.await;
            // settled: the next caller must start a fresh execution
            evict(&table, &owned_key, id);
            result
        });

        async move {
            task.await.unwrap_or_else(|e| {
                Err(Error::runtime_with_context(
                    format!("deduplicated operation did not complete: {}", e),
                    ErrorContext::new().with_source("deduplicator"),
                ))
            })
        }
        .boxed()
        .shared()
    }

    /// Number of keys with an execution in flight.
    pub fn pending_count(&self) -> usize {
        lock(&self.pending).len()
    }
}

impl<T: Clone + Send + Sync + 'static> Default for Deduplicator<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::time::Instant;
    use tokio::time::sleep;

    #[tokio::test]
    async fn test_concurrent_callers_share_one_execution() {
        let dedup = Deduplicator::new();
        let invocations = Arc::new(AtomicUsize::new(0));

        let calls = (0..5).map(|_| {
            let invocations = Arc::clone(&invocations);
            dedup.deduplicate(
                "k",
                move || async move {
                    let n = invocations.fetch_add(1, Ordering::SeqCst) + 1;
                    sleep(Duration::from_millis(30)).await;
                    Ok(format!("result-{}", n))
                },
                None,
            )
        });
        let results = join_all(calls).await;

        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        for r in results {
            assert_eq!(r.unwrap(), "result-1");
        }
        assert_eq!(dedup.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_is_shared_by_all_waiters() {
        let dedup: Deduplicator<u32> = Deduplicator::new();
        let invocations = Arc::new(AtomicUsize::new(0));

        let calls = (0..5).map(|_| {
            let invocations = Arc::clone(&invocations);
            dedup.deduplicate(
                "k",
                move || async move {
                    invocations.fetch_add(1, Ordering::SeqCst);
                    sleep(Duration::from_millis(20)).await;
                    Err(Error::Remote {
                        status: 502,
                        message: "bad gateway".into(),
                    })
                },
                None,
            )
        });
        let results = join_all(calls).await;

        assert_eq!(invocations.load(Ordering::SeqCst), 1);
        for r in results {
            assert_eq!(r.unwrap_err().status(), Some(502));
        }
    }

    #[tokio::test]
    async fn test_next_call_after_settle_starts_fresh() {
        let dedup = Deduplicator::new();
        let invocations = Arc::new(AtomicUsize::new(0));

        for expected in 1..=2 {
            let counter = Arc::clone(&invocations);
            let value = dedup
                .deduplicate(
                    "k",
                    move || async move { Ok(counter.fetch_add(1, Ordering::SeqCst) + 1) },
                    None,
                )
                .await
                .unwrap();
            assert_eq!(value, expected);
        }
        assert_eq!(invocations.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_distinct_keys_run_independently() {
        let dedup = Deduplicator::new();
        let (a, b) = tokio::join!(
            dedup.deduplicate("a", || async { Ok(1) }, None),
            dedup.deduplicate("b", || async { Ok(2) }, None),
        );
        assert_eq!(a.unwrap(), 1);
        assert_eq!(b.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_timeout_detaches_waiter_and_evicts() {
        let dedup: Deduplicator<u32> = Deduplicator::new();
        let started = Instant::now();
        let err = dedup
            .deduplicate(
                "k",
                || futures::future::pending::<Result<u32>>(),
                Some(Duration::from_millis(50)),
            )
            .await
            .unwrap_err();

        let elapsed = started.elapsed();
        assert!(err.is_timeout());
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(1000));
        assert_eq!(dedup.pending_count(), 0);

        let retried = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&retried);
        let value = dedup
            .deduplicate(
                "k",
                move || async move {
                    flag.store(true, Ordering::SeqCst);
                    Ok(7)
                },
                None,
            )
            .await
            .unwrap();
        assert_eq!(value, 7);
        assert!(retried.load(Ordering::SeqCst));
    }

    #[test]
    #[should_panic]
    fn test_deduplicate_requires_runtime() {
        let dedup: Deduplicator<u8> = Deduplicator::new();
        let _ = dedup.deduplicate("k", || async { Ok(1) }, None).now_or_never();
    }

    #[tokio::test]
    async fn test_operation_may_inspect_its_deduplicator() {
        let dedup: Deduplicator<usize> = Deduplicator::new();
        let seen = dedup
            .deduplicate(
                "k",
                || {
                    let in_flight = dedup.pending_count();
                    async move { Ok(in_flight) }
                },
                Some(Duration::from_secs(1)),
            )
            .await
            .unwrap();
        assert_eq!(seen, 0);
        assert_eq!(dedup.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_orphaned_operation_finishes_without_touching_new_registration() {
        let dedup: Arc<Deduplicator<u32>> = Arc::new(Deduplicator::new());
        let finished = Arc::new(AtomicBool::new(false));

        let flag = Arc::clone(&finished);
        let err = dedup
            .deduplicate(
                "k",
                move || async move {
                    sleep(Duration::from_millis(80)).await;
                    flag.store(true, Ordering::SeqCst);
                    Ok(1)
                },
                Some(Duration::from_millis(20)),
            )
            .await
            .unwrap_err();
        assert!(err.is_timeout());

        // a fresh registration outlives the orphan
        let fresh = {
            let dedup = Arc::clone(&dedup);
            tokio::spawn(async move {
                dedup
                    .deduplicate(
                        "k",
                        || async {
                            sleep(Duration::from_millis(200)).await;
                            Ok(2)
                        },
                        None,
                    )
                    .await
            })
        };

        sleep(Duration::from_millis(120)).await;
        assert!(finished.load(Ordering::SeqCst));
        assert_eq!(dedup.pending_count(), 1);

        assert_eq!(fresh.await.unwrap().unwrap(), 2);
        assert_eq!(dedup.pending_count(), 0);
    }
}
