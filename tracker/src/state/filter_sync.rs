//! Filter state synchronizer.
//!
//! Owns the canonical [`Filter`] and publishes it through a `watch` channel so
//! every surface (search box, filter form, list view) observes one value.
//! Typed search text is debounced; the query is persisted to a session store
//! so it survives a restart of the view.

use shared::Filter;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::backend::storage::KeyValueStore;

pub const FILTER_QUERY_KEY: &str = "expenses.filters.query";
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// A partial filter update. `None` leaves the field untouched; for `min` and
/// `max`, `Some(None)` clears the bound.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterChange {
    pub query: Option<String>,
    pub min: Option<Option<f64>>,
    pub max: Option<Option<f64>>,
    pub date: Option<String>,
}

impl FilterChange {
    /// Every field of a filter form at once, as an "Apply" button submits it
    pub fn form(query: &str, min: Option<f64>, max: Option<f64>, date: &str) -> Self {
        Self {
            query: Some(query.to_string()),
            min: Some(min),
            max: Some(max),
            date: Some(date.to_string()),
        }
    }
}

struct Inner {
    state: watch::Sender<Filter>,
    session: Arc<dyn KeyValueStore>,
    /// Bumped by every input, submit, apply and clear. A debounced commit
    /// only lands if nothing newer happened since it was scheduled.
    generation: AtomicU64,
    /// Serializes commit and persist so the stored query follows the
    /// published one
    commit_lock: tokio::sync::Mutex<()>,
}

impl Inner {
    fn bump(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn commit_query(&self, text: String, generation: Option<u64>) {
        let _guard = self.commit_lock.lock().await;
        let committed = self.state.send_if_modified(|filter| {
            if let Some(expected) = generation {
                if self.generation.load(Ordering::SeqCst) != expected {
                    return false;
                }
            }
            if filter.query == text {
                return false;
            }
            filter.query = text.clone();
            true
        });

        if committed {
            debug!("Committed filter query '{}'", text);
            self.persist(&text).await;
        }
    }

    async fn persist(&self, query: &str) {
        if let Err(e) = self.session.set(FILTER_QUERY_KEY, query).await {
            warn!("Could not persist filter query: {}", e);
        }
    }
}

pub struct FilterSync {
    inner: Arc<Inner>,
    pending: Mutex<Option<JoinHandle<()>>>,
    delay: Duration,
}

impl FilterSync {
    /// Start from the query persisted in `session`, or an empty filter
    pub async fn restore(session: Arc<dyn KeyValueStore>, delay: Duration) -> Self {
        let query = match session.get(FILTER_QUERY_KEY).await {
            Ok(query) => query.unwrap_or_default(),
            Err(e) => {
                warn!("Could not restore filter query: {}", e);
                String::new()
            }
        };

        let (state, _) = watch::channel(Filter {
            query,
            ..Filter::default()
        });

        Self {
            inner: Arc::new(Inner {
                state,
                session,
                generation: AtomicU64::new(0),
                commit_lock: tokio::sync::Mutex::new(()),
            }),
            pending: Mutex::new(None),
            delay,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Filter> {
        self.inner.state.subscribe()
    }

    pub fn current(&self) -> Filter {
        self.inner.state.borrow().clone()
    }

    /// Whether a debounced commit is still waiting
    pub fn has_pending(&self) -> bool {
        self.lock_pending()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Schedule `text` to become the query after the debounce delay. A newer
    /// call replaces the pending one.
    pub fn input(&self, text: impl Into<String>) {
        let text = text.into();
        let generation = self.inner.bump();
        let inner = Arc::clone(&self.inner);
        let delay = self.delay;

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            inner.commit_query(text, Some(generation)).await;
        });

        if let Some(previous) = self.lock_pending().replace(handle) {
            previous.abort();
        }
    }

    /// Commit `text` now, dropping any pending debounced value
    pub async fn submit(&self, text: impl Into<String>) {
        self.inner.bump();
        self.cancel_pending();
        self.inner.commit_query(text.into(), None).await;
    }

    /// Merge `change` into the filter immediately
    pub async fn apply(&self, change: FilterChange) {
        if change.query.is_some() {
            self.inner.bump();
            self.cancel_pending();
        }

        let _guard = self.inner.commit_lock.lock().await;
        self.inner.state.send_modify(|filter| {
            if let Some(query) = &change.query {
                filter.query = query.clone();
            }
            if let Some(min) = change.min {
                filter.min = min;
            }
            if let Some(max) = change.max {
                filter.max = max;
            }
            if let Some(date) = &change.date {
                filter.date = if date.is_empty() { None } else { Some(date.clone()) };
            }
        });
        if let Some(query) = &change.query {
            self.inner.persist(query).await;
        }
    }

    /// Reset to the empty filter and forget the persisted query
    pub async fn clear(&self) {
        self.inner.bump();
        self.cancel_pending();

        let _guard = self.inner.commit_lock.lock().await;
        self.inner.state.send_replace(Filter::default());
        if let Err(e) = self.inner.session.remove(FILTER_QUERY_KEY).await {
            warn!("Could not remove persisted filter query: {}", e);
        }
    }

    fn cancel_pending(&self) {
        if let Some(pending) = self.lock_pending().take() {
            pending.abort();
        }
    }

    fn lock_pending(&self) -> std::sync::MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for FilterSync {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::storage::{DisabledStore, MemoryStore};
    use tokio::time::sleep;

    async fn sync_over(store: &MemoryStore) -> FilterSync {
        FilterSync::restore(Arc::new(store.clone()), DEFAULT_DEBOUNCE).await
    }

    async fn persisted(store: &MemoryStore) -> Option<String> {
        store.get(FILTER_QUERY_KEY).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_commits_last_value_only() {
        let store = MemoryStore::new();
        let sync = sync_over(&store).await;

        sync.input("c");
        sleep(Duration::from_millis(200)).await;
        sync.input("co");
        sleep(Duration::from_millis(200)).await;
        // The first input would have fired by now had it not been replaced
        assert_eq!(sync.current().query, "");
        assert!(sync.has_pending());

        sync.input("cof");
        sleep(Duration::from_millis(350)).await;

        assert_eq!(sync.current().query, "cof");
        assert_eq!(persisted(&store).await.as_deref(), Some("cof"));
        assert!(!sync.has_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_flushes_immediately() {
        let store = MemoryStore::new();
        let sync = sync_over(&store).await;

        sync.input("draft");
        sync.submit("final").await;

        assert_eq!(sync.current().query, "final");
        assert_eq!(persisted(&store).await.as_deref(), Some("final"));

        // The replaced debounce never lands
        sleep(Duration::from_secs(1)).await;
        assert_eq!(sync.current().query, "final");
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_commits() {
        let store = MemoryStore::new();
        let sync = sync_over(&store).await;
        let mut receiver = sync.subscribe();

        sync.input("rent");
        receiver.changed().await.unwrap();

        assert_eq!(receiver.borrow_and_update().query, "rent");
    }

    #[tokio::test(start_paused = true)]
    async fn test_every_surface_sees_the_same_query() {
        let store = MemoryStore::new();
        let sync = sync_over(&store).await;
        let mut search_box = sync.subscribe();
        let mut list_view = sync.subscribe();

        sync.input("t");
        sync.input("ta");
        sync.input("taxi");
        sleep(Duration::from_millis(350)).await;

        assert!(search_box.has_changed().unwrap());
        assert!(list_view.has_changed().unwrap());
        assert_eq!(search_box.borrow_and_update().query, "taxi");
        assert_eq!(list_view.borrow_and_update().query, "taxi");
        assert_eq!(sync.current().query, "taxi");

        sync.submit("bus").await;

        assert_eq!(search_box.borrow_and_update().query, "bus");
        assert_eq!(list_view.borrow_and_update().query, "bus");
        assert_eq!(sync.current().query, "bus");
        assert_eq!(persisted(&store).await.as_deref(), Some("bus"));
    }

    #[tokio::test]
    async fn test_restore_reads_persisted_query() {
        let store = MemoryStore::new();
        store.set(FILTER_QUERY_KEY, "coffee").await.unwrap();

        let sync = sync_over(&store).await;

        assert_eq!(sync.current().query, "coffee");
        assert_eq!(sync.current().min, None);
    }

    #[tokio::test]
    async fn test_restore_with_unavailable_storage() {
        let sync = FilterSync::restore(Arc::new(DisabledStore), DEFAULT_DEBOUNCE).await;
        assert_eq!(sync.current(), Filter::default());

        // Writes fail quietly
        sync.submit("tea").await;
        assert_eq!(sync.current().query, "tea");
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_removes_persisted_query() {
        let store = MemoryStore::new();
        let sync = sync_over(&store).await;
        sync.apply(FilterChange::form("bus", Some(1.0), Some(5.0), "2024-01-01"))
            .await;
        sync.input("pending");

        sync.clear().await;
        sleep(Duration::from_secs(1)).await;

        assert_eq!(sync.current(), Filter::default());
        assert_eq!(persisted(&store).await, None);
    }

    #[tokio::test]
    async fn test_apply_merges_partial_changes() {
        let store = MemoryStore::new();
        let sync = sync_over(&store).await;

        sync.apply(FilterChange::form("lunch", Some(5.0), None, "")).await;
        sync.apply(FilterChange {
            max: Some(Some(20.0)),
            ..Default::default()
        })
        .await;

        let filter = sync.current();
        assert_eq!(filter.query, "lunch");
        assert_eq!(filter.min, Some(5.0));
        assert_eq!(filter.max, Some(20.0));
        assert_eq!(filter.date, None);
        assert_eq!(persisted(&store).await.as_deref(), Some("lunch"));

        sync.apply(FilterChange {
            min: Some(None),
            ..Default::default()
        })
        .await;
        assert_eq!(sync.current().min, None);
    }
}
