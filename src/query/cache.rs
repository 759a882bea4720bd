//! Shared, authenticated query cache.

use chrono::{Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use futures::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, trace, warn};

use super::entry::{Payload, QueryEntry, QueryError, QueryStatus};
use super::key::QueryKey;

/// A factory producing one fetch per call
type Fetcher = Arc<dyn Fn() -> BoxFuture<'static, Result<Payload>> + Send + Sync>;

/// Per-subscription options.
#[derive(Debug, Clone, Copy)]
pub struct QueryOptions {
  /// When false, nothing is fetched and the entry stays `Idle`
  pub enabled: bool,
  /// Age after which a successful entry is re-fetched on the next subscribe.
  /// `None` keeps data fresh until it is invalidated.
  pub stale_time: Option<Duration>,
}

impl Default for QueryOptions {
  fn default() -> Self {
    Self {
      enabled: true,
      stale_time: None,
    }
  }
}

impl QueryOptions {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn enabled(mut self, enabled: bool) -> Self {
    self.enabled = enabled;
    self
  }

  pub fn stale_time(mut self, stale_time: Duration) -> Self {
    self.stale_time = Some(stale_time);
    self
  }
}

struct Observer {
  enabled: bool,
  fetcher: Fetcher,
}

/// Mutable state behind one key. Only touched with the table lock held.
struct Slot {
  status: QueryStatus,
  data: Option<Payload>,
  error: Option<QueryError>,
  last_fetched_at: Option<chrono::DateTime<Utc>>,
  stale_time: Option<Duration>,
  invalidated: bool,
  in_flight: Option<u64>,
  refetch_pending: bool,
  observers: HashMap<u64, Observer>,
}

impl Slot {
  fn new() -> Self {
    Self {
      status: QueryStatus::Idle,
      data: None,
      error: None,
      last_fetched_at: None,
      stale_time: None,
      invalidated: false,
      in_flight: None,
      refetch_pending: false,
      observers: HashMap::new(),
    }
  }

  fn is_stale(&self) -> bool {
    if self.invalidated {
      return true;
    }
    match (self.stale_time, self.last_fetched_at) {
      (Some(stale_time), Some(fetched_at)) => Utc::now() - fetched_at > stale_time,
      _ => false,
    }
  }

  /// Whether a consumer asking for this entry should cause a fetch.
  fn needs_fetch(&self) -> bool {
    match self.status {
      QueryStatus::Fetching => false,
      QueryStatus::Idle | QueryStatus::Error => true,
      QueryStatus::Success => self.is_stale(),
    }
  }

  /// Fetcher of the most recently registered enabled observer.
  fn active_fetcher(&self) -> Option<Fetcher> {
    self
      .observers
      .iter()
      .filter(|(_, o)| o.enabled)
      .max_by_key(|(id, _)| **id)
      .map(|(_, o)| Arc::clone(&o.fetcher))
  }

  fn snapshot(&self, key: &QueryKey) -> QueryEntry {
    QueryEntry {
      key: key.clone(),
      status: self.status,
      error: self.error.clone(),
      last_fetched_at: self.last_fetched_at,
      is_stale: self.is_stale(),
      data: self.data.clone(),
    }
  }
}

struct Inner {
  slots: Mutex<HashMap<QueryKey, Slot>>,
  runtime: Handle,
  changes: watch::Sender<u64>,
  next_observer: AtomicU64,
  next_fetch: AtomicU64,
}

/// Memoized, de-duplicated, invalidatable access to server resources.
///
/// One cache is created at startup and handed to every screen. Clones share
/// the same entry table. Fetches run as tasks on the runtime passed to
/// [`QueryCache::new`]; none of the public methods block or fail.
#[derive(Clone)]
pub struct QueryCache {
  inner: Arc<Inner>,
}

impl QueryCache {
  pub fn new(runtime: Handle) -> Self {
    let (changes, _) = watch::channel(0);
    Self {
      inner: Arc::new(Inner {
        slots: Mutex::new(HashMap::new()),
        runtime,
        changes,
        next_observer: AtomicU64::new(1),
        next_fetch: AtomicU64::new(1),
      }),
    }
  }

  /// Register interest in `key`.
  ///
  /// Triggers at most one fetch: only when `options.enabled` is set, nothing
  /// is already in flight, and the entry is missing, idle, failed or stale.
  pub fn subscribe<T, F, Fut>(&self, key: QueryKey, fetcher: F, options: QueryOptions) -> Subscription
  where
    T: Send + Sync + 'static,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
  {
    let fetcher: Fetcher = Arc::new(move || {
      let fut = fetcher();
      async move { fut.await.map(|data| Arc::new(data) as Payload) }.boxed()
    });

    let id = self.inner.next_observer.fetch_add(1, Ordering::Relaxed);
    let started = {
      let mut slots = self.lock();
      let slot = slots.entry(key.clone()).or_insert_with(Slot::new);
      slot.observers.insert(
        id,
        Observer {
          enabled: options.enabled,
          fetcher: Arc::clone(&fetcher),
        },
      );
      slot.stale_time = options.stale_time;

      if options.enabled && slot.needs_fetch() {
        self.start_fetch(&key, slot, fetcher);
        true
      } else {
        if options.enabled && slot.status == QueryStatus::Fetching {
          trace!(key = %key, "attached to in-flight fetch");
        }
        false
      }
    };

    if started {
      self.notify();
    }

    Subscription {
      cache: self.clone(),
      key,
      id,
    }
  }

  /// Mark entries stale: the listed keys, or every entry when `keys` is `None`.
  ///
  /// Entries with an enabled observer are re-fetched right away. Entries that
  /// are already fetching get exactly one follow-up fetch once the current one
  /// resolves. The rest re-fetch on their next subscribe.
  pub fn invalidate(&self, keys: Option<&[QueryKey]>) {
    let mut touched = 0usize;
    {
      let mut slots = self.lock();
      for (key, slot) in slots.iter_mut() {
        if let Some(keys) = keys {
          if !keys.contains(key) {
            continue;
          }
        }
        touched += 1;

        if slot.status == QueryStatus::Fetching {
          slot.refetch_pending = true;
          continue;
        }

        match slot.active_fetcher() {
          Some(fetcher) => self.start_fetch(key, slot, fetcher),
          None => slot.invalidated = true,
        }
      }
    }

    debug!(entries = touched, scoped = keys.is_some(), "invalidated queries");
    if touched > 0 {
      self.notify();
    }
  }

  /// Re-fetch `key` now if an enabled observer exists and nothing is in flight.
  pub fn refetch(&self, key: &QueryKey) {
    let started = {
      let mut slots = self.lock();
      match slots.get_mut(key) {
        Some(slot) if slot.status != QueryStatus::Fetching => match slot.active_fetcher() {
          Some(fetcher) => {
            self.start_fetch(key, slot, fetcher);
            true
          }
          None => false,
        },
        _ => false,
      }
    };

    if started {
      self.notify();
    }
  }

  /// Synchronous snapshot, no side effects.
  pub fn get_entry(&self, key: &QueryKey) -> Option<QueryEntry> {
    self.lock().get(key).map(|slot| slot.snapshot(key))
  }

  /// Wait until `key` is no longer fetching and return its entry.
  #[cfg(test)]
  pub async fn settled(&self, key: &QueryKey) -> Option<QueryEntry> {
    let mut changes = self.changes();
    loop {
      match self.get_entry(key) {
        Some(entry) if entry.is_fetching() => {}
        other => return other,
      }
      if changes.changed().await.is_err() {
        return self.get_entry(key);
      }
    }
  }

  /// Generation counter bumped after every visible state change.
  pub fn changes(&self) -> watch::Receiver<u64> {
    self.inner.changes.subscribe()
  }

  /// Number of entries in the table.
  pub fn len(&self) -> usize {
    self.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Number of entries with a fetch in flight.
  pub fn fetching_count(&self) -> usize {
    self
      .lock()
      .values()
      .filter(|slot| slot.status == QueryStatus::Fetching)
      .count()
  }

  fn set_enabled(&self, key: &QueryKey, id: u64, enabled: bool) {
    let started = {
      let mut slots = self.lock();
      let Some(slot) = slots.get_mut(key) else {
        return;
      };
      let Some(observer) = slot.observers.get_mut(&id) else {
        return;
      };
      let was_enabled = std::mem::replace(&mut observer.enabled, enabled);
      let fetcher = Arc::clone(&observer.fetcher);

      if enabled && !was_enabled && slot.needs_fetch() {
        debug!(key = %key, "query enabled, starting deferred fetch");
        self.start_fetch(key, slot, fetcher);
        true
      } else {
        false
      }
    };

    if started {
      self.notify();
    }
  }

  fn is_observer_enabled(&self, key: &QueryKey, id: u64) -> bool {
    self
      .lock()
      .get(key)
      .and_then(|slot| slot.observers.get(&id))
      .is_some_and(|o| o.enabled)
  }

  fn unsubscribe(&self, key: &QueryKey, id: u64) {
    if let Some(slot) = self.lock().get_mut(key) {
      slot.observers.remove(&id);
    }
  }

  /// Transition `slot` to `Fetching` and spawn the fetch. Caller holds the lock.
  fn start_fetch(&self, key: &QueryKey, slot: &mut Slot, fetcher: Fetcher) {
    let fetch_id = self.inner.next_fetch.fetch_add(1, Ordering::Relaxed);
    slot.status = QueryStatus::Fetching;
    slot.in_flight = Some(fetch_id);
    slot.invalidated = false;
    slot.refetch_pending = false;

    debug!(key = %key, fetch_id, "fetch started");

    let cache = self.clone();
    let key = key.clone();
    self.inner.runtime.spawn(async move {
      let result = AssertUnwindSafe(async move { fetcher().await })
        .catch_unwind()
        .await
        .unwrap_or_else(|_| Err(eyre!("fetch for {} panicked", key)));
      cache.complete(&key, fetch_id, result);
    });
  }

  fn complete(&self, key: &QueryKey, fetch_id: u64, result: Result<Payload>) {
    {
      let mut slots = self.lock();
      let Some(slot) = slots.get_mut(key) else {
        return;
      };
      if slot.in_flight != Some(fetch_id) {
        debug!(key = %key, fetch_id, "discarding superseded fetch result");
        return;
      }
      slot.in_flight = None;

      match result {
        Ok(data) => {
          debug!(key = %key, fetch_id, "fetch succeeded");
          slot.data = Some(data);
          slot.error = None;
          slot.status = QueryStatus::Success;
          slot.last_fetched_at = Some(Utc::now());
        }
        Err(report) => {
          warn!(key = %key, fetch_id, error = %report, "fetch failed");
          slot.error = Some(QueryError::new(report));
          slot.status = QueryStatus::Error;
        }
      }

      if std::mem::take(&mut slot.refetch_pending) {
        match slot.active_fetcher() {
          Some(fetcher) => self.start_fetch(key, slot, fetcher),
          None => slot.invalidated = true,
        }
      }
    }

    self.notify();
  }

  fn notify(&self) {
    self.inner.changes.send_modify(|generation| *generation += 1);
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<QueryKey, Slot>> {
    // State transitions never panic mid-update, so a poisoned table is still consistent
    self
      .inner
      .slots
      .lock()
      .unwrap_or_else(|poisoned| poisoned.into_inner())
  }
}

impl std::fmt::Debug for QueryCache {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("QueryCache")
      .field("entries", &self.len())
      .finish_non_exhaustive()
  }
}

/// A live observer of one key.
///
/// Dropping it stops the observer from driving invalidation re-fetches; an
/// in-flight fetch still runs to completion and is committed.
pub struct Subscription {
  cache: QueryCache,
  key: QueryKey,
  id: u64,
}

impl Subscription {
  pub fn key(&self) -> &QueryKey {
    &self.key
  }

  /// Current snapshot of the observed entry.
  pub fn entry(&self) -> QueryEntry {
    self
      .cache
      .get_entry(&self.key)
      .unwrap_or_else(|| QueryEntry::idle(self.key.clone()))
  }

  /// Toggle the fetch gate. Enabling on an idle or stale entry fetches it.
  pub fn set_enabled(&self, enabled: bool) {
    self.cache.set_enabled(&self.key, self.id, enabled);
  }

  pub fn is_enabled(&self) -> bool {
    self.cache.is_observer_enabled(&self.key, self.id)
  }

  pub fn refetch(&self) {
    self.cache.refetch(&self.key);
  }

  /// Wait for the entry to leave `Fetching`.
  #[cfg(test)]
  pub async fn settled(&self) -> QueryEntry {
    self
      .cache
      .settled(&self.key)
      .await
      .unwrap_or_else(|| QueryEntry::idle(self.key.clone()))
  }
}

impl Drop for Subscription {
  fn drop(&mut self) {
    self.cache.unsubscribe(&self.key, self.id);
  }
}

impl std::fmt::Debug for Subscription {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Subscription")
      .field("key", &self.key)
      .field("id", &self.id)
      .finish()
  }
}
