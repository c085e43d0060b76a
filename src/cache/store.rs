//! Keyed in-memory query cache with request de-duplication.
//!
//! Inspired by TanStack Query: every server resource lives in one keyed
//! slot, concurrent requests for the same key share a single in-flight
//! load, and invalidation marks entries stale without dropping the last
//! known value.
//!
//! The cache is the only shared mutable state in the data layer. All
//! writes go through `request`/`invalidate`; views read snapshots via
//! `get`. Values are stored as `serde_json::Value` so slots of different
//! resource types can live in one map; `request` is typed at the edges.

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;

use super::key::{KeyPattern, ResourceKey};
use crate::ledger::error::LedgerError;

type LoadResult = Result<Value, LedgerError>;
type BoxLoadFuture = Pin<Box<dyn Future<Output = LoadResult> + Send>>;
type Loader = Arc<dyn Fn() -> BoxLoadFuture + Send + Sync>;

/// Freshness of a cached entry.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryStatus {
  /// A load is in flight and no settled value exists yet.
  Loading,
  /// The stored value is trusted.
  Fresh,
  /// The stored value is still shown but a refetch is due.
  Stale,
  /// The last load failed; any prior value stays visible.
  Error(LedgerError),
}

/// Snapshot of one cached slot, handed out to views by value.
#[derive(Debug, Clone)]
pub struct CacheEntry {
  pub key: ResourceKey,
  pub value: Option<Value>,
  pub status: EntryStatus,
  pub last_updated: DateTime<Utc>,
}

struct Inflight {
  generation: u64,
  rx: watch::Receiver<Option<LoadResult>>,
}

struct Slot {
  entry: CacheEntry,
  /// Loader last used for this key, kept for invalidation-triggered
  /// refetches.
  loader: Option<Loader>,
  inflight: Option<Inflight>,
  /// Most recently started load; older generations may not write their
  /// result back.
  latest_generation: u64,
  /// Set when the slot was invalidated while a load (started before the
  /// invalidation) was still in flight: that result lands as stale.
  stale_on_settle: bool,
  subscribers: usize,
}

impl Slot {
  fn new(key: ResourceKey) -> Self {
    Self {
      entry: CacheEntry {
        key,
        value: None,
        status: EntryStatus::Loading,
        last_updated: DateTime::<Utc>::MIN_UTC,
      },
      loader: None,
      inflight: None,
      latest_generation: 0,
      stale_on_settle: false,
      subscribers: 0,
    }
  }
}

/// Process-wide query cache.
///
/// Created once at application start and torn down at process exit; there
/// is no eviction policy, correctness of the displayed data is the concern
/// here, not memory bounding.
#[derive(Clone)]
pub struct QueryCache {
  slots: Arc<Mutex<HashMap<ResourceKey, Slot>>>,
  generation: Arc<AtomicU64>,
}

impl QueryCache {
  pub fn new() -> Self {
    Self {
      slots: Arc::new(Mutex::new(HashMap::new())),
      generation: Arc::new(AtomicU64::new(1)),
    }
  }

  fn lock(&self) -> MutexGuard<'_, HashMap<ResourceKey, Slot>> {
    self.slots.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  /// Synchronous snapshot of a slot. No side effects.
  pub fn get(&self, key: &ResourceKey) -> Option<CacheEntry> {
    self.lock().get(key).map(|slot| slot.entry.clone())
  }

  /// Fetch a resource through the cache.
  ///
  /// A `Fresh` entry resolves immediately from the stored value. If a load
  /// is already in flight for this key, the call joins it instead of
  /// issuing a second network request. Otherwise (absent, stale or
  /// errored) the loader runs and the settled result is stored.
  pub async fn request<T, F, Fut>(&self, key: ResourceKey, loader: F) -> Result<T, LedgerError>
  where
    T: Serialize + DeserializeOwned,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, LedgerError>> + Send + 'static,
  {
    let erased: Loader = Arc::new(move || {
      let fut = loader();
      Box::pin(async move {
        let value = fut.await?;
        serde_json::to_value(value).map_err(|e| LedgerError::Decode(e.to_string()))
      })
    });

    let value = self.request_value(key, erased).await?;
    serde_json::from_value(value).map_err(|e| LedgerError::Decode(e.to_string()))
  }

  /// Mark every slot matching `pattern` as stale, keeping the last known
  /// value visible. Subscribed slots refetch immediately with the loader
  /// last used for them; the rest refetch on their next `request`.
  pub fn invalidate(&self, pattern: &KeyPattern) {
    let mut slots = self.lock();
    for (key, slot) in slots.iter_mut() {
      if !pattern.matches(key) {
        continue;
      }

      slot.entry.status = EntryStatus::Stale;
      tracing::debug!(key = %key.describe(), "cache entry invalidated");

      if slot.subscribers > 0 {
        if let Some(loader) = slot.loader.clone() {
          self.begin_load(slot, key.clone(), loader);
          continue;
        }
      }
      if slot.inflight.is_some() {
        // A pre-invalidation load is still running; its result must not
        // come back as fresh.
        slot.stale_on_settle = true;
      }
    }
  }

  /// Register interest in a key. While the returned guard is alive,
  /// invalidating the key triggers an immediate background refetch.
  pub fn subscribe(&self, key: ResourceKey) -> Subscription {
    {
      let mut slots = self.lock();
      let slot = slots.entry(key.clone()).or_insert_with(|| Slot::new(key.clone()));
      slot.subscribers += 1;
    }
    Subscription { cache: self.clone(), key }
  }

  async fn request_value(&self, key: ResourceKey, loader: Loader) -> LoadResult {
    let mut rx = {
      let mut slots = self.lock();
      let slot = slots.entry(key.clone()).or_insert_with(|| Slot::new(key.clone()));
      slot.loader = Some(loader.clone());

      if slot.entry.status == EntryStatus::Fresh {
        if let Some(value) = &slot.entry.value {
          return Ok(value.clone());
        }
      }

      match &slot.inflight {
        Some(inflight) => inflight.rx.clone(),
        None => self.begin_load(slot, key, loader),
      }
    };

    let settled = rx.wait_for(|result| result.is_some()).await.map(|guard| guard.clone());
    match settled {
      Ok(Some(result)) => result,
      // The load task only vanishes without settling when the runtime is
      // shutting down.
      _ => Err(LedgerError::Network("load task dropped before settling".to_string())),
    }
  }

  /// Start a load for `slot` and return a receiver that settles with the
  /// result. The spawned task writes into the cache itself, so the result
  /// lands even if every waiter has walked away.
  fn begin_load(
    &self,
    slot: &mut Slot,
    key: ResourceKey,
    loader: Loader,
  ) -> watch::Receiver<Option<LoadResult>> {
    let generation = self.generation.fetch_add(1, Ordering::Relaxed);
    let (tx, rx) = watch::channel(None);

    slot.inflight = Some(Inflight { generation, rx: rx.clone() });
    slot.latest_generation = generation;
    slot.stale_on_settle = false;
    if slot.entry.status != EntryStatus::Stale {
      slot.entry.status = EntryStatus::Loading;
    }

    tracing::debug!(key = %key.describe(), "cache load started");
    let cache = self.clone();
    tokio::spawn(async move {
      let result = loader().await;
      cache.apply_settled(&key, generation, result.clone(), Utc::now());
      let _ = tx.send(Some(result));
    });

    rx
  }

  /// Store a settled load result. Responses from superseded loads and
  /// responses tagged older than the stored entry are discarded, so an
  /// out-of-order completion never rolls the entry back.
  fn apply_settled(
    &self,
    key: &ResourceKey,
    generation: u64,
    result: LoadResult,
    settled_at: DateTime<Utc>,
  ) {
    let mut slots = self.lock();
    let Some(slot) = slots.get_mut(key) else {
      return;
    };

    if slot.inflight.as_ref().is_some_and(|i| i.generation == generation) {
      slot.inflight = None;
    }
    if generation < slot.latest_generation || settled_at < slot.entry.last_updated {
      tracing::debug!(key = %key.describe(), "discarding out-of-order load result");
      return;
    }

    match result {
      Ok(value) => {
        slot.entry.value = Some(value);
        slot.entry.status = if slot.stale_on_settle {
          EntryStatus::Stale
        } else {
          EntryStatus::Fresh
        };
        tracing::debug!(key = %key.describe(), "cache load settled");
      }
      Err(e) => {
        // Prior value (if any) stays visible.
        tracing::warn!(key = %key.describe(), error = %e, "cache load failed");
        slot.entry.status = EntryStatus::Error(e);
      }
    }
    slot.stale_on_settle = false;
    slot.entry.last_updated = settled_at;
  }

  #[cfg(test)]
  fn latest_generation(&self, key: &ResourceKey) -> u64 {
    self.lock().get(key).map(|slot| slot.latest_generation).unwrap_or(0)
  }

  #[cfg(test)]
  fn apply_for_test(&self, key: &ResourceKey, generation: u64, result: LoadResult, settled_at: DateTime<Utc>) {
    self.apply_settled(key, generation, result, settled_at);
  }
}

impl Default for QueryCache {
  fn default() -> Self {
    Self::new()
  }
}

/// Guard returned by [`QueryCache::subscribe`]. Dropping it withdraws the
/// interest registration.
pub struct Subscription {
  cache: QueryCache,
  key: ResourceKey,
}

impl Drop for Subscription {
  fn drop(&mut self) {
    let mut slots = self.cache.lock();
    if let Some(slot) = slots.get_mut(&self.key) {
      slot.subscribers = slot.subscribers.saturating_sub(1);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::sync::atomic::AtomicU32;
  use std::time::Duration;

  fn counting_loader(
    counter: Arc<AtomicU32>,
    delay: Duration,
  ) -> impl Fn() -> Pin<Box<dyn Future<Output = Result<u32, LedgerError>> + Send>> + Send + Sync + 'static
  {
    move || {
      let counter = counter.clone();
      Box::pin(async move {
        tokio::time::sleep(delay).await;
        Ok(counter.fetch_add(1, Ordering::SeqCst) + 1)
      })
    }
  }

  #[tokio::test]
  async fn test_concurrent_requests_share_one_load() {
    let cache = QueryCache::new();
    let counter = Arc::new(AtomicU32::new(0));
    let key = ResourceKey::Teams;

    let (a, b) = tokio::join!(
      cache.request(key.clone(), counting_loader(counter.clone(), Duration::from_millis(50))),
      cache.request(key.clone(), counting_loader(counter.clone(), Duration::from_millis(50))),
    );

    assert_eq!(a.unwrap(), 1);
    assert_eq!(b.unwrap(), 1);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_fresh_value_served_without_refetch() {
    let cache = QueryCache::new();
    let counter = Arc::new(AtomicU32::new(0));
    let key = ResourceKey::Teams;

    let first: u32 = cache
      .request(key.clone(), counting_loader(counter.clone(), Duration::ZERO))
      .await
      .unwrap();
    let second: u32 = cache
      .request(key.clone(), counting_loader(counter.clone(), Duration::ZERO))
      .await
      .unwrap();

    assert_eq!(first, 1);
    assert_eq!(second, 1);
    assert_eq!(counter.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_invalidate_marks_stale_and_next_read_refetches() {
    let cache = QueryCache::new();
    let counter = Arc::new(AtomicU32::new(0));
    let key = ResourceKey::TeamExpenses("t1".to_string());

    let _: u32 = cache
      .request(key.clone(), counting_loader(counter.clone(), Duration::ZERO))
      .await
      .unwrap();
    cache.invalidate(&KeyPattern::TeamExpenses(Some("t1".to_string())));

    let entry = cache.get(&key).unwrap();
    assert_eq!(entry.status, EntryStatus::Stale);
    // Last known value stays visible while stale.
    assert_eq!(entry.value, Some(json!(1)));

    let refetched: u32 = cache
      .request(key.clone(), counting_loader(counter.clone(), Duration::ZERO))
      .await
      .unwrap();
    assert_eq!(refetched, 2);
    assert_eq!(cache.get(&key).unwrap().status, EntryStatus::Fresh);
  }

  #[tokio::test]
  async fn test_invalidate_with_subscriber_refetches_immediately() {
    let cache = QueryCache::new();
    let counter = Arc::new(AtomicU32::new(0));
    let key = ResourceKey::MyBalance("t1".to_string());

    let _: u32 = cache
      .request(key.clone(), counting_loader(counter.clone(), Duration::ZERO))
      .await
      .unwrap();

    let _sub = cache.subscribe(key.clone());
    cache.invalidate(&KeyPattern::MyBalance(Some("t1".to_string())));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(counter.load(Ordering::SeqCst), 2);
    let entry = cache.get(&key).unwrap();
    assert_eq!(entry.status, EntryStatus::Fresh);
    assert_eq!(entry.value, Some(json!(2)));
  }

  #[tokio::test]
  async fn test_failed_load_keeps_prior_value() {
    let cache = QueryCache::new();
    let counter = Arc::new(AtomicU32::new(0));
    let key = ResourceKey::Teams;

    let _: u32 = cache
      .request(key.clone(), counting_loader(counter.clone(), Duration::ZERO))
      .await
      .unwrap();
    cache.invalidate(&KeyPattern::Teams);

    let failed = cache
      .request::<u32, _, _>(key.clone(), || async {
        Err(LedgerError::Network("connection refused".to_string()))
      })
      .await;
    assert!(failed.is_err());

    let entry = cache.get(&key).unwrap();
    assert!(matches!(entry.status, EntryStatus::Error(_)));
    assert_eq!(entry.value, Some(json!(1)));
  }

  #[tokio::test]
  async fn test_out_of_order_settle_is_discarded() {
    let cache = QueryCache::new();
    let key = ResourceKey::Teams;

    let _: String = cache
      .request(key.clone(), || async { Ok("new".to_string()) })
      .await
      .unwrap();
    let entry = cache.get(&key).unwrap();
    let t1 = entry.last_updated;

    // A response from the same load generation but tagged before the
    // stored timestamp arrives late.
    let generation = cache.latest_generation(&key);
    cache.apply_for_test(
      &key,
      generation,
      Ok(json!("old")),
      t1 - chrono::Duration::seconds(5),
    );

    let entry = cache.get(&key).unwrap();
    assert_eq!(entry.value, Some(json!("new")));
    assert_eq!(entry.last_updated, t1);
  }

  #[tokio::test]
  async fn test_result_lands_after_caller_walks_away() {
    let cache = QueryCache::new();
    let counter = Arc::new(AtomicU32::new(0));
    let key = ResourceKey::Teams;

    let task = {
      let cache = cache.clone();
      let loader = counting_loader(counter.clone(), Duration::from_millis(50));
      let key = key.clone();
      tokio::spawn(async move { cache.request::<u32, _, _>(key, loader).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    task.abort();

    tokio::time::sleep(Duration::from_millis(100)).await;
    let entry = cache.get(&key).unwrap();
    assert_eq!(entry.status, EntryStatus::Fresh);
    assert_eq!(entry.value, Some(json!(1)));
  }

  #[tokio::test]
  async fn test_invalidate_during_flight_marks_result_stale() {
    let cache = QueryCache::new();
    let counter = Arc::new(AtomicU32::new(0));
    let key = ResourceKey::TeamBalances("t1".to_string());

    let task = {
      let cache = cache.clone();
      let loader = counting_loader(counter.clone(), Duration::from_millis(50));
      let key = key.clone();
      tokio::spawn(async move { cache.request::<u32, _, _>(key, loader).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    cache.invalidate(&KeyPattern::TeamBalances(Some("t1".to_string())));

    let loaded = task.await.unwrap().unwrap();
    assert_eq!(loaded, 1);
    // The load started before the invalidation, so its result may be
    // shown but not trusted.
    assert_eq!(cache.get(&key).unwrap().status, EntryStatus::Stale);
  }
}
