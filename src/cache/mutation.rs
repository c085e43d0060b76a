//! Write coordinator: runs a mutation, then applies the invalidation
//! graph.

use std::future::Future;

use super::invalidation::{self, MutationKind};
use super::store::QueryCache;
use crate::ledger::error::LedgerError;

/// Executes writes against the ledger service and keeps the query cache
/// consistent afterwards.
///
/// On success every key pattern the invalidation graph lists for the
/// mutation kind is marked stale (triggering refetches for subscribed
/// keys). On failure the cache is left exactly as it was and the error
/// propagates verbatim to the caller.
#[derive(Clone)]
pub struct MutationCoordinator {
  cache: QueryCache,
}

impl MutationCoordinator {
  pub fn new(cache: QueryCache) -> Self {
    Self { cache }
  }

  /// Run `write` and, if it succeeds, invalidate the affected cache keys.
  ///
  /// Invalidation is idempotent, so concurrent mutations touching
  /// overlapping keys cannot corrupt cache state; their refetches are
  /// serialized by the cache's timestamp-gated writes.
  pub async fn mutate<R, F, Fut>(
    &self,
    kind: MutationKind,
    team_id: Option<&str>,
    write: F,
  ) -> Result<R, LedgerError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<R, LedgerError>>,
  {
    let result = write().await?;

    tracing::info!(kind = kind.describe(), team = team_id.unwrap_or("-"), "mutation succeeded");
    for pattern in invalidation::targets(kind, team_id) {
      self.cache.invalidate(&pattern);
    }
    Ok(result)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::key::{KeyPattern, ResourceKey};
  use crate::cache::store::EntryStatus;
  use serde_json::json;

  async fn primed_cache() -> QueryCache {
    let cache = QueryCache::new();
    let _: u32 = cache
      .request(ResourceKey::TeamExpenses("t1".to_string()), || async { Ok(10) })
      .await
      .unwrap();
    let _: u32 = cache
      .request(ResourceKey::TeamMembers("t1".to_string()), || async { Ok(3) })
      .await
      .unwrap();
    cache
  }

  #[tokio::test]
  async fn test_successful_mutation_invalidates_graph_keys() {
    let cache = primed_cache().await;
    let coordinator = MutationCoordinator::new(cache.clone());

    let created: u32 = coordinator
      .mutate(MutationKind::CreateExpense, Some("t1"), || async { Ok(42) })
      .await
      .unwrap();
    assert_eq!(created, 42);

    let expenses = cache.get(&ResourceKey::TeamExpenses("t1".to_string())).unwrap();
    assert_eq!(expenses.status, EntryStatus::Stale);
    // Members are not on the create-expense row.
    let members = cache.get(&ResourceKey::TeamMembers("t1".to_string())).unwrap();
    assert_eq!(members.status, EntryStatus::Fresh);
  }

  #[tokio::test]
  async fn test_failed_mutation_leaves_cache_untouched() {
    let cache = primed_cache().await;
    let coordinator = MutationCoordinator::new(cache.clone());

    let before = cache.get(&ResourceKey::TeamExpenses("t1".to_string())).unwrap();
    let result: Result<u32, _> = coordinator
      .mutate(MutationKind::CreateExpense, Some("t1"), || async {
        Err(LedgerError::Validation {
          status: 400,
          message: "invalid amount".to_string(),
        })
      })
      .await;
    assert!(result.is_err());

    let after = cache.get(&ResourceKey::TeamExpenses("t1".to_string())).unwrap();
    assert_eq!(after.status, before.status);
    assert_eq!(after.value, before.value);
    assert_eq!(after.last_updated, before.last_updated);
  }

  #[tokio::test]
  async fn test_repeated_invalidation_is_idempotent() {
    let cache = primed_cache().await;
    let key = ResourceKey::TeamExpenses("t1".to_string());
    let pattern = KeyPattern::TeamExpenses(Some("t1".to_string()));

    cache.invalidate(&pattern);
    let first = cache.get(&key).unwrap();
    cache.invalidate(&pattern);
    let second = cache.get(&key).unwrap();

    assert_eq!(first.status, EntryStatus::Stale);
    assert_eq!(second.status, EntryStatus::Stale);
    assert_eq!(first.value, Some(json!(10)));
    assert_eq!(second.value, Some(json!(10)));
  }
}
