//! Fan-out/reduce engine for derived views the backend does not expose
//! as a single resource ("my balance across all teams", "all expenses").
//!
//! Every per-item fetch goes through the query cache, so repeated
//! aggregations reuse warm entries, and the derived value itself is never
//! stored: it is recomputed from base entries on every read and cannot go
//! stale independently of its inputs.

use futures::future;
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;

use super::key::ResourceKey;
use super::store::QueryCache;
use crate::ledger::client::LedgerClient;
use crate::ledger::error::LedgerError;
use crate::ledger::types::{Expense, NetBalance, Team};

/// Outcome of one fan-out item.
///
/// A failed item stays in the detail list as `Unavailable` so it can
/// never be mistaken for a zero value.
#[derive(Debug, Clone)]
pub enum ItemOutcome<T> {
  Ready(T),
  Unavailable(LedgerError),
}

impl<T> ItemOutcome<T> {
  pub fn is_unavailable(&self) -> bool {
    matches!(self, Self::Unavailable(_))
  }
}

/// One team's contribution to the all-balances view.
#[derive(Debug, Clone)]
pub struct TeamBalanceRow {
  pub team_id: String,
  pub team_name: String,
  pub balance: ItemOutcome<f64>,
}

/// Derived all-balances view: what the user owes and is owed, across
/// every team they belong to.
#[derive(Debug, Clone)]
pub struct BalanceOverview {
  /// One row per team, in the order of the team index.
  pub per_team: Vec<TeamBalanceRow>,
  /// Sum of positive per-team balances (owed to the user).
  pub total_owed: f64,
  /// Sum of negative per-team balances, as a positive number (owed by
  /// the user).
  pub total_owing: f64,
}

impl BalanceOverview {
  pub fn partial_error(&self) -> Option<LedgerError> {
    partial_error(self.per_team.iter().map(|row| &row.balance), self.per_team.len())
  }
}

/// One team's expenses within the all-expenses view.
#[derive(Debug, Clone)]
pub struct TeamExpensesRow {
  pub team_id: String,
  pub team_name: String,
  pub expenses: ItemOutcome<Vec<Expense>>,
}

/// An expense annotated with the team it belongs to.
#[derive(Debug, Clone)]
pub struct TeamExpense {
  pub team_id: String,
  pub team_name: String,
  pub expense: Expense,
}

/// Derived all-expenses view.
#[derive(Debug, Clone)]
pub struct ExpenseOverview {
  pub per_team: Vec<TeamExpensesRow>,
}

impl ExpenseOverview {
  /// Flatten loaded rows into displayable expense lines, keeping team
  /// index order.
  pub fn flattened(&self) -> Vec<TeamExpense> {
    let mut lines = Vec::new();
    for row in &self.per_team {
      if let ItemOutcome::Ready(expenses) = &row.expenses {
        for expense in expenses {
          lines.push(TeamExpense {
            team_id: row.team_id.clone(),
            team_name: row.team_name.clone(),
            expense: expense.clone(),
          });
        }
      }
    }
    lines
  }

  pub fn partial_error(&self) -> Option<LedgerError> {
    partial_error(self.per_team.iter().map(|row| &row.expenses), self.per_team.len())
  }
}

fn partial_error<'a, T: 'a>(
  outcomes: impl Iterator<Item = &'a ItemOutcome<T>>,
  total: usize,
) -> Option<LedgerError> {
  let failed = outcomes.filter(|outcome| outcome.is_unavailable()).count();
  (failed > 0).then_some(LedgerError::PartialAggregation { failed, total })
}

/// Issue one cached request per index item, in parallel, and return the
/// results in index order regardless of completion order.
///
/// The caller supplies the per-item cache key and the per-item loader;
/// this is the one shared fan-out used by every aggregate view instead of
/// per-view fetch loops.
pub async fn fan_out<I, T, F, Fut>(
  cache: &QueryCache,
  index: &[I],
  key_of: impl Fn(&I) -> ResourceKey,
  load: F,
) -> Vec<Result<T, LedgerError>>
where
  I: Clone + Send + Sync + 'static,
  T: Serialize + DeserializeOwned,
  F: Fn(I) -> Fut + Clone + Send + Sync + 'static,
  Fut: Future<Output = Result<T, LedgerError>> + Send + 'static,
{
  let fetches = index.iter().map(|item| {
    let key = key_of(item);
    let load = load.clone();
    let item = item.clone();
    async move { cache.request(key, move || load(item.clone())).await }
  });
  future::join_all(fetches).await
}

/// Answers cross-team questions by combining the team index with a
/// per-team dependent resource.
#[derive(Clone)]
pub struct Aggregator {
  cache: QueryCache,
  client: LedgerClient,
}

impl Aggregator {
  pub fn new(cache: QueryCache, client: LedgerClient) -> Self {
    Self { cache, client }
  }

  /// The user's balance across all teams.
  pub async fn balance_overview(&self) -> Result<BalanceOverview, LedgerError> {
    let teams = self.teams().await?;

    let client = self.client.clone();
    let balances = fan_out(
      &self.cache,
      &teams,
      |team| ResourceKey::MyBalance(team.id.clone()),
      move |team: Team| {
        let client = client.clone();
        async move { client.my_balance(&team.id).await }
      },
    )
    .await;

    Ok(reduce_balances(&teams, balances))
  }

  /// All expenses across all teams, annotated with team names.
  pub async fn expense_overview(&self) -> Result<ExpenseOverview, LedgerError> {
    let teams = self.teams().await?;

    let client = self.client.clone();
    let results = fan_out(
      &self.cache,
      &teams,
      |team| ResourceKey::TeamExpenses(team.id.clone()),
      move |team: Team| {
        let client = client.clone();
        async move { client.team_expenses(&team.id).await }
      },
    )
    .await;

    let per_team = teams
      .iter()
      .zip(results)
      .map(|(team, result)| TeamExpensesRow {
        team_id: team.id.clone(),
        team_name: team.name.clone(),
        expenses: match result {
          Ok(expenses) => ItemOutcome::Ready(expenses),
          Err(e) => ItemOutcome::Unavailable(e),
        },
      })
      .collect();
    Ok(ExpenseOverview { per_team })
  }

  async fn teams(&self) -> Result<Vec<Team>, LedgerError> {
    let client = self.client.clone();
    self
      .cache
      .request(ResourceKey::Teams, move || {
        let client = client.clone();
        async move { client.list_teams().await }
      })
      .await
  }
}

/// Accumulate the two running totals, classifying each team's
/// contribution by the sign of its balance. Exactly zero contributes to
/// neither total but keeps its row in the detail list.
fn reduce_balances(
  teams: &[Team],
  balances: Vec<Result<NetBalance, LedgerError>>,
) -> BalanceOverview {
  let mut total_owed = 0.0;
  let mut total_owing = 0.0;

  let per_team = teams
    .iter()
    .zip(balances)
    .map(|(team, result)| {
      let balance = match result {
        Ok(net) => {
          if net.net_balance > 0.0 {
            total_owed += net.net_balance;
          } else if net.net_balance < 0.0 {
            total_owing += -net.net_balance;
          }
          ItemOutcome::Ready(net.net_balance)
        }
        // Excluded from the sums, visibly distinct from a zero balance.
        Err(e) => ItemOutcome::Unavailable(e),
      };
      TeamBalanceRow {
        team_id: team.id.clone(),
        team_name: team.name.clone(),
        balance,
      }
    })
    .collect();

  BalanceOverview { per_team, total_owed, total_owing }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;
  use std::sync::atomic::{AtomicU32, Ordering};
  use std::sync::Arc;
  use std::time::Duration;

  fn team(id: &str, name: &str) -> Team {
    Team {
      id: id.to_string(),
      name: name.to_string(),
      description: String::new(),
    }
  }

  fn net(amount: f64) -> Result<NetBalance, LedgerError> {
    Ok(NetBalance { net_balance: amount })
  }

  #[test]
  fn test_totals_classified_by_sign() {
    let teams = vec![team("t1", "A"), team("t2", "B"), team("t3", "C"), team("t4", "D")];
    let overview = reduce_balances(&teams, vec![net(5.0), net(-3.0), net(0.0), net(-2.0)]);

    assert_eq!(overview.total_owed, 5.0);
    assert_eq!(overview.total_owing, 5.0);
    assert_eq!(overview.per_team.len(), 4);
    // The zero-balance team keeps its row but moved neither total.
    assert!(matches!(overview.per_team[2].balance, ItemOutcome::Ready(b) if b == 0.0));
    assert!(overview.partial_error().is_none());
  }

  #[test]
  fn test_partial_failure_excludes_item_from_sums() {
    let teams = vec![team("t1", "A"), team("t2", "B"), team("t3", "C"), team("t4", "D")];
    let overview = reduce_balances(
      &teams,
      vec![
        net(5.0),
        Err(LedgerError::Network("timeout".to_string())),
        net(0.0),
        net(-2.0),
      ],
    );

    assert_eq!(overview.total_owed, 5.0);
    assert_eq!(overview.total_owing, 2.0);
    assert_eq!(overview.per_team.len(), 4);
    assert!(overview.per_team[1].balance.is_unavailable());
    assert_eq!(
      overview.partial_error(),
      Some(LedgerError::PartialAggregation { failed: 1, total: 4 })
    );
  }

  #[test]
  fn test_rows_preserve_index_order() {
    let teams = vec![team("t2", "B"), team("t1", "A")];
    let overview = reduce_balances(&teams, vec![net(1.0), net(2.0)]);
    assert_eq!(overview.per_team[0].team_id, "t2");
    assert_eq!(overview.per_team[1].team_id, "t1");
  }

  #[tokio::test]
  async fn test_fan_out_order_independent_of_completion_order() {
    let cache = QueryCache::new();
    let index = vec!["a".to_string(), "b".to_string(), "c".to_string()];
    // Later items settle first.
    let delays: HashMap<String, u64> =
      [("a".to_string(), 60), ("b".to_string(), 30), ("c".to_string(), 5)].into();

    let results = fan_out(
      &cache,
      &index,
      |item| ResourceKey::MyBalance(item.clone()),
      move |item: String| {
        let delay = delays.get(&item).copied().unwrap_or(0);
        async move {
          tokio::time::sleep(Duration::from_millis(delay)).await;
          Ok(item)
        }
      },
    )
    .await;

    let names: Vec<String> = results.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(names, vec!["a", "b", "c"]);
  }

  #[tokio::test]
  async fn test_fan_out_reuses_warm_entries() {
    let cache = QueryCache::new();
    let index = vec!["a".to_string(), "b".to_string()];
    let counter = Arc::new(AtomicU32::new(0));

    for _ in 0..2 {
      let counter = counter.clone();
      let results = fan_out(
        &cache,
        &index,
        |item| ResourceKey::MyBalance(item.clone()),
        move |item: String| {
          let counter = counter.clone();
          async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(item)
          }
        },
      )
      .await;
      assert_eq!(results.len(), 2);
    }

    // Second aggregation was served entirely from fresh entries.
    assert_eq!(counter.load(Ordering::SeqCst), 2);
  }
}
