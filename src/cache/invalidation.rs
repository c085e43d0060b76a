//! Static mapping from mutation kind to the cache keys it dirties.
//!
//! Aggregate views (all-balances, all-expenses) are recomputed from base
//! entries on every read and are never cached themselves, so the rows
//! below invalidate the base keys those views are derived from. Erring on
//! the side of extra patterns is fine; leaving a read-path key out is a
//! correctness bug.

use super::key::KeyPattern;

/// Every write operation the client can perform.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationKind {
  CreateExpense,
  DeleteExpense,
  UploadReceipt,
  AddMember,
  UpdateApproval,
  RecordSettlement,
  CreateTeam,
}

impl MutationKind {
  pub fn describe(&self) -> &'static str {
    match self {
      Self::CreateExpense => "create expense",
      Self::DeleteExpense => "delete expense",
      Self::UploadReceipt => "upload receipt",
      Self::AddMember => "add member",
      Self::UpdateApproval => "update approval",
      Self::RecordSettlement => "record settlement",
      Self::CreateTeam => "create team",
    }
  }
}

/// Key patterns that must be marked stale after a successful mutation of
/// `kind`, parameterized by the team the mutation targeted (absent only
/// for team creation).
pub fn targets(kind: MutationKind, team_id: Option<&str>) -> Vec<KeyPattern> {
  let team = team_id.map(str::to_string);
  match kind {
    MutationKind::CreateExpense | MutationKind::DeleteExpense => vec![
      KeyPattern::TeamExpenses(team.clone()),
      KeyPattern::TeamBalances(team.clone()),
      // Base key of the all-balances aggregate for this team.
      KeyPattern::MyBalance(team),
    ],
    MutationKind::UploadReceipt => vec![KeyPattern::TeamExpenses(team)],
    MutationKind::AddMember => vec![KeyPattern::TeamMembers(team)],
    MutationKind::UpdateApproval => vec![
      KeyPattern::TeamApprovals(team.clone()),
      KeyPattern::TeamExpenses(team),
    ],
    MutationKind::RecordSettlement => vec![
      KeyPattern::TeamBalances(team.clone()),
      KeyPattern::MyBalance(team),
    ],
    MutationKind::CreateTeam => vec![KeyPattern::Teams],
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::key::ResourceKey;

  fn covers(kind: MutationKind, team: &str, key: &ResourceKey) -> bool {
    targets(kind, Some(team)).iter().any(|p| p.matches(key))
  }

  #[test]
  fn test_expense_mutations_cover_every_affected_read() {
    for kind in [MutationKind::CreateExpense, MutationKind::DeleteExpense] {
      assert!(covers(kind, "t1", &ResourceKey::TeamExpenses("t1".to_string())));
      assert!(covers(kind, "t1", &ResourceKey::TeamBalances("t1".to_string())));
      assert!(covers(kind, "t1", &ResourceKey::MyBalance("t1".to_string())));
      // Unrelated teams stay untouched.
      assert!(!covers(kind, "t1", &ResourceKey::TeamExpenses("t2".to_string())));
    }
  }

  #[test]
  fn test_approval_update_dirties_expense_statuses() {
    assert!(covers(
      MutationKind::UpdateApproval,
      "t1",
      &ResourceKey::TeamApprovals("t1".to_string())
    ));
    assert!(covers(
      MutationKind::UpdateApproval,
      "t1",
      &ResourceKey::TeamExpenses("t1".to_string())
    ));
  }

  #[test]
  fn test_settlement_dirties_both_balance_views() {
    assert!(covers(
      MutationKind::RecordSettlement,
      "t1",
      &ResourceKey::TeamBalances("t1".to_string())
    ));
    assert!(covers(
      MutationKind::RecordSettlement,
      "t1",
      &ResourceKey::MyBalance("t1".to_string())
    ));
    assert!(!covers(
      MutationKind::RecordSettlement,
      "t1",
      &ResourceKey::TeamExpenses("t1".to_string())
    ));
  }

  #[test]
  fn test_create_team_dirties_the_index() {
    let patterns = targets(MutationKind::CreateTeam, None);
    assert_eq!(patterns, vec![KeyPattern::Teams]);
  }

  #[test]
  fn test_receipt_and_member_rows() {
    assert_eq!(
      targets(MutationKind::UploadReceipt, Some("t1")),
      vec![KeyPattern::TeamExpenses(Some("t1".to_string()))]
    );
    assert_eq!(
      targets(MutationKind::AddMember, Some("t1")),
      vec![KeyPattern::TeamMembers(Some("t1".to_string()))]
    );
  }
}
