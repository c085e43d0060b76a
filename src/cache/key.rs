//! Resource keys and key patterns for the query cache.

/// Team identifiers are opaque UUID strings assigned by the server.
pub type TeamId = String;

/// Stable identifier for one cached server resource.
///
/// Two requests with equal keys refer to the same cached slot; the key is
/// built from the resource type plus its parameters and nothing else.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKey {
  /// The teams the current user belongs to.
  Teams,
  /// All expenses of one team.
  TeamExpenses(TeamId),
  /// Member roster of one team.
  TeamMembers(TeamId),
  /// Full balance summary of one team (member summaries + settlement
  /// suggestions).
  TeamBalances(TeamId),
  /// Pending/decided approvals of one team.
  TeamApprovals(TeamId),
  /// The current user's net balance within one team. This is the per-item
  /// base key the all-balances aggregate fans out over.
  MyBalance(TeamId),
}

impl ResourceKey {
  /// Human-readable form, used in log lines.
  pub fn describe(&self) -> String {
    match self {
      Self::Teams => "teams".to_string(),
      Self::TeamExpenses(t) => format!("expenses for team {}", t),
      Self::TeamMembers(t) => format!("members of team {}", t),
      Self::TeamBalances(t) => format!("balances for team {}", t),
      Self::TeamApprovals(t) => format!("approvals for team {}", t),
      Self::MyBalance(t) => format!("my balance in team {}", t),
    }
  }
}

/// A pattern over resource keys, used by invalidation.
///
/// A `None` team parameter matches that resource type for every team.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KeyPattern {
  Teams,
  TeamExpenses(Option<TeamId>),
  TeamMembers(Option<TeamId>),
  TeamBalances(Option<TeamId>),
  TeamApprovals(Option<TeamId>),
  MyBalance(Option<TeamId>),
}

impl KeyPattern {
  /// Whether `key` falls under this pattern.
  pub fn matches(&self, key: &ResourceKey) -> bool {
    match (self, key) {
      (KeyPattern::Teams, ResourceKey::Teams) => true,
      (KeyPattern::TeamExpenses(t), ResourceKey::TeamExpenses(k)) => param_matches(t, k),
      (KeyPattern::TeamMembers(t), ResourceKey::TeamMembers(k)) => param_matches(t, k),
      (KeyPattern::TeamBalances(t), ResourceKey::TeamBalances(k)) => param_matches(t, k),
      (KeyPattern::TeamApprovals(t), ResourceKey::TeamApprovals(k)) => param_matches(t, k),
      (KeyPattern::MyBalance(t), ResourceKey::MyBalance(k)) => param_matches(t, k),
      _ => false,
    }
  }
}

fn param_matches(pattern: &Option<TeamId>, key: &TeamId) -> bool {
  match pattern {
    Some(t) => t == key,
    None => true,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_exact_pattern_matches_same_team_only() {
    let pattern = KeyPattern::TeamExpenses(Some("t1".to_string()));
    assert!(pattern.matches(&ResourceKey::TeamExpenses("t1".to_string())));
    assert!(!pattern.matches(&ResourceKey::TeamExpenses("t2".to_string())));
    assert!(!pattern.matches(&ResourceKey::TeamBalances("t1".to_string())));
  }

  #[test]
  fn test_wildcard_pattern_matches_every_team() {
    let pattern = KeyPattern::MyBalance(None);
    assert!(pattern.matches(&ResourceKey::MyBalance("t1".to_string())));
    assert!(pattern.matches(&ResourceKey::MyBalance("t2".to_string())));
    assert!(!pattern.matches(&ResourceKey::Teams));
  }
}
