//! Domain records mirroring the ledger service's JSON resources.
//!
//! The client treats most fields as opaque payload; only identifiers (for
//! cache keys) and signed monetary amounts (for aggregation) carry
//! meaning here. Amounts stay `f64` end to end, formatting happens in the
//! UI layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserRef {
  pub id: String,
  pub name: String,
  pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamMember {
  pub user_id: String,
  pub name: String,
  pub email: String,
  pub role: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitType {
  Equal,
  Custom,
  Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalStatus {
  Pending,
  Approved,
  Rejected,
}

impl ApprovalStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Approved => "approved",
      Self::Rejected => "rejected",
    }
  }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expense {
  pub id: String,
  pub description: String,
  pub amount: f64,
  pub category: String,
  pub paid_by: UserRef,
  pub split_type: SplitType,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub receipt_url: Option<String>,
  pub approval_status: ApprovalStatus,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
  pub id: String,
  pub expense_id: String,
  pub status: ApprovalStatus,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub comment: Option<String>,
  pub created_at: DateTime<Utc>,
}

/// The current user's signed net balance within one team. Positive means
/// others owe them, negative means they owe others.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NetBalance {
  pub net_balance: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberBalance {
  pub user: UserRef,
  pub total_owed: f64,
  pub total_owing: f64,
  pub net_balance: f64,
}

/// A proposed payment between two members, computed server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementSuggestion {
  pub from_user: UserRef,
  pub to_user: UserRef,
  pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamBalanceSummary {
  pub team_id: String,
  pub team_name: String,
  #[serde(default)]
  pub balances: Vec<SettlementSuggestion>,
  #[serde(default)]
  pub members: Vec<MemberBalance>,
}

/// Report flavors the export endpoint offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
  Summary,
  Expenses,
}

impl ReportKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Summary => "summary",
      Self::Expenses => "expenses",
    }
  }
}
