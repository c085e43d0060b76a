//! Wire-level request and response shapes for the ledger API.

use serde::{Deserialize, Serialize};

use super::types::SplitType;

/// Every JSON endpoint wraps its payload in this envelope.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
  #[serde(default)]
  pub success: bool,
  pub data: Option<T>,
  #[serde(default)]
  pub error: Option<String>,
  #[serde(default)]
  pub message: Option<String>,
}

impl<T> ApiEnvelope<T> {
  /// Best error text the server gave us, in preference order.
  pub fn error_text(&self) -> String {
    self
      .error
      .clone()
      .or_else(|| self.message.clone())
      .unwrap_or_else(|| "unknown server error".to_string())
  }
}

#[derive(Debug, Serialize)]
pub struct CreateTeamPayload {
  pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CreateExpensePayload {
  pub description: String,
  pub amount: f64,
  pub category: String,
  pub split_type: SplitType,
  /// Member ids to split with; empty means all current members.
  pub split_with: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AddMemberPayload {
  pub email: String,
  pub role: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateApprovalPayload {
  pub status: String,
}

#[derive(Debug, Serialize)]
pub struct SettlementPayload {
  pub from_user: String,
  pub to_user: String,
  pub amount: f64,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ledger::types::{Expense, NetBalance, TeamBalanceSummary};

  #[test]
  fn test_envelope_unwraps_data() {
    let body = r#"{"success":true,"data":{"net_balance":-12.5},"message":"ok"}"#;
    let envelope: ApiEnvelope<NetBalance> = serde_json::from_str(body).unwrap();
    assert!(envelope.success);
    assert_eq!(envelope.data.unwrap().net_balance, -12.5);
  }

  #[test]
  fn test_envelope_error_text_prefers_error_field() {
    let body = r#"{"success":false,"error":"user is already a member","message":"bad request"}"#;
    let envelope: ApiEnvelope<NetBalance> = serde_json::from_str(body).unwrap();
    assert!(envelope.data.is_none());
    assert_eq!(envelope.error_text(), "user is already a member");
  }

  #[test]
  fn test_expense_round_trips_server_shape() {
    let body = r#"{
      "id": "e1",
      "team_id": "t1",
      "description": "Team lunch",
      "amount": 42.75,
      "category": "Food & Dining",
      "paid_by": {"id": "u1", "name": "Ana", "email": "ana@example.com"},
      "split_type": "equal",
      "splits": [],
      "approval_status": "pending",
      "created_at": "2026-08-01T12:00:00Z"
    }"#;
    let expense: Expense = serde_json::from_str(body).unwrap();
    assert_eq!(expense.description, "Team lunch");
    assert_eq!(expense.amount, 42.75);
    assert!(expense.receipt_url.is_none());
  }

  #[test]
  fn test_balance_summary_defaults_empty_lists() {
    let body = r#"{"team_id":"t1","team_name":"Paris Trip"}"#;
    let summary: TeamBalanceSummary = serde_json::from_str(body).unwrap();
    assert!(summary.balances.is_empty());
    assert!(summary.members.is_empty());
  }
}
