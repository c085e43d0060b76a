use color_eyre::{eyre::eyre, Result};
use reqwest::multipart;
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;

use crate::config::Config;

use super::api_types::{
  AddMemberPayload, ApiEnvelope, CreateExpensePayload, CreateTeamPayload, SettlementPayload,
  UpdateApprovalPayload,
};
use super::error::LedgerError;
use super::types::{
  Approval, ApprovalStatus, Expense, NetBalance, ReportKind, Team, TeamBalanceSummary, TeamMember,
};

/// Typed, stateless boundary to the remote ledger service.
#[derive(Clone)]
pub struct LedgerClient {
  http: reqwest::Client,
  base: String,
  token: String,
}

impl LedgerClient {
  pub fn new(config: &Config) -> Result<Self> {
    let token = Config::get_api_token()?;

    // Validate the configured URL up front so a typo fails at startup.
    Url::parse(&config.ledger.url)
      .map_err(|e| eyre!("Invalid ledger URL {}: {}", config.ledger.url, e))?;
    let base = format!("{}/api/v1", config.ledger.url.trim_end_matches('/'));

    let http = reqwest::Client::builder()
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self { http, base, token })
  }

  /// List the teams the current user belongs to.
  pub async fn list_teams(&self) -> Result<Vec<Team>, LedgerError> {
    self.get_json("/teams").await
  }

  /// Get the member roster of a team.
  pub async fn team_members(&self, team_id: &str) -> Result<Vec<TeamMember>, LedgerError> {
    self.get_json(&format!("/teams/{}/members", team_id)).await
  }

  /// Get all expenses of a team.
  pub async fn team_expenses(&self, team_id: &str) -> Result<Vec<Expense>, LedgerError> {
    self.get_json(&format!("/teams/{}/expenses", team_id)).await
  }

  /// Get the full balance summary of a team (member summaries plus
  /// settlement suggestions).
  pub async fn team_balances(&self, team_id: &str) -> Result<TeamBalanceSummary, LedgerError> {
    self.get_json(&format!("/teams/{}/balances", team_id)).await
  }

  /// Get the current user's net balance within a team.
  pub async fn my_balance(&self, team_id: &str) -> Result<NetBalance, LedgerError> {
    self.get_json(&format!("/teams/{}/balances/me", team_id)).await
  }

  /// Get the approvals of a team.
  pub async fn team_approvals(&self, team_id: &str) -> Result<Vec<Approval>, LedgerError> {
    self.get_json(&format!("/teams/{}/approvals", team_id)).await
  }

  pub async fn create_team(&self, name: &str) -> Result<Team, LedgerError> {
    let payload = CreateTeamPayload { name: name.to_string() };
    self.post_json("/teams", &payload).await
  }

  pub async fn create_expense(
    &self,
    team_id: &str,
    payload: &CreateExpensePayload,
  ) -> Result<Expense, LedgerError> {
    self.post_json(&format!("/teams/{}/expenses", team_id), payload).await
  }

  pub async fn delete_expense(&self, team_id: &str, expense_id: &str) -> Result<(), LedgerError> {
    let url = self.endpoint(&format!("/teams/{}/expenses/{}", team_id, expense_id));
    let response = self
      .http
      .delete(url)
      .bearer_auth(&self.token)
      .send()
      .await
      .map_err(transport)?;
    Self::expect_ok(response).await
  }

  /// Attach a receipt file to an expense (multipart, field `receipt`).
  pub async fn upload_receipt(
    &self,
    team_id: &str,
    expense_id: &str,
    file_name: &str,
    bytes: Vec<u8>,
  ) -> Result<(), LedgerError> {
    let part = multipart::Part::bytes(bytes).file_name(file_name.to_string());
    let form = multipart::Form::new().part("receipt", part);

    let url = self.endpoint(&format!("/teams/{}/expenses/{}/receipt", team_id, expense_id));
    let response = self
      .http
      .post(url)
      .bearer_auth(&self.token)
      .multipart(form)
      .send()
      .await
      .map_err(transport)?;
    Self::expect_ok(response).await
  }

  pub async fn update_approval(
    &self,
    team_id: &str,
    approval_id: &str,
    status: ApprovalStatus,
  ) -> Result<(), LedgerError> {
    let payload = UpdateApprovalPayload { status: status.as_str().to_string() };
    let url = self.endpoint(&format!("/teams/{}/approvals/{}", team_id, approval_id));
    let response = self
      .http
      .put(url)
      .bearer_auth(&self.token)
      .json(&payload)
      .send()
      .await
      .map_err(transport)?;
    Self::expect_ok(response).await
  }

  pub async fn record_settlement(
    &self,
    team_id: &str,
    from_user: &str,
    to_user: &str,
    amount: f64,
  ) -> Result<(), LedgerError> {
    let payload = SettlementPayload {
      from_user: from_user.to_string(),
      to_user: to_user.to_string(),
      amount,
    };
    let url = self.endpoint(&format!("/teams/{}/settlements", team_id));
    let response = self
      .http
      .post(url)
      .bearer_auth(&self.token)
      .json(&payload)
      .send()
      .await
      .map_err(transport)?;
    Self::expect_ok(response).await
  }

  pub async fn add_member(&self, team_id: &str, email: &str, role: &str) -> Result<(), LedgerError> {
    let payload = AddMemberPayload {
      email: email.to_string(),
      role: role.to_string(),
    };
    let url = self.endpoint(&format!("/teams/{}/members", team_id));
    let response = self
      .http
      .post(url)
      .bearer_auth(&self.token)
      .json(&payload)
      .send()
      .await
      .map_err(transport)?;
    Self::expect_ok(response).await
  }

  /// Download a CSV report. The export endpoints stream raw bytes, not
  /// the JSON envelope.
  pub async fn export_report(&self, team_id: &str, kind: ReportKind) -> Result<Vec<u8>, LedgerError> {
    let url = self.endpoint(&format!("/teams/{}/export/{}", team_id, kind.as_str()));
    let response = self
      .http
      .get(url)
      .bearer_auth(&self.token)
      .send()
      .await
      .map_err(transport)?;

    let status = response.status();
    if !status.is_success() {
      let body = response.text().await.unwrap_or_default();
      return Err(LedgerError::from_status(status.as_u16(), body));
    }
    let bytes = response.bytes().await.map_err(transport)?;
    Ok(bytes.to_vec())
  }

  fn endpoint(&self, path: &str) -> String {
    format!("{}{}", self.base, path)
  }

  async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, LedgerError> {
    let response = self
      .http
      .get(self.endpoint(path))
      .bearer_auth(&self.token)
      .send()
      .await
      .map_err(transport)?;
    Self::unwrap_envelope(response).await
  }

  async fn post_json<T: DeserializeOwned, B: Serialize>(
    &self,
    path: &str,
    body: &B,
  ) -> Result<T, LedgerError> {
    let response = self
      .http
      .post(self.endpoint(path))
      .bearer_auth(&self.token)
      .json(body)
      .send()
      .await
      .map_err(transport)?;
    Self::unwrap_envelope(response).await
  }

  /// Unwrap the `{success, data, error}` envelope into its payload.
  async fn unwrap_envelope<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, LedgerError> {
    let status = response.status();
    if !status.is_success() {
      return Err(Self::status_error(status.as_u16(), response).await);
    }

    let envelope: ApiEnvelope<T> = response
      .json()
      .await
      .map_err(|e| LedgerError::Decode(e.to_string()))?;
    envelope
      .data
      .ok_or_else(|| LedgerError::Decode("response envelope is missing data".to_string()))
  }

  /// Like `unwrap_envelope` for write endpoints whose success response
  /// carries no payload.
  async fn expect_ok(response: reqwest::Response) -> Result<(), LedgerError> {
    let status = response.status();
    if !status.is_success() {
      return Err(Self::status_error(status.as_u16(), response).await);
    }
    Ok(())
  }

  async fn status_error(status: u16, response: reqwest::Response) -> LedgerError {
    let message = match response.json::<ApiEnvelope<serde_json::Value>>().await {
      Ok(envelope) => envelope.error_text(),
      Err(_) => format!("HTTP {}", status),
    };
    LedgerError::from_status(status, message)
  }
}

fn transport(e: reqwest::Error) -> LedgerError {
  LedgerError::Network(e.to_string())
}
