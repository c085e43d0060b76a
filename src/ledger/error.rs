//! Error taxonomy for the ledger service boundary.

use thiserror::Error;

/// Errors produced while talking to the ledger service or combining its
/// responses.
///
/// The type is `Clone` on purpose: results are stored in shared cache
/// entries and handed to every caller that joined an in-flight request.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LedgerError {
  /// Transport failure or a 5xx from the service.
  #[error("network error: {0}")]
  Network(String),

  /// A 4xx rejection (duplicate member, invalid amount, unknown team...).
  #[error("{message}")]
  Validation { status: u16, message: String },

  /// The service answered but the payload did not match the expected shape.
  #[error("decode error: {0}")]
  Decode(String),

  /// One or more items of a fan-out aggregation failed. The aggregation
  /// itself still completes; this is only surfaced as a warning.
  #[error("{failed} of {total} item fetches failed")]
  PartialAggregation { failed: usize, total: usize },
}

impl LedgerError {
  /// Classify an HTTP status into the taxonomy, with the server-provided
  /// message when there is one.
  pub fn from_status(status: u16, message: String) -> Self {
    if (400..500).contains(&status) {
      LedgerError::Validation { status, message }
    } else {
      LedgerError::Network(format!("HTTP {}: {}", status, message))
    }
  }
}
