use crossterm::event::{self, Event as CrosstermEvent, KeyEvent};
use std::time::Duration;
use tokio::sync::mpsc;

use crate::cache::aggregate::{BalanceOverview, TeamExpense};
use crate::cache::MutationKind;
use crate::ledger::types::{Approval, Expense, Team, TeamBalanceSummary, TeamMember};

/// Everything the team detail view needs, fetched together.
#[derive(Debug, Default, Clone)]
pub struct TeamData {
  pub expenses: Vec<Expense>,
  pub members: Vec<TeamMember>,
  pub summary: Option<TeamBalanceSummary>,
  pub approvals: Vec<Approval>,
}

/// Results of async ledger work, delivered to the main loop.
#[derive(Debug)]
pub enum LedgerEvent {
  /// A background load started
  Loading,
  TeamsLoaded(Vec<Team>),
  TeamDataLoaded { team_id: String, data: Box<TeamData> },
  BalancesLoaded(BalanceOverview),
  ExpensesLoaded(Vec<TeamExpense>),
  /// A write went through; affected cache keys are already invalidated
  Mutated { kind: MutationKind, team_id: Option<String> },
  /// A CSV report landed on disk
  Exported(String),
}

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Periodic tick for UI refresh
  Tick,
  /// Async ledger result
  Ledger(LedgerEvent),
  /// Something went wrong in a background task
  Error(String),
}

/// Event handler that produces events from terminal input and a tick timer
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // Spawn terminal event reader
    let input_tx = tx.clone();
    tokio::task::spawn_blocking(move || {
      loop {
        if event::poll(tick_rate).unwrap_or(false) {
          if let Ok(CrosstermEvent::Key(key)) = event::read() {
            if input_tx.send(Event::Key(key)).is_err() {
              break;
            }
          }
        } else {
          // Tick
          if input_tx.send(Event::Tick).is_err() {
            break;
          }
        }
      }
    });

    Self { tx, rx }
  }

  /// A sender that background tasks can push ledger results into
  pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
    self.tx.clone()
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
