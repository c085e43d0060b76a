use crate::cache::aggregate::{BalanceOverview, TeamExpense};
use crate::cache::{
  Aggregator, MutationCoordinator, MutationKind, QueryCache, ResourceKey, Subscription,
};
use crate::commands::{self, Command};
use crate::config::Config;
use crate::event::{Event, EventHandler, LedgerEvent, TeamData};
use crate::filter;
use crate::ledger::api_types::CreateExpensePayload;
use crate::ledger::client::LedgerClient;
use crate::ledger::error::LedgerError;
use crate::ledger::types::{ApprovalStatus, ReportKind, SplitType, Team};
use crate::ui;
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::collections::BTreeSet;
use std::io::stdout;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;

/// Input mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
  Normal,
  Command,
  Search,
}

/// Tabs of the team detail view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailTab {
  Expenses,
  Balances,
  Approvals,
  Members,
}

impl DetailTab {
  pub fn next(self) -> Self {
    match self {
      Self::Expenses => Self::Balances,
      Self::Balances => Self::Approvals,
      Self::Approvals => Self::Members,
      Self::Members => Self::Expenses,
    }
  }

  pub fn title(&self) -> &'static str {
    match self {
      Self::Expenses => "Expenses",
      Self::Balances => "Balances",
      Self::Approvals => "Approvals",
      Self::Members => "Members",
    }
  }
}

/// View state - each variant owns its data
#[derive(Debug)]
pub enum ViewState {
  // Root views (set via : commands)
  TeamList {
    teams: Vec<Team>,
    selected: usize,
    loading: bool,
  },
  Balances {
    overview: Option<BalanceOverview>,
    loading: bool,
  },
  Expenses {
    lines: Vec<TeamExpense>,
    selected: usize,
    loading: bool,
  },

  // Detail view (pushed via Enter on a team)
  TeamDetail {
    team: Team,
    tab: DetailTab,
    data: TeamData,
    selected: usize,
    loading: bool,
  },
}

impl Default for ViewState {
  fn default() -> Self {
    ViewState::TeamList {
      teams: Vec::new(),
      selected: 0,
      loading: true,
    }
  }
}

/// Main application state
pub struct App {
  /// Navigation stack - root is always at index 0
  view_stack: Vec<ViewState>,

  /// Current input mode
  mode: Mode,

  /// Command input buffer (after pressing :)
  command_input: String,

  /// Search filter input (after pressing /)
  search_filter: String,

  /// Selected autocomplete suggestion index
  selected_suggestion: usize,

  /// Last error or confirmation, shown in the status bar
  status: Option<String>,

  /// Application configuration
  config: Config,

  /// Shared query cache; all server state flows through it
  cache: QueryCache,

  /// Ledger API client
  client: LedgerClient,

  /// Fan-out engine for the cross-team views
  aggregator: Aggregator,

  /// Write path: mutations plus cache invalidation
  mutations: MutationCoordinator,

  /// Cache keys the current view is interested in
  subscriptions: Vec<Subscription>,

  /// Whether the configured default team still has to be opened
  open_default_team: bool,

  /// Event sender for async tasks
  event_tx: mpsc::UnboundedSender<Event>,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub async fn new(config: Config) -> Result<Self> {
    let client = LedgerClient::new(&config)?;
    let cache = QueryCache::new();
    let aggregator = Aggregator::new(cache.clone(), client.clone());
    let mutations = MutationCoordinator::new(cache.clone());
    let (tx, _rx) = mpsc::unbounded_channel();

    let open_default_team = config.default_team.is_some();

    Ok(Self {
      view_stack: vec![ViewState::default()],
      mode: Mode::Normal,
      command_input: String::new(),
      search_filter: String::new(),
      selected_suggestion: 0,
      status: None,
      config,
      cache,
      client,
      aggregator,
      mutations,
      subscriptions: Vec::new(),
      open_default_team,
      event_tx: tx,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    // Create event handler
    let mut events = EventHandler::new(Duration::from_millis(250));
    self.event_tx = events.sender();

    // Initial data load
    self.resubscribe();
    self.load_teams();

    // Main loop
    while !self.should_quit {
      // Draw UI
      terminal.draw(|frame| ui::draw(frame, self))?;

      // Handle events
      if let Some(event) = events.next().await {
        self.handle_event(event);
      }
    }

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    Ok(())
  }

  // ==========================================================================
  // Data loading
  // ==========================================================================

  fn load_teams(&self) {
    let cache = self.cache.clone();
    let client = self.client.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let _ = tx.send(Event::Ledger(LedgerEvent::Loading));
      let result = cache
        .request(ResourceKey::Teams, move || {
          let client = client.clone();
          async move { client.list_teams().await }
        })
        .await;
      match result {
        Ok(teams) => {
          let _ = tx.send(Event::Ledger(LedgerEvent::TeamsLoaded(teams)));
        }
        Err(e) => {
          let _ = tx.send(Event::Error(e.to_string()));
        }
      }
    });
  }

  fn load_balance_overview(&self) {
    let aggregator = self.aggregator.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let _ = tx.send(Event::Ledger(LedgerEvent::Loading));
      match aggregator.balance_overview().await {
        Ok(overview) => {
          if let Some(partial) = overview.partial_error() {
            let _ = tx.send(Event::Error(partial.to_string()));
          }
          let _ = tx.send(Event::Ledger(LedgerEvent::BalancesLoaded(overview)));
        }
        Err(e) => {
          let _ = tx.send(Event::Error(e.to_string()));
        }
      }
    });
  }

  fn load_expense_overview(&self) {
    let aggregator = self.aggregator.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let _ = tx.send(Event::Ledger(LedgerEvent::Loading));
      match aggregator.expense_overview().await {
        Ok(overview) => {
          if let Some(partial) = overview.partial_error() {
            let _ = tx.send(Event::Error(partial.to_string()));
          }
          let _ = tx.send(Event::Ledger(LedgerEvent::ExpensesLoaded(overview.flattened())));
        }
        Err(e) => {
          let _ = tx.send(Event::Error(e.to_string()));
        }
      }
    });
  }

  fn load_team_detail(&self, team_id: String) {
    let cache = self.cache.clone();
    let client = self.client.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let _ = tx.send(Event::Ledger(LedgerEvent::Loading));

      let expenses_fut = cache.request(ResourceKey::TeamExpenses(team_id.clone()), {
        let client = client.clone();
        let id = team_id.clone();
        move || {
          let client = client.clone();
          let id = id.clone();
          async move { client.team_expenses(&id).await }
        }
      });
      let members_fut = cache.request(ResourceKey::TeamMembers(team_id.clone()), {
        let client = client.clone();
        let id = team_id.clone();
        move || {
          let client = client.clone();
          let id = id.clone();
          async move { client.team_members(&id).await }
        }
      });
      let summary_fut = cache.request(ResourceKey::TeamBalances(team_id.clone()), {
        let client = client.clone();
        let id = team_id.clone();
        move || {
          let client = client.clone();
          let id = id.clone();
          async move { client.team_balances(&id).await }
        }
      });
      let approvals_fut = cache.request(ResourceKey::TeamApprovals(team_id.clone()), {
        let client = client.clone();
        let id = team_id.clone();
        move || {
          let client = client.clone();
          let id = id.clone();
          async move { client.team_approvals(&id).await }
        }
      });

      let (expenses, members, summary, approvals) =
        tokio::join!(expenses_fut, members_fut, summary_fut, approvals_fut);

      // Degrade per section: a failed tab shows up empty, the rest of
      // the view still renders.
      let mut errors: Vec<String> = Vec::new();
      let data = TeamData {
        expenses: unwrap_or_report(expenses, &mut errors),
        members: unwrap_or_report(members, &mut errors),
        approvals: unwrap_or_report(approvals, &mut errors),
        summary: match summary {
          Ok(summary) => Some(summary),
          Err(e) => {
            errors.push(e.to_string());
            None
          }
        },
      };

      if let Some(first) = errors.first() {
        let _ = tx.send(Event::Error(first.clone()));
      }
      let _ = tx.send(Event::Ledger(LedgerEvent::TeamDataLoaded {
        team_id,
        data: Box::new(data),
      }));
    });
  }

  /// Re-request whatever the current view shows. Runs after a mutation,
  /// when the affected cache keys are already stale.
  fn reload_current_view(&self) {
    match self.view_stack.last() {
      Some(ViewState::TeamList { .. }) => self.load_teams(),
      Some(ViewState::Balances { .. }) => self.load_balance_overview(),
      Some(ViewState::Expenses { .. }) => self.load_expense_overview(),
      Some(ViewState::TeamDetail { team, .. }) => self.load_team_detail(team.id.clone()),
      None => {}
    }
  }

  /// Register cache interest for the keys the current view reads, so
  /// invalidations refetch them eagerly.
  fn resubscribe(&mut self) {
    let keys: Vec<ResourceKey> = match self.view_stack.last() {
      Some(ViewState::TeamList { .. }) => vec![ResourceKey::Teams],
      Some(ViewState::Balances { overview, .. }) => {
        let mut keys = vec![ResourceKey::Teams];
        if let Some(overview) = overview {
          keys.extend(
            overview
              .per_team
              .iter()
              .map(|row| ResourceKey::MyBalance(row.team_id.clone())),
          );
        }
        keys
      }
      Some(ViewState::Expenses { lines, .. }) => {
        let mut keys = vec![ResourceKey::Teams];
        let team_ids: BTreeSet<String> = lines.iter().map(|l| l.team_id.clone()).collect();
        keys.extend(team_ids.into_iter().map(ResourceKey::TeamExpenses));
        keys
      }
      Some(ViewState::TeamDetail { team, .. }) => vec![
        ResourceKey::TeamExpenses(team.id.clone()),
        ResourceKey::TeamMembers(team.id.clone()),
        ResourceKey::TeamBalances(team.id.clone()),
        ResourceKey::TeamApprovals(team.id.clone()),
      ],
      None => Vec::new(),
    };
    self.subscriptions = keys.into_iter().map(|key| self.cache.subscribe(key)).collect();
  }

  // ==========================================================================
  // Event handling
  // ==========================================================================

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {} // UI refresh happens automatically
      Event::Ledger(ledger_event) => self.handle_ledger_event(ledger_event),
      Event::Error(msg) => {
        tracing::error!(error = %msg, "background task failed");
        self.status = Some(msg);
        if let Some(view) = self.view_stack.last_mut() {
          set_loading(view, false);
        }
      }
    }
  }

  fn handle_ledger_event(&mut self, event: LedgerEvent) {
    match event {
      LedgerEvent::Loading => {
        if let Some(view) = self.view_stack.last_mut() {
          set_loading(view, true);
        }
      }
      LedgerEvent::TeamsLoaded(teams) => {
        if self.open_default_team {
          self.open_default_team = false;
          if let Some(team) = self
            .config
            .default_team
            .as_ref()
            .and_then(|name| teams.iter().find(|t| t.name.eq_ignore_ascii_case(name)))
          {
            let team = team.clone();
            if let Some(ViewState::TeamList { teams: list, loading, .. }) =
              self.view_stack.first_mut()
            {
              *list = teams;
              *loading = false;
            }
            self.open_team(team);
            return;
          }
        }
        if let Some(ViewState::TeamList { teams: list, loading, .. }) = self.view_stack.first_mut()
        {
          *list = teams;
          *loading = false;
        }
      }
      LedgerEvent::TeamDataLoaded { team_id, data } => {
        if let Some(ViewState::TeamDetail {
          team,
          data: current,
          loading,
          ..
        }) = self.view_stack.last_mut()
        {
          if team.id == team_id {
            *current = *data;
            *loading = false;
          }
        }
      }
      LedgerEvent::BalancesLoaded(overview) => {
        let mut landed = false;
        if let Some(ViewState::Balances {
          overview: current,
          loading,
        }) = self.view_stack.last_mut()
        {
          *current = Some(overview);
          *loading = false;
          landed = true;
        }
        if landed {
          self.resubscribe();
        }
      }
      LedgerEvent::ExpensesLoaded(lines) => {
        let mut landed = false;
        if let Some(ViewState::Expenses {
          lines: current,
          loading,
          ..
        }) = self.view_stack.last_mut()
        {
          *current = lines;
          *loading = false;
          landed = true;
        }
        if landed {
          self.resubscribe();
        }
      }
      LedgerEvent::Mutated { kind, .. } => {
        self.status = Some(format!("{} ok", kind.describe()));
        self.reload_current_view();
      }
      LedgerEvent::Exported(path) => {
        self.status = Some(format!("report written to {}", path));
      }
    }
  }

  fn handle_key(&mut self, key: crossterm::event::KeyEvent) {
    match self.mode {
      Mode::Normal => self.handle_normal_mode_key(key),
      Mode::Command => self.handle_command_mode_key(key),
      Mode::Search => self.handle_search_mode_key(key),
    }
  }

  fn handle_normal_mode_key(&mut self, key: crossterm::event::KeyEvent) {
    match key.code {
      // Quit
      KeyCode::Char('q') => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
          self.resubscribe();
        } else {
          self.should_quit = true;
        }
      }
      KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
        self.should_quit = true;
      }

      // Navigation
      KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1),
      KeyCode::Down | KeyCode::Char('j') => self.move_selection(1),
      KeyCode::Enter => self.enter_selected(),
      KeyCode::Esc => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
          self.resubscribe();
        }
      }
      KeyCode::Tab => {
        if let Some(ViewState::TeamDetail { tab, selected, .. }) = self.view_stack.last_mut() {
          *tab = tab.next();
          *selected = 0;
        }
      }

      // Mutations on the selected row
      KeyCode::Char('a') => self.decide_selected_approval(ApprovalStatus::Approved),
      KeyCode::Char('x') => self.decide_selected_approval(ApprovalStatus::Rejected),
      KeyCode::Char('d') => self.delete_selected_expense(),
      KeyCode::Char('s') => self.settle_selected_suggestion(),

      // Mode switches
      KeyCode::Char(':') => {
        self.mode = Mode::Command;
        self.command_input.clear();
      }
      KeyCode::Char('/') => {
        self.mode = Mode::Search;
        self.search_filter.clear();
      }

      _ => {}
    }
  }

  fn handle_command_mode_key(&mut self, key: crossterm::event::KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.command_input.clear();
        self.selected_suggestion = 0;
      }
      KeyCode::Enter => {
        self.execute_command();
        self.mode = Mode::Normal;
        self.selected_suggestion = 0;
      }
      KeyCode::Tab | KeyCode::Down => {
        // Navigate autocomplete suggestions
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = (self.selected_suggestion + 1) % suggestions.len();
        }
      }
      KeyCode::BackTab | KeyCode::Up => {
        // Navigate autocomplete suggestions backwards
        let suggestions = commands::get_suggestions(&self.command_input);
        if !suggestions.is_empty() {
          self.selected_suggestion = if self.selected_suggestion == 0 {
            suggestions.len() - 1
          } else {
            self.selected_suggestion - 1
          };
        }
      }
      KeyCode::Backspace => {
        self.command_input.pop();
        self.selected_suggestion = 0; // Reset selection on input change
      }
      KeyCode::Char(c) => {
        self.command_input.push(c);
        self.selected_suggestion = 0; // Reset selection on input change
      }
      _ => {}
    }
  }

  fn handle_search_mode_key(&mut self, key: crossterm::event::KeyEvent) {
    match key.code {
      KeyCode::Esc => {
        self.mode = Mode::Normal;
        self.search_filter.clear();
      }
      KeyCode::Enter => {
        // Apply filter and return to normal mode
        self.mode = Mode::Normal;
      }
      KeyCode::Backspace => {
        self.search_filter.pop();
      }
      KeyCode::Char(c) => {
        self.search_filter.push(c);
      }
      _ => {}
    }
  }

  // ==========================================================================
  // Commands
  // ==========================================================================

  fn execute_command(&mut self) {
    let input = self.command_input.trim().to_string();
    self.command_input.clear();

    let mut parts = input.splitn(2, char::is_whitespace);
    let word = parts.next().unwrap_or("");
    let args = parts.next().unwrap_or("").trim().to_string();

    // Resolve through autocomplete so aliases and partial names work
    let suggestions = commands::get_suggestions(word);
    let cmd = if !suggestions.is_empty() && self.selected_suggestion < suggestions.len() {
      suggestions[self.selected_suggestion].name
    } else {
      self.status = Some(format!("unknown command: {}", word));
      return;
    };

    match cmd {
      "teams" => {
        self.view_stack = vec![ViewState::default()];
        self.resubscribe();
        self.load_teams();
      }
      "expenses" => {
        self.view_stack = vec![ViewState::Expenses {
          lines: Vec::new(),
          selected: 0,
          loading: true,
        }];
        self.resubscribe();
        self.load_expense_overview();
      }
      "balances" => {
        self.view_stack = vec![ViewState::Balances {
          overview: None,
          loading: true,
        }];
        self.resubscribe();
        self.load_balance_overview();
      }
      "newteam" => {
        if args.is_empty() {
          self.status = Some("usage: newteam <name>".to_string());
        } else {
          self.create_team(args);
        }
      }
      "invite" => match self.current_team_id() {
        Some(team_id) if !args.is_empty() => self.invite_member(team_id, args),
        Some(_) => self.status = Some("usage: invite <email>".to_string()),
        None => self.status = Some("open a team first".to_string()),
      },
      "expense" => match self.current_team_id() {
        Some(team_id) => self.create_expense_from_args(team_id, &args),
        None => self.status = Some("open a team first".to_string()),
      },
      "receipt" => match self.selected_expense_id() {
        Some((team_id, expense_id)) if !args.is_empty() => {
          self.upload_receipt(team_id, expense_id, PathBuf::from(args));
        }
        Some(_) => self.status = Some("usage: receipt <path>".to_string()),
        None => self.status = Some("select an expense first".to_string()),
      },
      "export" => match self.current_team_id() {
        Some(team_id) => {
          let kind = match args.as_str() {
            "summary" | "" => ReportKind::Summary,
            "expenses" => ReportKind::Expenses,
            other => {
              self.status = Some(format!("unknown report kind: {}", other));
              return;
            }
          };
          self.export_report(team_id, kind);
        }
        None => self.status = Some("open a team first".to_string()),
      },
      "quit" => {
        self.should_quit = true;
      }
      _ => {}
    }
  }

  // ==========================================================================
  // Mutations
  // ==========================================================================

  fn create_team(&mut self, name: String) {
    let mutations = self.mutations.clone();
    let client = self.client.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let result = mutations
        .mutate(MutationKind::CreateTeam, None, move || async move {
          client.create_team(&name).await
        })
        .await;
      match result {
        Ok(team) => {
          let _ = tx.send(Event::Ledger(LedgerEvent::Mutated {
            kind: MutationKind::CreateTeam,
            team_id: Some(team.id),
          }));
        }
        Err(e) => {
          let _ = tx.send(Event::Error(e.to_string()));
        }
      }
    });
  }

  fn invite_member(&mut self, team_id: String, email: String) {
    let mutations = self.mutations.clone();
    let client = self.client.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let write_team = team_id.clone();
      let result = mutations
        .mutate(MutationKind::AddMember, Some(&team_id), move || async move {
          client.add_member(&write_team, &email, "member").await
        })
        .await;
      send_mutation_result(&tx, result, MutationKind::AddMember, Some(team_id));
    });
  }

  fn create_expense_from_args(&mut self, team_id: String, args: &str) {
    let mut parts = args.splitn(2, char::is_whitespace);
    let amount: Option<f64> = parts.next().and_then(|raw| raw.parse().ok());
    let description = parts.next().unwrap_or("").trim().to_string();

    let Some(amount) = amount.filter(|a| *a > 0.0) else {
      self.status = Some("usage: expense <amount> <description>".to_string());
      return;
    };
    if description.is_empty() {
      self.status = Some("usage: expense <amount> <description>".to_string());
      return;
    }

    let payload = CreateExpensePayload {
      description,
      amount,
      category: "General".to_string(),
      split_type: SplitType::Equal,
      // Empty list means: split with all current members.
      split_with: Vec::new(),
    };

    let mutations = self.mutations.clone();
    let client = self.client.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let write_team = team_id.clone();
      let result = mutations
        .mutate(MutationKind::CreateExpense, Some(&team_id), move || async move {
          client.create_expense(&write_team, &payload).await
        })
        .await;
      send_mutation_result(&tx, result, MutationKind::CreateExpense, Some(team_id));
    });
  }

  fn delete_selected_expense(&mut self) {
    let Some((team_id, expense_id)) = self.selected_expense_id() else {
      return;
    };
    let mutations = self.mutations.clone();
    let client = self.client.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let write_team = team_id.clone();
      let result = mutations
        .mutate(MutationKind::DeleteExpense, Some(&team_id), move || async move {
          client.delete_expense(&write_team, &expense_id).await
        })
        .await;
      send_mutation_result(&tx, result, MutationKind::DeleteExpense, Some(team_id));
    });
  }

  fn decide_selected_approval(&mut self, status: ApprovalStatus) {
    let Some(ViewState::TeamDetail {
      team,
      tab: DetailTab::Approvals,
      data,
      selected,
      ..
    }) = self.view_stack.last()
    else {
      return;
    };
    let Some(approval) = data.approvals.get(*selected) else {
      return;
    };

    let team_id = team.id.clone();
    let approval_id = approval.id.clone();
    let mutations = self.mutations.clone();
    let client = self.client.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let write_team = team_id.clone();
      let result = mutations
        .mutate(MutationKind::UpdateApproval, Some(&team_id), move || async move {
          client.update_approval(&write_team, &approval_id, status).await
        })
        .await;
      send_mutation_result(&tx, result, MutationKind::UpdateApproval, Some(team_id));
    });
  }

  fn settle_selected_suggestion(&mut self) {
    let Some(ViewState::TeamDetail {
      team,
      tab: DetailTab::Balances,
      data,
      selected,
      ..
    }) = self.view_stack.last()
    else {
      return;
    };
    let Some(suggestion) = data
      .summary
      .as_ref()
      .and_then(|summary| summary.balances.get(*selected))
    else {
      return;
    };

    let team_id = team.id.clone();
    let from_user = suggestion.from_user.id.clone();
    let to_user = suggestion.to_user.id.clone();
    let amount = suggestion.amount;
    let mutations = self.mutations.clone();
    let client = self.client.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let write_team = team_id.clone();
      let result = mutations
        .mutate(MutationKind::RecordSettlement, Some(&team_id), move || async move {
          client
            .record_settlement(&write_team, &from_user, &to_user, amount)
            .await
        })
        .await;
      send_mutation_result(&tx, result, MutationKind::RecordSettlement, Some(team_id));
    });
  }

  fn upload_receipt(&mut self, team_id: String, expense_id: String, path: PathBuf) {
    let mutations = self.mutations.clone();
    let client = self.client.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      let bytes = match tokio::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) => {
          let _ = tx.send(Event::Error(format!("cannot read {}: {}", path.display(), e)));
          return;
        }
      };
      let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| "receipt".to_string());

      let write_team = team_id.clone();
      let result = mutations
        .mutate(MutationKind::UploadReceipt, Some(&team_id), move || async move {
          client
            .upload_receipt(&write_team, &expense_id, &file_name, bytes)
            .await
        })
        .await;
      send_mutation_result(&tx, result, MutationKind::UploadReceipt, Some(team_id));
    });
  }

  fn export_report(&mut self, team_id: String, kind: ReportKind) {
    let client = self.client.clone();
    let tx = self.event_tx.clone();

    tokio::spawn(async move {
      match client.export_report(&team_id, kind).await {
        Ok(bytes) => {
          let path = format!("{}_{}.csv", kind.as_str(), team_id);
          match tokio::fs::write(&path, bytes).await {
            Ok(()) => {
              let _ = tx.send(Event::Ledger(LedgerEvent::Exported(path)));
            }
            Err(e) => {
              let _ = tx.send(Event::Error(format!("cannot write {}: {}", path, e)));
            }
          }
        }
        Err(e) => {
          let _ = tx.send(Event::Error(e.to_string()));
        }
      }
    });
  }

  // ==========================================================================
  // Selection and navigation
  // ==========================================================================

  fn move_selection(&mut self, delta: i32) {
    let len = self.current_list_len();
    if let Some(view) = self.view_stack.last_mut() {
      let selected = match view {
        ViewState::TeamList { selected, .. } => selected,
        ViewState::Expenses { selected, .. } => selected,
        ViewState::TeamDetail { selected, .. } => selected,
        ViewState::Balances { .. } => return,
      };
      if len > 0 {
        *selected = (*selected as i32 + delta).rem_euclid(len as i32) as usize;
      }
    }
  }

  fn current_list_len(&self) -> usize {
    match self.view_stack.last() {
      Some(ViewState::TeamList { teams, .. }) => filter::filter(teams, &self.search_filter).len(),
      Some(ViewState::Expenses { lines, .. }) => filter::filter(lines, &self.search_filter).len(),
      Some(ViewState::TeamDetail { tab, data, .. }) => match tab {
        DetailTab::Expenses => data.expenses.len(),
        DetailTab::Balances => data.summary.as_ref().map_or(0, |s| s.balances.len()),
        DetailTab::Approvals => data.approvals.len(),
        DetailTab::Members => data.members.len(),
      },
      _ => 0,
    }
  }

  fn enter_selected(&mut self) {
    if let Some(ViewState::TeamList {
      teams, selected, ..
    }) = self.view_stack.last()
    {
      let visible = filter::filter(teams, &self.search_filter);
      if let Some(team) = visible.get(*selected) {
        let team = (*team).clone();
        self.open_team(team);
      }
    }
  }

  fn open_team(&mut self, team: Team) {
    let team_id = team.id.clone();
    self.view_stack.push(ViewState::TeamDetail {
      team,
      tab: DetailTab::Expenses,
      data: TeamData::default(),
      selected: 0,
      loading: true,
    });
    self.search_filter.clear();
    self.resubscribe();
    self.load_team_detail(team_id);
  }

  fn current_team_id(&self) -> Option<String> {
    self.view_stack.iter().rev().find_map(|view| match view {
      ViewState::TeamDetail { team, .. } => Some(team.id.clone()),
      _ => None,
    })
  }

  fn selected_expense_id(&self) -> Option<(String, String)> {
    if let Some(ViewState::TeamDetail {
      team,
      tab: DetailTab::Expenses,
      data,
      selected,
      ..
    }) = self.view_stack.last()
    {
      return data
        .expenses
        .get(*selected)
        .map(|expense| (team.id.clone(), expense.id.clone()));
    }
    None
  }

  // ==========================================================================
  // Accessors for UI rendering
  // ==========================================================================

  pub fn current_view(&self) -> Option<&ViewState> {
    self.view_stack.last()
  }

  pub fn mode(&self) -> &Mode {
    &self.mode
  }

  pub fn command_input(&self) -> &str {
    &self.command_input
  }

  pub fn search_filter(&self) -> &str {
    &self.search_filter
  }

  pub fn status(&self) -> Option<&str> {
    self.status.as_deref()
  }

  pub fn title(&self) -> &str {
    self.config.title.as_deref().unwrap_or(&self.config.ledger.url)
  }

  pub fn view_breadcrumb(&self) -> Vec<String> {
    self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect()
  }

  pub fn autocomplete_suggestions(&self) -> Vec<&'static Command> {
    commands::get_suggestions(&self.command_input)
  }

  pub fn selected_suggestion(&self) -> usize {
    self.selected_suggestion
  }
}

fn set_loading(view: &mut ViewState, value: bool) {
  match view {
    ViewState::TeamList { loading, .. } => *loading = value,
    ViewState::Balances { loading, .. } => *loading = value,
    ViewState::Expenses { loading, .. } => *loading = value,
    ViewState::TeamDetail { loading, .. } => *loading = value,
  }
}

fn unwrap_or_report<T: Default>(result: Result<T, LedgerError>, errors: &mut Vec<String>) -> T {
  match result {
    Ok(value) => value,
    Err(e) => {
      errors.push(e.to_string());
      T::default()
    }
  }
}

fn send_mutation_result<R>(
  tx: &mpsc::UnboundedSender<Event>,
  result: Result<R, LedgerError>,
  kind: MutationKind,
  team_id: Option<String>,
) {
  match result {
    Ok(_) => {
      let _ = tx.send(Event::Ledger(LedgerEvent::Mutated { kind, team_id }));
    }
    Err(e) => {
      let _ = tx.send(Event::Error(e.to_string()));
    }
  }
}

impl ViewState {
  /// Get the label for this view in the breadcrumb
  fn breadcrumb_label(&self) -> String {
    match self {
      ViewState::TeamList { .. } => "Teams".to_string(),
      ViewState::Balances { .. } => "Balances".to_string(),
      ViewState::Expenses { .. } => "Expenses".to_string(),
      ViewState::TeamDetail { team, tab, .. } => format!("{} / {}", team.name, tab.title()),
    }
  }
}
