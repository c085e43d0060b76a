use crate::app::DetailTab;
use crate::event::TeamData;
use crate::ledger::types::Team;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Tabs};

use super::expenses::approval_color;
use super::{amount_color, money, truncate};

const TABS: [DetailTab; 4] = [
  DetailTab::Expenses,
  DetailTab::Balances,
  DetailTab::Approvals,
  DetailTab::Members,
];

pub fn draw_team_detail(
  frame: &mut Frame,
  area: Rect,
  team: &Team,
  tab: DetailTab,
  data: &TeamData,
  selected: usize,
  loading: bool,
) {
  let title = if loading {
    format!(" {} (loading...) ", team.name)
  } else {
    format!(" {} ", team.name)
  };

  let block = Block::default()
    .title(title)
    .title_alignment(Alignment::Center)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  let inner = block.inner(area);
  frame.render_widget(block, area);

  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Tab bar
      Constraint::Min(1),    // Tab content
    ])
    .split(inner);

  let tab_index = TABS.iter().position(|t| *t == tab).unwrap_or(0);
  let tabs = Tabs::new(TABS.iter().map(|t| t.title()))
    .select(tab_index)
    .style(Style::default().fg(Color::DarkGray))
    .highlight_style(Style::default().fg(Color::Yellow).bold());
  frame.render_widget(tabs, chunks[0]);

  match tab {
    DetailTab::Expenses => draw_expenses_tab(frame, chunks[1], data, selected),
    DetailTab::Balances => draw_balances_tab(frame, chunks[1], data, selected),
    DetailTab::Approvals => draw_approvals_tab(frame, chunks[1], data, selected),
    DetailTab::Members => draw_members_tab(frame, chunks[1], data, selected),
  }
}

fn draw_expenses_tab(frame: &mut Frame, area: Rect, data: &TeamData, selected: usize) {
  if data.expenses.is_empty() {
    let paragraph = Paragraph::new("No expenses yet. Add one with :expense <amount> <description>.")
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let items: Vec<ListItem> = data
    .expenses
    .iter()
    .map(|expense| {
      let receipt = if expense.receipt_url.is_some() { "R" } else { " " };
      let line = Line::from(vec![
        Span::styled(
          expense.created_at.format("%Y-%m-%d").to_string(),
          Style::default().fg(Color::DarkGray),
        ),
        Span::raw(" "),
        Span::styled(
          format!("{:>10}", money(expense.amount)),
          Style::default().fg(Color::White),
        ),
        Span::raw(" "),
        Span::styled(
          format!("{:<10}", expense.approval_status.as_str()),
          Style::default().fg(approval_color(expense.approval_status)),
        ),
        Span::raw(" "),
        Span::styled(receipt, Style::default().fg(Color::Cyan)),
        Span::raw(" "),
        Span::styled(
          format!("{:<20}", truncate(&expense.paid_by.name, 20)),
          Style::default().fg(Color::Cyan),
        ),
        Span::raw(" "),
        Span::raw(truncate(&expense.description, 40)),
      ]);
      ListItem::new(line)
    })
    .collect();

  render_selectable(frame, area, items, selected);
}

fn draw_balances_tab(frame: &mut Frame, area: Rect, data: &TeamData, selected: usize) {
  let Some(summary) = &data.summary else {
    let paragraph =
      Paragraph::new("Balance summary unavailable.").style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  };

  let member_rows = summary.members.len() as u16;
  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(member_rows + 1), // Per-member net balances
      Constraint::Min(1),                  // Settlement suggestions
    ])
    .split(area);

  let mut lines: Vec<Line> = summary
    .members
    .iter()
    .map(|member| {
      Line::from(vec![
        Span::styled(
          format!("{:<20}", truncate(&member.user.name, 20)),
          Style::default().fg(Color::Cyan),
        ),
        Span::raw(" "),
        Span::styled(
          format!("{:>10}", money(member.net_balance)),
          Style::default().fg(amount_color(member.net_balance)),
        ),
      ])
    })
    .collect();
  lines.push(Line::styled(
    "Suggested settlements (s to record the selected one):",
    Style::default().fg(Color::DarkGray),
  ));
  frame.render_widget(Paragraph::new(lines), chunks[0]);

  if summary.balances.is_empty() {
    let paragraph = Paragraph::new("All settled up.").style(Style::default().fg(Color::Green));
    frame.render_widget(paragraph, chunks[1]);
    return;
  }

  let items: Vec<ListItem> = summary
    .balances
    .iter()
    .map(|suggestion| {
      let line = Line::from(vec![
        Span::styled(
          truncate(&suggestion.from_user.name, 20),
          Style::default().fg(Color::Red),
        ),
        Span::styled(" pays ", Style::default().fg(Color::DarkGray)),
        Span::styled(
          truncate(&suggestion.to_user.name, 20),
          Style::default().fg(Color::Green),
        ),
        Span::raw(" "),
        Span::styled(money(suggestion.amount), Style::default().fg(Color::White).bold()),
      ]);
      ListItem::new(line)
    })
    .collect();

  render_selectable(frame, chunks[1], items, selected);
}

fn draw_approvals_tab(frame: &mut Frame, area: Rect, data: &TeamData, selected: usize) {
  if data.approvals.is_empty() {
    let paragraph =
      Paragraph::new("No approvals pending.").style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let items: Vec<ListItem> = data
    .approvals
    .iter()
    .map(|approval| {
      // Resolve the expense this approval refers to, if it is loaded
      let description = data
        .expenses
        .iter()
        .find(|e| e.id == approval.expense_id)
        .map(|e| e.description.as_str())
        .unwrap_or(approval.expense_id.as_str());

      let line = Line::from(vec![
        Span::styled(
          approval.created_at.format("%Y-%m-%d").to_string(),
          Style::default().fg(Color::DarkGray),
        ),
        Span::raw(" "),
        Span::styled(
          format!("{:<10}", approval.status.as_str()),
          Style::default().fg(approval_color(approval.status)),
        ),
        Span::raw(" "),
        Span::raw(truncate(description, 40)),
        Span::raw(" "),
        Span::styled(
          approval.comment.as_deref().unwrap_or(""),
          Style::default().fg(Color::DarkGray).italic(),
        ),
      ]);
      ListItem::new(line)
    })
    .collect();

  render_selectable(frame, area, items, selected);
}

fn draw_members_tab(frame: &mut Frame, area: Rect, data: &TeamData, selected: usize) {
  if data.members.is_empty() {
    let paragraph = Paragraph::new("No members loaded. Invite one with :invite <email>.")
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let items: Vec<ListItem> = data
    .members
    .iter()
    .map(|member| {
      let line = Line::from(vec![
        Span::styled(
          format!("{:<20}", truncate(&member.name, 20)),
          Style::default().fg(Color::Cyan),
        ),
        Span::raw(" "),
        Span::styled(
          format!("{:<10}", member.role),
          Style::default().fg(Color::Yellow),
        ),
        Span::raw(" "),
        Span::styled(&member.email, Style::default().fg(Color::DarkGray)),
      ]);
      ListItem::new(line)
    })
    .collect();

  render_selectable(frame, area, items, selected);
}

fn render_selectable(frame: &mut Frame, area: Rect, items: Vec<ListItem>, selected: usize) {
  let list = List::new(items)
    .highlight_style(
      Style::default()
        .bg(Color::DarkGray)
        .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("> ");

  let mut state = ListState::default();
  state.select(Some(selected));
  frame.render_stateful_widget(list, area, &mut state);
}
