use crate::cache::aggregate::TeamExpense;
use crate::ledger::types::ApprovalStatus;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use super::{money, truncate};

pub(crate) fn approval_color(status: ApprovalStatus) -> Color {
  match status {
    ApprovalStatus::Approved => Color::Green,
    ApprovalStatus::Rejected => Color::Red,
    ApprovalStatus::Pending => Color::Yellow,
  }
}

pub fn draw_expense_list(
  frame: &mut Frame,
  area: Rect,
  lines: &[&TeamExpense],
  selected: usize,
  loading: bool,
) {
  let title = if loading {
    " Expenses (loading...) ".to_string()
  } else {
    format!(" Expenses ({}) ", lines.len())
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  if lines.is_empty() && !loading {
    let paragraph = Paragraph::new("No expenses found.")
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let items: Vec<ListItem> = lines
    .iter()
    .map(|line| {
      let expense = &line.expense;
      let row = Line::from(vec![
        Span::styled(
          format!("{:<16}", truncate(&line.team_name, 16)),
          Style::default().fg(Color::Cyan),
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
        Span::styled(
          format!("{:<12}", truncate(&expense.category, 12)),
          Style::default().fg(Color::Magenta),
        ),
        Span::raw(" "),
        Span::raw(truncate(&expense.description, 40)),
      ]);
      ListItem::new(row)
    })
    .collect();

  let list = List::new(items)
    .block(block)
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
