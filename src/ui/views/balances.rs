use crate::cache::aggregate::{BalanceOverview, ItemOutcome};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use super::{amount_color, money, truncate};

pub fn draw_balances(
  frame: &mut Frame,
  area: Rect,
  overview: Option<&BalanceOverview>,
  loading: bool,
) {
  let title = match (overview, loading) {
    (Some(_), true) => " Balances (refreshing...) ".to_string(),
    (None, _) => " Balances (loading...) ".to_string(),
    (Some(o), false) => format!(" Balances ({} teams) ", o.per_team.len()),
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  let Some(overview) = overview else {
    let paragraph = Paragraph::new("Loading balances across your teams...")
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  };

  let mut lines: Vec<Line> = Vec::new();

  // Totals first, the per-team detail below
  lines.push(Line::from(vec![
    Span::styled("You are owed: ", Style::default().fg(Color::DarkGray)),
    Span::styled(money(overview.total_owed), Style::default().fg(Color::Green).bold()),
    Span::raw("    "),
    Span::styled("You owe: ", Style::default().fg(Color::DarkGray)),
    Span::styled(money(overview.total_owing), Style::default().fg(Color::Red).bold()),
  ]));
  lines.push(Line::raw(""));

  for row in &overview.per_team {
    let name = Span::styled(
      format!("{:<24}", truncate(&row.team_name, 24)),
      Style::default().fg(Color::Cyan),
    );
    let value = match &row.balance {
      ItemOutcome::Ready(balance) => Span::styled(
        format!("{:>10}", money(*balance)),
        Style::default().fg(amount_color(*balance)),
      ),
      // Failed items are excluded from the totals above; make that
      // visible instead of rendering a zero.
      ItemOutcome::Unavailable(_) => Span::styled(
        format!("{:>10}", "unavailable"),
        Style::default().fg(Color::Red).italic(),
      ),
    };
    lines.push(Line::from(vec![name, Span::raw(" "), value]));
  }

  if overview.partial_error().is_some() {
    lines.push(Line::raw(""));
    lines.push(Line::styled(
      "Some teams could not be loaded; their balances are not included in the totals.",
      Style::default().fg(Color::Red),
    ));
  }

  let paragraph = Paragraph::new(lines).block(block);
  frame.render_widget(paragraph, area);
}
