use crate::ledger::types::Team;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

use super::truncate;

pub fn draw_team_list(
  frame: &mut Frame,
  area: Rect,
  teams: &[&Team],
  selected: usize,
  loading: bool,
) {
  let title = if loading {
    " Teams (loading...) ".to_string()
  } else {
    format!(" Teams ({}) ", teams.len())
  };

  let block = Block::default()
    .title(title)
    .borders(Borders::ALL)
    .border_style(Style::default().fg(Color::Blue));

  if teams.is_empty() && !loading {
    let paragraph = Paragraph::new("No teams found. Create one with :newteam <name>.")
      .block(block)
      .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(paragraph, area);
    return;
  }

  let items: Vec<ListItem> = teams
    .iter()
    .map(|team| {
      let line = Line::from(vec![
        Span::styled(
          format!("{:<24}", truncate(&team.name, 24)),
          Style::default().fg(Color::Cyan),
        ),
        Span::raw(" "),
        Span::styled(
          truncate(&team.description, 50),
          Style::default().fg(Color::DarkGray),
        ),
      ]);
      ListItem::new(line)
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
