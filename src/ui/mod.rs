mod views;

use crate::app::{App, Mode, ViewState};
use crate::filter;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Main draw function
pub fn draw(frame: &mut Frame, app: &App) {
  let suggestion_rows = if *app.mode() == Mode::Command {
    app.autocomplete_suggestions().len().min(6) as u16
  } else {
    0
  };

  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1),               // Header
      Constraint::Min(1),                  // Main content
      Constraint::Length(suggestion_rows), // Command suggestions
      Constraint::Length(1),               // Status bar
    ])
    .split(frame.area());

  draw_header(frame, chunks[0], app);

  // Draw current view
  if let Some(view) = app.current_view() {
    match view {
      ViewState::TeamList {
        teams,
        selected,
        loading,
      } => {
        let visible = filter::filter(teams, app.search_filter());
        views::teams::draw_team_list(frame, chunks[1], &visible, *selected, *loading);
      }
      ViewState::Balances { overview, loading } => {
        views::balances::draw_balances(frame, chunks[1], overview.as_ref(), *loading);
      }
      ViewState::Expenses {
        lines,
        selected,
        loading,
      } => {
        let visible = filter::filter(lines, app.search_filter());
        views::expenses::draw_expense_list(frame, chunks[1], &visible, *selected, *loading);
      }
      ViewState::TeamDetail {
        team,
        tab,
        data,
        selected,
        loading,
      } => {
        views::team_detail::draw_team_detail(
          frame, chunks[1], team, *tab, data, *selected, *loading,
        );
      }
    }
  }

  if suggestion_rows > 0 {
    draw_suggestions(frame, chunks[2], app);
  }

  // Draw status bar
  draw_status_bar(frame, chunks[3], app);
}

fn draw_header(frame: &mut Frame, area: Rect, app: &App) {
  let breadcrumb = app.view_breadcrumb().join(" > ");

  let header = Line::from(vec![
    Span::styled(" divvy ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", extract_domain(app.title())),
      Style::default().fg(Color::White),
    ),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(
      format!(" {} ", breadcrumb),
      Style::default().fg(Color::Yellow).bold(),
    ),
    Span::raw("  "),
    // Shortcuts - keys highlighted, descriptions dimmed
    Span::styled("<:>", Style::default().fg(Color::Cyan)),
    Span::styled(" command", Style::default().fg(Color::DarkGray)),
    Span::raw("   "),
    Span::styled("</>", Style::default().fg(Color::Cyan)),
    Span::styled(" filter", Style::default().fg(Color::DarkGray)),
    Span::raw("   "),
    Span::styled("<q>", Style::default().fg(Color::Cyan)),
    Span::styled(" back", Style::default().fg(Color::DarkGray)),
  ]);

  let paragraph = Paragraph::new(header).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

fn draw_suggestions(frame: &mut Frame, area: Rect, app: &App) {
  let suggestions = app.autocomplete_suggestions();
  let lines: Vec<Line> = suggestions
    .iter()
    .take(area.height as usize)
    .enumerate()
    .map(|(i, cmd)| {
      let style = if i == app.selected_suggestion() {
        Style::default().fg(Color::Black).bg(Color::Yellow)
      } else {
        Style::default().fg(Color::DarkGray)
      };
      Line::styled(format!(" {:<10} {}", cmd.name, cmd.description), style)
    })
    .collect();

  frame.render_widget(Paragraph::new(lines), area);
}

fn draw_status_bar(frame: &mut Frame, area: Rect, app: &App) {
  let (content, style) = match app.mode() {
    Mode::Normal => match app.status() {
      Some(status) => (format!(" {}", status), Style::default().fg(Color::White)),
      None => {
        let hint =
          " :command  /search  j/k:nav  Enter:open  Tab:tab  a/x:approve/reject  d:delete  s:settle  q:back";
        (hint.to_string(), Style::default().fg(Color::DarkGray))
      }
    },
    Mode::Command => {
      let cmd = format!(":{}", app.command_input());
      (cmd, Style::default().fg(Color::Yellow))
    }
    Mode::Search => {
      let search = format!("/{}", app.search_filter());
      (search, Style::default().fg(Color::Cyan))
    }
  };

  let paragraph = Paragraph::new(content).style(style);
  frame.render_widget(paragraph, area);
}

/// Extract domain from the configured ledger URL (or pass a plain title
/// through unchanged)
fn extract_domain(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_extract_domain() {
    assert_eq!(
      extract_domain("https://ledger.example.com"),
      "ledger.example.com"
    );
    assert_eq!(
      extract_domain("https://ledger.example.com/api"),
      "ledger.example.com"
    );
    assert_eq!(extract_domain("http://localhost:8080"), "localhost:8080");
    assert_eq!(extract_domain("Expenses"), "Expenses");
  }
}
