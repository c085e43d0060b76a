pub mod balances;
pub mod expenses;
pub mod team_detail;
pub mod teams;

use ratatui::prelude::*;

pub(crate) fn money(amount: f64) -> String {
  format!("{:.2}", amount)
}

pub(crate) fn amount_color(amount: f64) -> Color {
  if amount > 0.0 {
    Color::Green
  } else if amount < 0.0 {
    Color::Red
  } else {
    Color::White
  }
}

pub(crate) fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let cut: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", cut)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate_leaves_short_strings_alone() {
    assert_eq!(truncate("Lunch", 10), "Lunch");
  }

  #[test]
  fn test_truncate_cuts_long_strings() {
    assert_eq!(truncate("A very long description", 10), "A very ...");
  }
}
