//! Pure, synchronous search filtering over already-cached collections.
//!
//! Runs on every keystroke in search mode, so it must stay side-effect
//! free: no cache access, no requests, no mutation of the input.

use crate::cache::aggregate::TeamExpense;
use crate::ledger::types::Team;

/// Collections that can be narrowed by the live search filter expose a
/// fixed list of text fields to match against.
pub trait SearchText {
  fn search_fields(&self) -> Vec<&str>;
}

/// Case-insensitive substring match of `term` against any search field.
/// An empty or whitespace-only term keeps everything.
pub fn filter<'a, T: SearchText>(items: &'a [T], term: &str) -> Vec<&'a T> {
  let needle = term.trim().to_lowercase();
  if needle.is_empty() {
    return items.iter().collect();
  }

  items
    .iter()
    .filter(|item| {
      item
        .search_fields()
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
    })
    .collect()
}

impl SearchText for Team {
  fn search_fields(&self) -> Vec<&str> {
    vec![&self.name, &self.description]
  }
}

impl SearchText for TeamExpense {
  fn search_fields(&self) -> Vec<&str> {
    vec![
      &self.expense.description,
      &self.team_name,
      &self.expense.category,
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::ledger::types::{ApprovalStatus, Expense, SplitType, UserRef};
  use chrono::Utc;

  fn line(description: &str, team_name: &str, category: &str) -> TeamExpense {
    TeamExpense {
      team_id: "t1".to_string(),
      team_name: team_name.to_string(),
      expense: Expense {
        id: "e1".to_string(),
        description: description.to_string(),
        amount: 10.0,
        category: category.to_string(),
        paid_by: UserRef {
          id: "u1".to_string(),
          name: "Ana".to_string(),
          email: "ana@example.com".to_string(),
        },
        split_type: SplitType::Equal,
        receipt_url: None,
        approval_status: ApprovalStatus::Pending,
        created_at: Utc::now(),
      },
    }
  }

  #[test]
  fn test_matches_any_text_field_case_insensitively() {
    let items = vec![
      line("Lunch", "Paris Trip", "Food"),
      line("Flight", "Office", "Travel"),
      line("Hotel", "Office", "PARIS deals"),
    ];

    let hits = filter(&items, "pari");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].expense.description, "Lunch");
    assert_eq!(hits[1].expense.description, "Hotel");
  }

  #[test]
  fn test_empty_term_keeps_everything() {
    let items = vec![line("Lunch", "Paris Trip", "Food")];
    assert_eq!(filter(&items, "").len(), 1);
    assert_eq!(filter(&items, "   ").len(), 1);
  }

  #[test]
  fn test_no_match_returns_empty() {
    let items = vec![line("Lunch", "Paris Trip", "Food")];
    assert!(filter(&items, "taxi").is_empty());
  }

  #[test]
  fn test_filter_is_idempotent() {
    let items = vec![
      line("Lunch", "Paris Trip", "Food"),
      line("Flight", "Office", "Travel"),
    ];
    let once: Vec<String> = filter(&items, "lun")
      .iter()
      .map(|e| e.expense.description.clone())
      .collect();
    let twice: Vec<String> = filter(&items, "lun")
      .iter()
      .map(|e| e.expense.description.clone())
      .collect();
    assert_eq!(once, twice);
  }
}
