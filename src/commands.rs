/// Available commands and autocomplete logic

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "teams",
    aliases: &["t", "team"],
    description: "Browse your teams",
  },
  Command {
    name: "expenses",
    aliases: &["e", "exp"],
    description: "All expenses across teams",
  },
  Command {
    name: "balances",
    aliases: &["b", "bal"],
    description: "Your balance across teams",
  },
  Command {
    name: "newteam",
    aliases: &["nt"],
    description: "Create a team: newteam <name>",
  },
  Command {
    name: "invite",
    aliases: &["inv"],
    description: "Add a member to the open team: invite <email>",
  },
  Command {
    name: "expense",
    aliases: &["add"],
    description: "Add an expense to the open team: expense <amount> <description>",
  },
  Command {
    name: "receipt",
    aliases: &["rcpt"],
    description: "Attach a receipt to the selected expense: receipt <path>",
  },
  Command {
    name: "export",
    aliases: &["x"],
    description: "Export a CSV report: export summary|expenses",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit divvy",
  },
];

/// Get autocomplete suggestions for a given input.
///
/// Only the command word is matched; arguments after the first space are
/// ignored here and parsed by the app when the command runs.
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let word = input.split_whitespace().next().unwrap_or("");
  let input_lower = word.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    // Exact match on name
    if cmd.name == input_lower {
      matches.push((cmd, 0)); // Highest priority
      continue;
    }

    // Exact match on alias
    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    // Prefix match on name
    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    // Prefix match on alias
    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    // Fuzzy match (contains)
    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
      continue;
    }

    // Fuzzy match on alias
    if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

  // Sort by priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_input_returns_all() {
    let suggestions = get_suggestions("");
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("teams");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "teams");
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("b");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "balances");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("exp");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "expenses");
  }

  #[test]
  fn test_arguments_do_not_affect_matching() {
    let suggestions = get_suggestions("newteam Paris Trip");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "newteam");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("uit");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "quit");
  }
}
