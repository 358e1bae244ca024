/// Available commands and autocomplete logic
use crate::session::Role;

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  /// Only shown to admin and department-head roles
  pub reviewers_only: bool,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "resources",
    aliases: &["r", "res", "resource"],
    description: "Browse resources",
    reviewers_only: false,
  },
  Command {
    name: "allocations",
    aliases: &["a", "alloc", "requests"],
    description: "Browse allocation requests",
    reviewers_only: false,
  },
  Command {
    name: "departments",
    aliases: &["d", "dep", "department"],
    description: "Manage departments",
    reviewers_only: true,
  },
  Command {
    name: "transfers",
    aliases: &["t", "transfer"],
    description: "Review transfers",
    reviewers_only: true,
  },
  Command {
    name: "signout",
    aliases: &["logout"],
    description: "Sign out",
    reviewers_only: false,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit r9s",
    reviewers_only: false,
  },
];

/// Get autocomplete suggestions for a given input, filtered by role
pub fn get_suggestions(input: &str, role: Role) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  let visible = COMMANDS
    .iter()
    .filter(|cmd| !cmd.reviewers_only || role.can_review());

  if input_lower.is_empty() {
    return visible.collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in visible {
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
  fn test_empty_input_returns_all_for_admin() {
    let suggestions = get_suggestions("", Role::Admin);
    assert_eq!(suggestions.len(), COMMANDS.len());
  }

  #[test]
  fn test_staff_does_not_see_review_commands() {
    let suggestions = get_suggestions("", Role::Staff);
    assert!(suggestions.iter().all(|c| !c.reviewers_only));
    assert!(suggestions.len() < COMMANDS.len());
  }

  #[test]
  fn test_exact_match() {
    let suggestions = get_suggestions("resources", Role::Staff);
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "resources");
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("r", Role::Staff);
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "resources");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("dep", Role::DepartmentHead);
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "departments");
  }

  #[test]
  fn test_staff_sees_allocation_requests() {
    let suggestions = get_suggestions("requests", Role::Staff);
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "allocations");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("loc", Role::DepartmentHead);
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "allocations");
  }

  #[test]
  fn test_alias_hidden_by_role() {
    let suggestions = get_suggestions("dep", Role::Staff);
    assert!(suggestions.iter().all(|c| c.name != "departments"));
  }
}
