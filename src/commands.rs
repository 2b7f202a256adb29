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
    name: "projects",
    aliases: &["p", "project", "list"],
    description: "Browse your projects",
  },
  Command {
    name: "new",
    aliases: &["n", "create"],
    description: "Create a project",
  },
  Command {
    name: "refresh",
    aliases: &["r", "reload"],
    description: "Refresh from the server",
  },
  Command {
    name: "logout",
    aliases: &["signout"],
    description: "Sign out and clear the saved session",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit trk",
  },
];

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    if cmd.name == input_lower {
      matches.push((cmd, 0));
      continue;
    }

    if cmd.aliases.contains(&input_lower.as_str()) {
      matches.push((cmd, 1));
      continue;
    }

    if cmd.name.starts_with(&input_lower) {
      matches.push((cmd, 2));
      continue;
    }

    if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      matches.push((cmd, 3));
      continue;
    }

    if cmd.name.contains(&input_lower) {
      matches.push((cmd, 4));
      continue;
    }

    if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      matches.push((cmd, 5));
    }
  }

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
    let suggestions = get_suggestions("projects");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "projects");
  }

  #[test]
  fn test_alias_match() {
    let suggestions = get_suggestions("p");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "projects");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("pro");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "projects");
  }

  #[test]
  fn test_fuzzy_match() {
    let suggestions = get_suggestions("oject");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "projects");
  }

  #[test]
  fn test_case_insensitive() {
    let suggestions = get_suggestions("QUIT");
    assert!(!suggestions.is_empty());
    assert_eq!(suggestions[0].name, "quit");
  }
}
