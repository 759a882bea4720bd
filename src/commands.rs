//! `:` commands and their autocomplete ranking

/// What a command does once submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandAction {
  Balances,
  Notifications,
  Profile,
  Tickets,
  Refresh,
  SignOut,
  Quit,
}

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  pub action: CommandAction,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "balances",
    aliases: &["b", "wallet"],
    description: "Asset balances",
    action: CommandAction::Balances,
  },
  Command {
    name: "notifications",
    aliases: &["n", "inbox"],
    description: "Account notifications",
    action: CommandAction::Notifications,
  },
  Command {
    name: "profile",
    aliases: &["p", "me", "kyc"],
    description: "User details and verification status",
    action: CommandAction::Profile,
  },
  Command {
    name: "tickets",
    aliases: &["t", "support"],
    description: "Support tickets",
    action: CommandAction::Tickets,
  },
  Command {
    name: "refresh",
    aliases: &["r", "reload"],
    description: "Refetch everything",
    action: CommandAction::Refresh,
  },
  Command {
    name: "signout",
    aliases: &["logout", "lock"],
    description: "Forget the credential for this run",
    action: CommandAction::SignOut,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit walletq",
    action: CommandAction::Quit,
  },
];

/// Look up a command by exact name or alias
pub fn resolve(input: &str) -> Option<CommandAction> {
  let input = input.trim().to_lowercase();
  COMMANDS
    .iter()
    .find(|cmd| cmd.name == input || cmd.aliases.contains(&input.as_str()))
    .map(|cmd| cmd.action)
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.trim().to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = COMMANDS
    .iter()
    .filter_map(|cmd| match_priority(cmd, &input_lower).map(|p| (cmd, p)))
    .collect();

  // Stable sort keeps table order within a priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}

/// Lower is better; None means no match
fn match_priority(cmd: &Command, input: &str) -> Option<u32> {
  if cmd.name == input {
    Some(0)
  } else if cmd.aliases.contains(&input) {
    Some(1)
  } else if cmd.name.starts_with(input) {
    Some(2)
  } else if cmd.aliases.iter().any(|a| a.starts_with(input)) {
    Some(3)
  } else if cmd.name.contains(input) {
    Some(4)
  } else if cmd.aliases.iter().any(|a| a.contains(input)) {
    Some(5)
  } else {
    None
  }
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
  fn test_exact_match_first() {
    let suggestions = get_suggestions("tickets");
    assert_eq!(suggestions[0].name, "tickets");
  }

  #[test]
  fn test_alias_beats_prefix() {
    // "p" is an alias of profile and nothing else starts with it
    assert_eq!(get_suggestions("p")[0].name, "profile");
    // "kyc" only lives in profile's aliases
    assert_eq!(get_suggestions("kyc")[0].name, "profile");
  }

  #[test]
  fn test_prefix_match() {
    let suggestions = get_suggestions("noti");
    assert_eq!(suggestions.len(), 1);
    assert_eq!(suggestions[0].name, "notifications");
  }

  #[test]
  fn test_substring_match() {
    let suggestions = get_suggestions("ance");
    assert_eq!(suggestions[0].name, "balances");
  }

  #[test]
  fn test_no_match() {
    assert!(get_suggestions("zzz").is_empty());
  }

  #[test]
  fn test_resolve() {
    assert_eq!(resolve("balances"), Some(CommandAction::Balances));
    assert_eq!(resolve(" Support "), Some(CommandAction::Tickets));
    assert_eq!(resolve("exit"), Some(CommandAction::Quit));
    assert_eq!(resolve("logout"), Some(CommandAction::SignOut));
    assert_eq!(resolve("bal"), None);
  }
}
