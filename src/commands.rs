/// Available commands and autocomplete logic
use crate::routes::Route;

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "dashboard",
    aliases: &["d", "links", "urls"],
    description: "Your short links and analytics",
  },
  Command {
    name: "home",
    aliases: &["h", "landing"],
    description: "Landing page",
  },
  Command {
    name: "about",
    aliases: &["a", "info"],
    description: "About ShortLink",
  },
  Command {
    name: "login",
    aliases: &["l", "signin"],
    description: "Log in",
  },
  Command {
    name: "register",
    aliases: &["r", "signup"],
    description: "Create an account",
  },
  Command {
    name: "logout",
    aliases: &["signout"],
    description: "Forget the saved token",
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit shortlink",
  },
];

/// What a submitted command line asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
  Navigate(Route),
  Logout,
  Quit,
  Unknown(String),
}

/// Resolve a command name, or a raw path such as `/s/abc`.
pub fn resolve(input: &str) -> Action {
  let input = input.trim();
  if input.starts_with('/') {
    return Action::Navigate(Route::parse(input));
  }

  match input.to_lowercase().as_str() {
    "dashboard" => Action::Navigate(Route::Dashboard),
    "home" => Action::Navigate(Route::Landing),
    "about" => Action::Navigate(Route::About),
    "login" => Action::Navigate(Route::Login),
    "register" => Action::Navigate(Route::Register),
    "logout" => Action::Logout,
    "quit" => Action::Quit,
    other => Action::Unknown(other.to_string()),
  }
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.starts_with('/') {
    return Vec::new();
  }

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
