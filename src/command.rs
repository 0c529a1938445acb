//! Operator commands read from the terminal

use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Scan,
    List,
    Json,
    Toggle(String),
    Help,
    Quit,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command {0:?}, type `help`")]
    Unknown(String),

    #[error("`toggle` needs an item name")]
    MissingItem,
}

impl FromStr for Command {
    type Err = CommandError;

    /// An empty line triggers a scan, like pressing Enter in the game overlay.
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        match word.to_lowercase().as_str() {
            "" | "s" | "scan" => Ok(Command::Scan),
            "l" | "ls" | "list" => Ok(Command::List),
            "json" => Ok(Command::Json),
            "t" | "toggle" if rest.is_empty() => Err(CommandError::MissingItem),
            "t" | "toggle" => Ok(Command::Toggle(rest.to_string())),
            "h" | "?" | "help" => Ok(Command::Help),
            "q" | "quit" | "exit" => Ok(Command::Quit),
            _ => Err(CommandError::Unknown(line.to_string())),
        }
    }
}

pub const HELP: &str = "\
  <Enter> | scan       scan the game window
  list                 show the checklist
  json                 print the checklist as JSON
  toggle <item>        flip an item by hand
  quit                 exit";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enter_means_scan() {
        assert_eq!("".parse::<Command>(), Ok(Command::Scan));
        assert_eq!("  \n".parse::<Command>(), Ok(Command::Scan));
        assert_eq!("SCAN".parse::<Command>(), Ok(Command::Scan));
    }

    #[test]
    fn test_toggle_keeps_full_name() {
        assert_eq!(
            "toggle  Armband (Evasion) ".parse::<Command>(),
            Ok(Command::Toggle("Armband (Evasion)".into()))
        );
        assert_eq!("toggle".parse::<Command>(), Err(CommandError::MissingItem));
    }

    #[test]
    fn test_unknown_command() {
        assert!(matches!("dance".parse::<Command>(), Err(CommandError::Unknown(_))));
    }
}
