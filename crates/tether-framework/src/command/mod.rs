//! Chat command parsing and routing.
//!
//! A chat line becomes a [`CommandInvocation`] via the [`CommandParser`], then
//! the [`CommandRouter`] decides which [`CommandTable`] (if any) owns it.
//!
//! # Parsing Rules
//!
//! 1. A single leading prefix character is stripped. When the prefix is
//!    mandatory, lines without it are not commands.
//! 2. The remainder is tokenized on whitespace, or shell-style when quote
//!    awareness is enabled.
//! 3. The first token is the command name; an empty name means "not a
//!    command".
//!
//! ```rust
//! use tether_framework::command::CommandParser;
//!
//! let parser = CommandParser::default();
//! let invocation = parser.parse("/give wood 5").unwrap();
//! assert_eq!(invocation.name(), "give");
//! assert_eq!(invocation.args(), ["wood", "5"]);
//!
//! assert!(parser.parse("/").is_none());
//! ```

use serde::{Deserialize, Serialize};

pub mod router;
pub mod split;
pub mod table;

pub use router::{CommandRouter, RESTRICTED_COMMANDS, RouteOutcome, TableKind, is_restricted};
pub use split::{shell_split, whitespace_split};
pub use table::{BoxedCommandHandler, CommandCall, CommandTable, into_command_handler};

// =============================================================================
// CommandSettings
// =============================================================================

/// Command parsing options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommandSettings {
    /// Command prefix character.
    pub prefix: char,
    /// Whether a line must start with the prefix to count as a command.
    pub require_prefix: bool,
    /// Whether quoted arguments are kept together.
    pub quote_aware: bool,
}

impl Default for CommandSettings {
    fn default() -> Self {
        Self {
            prefix: '/',
            require_prefix: false,
            quote_aware: false,
        }
    }
}

// =============================================================================
// CommandInvocation
// =============================================================================

/// A parsed command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandInvocation {
    name: String,
    raw_name: String,
    args: Vec<String>,
}

impl CommandInvocation {
    /// Builds an invocation from a name token and its arguments.
    ///
    /// Returns `None` for an empty name.
    pub fn new(raw_name: impl Into<String>, args: Vec<String>) -> Option<Self> {
        let raw_name = raw_name.into();
        if raw_name.is_empty() {
            return None;
        }
        Some(Self {
            name: raw_name.to_lowercase(),
            raw_name,
            args,
        })
    }

    /// The lower-cased command name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The command name as typed.
    pub fn raw_name(&self) -> &str {
        &self.raw_name
    }

    /// Arguments in order.
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

// =============================================================================
// CommandParser
// =============================================================================

/// Turns chat lines into [`CommandInvocation`]s.
#[derive(Debug, Clone, Default)]
pub struct CommandParser {
    settings: CommandSettings,
}

impl CommandParser {
    /// Creates a parser with the given settings.
    pub fn new(settings: CommandSettings) -> Self {
        Self { settings }
    }

    /// The active settings.
    pub fn settings(&self) -> &CommandSettings {
        &self.settings
    }

    /// Parses `line`, returning `None` if it is not a command.
    pub fn parse(&self, line: &str) -> Option<CommandInvocation> {
        let line = line.trim_start();
        let body = match line.strip_prefix(self.settings.prefix) {
            Some(rest) => rest,
            None if self.settings.require_prefix => return None,
            None => line,
        };

        let mut tokens = if self.settings.quote_aware {
            shell_split(body)
        } else {
            whitespace_split(body)
        };
        if tokens.is_empty() {
            return None;
        }

        let name = tokens.remove(0);
        CommandInvocation::new(name, tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_give() {
        let parser = CommandParser::default();
        let invocation = parser.parse("/give wood 5").unwrap();
        assert_eq!(invocation.name(), "give");
        assert_eq!(invocation.args(), ["wood", "5"]);
    }

    #[test]
    fn test_prefix_alone_is_not_a_command() {
        let parser = CommandParser::default();
        assert!(parser.parse("/").is_none());
        assert!(parser.parse("/   ").is_none());
        assert!(parser.parse("").is_none());
    }

    #[test]
    fn test_only_one_prefix_is_stripped() {
        let parser = CommandParser::default();
        assert_eq!(parser.parse("//home").unwrap().raw_name(), "/home");
    }

    #[test]
    fn test_name_is_lowercased_but_raw_kept() {
        let parser = CommandParser::default();
        let invocation = parser.parse("/Home Base").unwrap();
        assert_eq!(invocation.name(), "home");
        assert_eq!(invocation.raw_name(), "Home");
        assert_eq!(invocation.args(), ["Base"]);
    }

    #[test]
    fn test_optional_prefix() {
        let parser = CommandParser::default();
        assert_eq!(parser.parse("kit starter").unwrap().name(), "kit");
    }

    #[test]
    fn test_required_prefix() {
        let parser = CommandParser::new(CommandSettings {
            require_prefix: true,
            ..Default::default()
        });
        assert!(parser.parse("kit starter").is_none());
        assert!(parser.parse("/kit starter").is_some());
    }

    #[test]
    fn test_custom_prefix() {
        let parser = CommandParser::new(CommandSettings {
            prefix: '!',
            ..Default::default()
        });
        assert_eq!(parser.parse("!tp Bob").unwrap().name(), "tp");
    }

    #[test]
    fn test_quote_aware_option() {
        let plain = CommandParser::default();
        assert_eq!(plain.parse(r#"/msg "Big Bob" hi"#).unwrap().args().len(), 3);

        let quoted = CommandParser::new(CommandSettings {
            quote_aware: true,
            ..Default::default()
        });
        assert_eq!(
            quoted.parse(r#"/msg "Big Bob" hi"#).unwrap().args(),
            ["Big Bob", "hi"]
        );
    }
}
