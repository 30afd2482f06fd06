//! Command types and definitions.

use std::fmt;

/// Available bot commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotCommand {
    /// Enter the funnel. Carries the deep-link payload, if any.
    Start(Option<String>),

    /// Send the tracking link again.
    Site,

    /// Show help information.
    Help,
}

impl BotCommand {
    /// Parses a command from a message text.
    ///
    /// Accepts `/cmd`, `/cmd args` and `/cmd@botname`. A mention of another
    /// bot is rejected when `bot_username` is known.
    ///
    /// Returns `None` if the message is not a valid command.
    #[must_use]
    pub fn parse(text: &str, bot_username: Option<&str>) -> Option<Self> {
        let text = text.trim().strip_prefix('/')?;

        let (head, args) = match text.split_once(char::is_whitespace) {
            Some((head, args)) => (head, Some(args.trim()).filter(|a| !a.is_empty())),
            None => (text, None),
        };

        let cmd = match head.split_once('@') {
            Some((cmd, mention)) => {
                if let Some(username) = bot_username {
                    if !mention.eq_ignore_ascii_case(username.trim_start_matches('@')) {
                        return None;
                    }
                }
                cmd
            }
            None => head,
        };

        match cmd.to_lowercase().as_str() {
            "start" => Some(Self::Start(args.map(str::to_owned))),
            "site" | "link" => Some(Self::Site),
            "help" => Some(Self::Help),
            _ => None,
        }
    }

    /// Returns the command name as it appears in help.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Start(_) => "start",
            Self::Site => "site",
            Self::Help => "help",
        }
    }

    /// Returns the command description for help.
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Start(_) => "Start over and get your personal form link",
            Self::Site => "Send the form link again",
            Self::Help => "Show this help message",
        }
    }

    /// Returns all available commands with their aliases and descriptions.
    #[must_use]
    pub fn all_commands() -> Vec<(&'static str, &'static str, &'static str)> {
        [Self::Start(None), Self::Site, Self::Help]
            .iter()
            .map(|cmd| {
                let aliases = if *cmd == Self::Site { "(link)" } else { "" };
                (cmd.name(), aliases, cmd.description())
            })
            .collect()
    }
}

impl fmt::Display for BotCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Start(Some(payload)) => write!(f, "start {payload}"),
            _ => write!(f, "{}", self.name()),
        }
    }
}

/// Result of command execution.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Whether every message of the command was delivered.
    pub success: bool,

    /// Summary for the log.
    pub message: String,
}

impl CommandResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    /// Creates an error result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
