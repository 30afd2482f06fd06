//! Command handler implementation.

use std::sync::Arc;

use tracing::{debug, info};

use super::types::{BotCommand, CommandResult};
use crate::funnel::Funnel;
use crate::types::UserId;

/// Runs chat commands against the funnel.
pub struct CommandHandler {
    funnel: Arc<Funnel>,

    /// The bot's own username, used to accept `/cmd@username`.
    bot_username: Option<String>,
}

impl CommandHandler {
    /// Creates a new command handler.
    #[must_use]
    pub fn new(funnel: Arc<Funnel>, bot_username: Option<String>) -> Self {
        Self {
            funnel,
            bot_username,
        }
    }

    /// Tries to parse and execute a command from a message.
    ///
    /// Returns `None` if the message is not a command.
    pub async fn try_handle(&self, user_id: UserId, message_text: &str) -> Option<CommandResult> {
        let command = BotCommand::parse(message_text, self.bot_username.as_deref())?;

        debug!(user_id = %user_id, command = %command, "Handling command");
        let result = self.execute(user_id, command).await;
        info!(
            user_id = %user_id,
            success = result.success,
            "Command result: {}",
            result.message
        );

        Some(result)
    }

    async fn execute(&self, user_id: UserId, command: BotCommand) -> CommandResult {
        match command {
            BotCommand::Start(payload) => self.handle_start(user_id, payload).await,
            BotCommand::Site => self.handle_site(user_id).await,
            BotCommand::Help => self.handle_help(user_id).await,
        }
    }

    async fn handle_start(&self, user_id: UserId, payload: Option<String>) -> CommandResult {
        if let Some(payload) = payload {
            debug!(user_id = %user_id, payload = %payload, "Start with deep-link payload");
        }
        self.funnel.start(user_id).await;
        CommandResult::success("Funnel started")
    }

    async fn handle_site(&self, user_id: UserId) -> CommandResult {
        if self.funnel.send_site_link(user_id).await.is_delivered() {
            CommandResult::success("Tracking link sent")
        } else {
            CommandResult::error("Tracking link could not be delivered")
        }
    }

    async fn handle_help(&self, user_id: UserId) -> CommandResult {
        if self.funnel.notify(user_id, &help_text()).await.is_delivered() {
            CommandResult::success("Help sent")
        } else {
            CommandResult::error("Help could not be delivered")
        }
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler")
            .field("bot_username", &self.bot_username)
            .finish_non_exhaustive()
    }
}

fn help_text() -> String {
    let mut lines = vec!["Commands:".to_owned(), String::new()];

    for (cmd, aliases, desc) in BotCommand::all_commands() {
        let alias_str = if aliases.is_empty() {
            String::new()
        } else {
            format!(" {aliases}")
        };
        lines.push(format!("  /{cmd}{alias_str} - {desc}"));
    }

    lines.join("\n")
}
