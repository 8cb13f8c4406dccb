//! Built-in bot commands. Instant responses, no translation call.

mod settings;

#[cfg(test)]
mod tests;

pub(crate) use settings::{set_target_language, SetLangOutcome};

use crate::backend::Backend;
use crate::replies;
use tolmach_memory::{PendingActions, SettingsStore};
use tracing::warn;

/// Grouped context for command execution.
pub struct CommandContext<'a> {
    pub backend: &'a Backend,
    pub settings: &'a SettingsStore,
    pub pending: &'a PendingActions,
    pub bot_name: &'a str,
    pub sender_id: i64,
    pub text: &'a str,
}

/// Known bot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Detect,
    SetLang,
    Cancel,
}

impl Command {
    /// Parse a command from message text. Returns `None` for anything else,
    /// including unknown `/` prefixes, which are translated like text.
    pub fn parse(text: &str) -> Option<Self> {
        let first = text.split_whitespace().next()?;
        // Strip @botname suffix (e.g. "/help@tolmach_bot" -> "/help").
        let cmd = first.split('@').next().unwrap_or(first);
        match cmd {
            "/start" => Some(Self::Start),
            "/help" => Some(Self::Help),
            "/detect" => Some(Self::Detect),
            "/setlang" | "/lang" => Some(Self::SetLang),
            "/cancel" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// First argument after the command word, if any.
fn argument(text: &str) -> Option<&str> {
    text.split_whitespace().nth(1)
}

/// Handle a command and return the response text.
pub async fn handle(cmd: Command, ctx: &CommandContext<'_>) -> String {
    match cmd {
        Command::Start | Command::Help => {
            replies::help(ctx.bot_name, ctx.settings.default_language())
        }
        Command::Detect => {
            ctx.pending.set_detect(ctx.sender_id);
            replies::DETECT_ARMED.to_string()
        }
        Command::Cancel => {
            if ctx.pending.clear(ctx.sender_id) {
                replies::CANCELLED.to_string()
            } else {
                replies::NOTHING_TO_CANCEL.to_string()
            }
        }
        Command::SetLang => match argument(ctx.text) {
            None => match ctx.settings.get(ctx.sender_id) {
                Ok(s) => replies::current_target(&s.target_language),
                Err(e) => {
                    warn!("settings lookup failed for {}: {e}", ctx.sender_id);
                    replies::current_target(ctx.settings.default_language())
                }
            },
            Some(code) => {
                set_target_language(ctx.backend, ctx.settings, ctx.sender_id, code)
                    .await
                    .reply()
            }
        },
    }
}
