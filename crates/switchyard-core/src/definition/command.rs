use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{DefinitionId, HandlerRef, OptionDefinition, ReplyConfig};

/// Where a command is invoked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    Slash,
    /// Context menu on a user.
    User,
    /// Context menu on a message.
    Message,
}

/// Where a command is registered on the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandScope {
    #[default]
    Global,
    Guild,
}

/// Per-user delay between two invocations of one command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CooldownDefinition {
    pub delay_ms: u64,
}

impl CooldownDefinition {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        }
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

/// A slash command or context-menu command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandDefinition {
    pub id: DefinitionId,
    pub handler: HandlerRef,
    /// Full name; subcommands are space-joined, e.g. `config set`.
    pub name: String,
    pub description: String,
    pub kind: CommandKind,
    pub scope: CommandScope,
    pub options: Vec<OptionDefinition>,
    pub cooldown: Option<CooldownDefinition>,
    pub permissions: Vec<String>,
    pub reply: ReplyConfig,
}

impl CommandDefinition {
    pub fn option(&self, name: &str) -> Option<&OptionDefinition> {
        self.options.iter().find(|option| option.name == name)
    }
}
