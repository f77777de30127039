use serde::{Deserialize, Serialize};

use super::{DefinitionId, HandlerRef};

/// Names the command (and optionally the options) an autocomplete handler serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutoCompleteRule {
    pub command: String,
    /// Empty means every autocomplete option of the command.
    #[serde(default)]
    pub options: Vec<String>,
}

impl AutoCompleteRule {
    pub fn command(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            options: Vec::new(),
        }
    }

    pub fn option(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }

    /// A rule naming a parent command also covers its subcommands.
    pub fn matches(&self, command: &str, option: &str) -> bool {
        let command_matches = command == self.command
            || command
                .strip_prefix(self.command.as_str())
                .is_some_and(|rest| rest.starts_with(' '));
        command_matches && (self.options.is_empty() || self.options.iter().any(|o| o == option))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AutoCompleteDefinition {
    pub id: DefinitionId,
    pub handler: HandlerRef,
    pub rules: Vec<AutoCompleteRule>,
}

impl AutoCompleteDefinition {
    pub fn serves(&self, command: &str, option: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(command, option))
    }
}
