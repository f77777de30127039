//! The definition input contract.
//!
//! Handler metadata is produced outside the router (by a build step, a macro or a
//! hand-written file) as one [`InteractionDescriptor`] per handler method. Descriptors
//! are plain serde data; [`InteractionDescriptor::into_definition`] validates them and
//! derives the definition id.
//!
//! ## Example
//!
//! ```json
//! {
//!   "class": "Moderation",
//!   "method": "ban",
//!   "kind": "slash_command",
//!   "name": "ban",
//!   "permissions": ["BAN_MEMBERS"],
//!   "options": [
//!     { "name": "target", "type": "member" },
//!     { "name": "days", "type": "integer", "required": false,
//!       "constraints": [{ "kind": "max", "value": 7, "message_key": "ban.days" }] }
//!   ]
//! }
//! ```

use std::collections::HashSet;
use std::time::Duration;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::definition::{
    AutoCompleteDefinition, AutoCompleteRule, CommandDefinition, CommandKind, CommandScope,
    ComponentDefinition, ComponentKind, ConstraintKind, CooldownDefinition, Definition,
    DefinitionId, HANDLER_SEPARATOR, HandlerRef, MAX_MODAL_INPUTS, ModalDefinition,
    OptionDefinition, ReplyConfig, TextInputDefinition,
};
use crate::error::DescriptorError;

/// Longest name of one command segment.
const MAX_COMMAND_SEGMENT: usize = 32;
/// Command name segments: command, group, subcommand.
const MAX_COMMAND_DEPTH: usize = 3;

/// Metadata for one handler method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionDescriptor {
    pub class: String,
    pub method: String,
    #[serde(default)]
    pub permissions: Vec<String>,
    #[serde(default)]
    pub reply: ReplyConfig,
    #[serde(flatten)]
    pub kind: DescriptorKind,
}

/// Kind-specific descriptor metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DescriptorKind {
    SlashCommand {
        name: String,
        #[serde(default)]
        description: String,
        #[serde(default)]
        scope: CommandScope,
        #[serde(default)]
        options: Vec<OptionDefinition>,
        #[serde(default)]
        cooldown_ms: u64,
    },
    UserContext {
        name: String,
        #[serde(default)]
        scope: CommandScope,
    },
    MessageContext {
        name: String,
        #[serde(default)]
        scope: CommandScope,
    },
    Component {
        component: ComponentKind,
        #[serde(default)]
        label: Option<String>,
        #[serde(default)]
        independent: bool,
    },
    Modal {
        title: String,
        inputs: Vec<TextInputDefinition>,
    },
    AutoComplete {
        rules: Vec<AutoCompleteRule>,
    },
}

impl InteractionDescriptor {
    fn new(class: impl Into<String>, method: impl Into<String>, kind: DescriptorKind) -> Self {
        Self {
            class: class.into(),
            method: method.into(),
            permissions: Vec::new(),
            reply: ReplyConfig::default(),
            kind,
        }
    }

    pub fn slash_command(class: impl Into<String>, method: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(
            class,
            method,
            DescriptorKind::SlashCommand {
                name: name.into(),
                description: String::new(),
                scope: CommandScope::Global,
                options: Vec::new(),
                cooldown_ms: 0,
            },
        )
    }

    pub fn user_context(class: impl Into<String>, method: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(
            class,
            method,
            DescriptorKind::UserContext {
                name: name.into(),
                scope: CommandScope::Global,
            },
        )
    }

    pub fn message_context(class: impl Into<String>, method: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(
            class,
            method,
            DescriptorKind::MessageContext {
                name: name.into(),
                scope: CommandScope::Global,
            },
        )
    }

    pub fn component(class: impl Into<String>, method: impl Into<String>, component: ComponentKind) -> Self {
        Self::new(
            class,
            method,
            DescriptorKind::Component {
                component,
                label: None,
                independent: false,
            },
        )
    }

    pub fn button(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self::component(class, method, ComponentKind::Button)
    }

    pub fn modal<I>(class: impl Into<String>, method: impl Into<String>, title: impl Into<String>, inputs: I) -> Self
    where
        I: IntoIterator<Item = TextInputDefinition>,
    {
        Self::new(
            class,
            method,
            DescriptorKind::Modal {
                title: title.into(),
                inputs: inputs.into_iter().collect(),
            },
        )
    }

    pub fn autocomplete<I>(class: impl Into<String>, method: impl Into<String>, rules: I) -> Self
    where
        I: IntoIterator<Item = AutoCompleteRule>,
    {
        Self::new(
            class,
            method,
            DescriptorKind::AutoComplete {
                rules: rules.into_iter().collect(),
            },
        )
    }

    /// Appends an option. Ignored for kinds without options.
    pub fn option(mut self, option: OptionDefinition) -> Self {
        if let DescriptorKind::SlashCommand { options, .. } = &mut self.kind {
            options.push(option);
        }
        self
    }

    /// Sets the per-user cooldown. Ignored for kinds other than slash commands.
    pub fn cooldown(mut self, delay: Duration) -> Self {
        if let DescriptorKind::SlashCommand { cooldown_ms, .. } = &mut self.kind {
            *cooldown_ms = CooldownDefinition::new(delay).delay_ms;
        }
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        if let DescriptorKind::SlashCommand { description, .. } = &mut self.kind {
            *description = text.into();
        }
        self
    }

    pub fn label(mut self, text: impl Into<String>) -> Self {
        if let DescriptorKind::Component { label, .. } = &mut self.kind {
            *label = Some(text.into());
        }
        self
    }

    pub fn independent(mut self) -> Self {
        if let DescriptorKind::Component { independent, .. } = &mut self.kind {
            *independent = true;
        }
        self
    }

    pub fn permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    pub fn ephemeral(mut self) -> Self {
        self.reply.ephemeral = true;
        self
    }

    pub fn handler(&self) -> HandlerRef {
        HandlerRef::new(self.class.clone(), self.method.clone())
    }

    /// Validates the descriptor and turns it into a [`Definition`].
    pub fn into_definition(self) -> Result<Definition, DescriptorError> {
        if self.class.trim().is_empty() || self.method.trim().is_empty() {
            return Err(DescriptorError::MissingHandler);
        }
        if self.class.contains(HANDLER_SEPARATOR) || self.method.contains(HANDLER_SEPARATOR) {
            return Err(DescriptorError::ReservedSeparator {
                class: self.class,
                method: self.method,
            });
        }
        let handler = self.handler();
        let id = handler.definition_id();

        let definition = match self.kind {
            DescriptorKind::SlashCommand {
                name,
                description,
                scope,
                options,
                cooldown_ms,
            } => {
                validate_command_name(&name, CommandKind::Slash)?;
                validate_options(&name, &options)?;
                Definition::Command(CommandDefinition {
                    id,
                    handler,
                    name,
                    description,
                    kind: CommandKind::Slash,
                    scope,
                    options,
                    cooldown: (cooldown_ms > 0).then_some(CooldownDefinition {
                        delay_ms: cooldown_ms,
                    }),
                    permissions: self.permissions,
                    reply: self.reply,
                })
            }
            DescriptorKind::UserContext { name, scope } => {
                context_command(id, handler, name, CommandKind::User, scope, self.permissions, self.reply)?
            }
            DescriptorKind::MessageContext { name, scope } => {
                context_command(id, handler, name, CommandKind::Message, scope, self.permissions, self.reply)?
            }
            DescriptorKind::Component {
                component,
                label,
                independent,
            } => Definition::Component(ComponentDefinition {
                id,
                handler,
                kind: component,
                label,
                independent,
                permissions: self.permissions,
                reply: self.reply,
            }),
            DescriptorKind::Modal { title, inputs } => {
                if inputs.is_empty() || inputs.len() > MAX_MODAL_INPUTS {
                    return Err(DescriptorError::InputCount {
                        title,
                        count: inputs.len(),
                        max: MAX_MODAL_INPUTS,
                    });
                }
                Definition::Modal(ModalDefinition::new(id, handler, title, inputs, self.reply))
            }
            DescriptorKind::AutoComplete { rules } => {
                if rules.is_empty() {
                    return Err(DescriptorError::EmptyRules {
                        class: handler.class,
                        method: handler.method,
                    });
                }
                Definition::AutoComplete(AutoCompleteDefinition { id, handler, rules })
            }
        };
        Ok(definition)
    }
}

fn context_command(
    id: DefinitionId,
    handler: HandlerRef,
    name: String,
    kind: CommandKind,
    scope: CommandScope,
    permissions: Vec<String>,
    reply: ReplyConfig,
) -> Result<Definition, DescriptorError> {
    validate_command_name(&name, kind)?;
    Ok(Definition::Command(CommandDefinition {
        id,
        handler,
        name,
        description: String::new(),
        kind,
        scope,
        options: Vec::new(),
        cooldown: None,
        permissions,
        reply,
    }))
}

fn validate_command_name(name: &str, kind: CommandKind) -> Result<(), DescriptorError> {
    let invalid = |reason| DescriptorError::InvalidCommandName {
        name: name.to_string(),
        reason,
    };

    if name.trim().is_empty() {
        return Err(invalid("name is empty"));
    }
    // Context menu names are free-form display strings.
    if kind != CommandKind::Slash {
        return if name.chars().count() > MAX_COMMAND_SEGMENT {
            Err(invalid("name is longer than 32 characters"))
        } else {
            Ok(())
        };
    }

    let segments: Vec<&str> = name.split(' ').collect();
    if segments.len() > MAX_COMMAND_DEPTH {
        return Err(invalid("more than three name segments"));
    }
    for segment in segments {
        if segment.is_empty() || segment.chars().count() > MAX_COMMAND_SEGMENT {
            return Err(invalid("segments must be 1 to 32 characters"));
        }
        if !segment
            .chars()
            .all(|c| c == '-' || c == '_' || c.is_numeric() || (c.is_alphabetic() && !c.is_uppercase()))
        {
            return Err(invalid("segments must be lowercase words, digits, '-' or '_'"));
        }
    }
    Ok(())
}

fn validate_options(command: &str, options: &[OptionDefinition]) -> Result<(), DescriptorError> {
    let mut seen = HashSet::new();
    let mut optional_seen = false;
    for option in options {
        if !seen.insert(option.name.as_str()) {
            return Err(DescriptorError::DuplicateOption {
                command: command.to_string(),
                option: option.name.clone(),
            });
        }
        if option.required && optional_seen {
            return Err(DescriptorError::RequiredAfterOptional {
                command: command.to_string(),
                option: option.name.clone(),
            });
        }
        optional_seen |= !option.required;

        for constraint in &option.constraints {
            if let ConstraintKind::Pattern { regex } = &constraint.kind {
                Regex::new(regex).map_err(|e| DescriptorError::InvalidPattern {
                    option: option.name.clone(),
                    message: e.to_string(),
                })?;
            }
        }
    }
    Ok(())
}
