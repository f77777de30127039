//! Immutable descriptions of invocable units.
//!
//! A [`Definition`] is created once at startup from an
//! [`InteractionDescriptor`](crate::InteractionDescriptor) and never mutated. Every
//! definition points at one handler method through a [`HandlerRef`] and is keyed by a
//! [`DefinitionId`] derived from that reference, so the same handler always produces
//! the same id across restarts and custom ids survive redeploys.

mod autocomplete;
mod command;
mod component;
mod modal;
mod option;

use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use autocomplete::{AutoCompleteDefinition, AutoCompleteRule};
pub use command::{CommandDefinition, CommandKind, CommandScope, CooldownDefinition};
pub use component::{ComponentDefinition, ComponentKind};
pub use modal::{MAX_MODAL_INPUTS, ModalDefinition, TextInputDefinition, TextInputStyle};
pub use option::{Constraint, ConstraintKind, DefaultPolicy, OptionDefinition, OptionType};

// =============================================================================
// Identity
// =============================================================================

/// Joins class and method in the id hash; descriptors may not use it in either part.
pub(crate) const HANDLER_SEPARATOR: char = '#';

/// Longest base36 rendering of a `u64`.
pub(crate) const DEFINITION_ID_MAX_LEN: usize = 13;

/// Stable identifier of a definition.
///
/// The base36 rendering of the first 64 bits of `SHA-256(class + "#" + method)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DefinitionId(String);

impl DefinitionId {
    /// Derives the id of the handler method `class#method`.
    pub fn of(class: &str, method: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(class.as_bytes());
        hasher.update([HANDLER_SEPARATOR as u8]);
        hasher.update(method.as_bytes());
        let digest = hasher.finalize();

        let mut prefix = [0u8; 8];
        prefix.copy_from_slice(&digest[..8]);
        Self(to_base36(u64::from_be_bytes(prefix)))
    }

    /// Accepts a previously rendered id, rejecting anything that is not lowercase base36.
    pub fn parse(raw: &str) -> Option<Self> {
        let valid = !raw.is_empty()
            && raw.len() <= DEFINITION_ID_MAX_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_digit() || b.is_ascii_lowercase());
        valid.then(|| Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DefinitionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for DefinitionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::with_capacity(DEFINITION_ID_MAX_LEN);
    while value > 0 {
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    out.into_iter().map(char::from).collect()
}

/// The handler method a definition invokes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandlerRef {
    pub class: String,
    pub method: String,
}

impl HandlerRef {
    pub fn new(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            class: class.into(),
            method: method.into(),
        }
    }

    pub fn definition_id(&self) -> DefinitionId {
        DefinitionId::of(&self.class, &self.method)
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.class, self.method)
    }
}

/// How replies produced for a definition are sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyConfig {
    /// Only the invoking user sees the reply.
    #[serde(default)]
    pub ephemeral: bool,
    /// Suppress push notifications for the reply.
    #[serde(default)]
    pub silent: bool,
}

// =============================================================================
// Definition
// =============================================================================

/// One invocable unit.
#[derive(Debug, Clone, PartialEq)]
pub enum Definition {
    Command(CommandDefinition),
    Component(ComponentDefinition),
    Modal(ModalDefinition),
    AutoComplete(AutoCompleteDefinition),
}

impl Definition {
    pub fn id(&self) -> &DefinitionId {
        match self {
            Self::Command(d) => &d.id,
            Self::Component(d) => &d.id,
            Self::Modal(d) => &d.id,
            Self::AutoComplete(d) => &d.id,
        }
    }

    pub fn handler(&self) -> &HandlerRef {
        match self {
            Self::Command(d) => &d.handler,
            Self::Component(d) => &d.handler,
            Self::Modal(d) => &d.handler,
            Self::AutoComplete(d) => &d.handler,
        }
    }

    /// Human-readable name for logs and error replies.
    pub fn display_name(&self) -> String {
        match self {
            Self::Command(d) => match d.kind {
                CommandKind::Slash => format!("/{}", d.name),
                CommandKind::User | CommandKind::Message => d.name.clone(),
            },
            Self::Component(d) => match &d.label {
                Some(label) => format!("{:?} '{}'", d.kind, label),
                None => format!("{:?} {}", d.kind, d.handler),
            },
            Self::Modal(d) => format!("Modal '{}'", d.title),
            Self::AutoComplete(d) => format!("AutoComplete {}", d.handler),
        }
    }

    /// Short kind name used as a tracing field.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Command(_) => "command",
            Self::Component(_) => "component",
            Self::Modal(_) => "modal",
            Self::AutoComplete(_) => "autocomplete",
        }
    }

    /// Options whose values are adapted and validated before invocation.
    pub fn options(&self) -> &[OptionDefinition] {
        match self {
            Self::Command(d) => &d.options,
            Self::Modal(d) => &d.options,
            Self::Component(_) | Self::AutoComplete(_) => &[],
        }
    }

    /// Permissions the invoking member must hold.
    pub fn permissions(&self) -> &[String] {
        match self {
            Self::Command(d) => &d.permissions,
            Self::Component(d) => &d.permissions,
            Self::Modal(_) | Self::AutoComplete(_) => &[],
        }
    }

    pub fn reply_config(&self) -> ReplyConfig {
        match self {
            Self::Command(d) => d.reply,
            Self::Component(d) => d.reply,
            Self::Modal(d) => d.reply,
            Self::AutoComplete(_) => ReplyConfig::default(),
        }
    }

    /// Whether this is a component that never binds to a runtime.
    pub fn is_independent(&self) -> bool {
        matches!(self, Self::Component(d) if d.independent)
    }

    pub fn as_command(&self) -> Option<&CommandDefinition> {
        match self {
            Self::Command(d) => Some(d),
            _ => None,
        }
    }
}
