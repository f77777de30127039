//! Reply intents handed to the reply sink.
//!
//! Replies describe *what* to send, not how it looks on the wire. Text may be literal
//! or a message key that the host resolves against its localization tables.

use serde::{Deserialize, Serialize};

use crate::custom_id::CustomId;
use crate::definition::{ReplyConfig, TextInputDefinition};

/// Body of a message reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageContent {
    Text { text: String },
    /// A localization key plus named placeholder values.
    Key {
        key: String,
        #[serde(default)]
        args: Vec<(String, String)>,
    },
}

impl MessageContent {
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Key { key, .. } => Some(key),
            Self::Text { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageReply {
    pub content: MessageContent,
    #[serde(default)]
    pub ephemeral: bool,
    #[serde(default)]
    pub silent: bool,
    /// Encoded custom ids of attached components.
    #[serde(default)]
    pub components: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalReply {
    pub custom_id: String,
    pub title: String,
    pub inputs: Vec<TextInputDefinition>,
}

/// One autocomplete suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub name: String,
    pub value: String,
}

impl Choice {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// What to answer an interaction with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reply", rename_all = "snake_case")]
pub enum ReplyIntent {
    Message(MessageReply),
    Modal(ModalReply),
    Choices { choices: Vec<Choice> },
}

impl ReplyIntent {
    pub fn text(text: impl Into<String>) -> Self {
        Self::message(MessageContent::Text { text: text.into() })
    }

    pub fn key(key: impl Into<String>) -> Self {
        Self::message(MessageContent::Key {
            key: key.into(),
            args: Vec::new(),
        })
    }

    pub fn key_with_args<I, K, V>(key: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::message(MessageContent::Key {
            key: key.into(),
            args: args.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        })
    }

    fn message(content: MessageContent) -> Self {
        Self::Message(MessageReply {
            content,
            ephemeral: false,
            silent: false,
            components: Vec::new(),
        })
    }

    pub fn modal(custom_id: &CustomId, title: impl Into<String>, inputs: Vec<TextInputDefinition>) -> Self {
        Self::Modal(ModalReply {
            custom_id: custom_id.encode(),
            title: title.into(),
            inputs,
        })
    }

    pub fn choices<I>(choices: I) -> Self
    where
        I: IntoIterator<Item = Choice>,
    {
        Self::Choices {
            choices: choices.into_iter().collect(),
        }
    }

    /// Marks a message reply as visible to the invoking user only.
    pub fn ephemeral(mut self) -> Self {
        if let Self::Message(message) = &mut self {
            message.ephemeral = true;
        }
        self
    }

    /// Attaches a component to a message reply.
    pub fn with_component(mut self, custom_id: &CustomId) -> Self {
        if let Self::Message(message) = &mut self {
            message.components.push(custom_id.encode());
        }
        self
    }

    /// Applies a definition's reply defaults. Never clears flags set by the handler.
    pub fn apply_config(mut self, config: ReplyConfig) -> Self {
        if let Self::Message(message) = &mut self {
            message.ephemeral |= config.ephemeral;
            message.silent |= config.silent;
        }
        self
    }

    pub fn as_message(&self) -> Option<&MessageReply> {
        match self {
            Self::Message(message) => Some(message),
            _ => None,
        }
    }

    /// Message key of a keyed message reply.
    pub fn message_key(&self) -> Option<&str> {
        self.as_message().and_then(|message| message.content.key())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::DefinitionId;

    #[test]
    fn test_apply_config_keeps_handler_flags() {
        let reply = ReplyIntent::text("hi").ephemeral().apply_config(ReplyConfig::default());
        assert!(reply.as_message().unwrap().ephemeral);

        let reply = ReplyIntent::text("hi").apply_config(ReplyConfig {
            ephemeral: true,
            silent: true,
        });
        let message = reply.as_message().unwrap();
        assert!(message.ephemeral && message.silent);
    }

    #[test]
    fn test_components_are_encoded() {
        let id = CustomId::independent(DefinitionId::of("Poll", "vote"), "yes").unwrap();
        let reply = ReplyIntent::key("poll.open").with_component(&id);
        assert_eq!(reply.as_message().unwrap().components, vec![id.encode()]);
        assert_eq!(reply.message_key(), Some("poll.open"));
        assert_eq!(ReplyIntent::choices([]).message_key(), None);
    }
}
