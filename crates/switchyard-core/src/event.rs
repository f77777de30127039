//! Inbound interaction events.
//!
//! Events arrive already parsed by the transport. The router never talks to the
//! platform itself; it only reads the fields modelled here.
//!
//! ## Shape
//!
//! An [`Interaction`] carries who triggered it (user, optional guild member), where it
//! happened (guild and channel ids) and an [`InteractionKind`] describing what was
//! triggered. Option values are transported as [`RawValue`]s and converted into typed
//! arguments by the framework's adapter registry.

use serde::{Deserialize, Serialize};

/// Platform entity identifier.
pub type Snowflake = u64;

// =============================================================================
// Entities
// =============================================================================

/// A platform user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub bot: bool,
}

impl User {
    pub fn new(id: Snowflake, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            bot: false,
        }
    }
}

/// A user in the context of one guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub user: User,
    pub guild_id: Snowflake,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub roles: Vec<Snowflake>,
    /// Permission names granted to the member in this guild, e.g. `BAN_MEMBERS`.
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl Member {
    pub fn new(user: User, guild_id: Snowflake) -> Self {
        Self {
            user,
            guild_id,
            nickname: None,
            roles: Vec::new(),
            permissions: Vec::new(),
        }
    }

    pub fn with_permissions<I, S>(mut self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.permissions = permissions.into_iter().map(Into::into).collect();
        self
    }

    /// Returns `true` if the member holds `permission` or is an administrator.
    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions
            .iter()
            .any(|granted| granted == permission || granted == ADMINISTRATOR)
    }
}

/// Permission name that implies every other permission.
pub const ADMINISTRATOR: &str = "ADMINISTRATOR";

/// A guild or direct-message channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
}

/// A guild role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: Snowflake,
    pub guild_id: Snowflake,
    pub name: String,
    #[serde(default)]
    pub permissions: Vec<String>,
}

/// An uploaded file attached to an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: Snowflake,
    pub filename: String,
    pub url: String,
    #[serde(default)]
    pub size: u64,
}

// =============================================================================
// Raw option values
// =============================================================================

/// An option value as transported by the platform, before adaptation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RawValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    User(Snowflake),
    Channel(Snowflake),
    Role(Snowflake),
    Mentionable(Snowflake),
    Attachment(Attachment),
}

/// Discriminant of a [`RawValue`], used as half of the adapter registry key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawKind {
    String,
    Integer,
    Number,
    Boolean,
    User,
    Channel,
    Role,
    Mentionable,
    Attachment,
}

impl RawValue {
    pub fn kind(&self) -> RawKind {
        match self {
            Self::String(_) => RawKind::String,
            Self::Integer(_) => RawKind::Integer,
            Self::Number(_) => RawKind::Number,
            Self::Boolean(_) => RawKind::Boolean,
            Self::User(_) => RawKind::User,
            Self::Channel(_) => RawKind::Channel,
            Self::Role(_) => RawKind::Role,
            Self::Mentionable(_) => RawKind::Mentionable,
            Self::Attachment(_) => RawKind::Attachment,
        }
    }
}

/// A named option as sent with a slash command or autocomplete request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawOption {
    pub name: String,
    pub value: RawValue,
}

impl RawOption {
    pub fn new(name: impl Into<String>, value: RawValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }
}

// =============================================================================
// Interaction
// =============================================================================

/// Target of a context-menu command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContextTarget {
    User { user: User },
    Message { id: Snowflake, content: String },
}

/// A submitted modal text input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModalField {
    pub id: String,
    pub value: String,
}

/// What was triggered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InteractionKind {
    SlashCommand {
        name: String,
        #[serde(default)]
        options: Vec<RawOption>,
    },
    ContextCommand {
        name: String,
        target: ContextTarget,
    },
    /// A button press or a select-menu submission. `values` holds the selected
    /// option values and is empty for buttons.
    Component {
        custom_id: String,
        #[serde(default)]
        values: Vec<String>,
    },
    Modal {
        custom_id: String,
        #[serde(default)]
        fields: Vec<ModalField>,
    },
    AutoComplete {
        command: String,
        focused: RawOption,
        #[serde(default)]
        options: Vec<RawOption>,
    },
}

/// One inbound interaction event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: Snowflake,
    pub user: User,
    #[serde(default)]
    pub member: Option<Member>,
    #[serde(default)]
    pub guild_id: Option<Snowflake>,
    #[serde(default)]
    pub channel_id: Option<Snowflake>,
    #[serde(default = "default_locale")]
    pub locale: String,
    pub kind: InteractionKind,
}

fn default_locale() -> String {
    "en-US".to_string()
}

impl Interaction {
    pub fn new(id: Snowflake, user: User, kind: InteractionKind) -> Self {
        Self {
            id,
            user,
            member: None,
            guild_id: None,
            channel_id: None,
            locale: default_locale(),
            kind,
        }
    }

    pub fn slash(id: Snowflake, user: User, name: impl Into<String>, options: Vec<RawOption>) -> Self {
        Self::new(
            id,
            user,
            InteractionKind::SlashCommand {
                name: name.into(),
                options,
            },
        )
    }

    pub fn component(id: Snowflake, user: User, custom_id: impl Into<String>) -> Self {
        Self::new(
            id,
            user,
            InteractionKind::Component {
                custom_id: custom_id.into(),
                values: Vec::new(),
            },
        )
    }

    pub fn modal(id: Snowflake, user: User, custom_id: impl Into<String>, fields: Vec<ModalField>) -> Self {
        Self::new(
            id,
            user,
            InteractionKind::Modal {
                custom_id: custom_id.into(),
                fields,
            },
        )
    }

    /// Attaches guild membership, also setting `guild_id`.
    pub fn in_guild(mut self, member: Member) -> Self {
        self.guild_id = Some(member.guild_id);
        self.member = Some(member);
        self
    }

    /// Short name of the interaction kind, used as a tracing field.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            InteractionKind::SlashCommand { .. } => "slash_command",
            InteractionKind::ContextCommand { .. } => "context_command",
            InteractionKind::Component { .. } => "component",
            InteractionKind::Modal { .. } => "modal",
            InteractionKind::AutoComplete { .. } => "autocomplete",
        }
    }

    /// The custom id carried by component and modal interactions.
    pub fn custom_id(&self) -> Option<&str> {
        match &self.kind {
            InteractionKind::Component { custom_id, .. } | InteractionKind::Modal { custom_id, .. } => {
                Some(custom_id)
            }
            _ => None,
        }
    }

    /// Option values to adapt for the handler, in transport order.
    ///
    /// Modal fields become string options keyed by input id; autocomplete requests
    /// include the focused option.
    pub fn raw_options(&self) -> Vec<RawOption> {
        match &self.kind {
            InteractionKind::SlashCommand { options, .. } => options.clone(),
            InteractionKind::AutoComplete {
                focused, options, ..
            } => {
                let mut all = options.clone();
                if !all.iter().any(|option| option.name == focused.name) {
                    all.push(focused.clone());
                }
                all
            }
            InteractionKind::Modal { fields, .. } => fields
                .iter()
                .map(|field| RawOption::new(field.id.clone(), RawValue::String(field.value.clone())))
                .collect(),
            InteractionKind::ContextCommand { .. } | InteractionKind::Component { .. } => Vec::new(),
        }
    }
}
