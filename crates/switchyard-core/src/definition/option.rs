//! Command options and their constraints.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::RawValue;

/// Semantic type a handler expects for an option.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    String,
    Integer,
    Number,
    Boolean,
    User,
    Member,
    Channel,
    Role,
    Mentionable,
    Attachment,
    /// A user-defined type, adapted by a user-registered adapter.
    Custom(String),
}

impl OptionType {
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Integer | Self::Number)
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Integer => f.write_str("integer"),
            Self::Number => f.write_str("number"),
            Self::Boolean => f.write_str("boolean"),
            Self::User => f.write_str("user"),
            Self::Member => f.write_str("member"),
            Self::Channel => f.write_str("channel"),
            Self::Role => f.write_str("role"),
            Self::Mentionable => f.write_str("mentionable"),
            Self::Attachment => f.write_str("attachment"),
            Self::Custom(name) => write!(f, "custom({name})"),
        }
    }
}

/// What a validator checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConstraintKind {
    Min {
        value: f64,
    },
    Max {
        value: f64,
    },
    Length {
        #[serde(default)]
        min: Option<usize>,
        #[serde(default)]
        max: Option<usize>,
    },
    Pattern {
        regex: String,
    },
    Perm {
        permissions: Vec<String>,
    },
    NotPerm {
        permissions: Vec<String>,
    },
    /// Handled by a user-registered validator with the same name.
    Custom {
        name: String,
        #[serde(default)]
        params: serde_json::Value,
    },
}

impl ConstraintKind {
    /// Name validators register under.
    pub fn name(&self) -> &str {
        match self {
            Self::Min { .. } => "min",
            Self::Max { .. } => "max",
            Self::Length { .. } => "length",
            Self::Pattern { .. } => "pattern",
            Self::Perm { .. } => "perm",
            Self::NotPerm { .. } => "not_perm",
            Self::Custom { name, .. } => name,
        }
    }
}

/// A constraint plus the message key reported when it fails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    #[serde(flatten)]
    pub kind: ConstraintKind,
    pub message_key: String,
}

impl Constraint {
    pub fn new(kind: ConstraintKind, message_key: impl Into<String>) -> Self {
        Self {
            kind,
            message_key: message_key.into(),
        }
    }

    pub fn min(value: f64, message_key: impl Into<String>) -> Self {
        Self::new(ConstraintKind::Min { value }, message_key)
    }

    pub fn max(value: f64, message_key: impl Into<String>) -> Self {
        Self::new(ConstraintKind::Max { value }, message_key)
    }

    pub fn length(min: Option<usize>, max: Option<usize>, message_key: impl Into<String>) -> Self {
        Self::new(ConstraintKind::Length { min, max }, message_key)
    }

    pub fn pattern(regex: impl Into<String>, message_key: impl Into<String>) -> Self {
        Self::new(
            ConstraintKind::Pattern {
                regex: regex.into(),
            },
            message_key,
        )
    }

    pub fn name(&self) -> &str {
        self.kind.name()
    }
}

/// What to do when an optional option is absent from the event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "policy", content = "value", rename_all = "snake_case")]
pub enum DefaultPolicy {
    /// The argument is absent.
    #[default]
    None,
    /// The type's zero value: empty string, `0`, `0.0` or `false`.
    TypeDefault,
    /// This raw value, adapted like a submitted one.
    Value(RawValue),
}

/// One declared option of a command or modal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type")]
    pub option_type: OptionType,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    #[serde(default)]
    pub default: DefaultPolicy,
    #[serde(default)]
    pub autocomplete: bool,
}

fn default_required() -> bool {
    true
}

impl OptionDefinition {
    /// Creates a required option without constraints.
    pub fn new(name: impl Into<String>, option_type: OptionType) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            option_type,
            required: true,
            constraints: Vec::new(),
            default: DefaultPolicy::None,
            autocomplete: false,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn default_policy(mut self, policy: DefaultPolicy) -> Self {
        self.default = policy;
        self
    }

    pub fn with_autocomplete(mut self) -> Self {
        self.autocomplete = true;
        self
    }
}
