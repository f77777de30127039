//! Adapted handler arguments.
//!
//! After adaptation every declared option has an [`Argument`] (or nothing, for absent
//! optional options). Handlers read them by name through [`Arguments::get`] and the
//! [`FromArgument`] conversion, which mirrors how context extractors work elsewhere in
//! the framework.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use switchyard_core::{Attachment, Channel, Member, OptionType, Role, User};

use crate::error::ArgumentError;

/// A mentionable entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Mentionable {
    User(User),
    Member(Member),
    Role(Role),
}

/// A value of a user-defined option type.
#[derive(Clone)]
pub struct CustomArgument {
    type_name: String,
    value: Arc<dyn Any + Send + Sync>,
}

impl CustomArgument {
    pub fn new<T: Any + Send + Sync>(type_name: impl Into<String>, value: T) -> Self {
        Self {
            type_name: type_name.into(),
            value: Arc::new(value),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }
}

impl fmt::Debug for CustomArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomArgument")
            .field("type_name", &self.type_name)
            .finish_non_exhaustive()
    }
}

/// A typed option value.
#[derive(Debug, Clone)]
pub enum Argument {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
    User(User),
    Member(Member),
    Channel(Channel),
    Role(Role),
    Mentionable(Mentionable),
    Attachment(Attachment),
    Custom(CustomArgument),
}

impl Argument {
    pub fn option_type(&self) -> OptionType {
        match self {
            Self::String(_) => OptionType::String,
            Self::Integer(_) => OptionType::Integer,
            Self::Number(_) => OptionType::Number,
            Self::Boolean(_) => OptionType::Boolean,
            Self::User(_) => OptionType::User,
            Self::Member(_) => OptionType::Member,
            Self::Channel(_) => OptionType::Channel,
            Self::Role(_) => OptionType::Role,
            Self::Mentionable(_) => OptionType::Mentionable,
            Self::Attachment(_) => OptionType::Attachment,
            Self::Custom(custom) => OptionType::Custom(custom.type_name.clone()),
        }
    }

    /// Numeric view used by range validators.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Integer(value) => Some(*value as f64),
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    /// The guild member behind this argument, if any.
    pub fn as_member(&self) -> Option<&Member> {
        match self {
            Self::Member(member) | Self::Mentionable(Mentionable::Member(member)) => Some(member),
            _ => None,
        }
    }

    /// Zero value of a primitive option type.
    pub fn type_default(option_type: &OptionType) -> Option<Self> {
        match option_type {
            OptionType::String => Some(Self::String(String::new())),
            OptionType::Integer => Some(Self::Integer(0)),
            OptionType::Number => Some(Self::Number(0.0)),
            OptionType::Boolean => Some(Self::Boolean(false)),
            _ => None,
        }
    }
}

/// Conversion from an [`Argument`] into a handler-facing type.
pub trait FromArgument: Sized {
    fn from_argument(argument: &Argument) -> Option<Self>;
}

impl FromArgument for Argument {
    fn from_argument(argument: &Argument) -> Option<Self> {
        Some(argument.clone())
    }
}

impl FromArgument for String {
    fn from_argument(argument: &Argument) -> Option<Self> {
        argument.as_str().map(str::to_string)
    }
}

impl FromArgument for i64 {
    fn from_argument(argument: &Argument) -> Option<Self> {
        match argument {
            Argument::Integer(value) => Some(*value),
            _ => None,
        }
    }
}

impl FromArgument for i32 {
    fn from_argument(argument: &Argument) -> Option<Self> {
        i64::from_argument(argument).and_then(|value| i32::try_from(value).ok())
    }
}

impl FromArgument for u64 {
    fn from_argument(argument: &Argument) -> Option<Self> {
        i64::from_argument(argument).and_then(|value| u64::try_from(value).ok())
    }
}

impl FromArgument for f64 {
    fn from_argument(argument: &Argument) -> Option<Self> {
        argument.as_f64()
    }
}

impl FromArgument for bool {
    fn from_argument(argument: &Argument) -> Option<Self> {
        match argument {
            Argument::Boolean(value) => Some(*value),
            _ => None,
        }
    }
}

impl FromArgument for User {
    fn from_argument(argument: &Argument) -> Option<Self> {
        match argument {
            Argument::User(user) | Argument::Mentionable(Mentionable::User(user)) => Some(user.clone()),
            Argument::Member(member) | Argument::Mentionable(Mentionable::Member(member)) => {
                Some(member.user.clone())
            }
            _ => None,
        }
    }
}

impl FromArgument for Member {
    fn from_argument(argument: &Argument) -> Option<Self> {
        argument.as_member().cloned()
    }
}

impl FromArgument for Channel {
    fn from_argument(argument: &Argument) -> Option<Self> {
        match argument {
            Argument::Channel(channel) => Some(channel.clone()),
            _ => None,
        }
    }
}

impl FromArgument for Role {
    fn from_argument(argument: &Argument) -> Option<Self> {
        match argument {
            Argument::Role(role) | Argument::Mentionable(Mentionable::Role(role)) => Some(role.clone()),
            _ => None,
        }
    }
}

impl FromArgument for Mentionable {
    fn from_argument(argument: &Argument) -> Option<Self> {
        match argument {
            Argument::Mentionable(mentionable) => Some(mentionable.clone()),
            Argument::User(user) => Some(Mentionable::User(user.clone())),
            Argument::Member(member) => Some(Mentionable::Member(member.clone())),
            Argument::Role(role) => Some(Mentionable::Role(role.clone())),
            _ => None,
        }
    }
}

impl FromArgument for Attachment {
    fn from_argument(argument: &Argument) -> Option<Self> {
        match argument {
            Argument::Attachment(attachment) => Some(attachment.clone()),
            _ => None,
        }
    }
}

impl FromArgument for CustomArgument {
    fn from_argument(argument: &Argument) -> Option<Self> {
        match argument {
            Argument::Custom(custom) => Some(custom.clone()),
            _ => None,
        }
    }
}

/// Adapted arguments of one invocation, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct Arguments {
    values: Vec<(String, Option<Argument>)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: Option<Argument>) {
        self.values.push((name.into(), value));
    }

    /// The raw argument, `None` if absent or undeclared.
    pub fn argument(&self, name: &str) -> Option<&Argument> {
        self.values
            .iter()
            .find(|(candidate, _)| candidate == name)
            .and_then(|(_, value)| value.as_ref())
    }

    /// The argument converted to `T`, `None` if absent or of another type.
    pub fn get<T: FromArgument>(&self, name: &str) -> Option<T> {
        self.argument(name).and_then(T::from_argument)
    }

    /// Like [`get`](Self::get), but reports why the value is unavailable.
    pub fn require<T: FromArgument>(&self, name: &str) -> Result<T, ArgumentError> {
        let argument = self.argument(name).ok_or_else(|| ArgumentError::Absent {
            name: name.to_string(),
        })?;
        T::from_argument(argument).ok_or_else(|| ArgumentError::TypeMismatch {
            name: name.to_string(),
            expected: std::any::type_name::<T>(),
        })
    }

    /// Downcasts a custom-typed argument.
    pub fn custom<T: Any + Clone>(&self, name: &str) -> Option<T> {
        match self.argument(name)? {
            Argument::Custom(custom) => custom.downcast_ref::<T>().cloned(),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&Argument>)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_ref()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Arguments {
        let mut args = Arguments::new();
        args.push("amount", Some(Argument::Integer(42)));
        args.push("note", None);
        args.push(
            "target",
            Some(Argument::Member(Member::new(User::new(9, "carol"), 1))),
        );
        args.push("when", Some(Argument::Custom(CustomArgument::new("duration", 30u32))));
        args
    }

    #[test]
    fn test_typed_access() {
        let args = sample();
        assert_eq!(args.get::<i64>("amount"), Some(42));
        assert_eq!(args.get::<i32>("amount"), Some(42));
        assert_eq!(args.get::<f64>("amount"), Some(42.0));
        assert_eq!(args.get::<String>("amount"), None);
        assert_eq!(args.get::<User>("target").map(|u| u.id), Some(9));
        assert_eq!(args.custom::<u32>("when"), Some(30));
        assert_eq!(args.len(), 4);
    }

    #[test]
    fn test_require_reports_reason() {
        let args = sample();
        assert_eq!(
            args.require::<String>("note"),
            Err(ArgumentError::Absent { name: "note".into() })
        );
        assert!(matches!(
            args.require::<bool>("amount"),
            Err(ArgumentError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_type_defaults() {
        assert!(matches!(Argument::type_default(&OptionType::Integer), Some(Argument::Integer(0))));
        assert!(matches!(Argument::type_default(&OptionType::Boolean), Some(Argument::Boolean(false))));
        assert!(Argument::type_default(&OptionType::User).is_none());
    }
}
