//! Built-in validators.

use std::collections::HashMap;

use parking_lot::Mutex;
use regex::Regex;
use switchyard_core::{ConstraintKind, OptionType};
use tracing::warn;

use super::{ValidationContext, Validator};
use crate::argument::{Argument, Mentionable};

/// Numeric lower bound, inclusive.
#[derive(Debug, Default, Clone, Copy)]
pub struct MinValidator;

impl Validator for MinValidator {
    fn constraint(&self) -> &str {
        "min"
    }

    fn supports(&self, option_type: &OptionType) -> bool {
        option_type.is_numeric()
    }

    fn validate(&self, argument: &Argument, constraint: &ConstraintKind, _: &ValidationContext<'_>) -> bool {
        match (argument.as_f64(), constraint) {
            (Some(value), ConstraintKind::Min { value: min }) => value >= *min,
            _ => false,
        }
    }
}

/// Numeric upper bound, inclusive.
#[derive(Debug, Default, Clone, Copy)]
pub struct MaxValidator;

impl Validator for MaxValidator {
    fn constraint(&self) -> &str {
        "max"
    }

    fn supports(&self, option_type: &OptionType) -> bool {
        option_type.is_numeric()
    }

    fn validate(&self, argument: &Argument, constraint: &ConstraintKind, _: &ValidationContext<'_>) -> bool {
        match (argument.as_f64(), constraint) {
            (Some(value), ConstraintKind::Max { value: max }) => value <= *max,
            _ => false,
        }
    }
}

/// String length in characters, both bounds inclusive.
#[derive(Debug, Default, Clone, Copy)]
pub struct LengthValidator;

impl Validator for LengthValidator {
    fn constraint(&self) -> &str {
        "length"
    }

    fn supports(&self, option_type: &OptionType) -> bool {
        *option_type == OptionType::String
    }

    fn validate(&self, argument: &Argument, constraint: &ConstraintKind, _: &ValidationContext<'_>) -> bool {
        let (Some(text), ConstraintKind::Length { min, max }) = (argument.as_str(), constraint) else {
            return false;
        };
        let len = text.chars().count();
        min.is_none_or(|min| len >= min) && max.is_none_or(|max| len <= max)
    }
}

/// Whole-string regex match. Compiled patterns are cached.
#[derive(Debug, Default)]
pub struct PatternValidator {
    cache: Mutex<HashMap<String, Option<Regex>>>,
}

impl PatternValidator {
    fn is_match(&self, pattern: &str, text: &str) -> bool {
        let mut cache = self.cache.lock();
        let compiled = cache.entry(pattern.to_string()).or_insert_with(|| {
            Regex::new(&format!("^(?:{pattern})$"))
                .inspect_err(|error| warn!(pattern, %error, "Invalid pattern constraint"))
                .ok()
        });
        compiled.as_ref().is_some_and(|regex| regex.is_match(text))
    }
}

impl Validator for PatternValidator {
    fn constraint(&self) -> &str {
        "pattern"
    }

    fn supports(&self, option_type: &OptionType) -> bool {
        *option_type == OptionType::String
    }

    fn validate(&self, argument: &Argument, constraint: &ConstraintKind, _: &ValidationContext<'_>) -> bool {
        match (argument.as_str(), constraint) {
            (Some(text), ConstraintKind::Pattern { regex }) => self.is_match(regex, text),
            _ => false,
        }
    }
}

fn supports_permissions(option_type: &OptionType) -> bool {
    matches!(
        option_type,
        OptionType::User | OptionType::Member | OptionType::Mentionable
    )
}

/// Permissions granted to the user behind an argument. Users outside a guild hold
/// none.
fn granted(argument: &Argument) -> Option<&[String]> {
    match argument {
        Argument::User(_) | Argument::Mentionable(Mentionable::User(_)) => Some(Default::default()),
        other => other.as_member().map(|member| member.permissions.as_slice()),
    }
}

fn holds(granted: &[String], permission: &str) -> bool {
    granted
        .iter()
        .any(|name| name == permission || name == switchyard_core::ADMINISTRATOR)
}

/// The argument's member must hold every listed permission.
#[derive(Debug, Default, Clone, Copy)]
pub struct PermValidator;

impl Validator for PermValidator {
    fn constraint(&self) -> &str {
        "perm"
    }

    fn supports(&self, option_type: &OptionType) -> bool {
        supports_permissions(option_type)
    }

    fn validate(&self, argument: &Argument, constraint: &ConstraintKind, _: &ValidationContext<'_>) -> bool {
        match (granted(argument), constraint) {
            (Some(granted), ConstraintKind::Perm { permissions }) => {
                permissions.iter().all(|permission| holds(granted, permission))
            }
            _ => false,
        }
    }
}

/// The argument's member must hold none of the listed permissions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotPermValidator;

impl Validator for NotPermValidator {
    fn constraint(&self) -> &str {
        "not_perm"
    }

    fn supports(&self, option_type: &OptionType) -> bool {
        supports_permissions(option_type)
    }

    fn validate(&self, argument: &Argument, constraint: &ConstraintKind, _: &ValidationContext<'_>) -> bool {
        match (granted(argument), constraint) {
            (Some(granted), ConstraintKind::NotPerm { permissions }) => {
                !permissions.iter().any(|permission| holds(granted, permission))
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use switchyard_core::{Interaction, InteractionDescriptor, Member, User};

    fn with_ctx(f: impl FnOnce(&ValidationContext<'_>)) {
        let interaction = Interaction::slash(1, User::new(1, "alice"), "run", vec![]);
        let definition = InteractionDescriptor::slash_command("Test", "run", "run")
            .into_definition()
            .unwrap();
        f(&ValidationContext {
            interaction: &interaction,
            definition: &definition,
        });
    }

    #[test]
    fn test_bounds_are_inclusive() {
        with_ctx(|ctx| {
            let min = ConstraintKind::Min { value: 5.0 };
            assert!(MinValidator.validate(&Argument::Integer(5), &min, ctx));
            assert!(!MinValidator.validate(&Argument::Number(4.99), &min, ctx));

            let max = ConstraintKind::Max { value: 10.0 };
            assert!(MaxValidator.validate(&Argument::Integer(10), &max, ctx));
            assert!(!MaxValidator.validate(&Argument::Integer(11), &max, ctx));

            let length = ConstraintKind::Length {
                min: Some(2),
                max: Some(3),
            };
            assert!(LengthValidator.validate(&Argument::String("ßü".into()), &length, ctx));
            assert!(!LengthValidator.validate(&Argument::String("abcd".into()), &length, ctx));
        });
    }

    #[test]
    fn test_pattern_matches_whole_string() {
        with_ctx(|ctx| {
            let validator = PatternValidator::default();
            let pattern = ConstraintKind::Pattern {
                regex: "[a-z]+".into(),
            };
            assert!(validator.validate(&Argument::String("abc".into()), &pattern, ctx));
            assert!(!validator.validate(&Argument::String("abc1".into()), &pattern, ctx));

            let broken = ConstraintKind::Pattern { regex: "(".into() };
            assert!(!validator.validate(&Argument::String("(".into()), &broken, ctx));
        });
    }

    #[test]
    fn test_permission_validators() {
        with_ctx(|ctx| {
            let moderator = Argument::Member(
                Member::new(User::new(2, "bob"), 100).with_permissions(["BAN_MEMBERS"]),
            );
            let admin = Argument::Member(
                Member::new(User::new(3, "carol"), 100).with_permissions(["ADMINISTRATOR"]),
            );
            let stranger = Argument::User(User::new(4, "dave"));

            let perm = ConstraintKind::Perm {
                permissions: vec!["BAN_MEMBERS".into()],
            };
            assert!(PermValidator.validate(&moderator, &perm, ctx));
            assert!(PermValidator.validate(&admin, &perm, ctx));
            assert!(!PermValidator.validate(&stranger, &perm, ctx));

            let not_perm = ConstraintKind::NotPerm {
                permissions: vec!["BAN_MEMBERS".into()],
            };
            assert!(!NotPermValidator.validate(&moderator, &not_perm, ctx));
            assert!(NotPermValidator.validate(&stranger, &not_perm, ctx));
        });
    }
}
