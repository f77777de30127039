//! Type adaptation.
//!
//! Raw option values arrive as [`RawValue`]s. Before a handler runs, each declared
//! option is converted into an [`Argument`] of its declared [`OptionType`] by the
//! [`TypeAdapterRegistry`].
//!
//! ## Lookup
//!
//! Adapters are keyed by `(RawKind, OptionType)`. For a value of raw kind `R` and a
//! target `T` the registry tries:
//!
//! 1. the exact adapter `(R, T)`;
//! 2. every composed path `(R, I)` followed by an [`ArgumentMapper`] `I → T`, in
//!    mapper registration order.
//!
//! The first adapter that produces a value wins. If none does, the option yields an
//! [`AdaptationFailure`]; all failures of one event are reported together.

mod builtin;
mod entity;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use switchyard_core::{
    DefaultPolicy, Interaction, OptionDefinition, OptionType, RawKind, RawOption, RawValue,
};
use tracing::{debug, trace};

use crate::argument::{Argument, Arguments};
use crate::error::AdaptError;

pub use entity::{EntityCache, EntityResolver, NoEntities};

/// What an adapter may consult besides the raw value.
#[derive(Clone, Copy)]
pub struct AdaptContext<'a> {
    pub interaction: &'a Interaction,
    pub entities: &'a dyn EntityResolver,
}

/// Converts a raw value into a typed argument.
pub trait TypeAdapter: Send + Sync {
    fn adapt(&self, raw: &RawValue, ctx: &AdaptContext<'_>) -> Option<Argument>;
}

impl<F> TypeAdapter for F
where
    F: Fn(&RawValue, &AdaptContext<'_>) -> Option<Argument> + Send + Sync,
{
    fn adapt(&self, raw: &RawValue, ctx: &AdaptContext<'_>) -> Option<Argument> {
        self(raw, ctx)
    }
}

/// Converts one argument type into another.
pub trait ArgumentMapper: Send + Sync {
    fn map(&self, argument: Argument, ctx: &AdaptContext<'_>) -> Option<Argument>;
}

impl<F> ArgumentMapper for F
where
    F: Fn(Argument, &AdaptContext<'_>) -> Option<Argument> + Send + Sync,
{
    fn map(&self, argument: Argument, ctx: &AdaptContext<'_>) -> Option<Argument> {
        self(argument, ctx)
    }
}

/// One option that could not be adapted.
#[derive(Debug, Clone, PartialEq)]
pub struct AdaptationFailure {
    pub option: String,
    pub target: OptionType,
    pub error: AdaptError,
}

struct MapperEntry {
    from: OptionType,
    to: OptionType,
    mapper: Arc<dyn ArgumentMapper>,
}

/// Adapter lookup table.
pub struct TypeAdapterRegistry {
    exact: HashMap<(RawKind, OptionType), Arc<dyn TypeAdapter>>,
    mappers: Vec<MapperEntry>,
}

impl TypeAdapterRegistry {
    /// An empty registry.
    pub fn empty() -> Self {
        Self {
            exact: HashMap::new(),
            mappers: Vec::new(),
        }
    }

    /// A registry preloaded with the built-in adapters and mappers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        builtin::register(&mut registry);
        registry
    }

    /// Registers or replaces the exact adapter for `(raw, target)`.
    pub fn register<A>(&mut self, raw: RawKind, target: OptionType, adapter: A) -> &mut Self
    where
        A: TypeAdapter + 'static,
    {
        self.exact.insert((raw, target), Arc::new(adapter));
        self
    }

    /// Registers a mapper used to complete composed paths ending in `to`.
    pub fn register_mapper<M>(&mut self, from: OptionType, to: OptionType, mapper: M) -> &mut Self
    where
        M: ArgumentMapper + 'static,
    {
        self.mappers.push(MapperEntry {
            from,
            to,
            mapper: Arc::new(mapper),
        });
        self
    }

    pub fn has_path(&self, raw: RawKind, target: &OptionType) -> bool {
        self.exact.contains_key(&(raw, target.clone()))
            || self.mappers.iter().any(|entry| {
                &entry.to == target && self.exact.contains_key(&(raw, entry.from.clone()))
            })
    }

    /// Adapts one value to `target`.
    pub fn adapt(
        &self,
        raw: &RawValue,
        target: &OptionType,
        ctx: &AdaptContext<'_>,
    ) -> Result<Argument, AdaptError> {
        let kind = raw.kind();
        let mut applicable = false;

        if let Some(adapter) = self.exact.get(&(kind, target.clone())) {
            applicable = true;
            if let Some(argument) = adapter.adapt(raw, ctx) {
                return Ok(argument);
            }
        }

        for entry in self.mappers.iter().filter(|entry| &entry.to == target) {
            let Some(first) = self.exact.get(&(kind, entry.from.clone())) else {
                continue;
            };
            applicable = true;
            trace!(raw = ?kind, via = %entry.from, target = %target, "Trying composed adapter");
            if let Some(argument) = first
                .adapt(raw, ctx)
                .and_then(|intermediate| entry.mapper.map(intermediate, ctx))
            {
                return Ok(argument);
            }
        }

        let error = if applicable {
            AdaptError::Rejected {
                raw: raw.clone(),
                target: target.clone(),
            }
        } else {
            AdaptError::NoPath {
                raw: raw.clone(),
                target: target.clone(),
            }
        };
        Err(error)
    }

    /// Adapts every declared option of an invocation.
    ///
    /// Absent options follow their [`DefaultPolicy`]; absent required options fail.
    /// Returns every failure, not just the first.
    pub fn adapt_options(
        &self,
        options: &[OptionDefinition],
        raw: &[RawOption],
        ctx: &AdaptContext<'_>,
    ) -> Result<Arguments, Vec<AdaptationFailure>> {
        let mut arguments = Arguments::new();
        let mut failures = Vec::new();

        for option in options {
            let submitted = raw.iter().find(|candidate| candidate.name == option.name);
            let result = match (submitted, &option.default) {
                (Some(submitted), _) => self.adapt(&submitted.value, &option.option_type, ctx).map(Some),
                (None, _) if option.required => Err(AdaptError::Missing),
                (None, DefaultPolicy::None) => Ok(None),
                (None, DefaultPolicy::TypeDefault) => Ok(Argument::type_default(&option.option_type)),
                (None, DefaultPolicy::Value(value)) => self.adapt(value, &option.option_type, ctx).map(Some),
            };

            match result {
                Ok(value) => arguments.push(option.name.clone(), value),
                Err(error) => {
                    debug!(option = %option.name, target = %option.option_type, %error, "Option adaptation failed");
                    failures.push(AdaptationFailure {
                        option: option.name.clone(),
                        target: option.option_type.clone(),
                        error,
                    });
                }
            }
        }

        if failures.is_empty() {
            Ok(arguments)
        } else {
            Err(failures)
        }
    }
}

impl Default for TypeAdapterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for TypeAdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeAdapterRegistry")
            .field("adapters", &self.exact.len())
            .field("mappers", &self.mappers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::CustomArgument;
    use switchyard_core::{Member, Role, User};

    fn interaction() -> Interaction {
        Interaction::slash(1, User::new(1, "alice"), "test", vec![])
            .in_guild(Member::new(User::new(1, "alice"), 100))
    }

    fn adapt(
        registry: &TypeAdapterRegistry,
        raw: RawValue,
        target: OptionType,
    ) -> Result<Argument, AdaptError> {
        let event = interaction();
        let ctx = AdaptContext {
            interaction: &event,
            entities: &NoEntities,
        };
        registry.adapt(&raw, &target, &ctx)
    }

    #[test]
    fn test_primitive_adapters() {
        let registry = TypeAdapterRegistry::with_defaults();
        assert!(matches!(
            adapt(&registry, RawValue::String("42".into()), OptionType::Integer),
            Ok(Argument::Integer(42))
        ));
        assert!(matches!(
            adapt(&registry, RawValue::String(" 2.5 ".into()), OptionType::Number),
            Ok(Argument::Number(n)) if n == 2.5
        ));
        assert!(matches!(
            adapt(&registry, RawValue::Integer(3), OptionType::Number),
            Ok(Argument::Number(n)) if n == 3.0
        ));
        assert!(matches!(
            adapt(&registry, RawValue::String("abc".into()), OptionType::Integer),
            Err(AdaptError::Rejected { .. })
        ));
        assert!(matches!(
            adapt(&registry, RawValue::Boolean(true), OptionType::Role),
            Err(AdaptError::NoPath { .. })
        ));
    }

    #[test]
    fn test_composed_path_through_mapper() {
        let mut registry = TypeAdapterRegistry::with_defaults();
        fn seconds(argument: Argument, _: &AdaptContext<'_>) -> Option<Argument> {
            match argument {
                Argument::Integer(value) if value >= 0 => {
                    Some(Argument::Custom(CustomArgument::new("seconds", value as u64)))
                }
                _ => None,
            }
        }
        registry.register_mapper(OptionType::Integer, OptionType::custom("seconds"), seconds);

        assert!(registry.has_path(RawKind::String, &OptionType::custom("seconds")));
        match adapt(&registry, RawValue::String("90".into()), OptionType::custom("seconds")) {
            Ok(Argument::Custom(custom)) => assert_eq!(custom.downcast_ref::<u64>(), Some(&90)),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            adapt(&registry, RawValue::String("-1".into()), OptionType::custom("seconds")),
            Err(AdaptError::Rejected { .. })
        ));
    }

    #[test]
    fn test_entities_resolve_through_resolver() {
        let registry = TypeAdapterRegistry::with_defaults();
        let cache = EntityCache::new();
        cache.insert_member(Member::new(User::new(7, "dave"), 100));
        cache.insert_role(Role {
            id: 9,
            guild_id: 100,
            name: "mods".into(),
            permissions: vec![],
        });

        let event = interaction();
        let ctx = AdaptContext {
            interaction: &event,
            entities: &cache,
        };

        assert!(matches!(
            registry.adapt(&RawValue::User(7), &OptionType::Member, &ctx),
            Ok(Argument::Member(member)) if member.user.id == 7
        ));
        assert!(matches!(
            registry.adapt(&RawValue::Mentionable(9), &OptionType::Mentionable, &ctx),
            Ok(Argument::Mentionable(crate::argument::Mentionable::Role(role))) if role.id == 9
        ));
        assert!(matches!(
            registry.adapt(&RawValue::Mentionable(7), &OptionType::User, &ctx),
            Ok(Argument::User(user)) if user.id == 7
        ));
        assert!(registry.adapt(&RawValue::User(8), &OptionType::User, &ctx).is_err());
    }

    #[test]
    fn test_adapt_options_bundles_failures_and_applies_defaults() {
        let registry = TypeAdapterRegistry::with_defaults();
        let options = vec![
            OptionDefinition::new("count", OptionType::Integer),
            OptionDefinition::new("ratio", OptionType::Number),
            OptionDefinition::new("required", OptionType::String),
            OptionDefinition::new("flag", OptionType::Boolean)
                .optional()
                .default_policy(DefaultPolicy::TypeDefault),
            OptionDefinition::new("note", OptionType::String).optional(),
            OptionDefinition::new("limit", OptionType::Integer)
                .optional()
                .default_policy(DefaultPolicy::Value(RawValue::Integer(10))),
        ];
        let event = interaction();
        let ctx = AdaptContext {
            interaction: &event,
            entities: &NoEntities,
        };

        let raw = vec![
            RawOption::new("count", RawValue::String("x".into())),
            RawOption::new("ratio", RawValue::String("y".into())),
        ];
        let failures = registry.adapt_options(&options, &raw, &ctx).unwrap_err();
        let names: Vec<_> = failures.iter().map(|f| f.option.as_str()).collect();
        assert_eq!(names, ["count", "ratio", "required"]);
        assert_eq!(failures[2].error, AdaptError::Missing);

        let raw = vec![
            RawOption::new("count", RawValue::Integer(1)),
            RawOption::new("ratio", RawValue::Number(0.5)),
            RawOption::new("required", RawValue::String("ok".into())),
        ];
        let args = registry.adapt_options(&options, &raw, &ctx).unwrap();
        assert_eq!(args.get::<bool>("flag"), Some(false));
        assert!(args.argument("note").is_none());
        assert_eq!(args.get::<i64>("limit"), Some(10));
        assert_eq!(args.len(), 6);
    }
}
