//! Constraint validation.
//!
//! Runs after adaptation. Every declared option that has a value is checked against
//! its constraints in declaration order; the first failing constraint of the whole
//! invocation is reported and nothing else is checked.
//!
//! Validators register under a constraint name (`min`, `max`, `length`, `pattern`,
//! `perm`, `not_perm`, or the name of a custom constraint) and declare which option
//! types they accept. A constraint without an applicable validator is skipped.

mod builtin;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use switchyard_core::{ConstraintKind, Definition, Interaction, OptionDefinition, OptionType};
use tracing::{debug, trace};

use crate::argument::{Argument, Arguments};

pub use builtin::{
    LengthValidator, MaxValidator, MinValidator, NotPermValidator, PatternValidator,
    PermValidator,
};

/// What a validator may consult besides the argument.
#[derive(Clone, Copy)]
pub struct ValidationContext<'a> {
    pub interaction: &'a Interaction,
    pub definition: &'a Definition,
}

/// Checks one kind of constraint.
pub trait Validator: Send + Sync {
    /// Constraint name this validator handles.
    fn constraint(&self) -> &str;

    /// Whether arguments of `option_type` can be checked.
    fn supports(&self, option_type: &OptionType) -> bool;

    /// Returns `true` if the argument satisfies the constraint.
    fn validate(
        &self,
        argument: &Argument,
        constraint: &ConstraintKind,
        ctx: &ValidationContext<'_>,
    ) -> bool;
}

/// The first constraint that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationFailure {
    pub option: String,
    pub constraint: String,
    pub message_key: String,
}

/// Validators by constraint name.
pub struct ValidatorRegistry {
    validators: HashMap<String, Vec<Arc<dyn Validator>>>,
}

impl ValidatorRegistry {
    pub fn empty() -> Self {
        Self {
            validators: HashMap::new(),
        }
    }

    /// A registry with the `min`, `max`, `length`, `pattern`, `perm` and `not_perm`
    /// validators.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry
            .register(MinValidator)
            .register(MaxValidator)
            .register(LengthValidator)
            .register(PatternValidator::default())
            .register(PermValidator)
            .register(NotPermValidator);
        registry
    }

    /// Adds a validator. Several validators may share a constraint name as long as
    /// they support different option types; the first registered match wins.
    pub fn register<V>(&mut self, validator: V) -> &mut Self
    where
        V: Validator + 'static,
    {
        self.validators
            .entry(validator.constraint().to_string())
            .or_default()
            .push(Arc::new(validator));
        self
    }

    /// Checks every present argument against its option's constraints.
    pub fn validate(
        &self,
        options: &[OptionDefinition],
        arguments: &Arguments,
        ctx: &ValidationContext<'_>,
    ) -> Result<(), ValidationFailure> {
        for option in options {
            let Some(argument) = arguments.argument(&option.name) else {
                continue;
            };
            let option_type = argument.option_type();

            for constraint in &option.constraints {
                let name = constraint.name();
                let validator = self.validators.get(name).and_then(|candidates| {
                    candidates
                        .iter()
                        .find(|validator| validator.supports(&option_type))
                });
                let Some(validator) = validator else {
                    debug!(option = %option.name, constraint = name, %option_type, "No applicable validator, constraint skipped");
                    continue;
                };

                if !validator.validate(argument, &constraint.kind, ctx) {
                    debug!(option = %option.name, constraint = name, "Constraint failed");
                    return Err(ValidationFailure {
                        option: option.name.clone(),
                        constraint: name.to_string(),
                        message_key: constraint.message_key.clone(),
                    });
                }
                trace!(option = %option.name, constraint = name, "Constraint passed");
            }
        }
        Ok(())
    }
}

impl Default for ValidatorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.validators.keys().collect();
        names.sort();
        f.debug_struct("ValidatorRegistry")
            .field("constraints", &names)
            .finish()
    }
}
