//! Definition registry.
//!
//! Definitions are collected in a [`RegistryBuilder`] and frozen into a
//! [`DefinitionRegistry`]. The frozen registry has no mutating API, so once the
//! dispatcher owns it the routing table cannot change.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use tracing::{debug, info};

use crate::definition::{CommandKind, Definition, DefinitionId};
use crate::descriptor::InteractionDescriptor;
use crate::error::{DefinitionError, DefinitionResult};

/// Collects definitions and rejects collisions.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    definitions: Vec<Arc<Definition>>,
    by_id: HashMap<DefinitionId, Arc<Definition>>,
    commands: HashMap<(CommandKind, String), Arc<Definition>>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a definition.
    ///
    /// Fails if its id is already taken or if a command of the same kind already uses
    /// its full name.
    pub fn register(&mut self, definition: Definition) -> DefinitionResult<&mut Self> {
        let id = definition.id().clone();
        if self.by_id.contains_key(&id) {
            return Err(DefinitionError::DuplicateDefinition {
                id: id.to_string(),
                display_name: definition.display_name(),
            });
        }

        let definition = Arc::new(definition);
        if let Definition::Command(command) = definition.as_ref() {
            match self.commands.entry((command.kind, command.name.clone())) {
                Entry::Occupied(_) => {
                    return Err(DefinitionError::DuplicateName {
                        name: command.name.clone(),
                    });
                }
                Entry::Vacant(slot) => {
                    slot.insert(Arc::clone(&definition));
                }
            }
        }

        debug!(
            definition_id = %id,
            kind = definition.kind_name(),
            name = %definition.display_name(),
            "Registered definition"
        );
        self.by_id.insert(id, Arc::clone(&definition));
        self.definitions.push(definition);
        Ok(self)
    }

    /// Validates a descriptor and registers the resulting definition.
    pub fn register_descriptor(&mut self, descriptor: InteractionDescriptor) -> DefinitionResult<&mut Self> {
        let definition = descriptor.into_definition()?;
        self.register(definition)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Freezes the registry.
    pub fn build(self) -> DefinitionRegistry {
        let autocompletes = self
            .definitions
            .iter()
            .filter(|d| matches!(d.as_ref(), Definition::AutoComplete(_)))
            .cloned()
            .collect();
        info!(definitions = self.definitions.len(), "Definition registry built");
        DefinitionRegistry {
            definitions: self.definitions,
            by_id: self.by_id,
            commands: self.commands,
            autocompletes,
        }
    }
}

/// Immutable, hash-indexed set of definitions.
#[derive(Debug, Default)]
pub struct DefinitionRegistry {
    definitions: Vec<Arc<Definition>>,
    by_id: HashMap<DefinitionId, Arc<Definition>>,
    commands: HashMap<(CommandKind, String), Arc<Definition>>,
    autocompletes: Vec<Arc<Definition>>,
}

impl DefinitionRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Builds a registry straight from descriptors.
    pub fn from_descriptors<I>(descriptors: I) -> DefinitionResult<Self>
    where
        I: IntoIterator<Item = InteractionDescriptor>,
    {
        let mut builder = RegistryBuilder::new();
        for descriptor in descriptors {
            builder.register_descriptor(descriptor)?;
        }
        Ok(builder.build())
    }

    /// Finds a command by full name, preferring slash commands over context menus.
    pub fn find_by_name(&self, name: &str) -> Option<&Definition> {
        [CommandKind::Slash, CommandKind::User, CommandKind::Message]
            .into_iter()
            .find_map(|kind| self.find_command(kind, name))
    }

    pub fn find_command(&self, kind: CommandKind, name: &str) -> Option<&Definition> {
        self.command_entry(kind, name).map(Arc::as_ref)
    }

    pub fn find_by_id(&self, id: &str) -> Option<&Definition> {
        self.by_id.get(id).map(Arc::as_ref)
    }

    /// The first autocomplete handler whose rules cover `command` / `option`.
    pub fn autocomplete_for(&self, command: &str, option: &str) -> Option<&Definition> {
        self.autocomplete_entry(command, option).map(Arc::as_ref)
    }

    pub(crate) fn command_entry(&self, kind: CommandKind, name: &str) -> Option<&Arc<Definition>> {
        self.commands.get(&(kind, name.to_string()))
    }

    pub(crate) fn autocomplete_entry(&self, command: &str, option: &str) -> Option<&Arc<Definition>> {
        self.autocompletes.iter().find(|definition| match definition.as_ref() {
            Definition::AutoComplete(autocomplete) => autocomplete.serves(command, option),
            _ => false,
        })
    }

    /// Shared handle to a definition, for callers that outlive a borrow of the registry.
    pub fn shared_by_id(&self, id: &str) -> Option<Arc<Definition>> {
        self.by_id.get(id).cloned()
    }

    pub fn shared_command(&self, kind: CommandKind, name: &str) -> Option<Arc<Definition>> {
        self.command_entry(kind, name).cloned()
    }

    pub fn shared_autocomplete(&self, command: &str, option: &str) -> Option<Arc<Definition>> {
        self.autocomplete_entry(command, option).cloned()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Definition> {
        self.definitions.iter().map(Arc::as_ref)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
