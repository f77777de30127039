//! # Switchyard Core
//!
//! Data model of the Switchyard interaction router.
//!
//! This crate holds everything that does not need an async runtime:
//!
//! - **Definitions**: immutable descriptions of commands, components, modals and
//!   autocomplete handlers ([`Definition`]), built from external
//!   [`InteractionDescriptor`]s.
//! - **Registry**: the frozen, hash-indexed routing table ([`DefinitionRegistry`]).
//! - **Custom ids**: the reversible `<definitionId>:<runtimeId|INDEPENDENT>:<extra>`
//!   encoding carried by components and modals ([`CustomId`]).
//! - **Events and replies**: parsed inbound [`Interaction`]s and outbound
//!   [`ReplyIntent`]s.
//!
//! Dispatching, runtimes and middleware live in `switchyard-framework`.

pub mod custom_id;
pub mod definition;
pub mod descriptor;
pub mod error;
pub mod event;
pub mod registry;
pub mod reply;

pub use custom_id::{CUSTOM_ID_MAX_LEN, CustomId, INDEPENDENT_MARKER, RuntimeBinding, RuntimeId};
pub use definition::{
    AutoCompleteDefinition, AutoCompleteRule, CommandDefinition, CommandKind, CommandScope,
    ComponentDefinition, ComponentKind, Constraint, ConstraintKind, CooldownDefinition,
    DefaultPolicy, Definition, DefinitionId, HandlerRef, ModalDefinition, OptionDefinition,
    OptionType, ReplyConfig, TextInputDefinition, TextInputStyle,
};
pub use descriptor::{DescriptorKind, InteractionDescriptor};
pub use error::{CustomIdError, CustomIdResult, DefinitionError, DefinitionResult, DescriptorError};
pub use event::{
    ADMINISTRATOR, Attachment, Channel, ContextTarget, Interaction, InteractionKind, Member,
    ModalField, RawKind, RawOption, RawValue, Role, Snowflake, User,
};
pub use registry::{DefinitionRegistry, RegistryBuilder};
pub use reply::{Choice, MessageContent, MessageReply, ModalReply, ReplyIntent};
