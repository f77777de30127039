use serde::{Deserialize, Serialize};

use super::{DefinitionId, HandlerRef, ReplyConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    Button,
    StringSelect,
    EntitySelect,
}

/// A button or select menu.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentDefinition {
    pub id: DefinitionId,
    pub handler: HandlerRef,
    pub kind: ComponentKind,
    pub label: Option<String>,
    /// Not bound to any runtime; every press starts a fresh one.
    pub independent: bool,
    pub permissions: Vec<String>,
    pub reply: ReplyConfig,
}
