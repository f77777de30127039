//! Custom id codec.
//!
//! Components and modals carry a platform-limited string that comes back verbatim
//! when the user interacts with them. Switchyard packs three segments into it:
//!
//! ```text
//! <definitionId>:<runtimeId|INDEPENDENT>:<extra>
//! ```
//!
//! - `definitionId` selects the handler (see [`DefinitionId`]);
//! - the runtime segment is a 32-character lowercase hex runtime id for components
//!   bound to a conversation, or the literal `INDEPENDENT`;
//! - `extra` is an opaque payload for the handler and may be empty.
//!
//! Encoding is deterministic and decoding needs no external state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::definition::DefinitionId;
use crate::error::{CustomIdError, CustomIdResult};

/// Platform limit on custom id length.
pub const CUSTOM_ID_MAX_LEN: usize = 100;

/// Runtime segment of custom ids that are not bound to a runtime.
pub const INDEPENDENT_MARKER: &str = "INDEPENDENT";

const SEPARATOR: char = ':';
const RUNTIME_ID_LEN: usize = 32;

// =============================================================================
// RuntimeId
// =============================================================================

/// Identifier of one runtime, a random v4 UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuntimeId(Uuid);

impl RuntimeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RuntimeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for RuntimeId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for RuntimeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl FromStr for RuntimeId {
    type Err = CustomIdError;

    /// Accepts only the 32-character lowercase hex form produced by `Display`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let well_formed = s.len() == RUNTIME_ID_LEN
            && s.bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if !well_formed {
            return Err(CustomIdError::invalid(s, "runtime id must be 32 lowercase hex characters"));
        }
        Uuid::try_parse(s)
            .map(Self)
            .map_err(|_| CustomIdError::invalid(s, "runtime id is not a uuid"))
    }
}

// =============================================================================
// CustomId
// =============================================================================

/// Which runtime a component belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuntimeBinding {
    Bound(RuntimeId),
    Independent,
}

/// A decoded custom id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CustomId {
    definition_id: DefinitionId,
    binding: RuntimeBinding,
    extra: String,
}

impl CustomId {
    /// A custom id routed back into runtime `runtime_id`.
    pub fn bound(
        definition_id: DefinitionId,
        runtime_id: RuntimeId,
        extra: impl Into<String>,
    ) -> CustomIdResult<Self> {
        Self::new(definition_id, RuntimeBinding::Bound(runtime_id), extra.into())
    }

    /// A custom id that starts a fresh runtime on every interaction.
    pub fn independent(definition_id: DefinitionId, extra: impl Into<String>) -> CustomIdResult<Self> {
        Self::new(definition_id, RuntimeBinding::Independent, extra.into())
    }

    fn new(definition_id: DefinitionId, binding: RuntimeBinding, extra: String) -> CustomIdResult<Self> {
        if extra.contains(SEPARATOR) {
            return Err(CustomIdError::SeparatorInExtra);
        }
        let id = Self {
            definition_id,
            binding,
            extra,
        };
        let len = id.encoded_len();
        if len > CUSTOM_ID_MAX_LEN {
            return Err(CustomIdError::CustomIdOverflow {
                len,
                max: CUSTOM_ID_MAX_LEN,
            });
        }
        Ok(id)
    }

    fn encoded_len(&self) -> usize {
        let runtime_len = match self.binding {
            RuntimeBinding::Bound(_) => RUNTIME_ID_LEN,
            RuntimeBinding::Independent => INDEPENDENT_MARKER.len(),
        };
        self.definition_id.as_str().len() + runtime_len + self.extra.len() + 2
    }

    pub fn definition_id(&self) -> &DefinitionId {
        &self.definition_id
    }

    pub fn binding(&self) -> RuntimeBinding {
        self.binding
    }

    pub fn runtime_id(&self) -> Option<RuntimeId> {
        match self.binding {
            RuntimeBinding::Bound(id) => Some(id),
            RuntimeBinding::Independent => None,
        }
    }

    pub fn is_independent(&self) -> bool {
        self.binding == RuntimeBinding::Independent
    }

    pub fn extra(&self) -> &str {
        &self.extra
    }

    pub fn encode(&self) -> String {
        self.to_string()
    }

    /// Decodes a wire custom id.
    pub fn decode(input: &str) -> CustomIdResult<Self> {
        if input.len() > CUSTOM_ID_MAX_LEN {
            return Err(CustomIdError::invalid(input, "longer than 100 characters"));
        }

        let mut segments = input.split(SEPARATOR);
        let (Some(definition), Some(runtime), Some(extra), None) =
            (segments.next(), segments.next(), segments.next(), segments.next())
        else {
            return Err(CustomIdError::invalid(input, "expected exactly three segments"));
        };

        let definition_id = DefinitionId::parse(definition)
            .ok_or_else(|| CustomIdError::invalid(input, "malformed definition id"))?;
        let binding = if runtime == INDEPENDENT_MARKER {
            RuntimeBinding::Independent
        } else {
            RuntimeBinding::Bound(
                runtime
                    .parse()
                    .map_err(|_| CustomIdError::invalid(input, "malformed runtime segment"))?,
            )
        };

        Ok(Self {
            definition_id,
            binding,
            extra: extra.to_string(),
        })
    }
}

impl fmt::Display for CustomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}", self.definition_id)?;
        match self.binding {
            RuntimeBinding::Bound(id) => write!(f, "{id}")?,
            RuntimeBinding::Independent => f.write_str(INDEPENDENT_MARKER)?,
        }
        write!(f, "{SEPARATOR}{}", self.extra)
    }
}

impl FromStr for CustomId {
    type Err = CustomIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}
