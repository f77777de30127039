use serde::{Deserialize, Serialize};

use super::{Constraint, DefinitionId, HandlerRef, OptionDefinition, OptionType, ReplyConfig};

/// Platform limit on inputs per modal.
pub const MAX_MODAL_INPUTS: usize = 5;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextInputStyle {
    #[default]
    Short,
    Paragraph,
}

/// One text input of a modal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextInputDefinition {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub style: TextInputStyle,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub placeholder: Option<String>,
}

fn default_required() -> bool {
    true
}

impl TextInputDefinition {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            style: TextInputStyle::Short,
            required: true,
            min_length: None,
            max_length: None,
            placeholder: None,
        }
    }

    pub fn paragraph(mut self) -> Self {
        self.style = TextInputStyle::Paragraph;
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn length(mut self, min: Option<usize>, max: Option<usize>) -> Self {
        self.min_length = min;
        self.max_length = max;
        self
    }

    /// The string option the submitted value is adapted and validated as.
    pub(crate) fn to_option(&self) -> OptionDefinition {
        let mut option = OptionDefinition::new(self.id.clone(), OptionType::String)
            .description(self.label.clone());
        if !self.required {
            option = option.optional();
        }
        if self.min_length.is_some() || self.max_length.is_some() {
            option = option.constraint(Constraint::length(
                self.min_length,
                self.max_length,
                "switchyard.validation.length",
            ));
        }
        option
    }
}

/// A modal dialog.
#[derive(Debug, Clone, PartialEq)]
pub struct ModalDefinition {
    pub id: DefinitionId,
    pub handler: HandlerRef,
    pub title: String,
    pub inputs: Vec<TextInputDefinition>,
    /// One string option per input, derived at build time.
    pub options: Vec<OptionDefinition>,
    pub reply: ReplyConfig,
}

impl ModalDefinition {
    pub(crate) fn new(
        id: DefinitionId,
        handler: HandlerRef,
        title: String,
        inputs: Vec<TextInputDefinition>,
        reply: ReplyConfig,
    ) -> Self {
        let options = inputs.iter().map(TextInputDefinition::to_option).collect();
        Self {
            id,
            handler,
            title,
            inputs,
            options,
            reply,
        }
    }
}
