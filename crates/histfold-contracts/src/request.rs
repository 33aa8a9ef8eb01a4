use std::path::Path;

use anyhow::Context;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::history::Message;
use crate::names::NameVariantSet;

/// Account-level persona naming: the canonical name and the variants to rewrite into it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PersonaNames {
    pub canonical_name: String,
    #[serde(default)]
    pub variants: NameVariantSet,
}

/// Everything needed to turn one conversation into a prompt string.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PromptRequest {
    pub history: Vec<Message>,
    pub model_name: String,
    #[serde(default)]
    pub user_names: NameVariantSet,
    #[serde(default)]
    pub persona: Option<PersonaNames>,
    /// Captions and transcripts keyed by message id.
    #[serde(default)]
    pub descriptions: IndexMap<String, String>,
    #[serde(default)]
    pub information: Option<String>,
    #[serde(default)]
    pub max_sentences_per_turn: Option<usize>,
}

impl PromptRequest {
    pub fn new(history: Vec<Message>, model_name: impl Into<String>) -> Self {
        Self {
            history,
            model_name: model_name.into(),
            ..Self::default()
        }
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading request {}", path.display()))?;
        serde_json::from_str(&raw).with_context(|| format!("parsing request {}", path.display()))
    }
}
