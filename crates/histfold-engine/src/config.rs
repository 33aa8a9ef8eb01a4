use std::env;

use crate::redact::USER_PLACEHOLDER;

pub const MAX_SENTENCES_ENV: &str = "HISTFOLD_MAX_SENTENCES";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Per-message sentence cap applied by the serializer; `None` keeps everything.
    pub max_sentences_per_turn: Option<usize>,
    pub placeholder: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_sentences_per_turn: None,
            placeholder: USER_PLACEHOLDER.to_string(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self {
            max_sentences_per_turn: parse_max_sentences(non_empty_env(MAX_SENTENCES_ENV)),
            ..Self::default()
        }
    }

    pub fn with_max_sentences(mut self, max_sentences: Option<usize>) -> Self {
        if max_sentences.is_some() {
            self.max_sentences_per_turn = max_sentences;
        }
        self
    }
}

fn parse_max_sentences(raw: Option<String>) -> Option<usize> {
    raw?.parse::<usize>().ok().filter(|&value| value > 0)
}

fn non_empty_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
