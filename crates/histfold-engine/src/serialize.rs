//! Flattens a message history into the `usr: ...` / `PERSONA: ...` transcript.

use std::sync::OnceLock;

use regex::{NoExpand, Regex};

use histfold_contracts::history::{Message, Role, BLANK_CONTENT};
use histfold_contracts::names::NameVariantSet;

use crate::redact::NameRedactor;

/// Stored history addresses the fan as "user" when no name is known.
pub const GENERIC_USER_ALIAS: &str = "user";

const FALLBACK_PERSONA_LABEL: &str = "INFLUENCER";

fn sentence_boundary() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"[.?!]+\s+").expect("valid sentence boundary regex"))
}

fn persona_label_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)influencer:").expect("valid persona label regex"))
}

/// Drops blank lines, joins the rest with spaces and ends with a single newline.
pub fn prepare_content(content: &str) -> String {
    let mut out = content
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<&str>>()
        .join(" ");
    out.push('\n');
    out
}

/// Splits after every run of `.`, `?` or `!` that is followed by whitespace.
pub fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut last = 0;
    for boundary in sentence_boundary().find_iter(text) {
        let end = boundary.start() + boundary.as_str().trim_end().len();
        sentences.push(&text[last..end]);
        last = boundary.end();
    }
    sentences.push(&text[last..]);
    sentences
        .into_iter()
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .collect()
}

/// Upper-cased display name with a trailing "ai" removed: `LagrandAI` -> `LAGRAND`.
pub fn persona_label(model_display_name: &str) -> String {
    let name = model_display_name.trim();
    let stem = name
        .len()
        .checked_sub(2)
        .filter(|&index| {
            name.is_char_boundary(index) && name[index..].eq_ignore_ascii_case("ai")
        })
        .map_or(name, |index| &name[..index])
        .trim();
    if stem.is_empty() {
        FALLBACK_PERSONA_LABEL.to_string()
    } else {
        stem.to_uppercase()
    }
}

#[derive(Debug, Clone)]
pub struct Serializer {
    variants: NameVariantSet,
    redactor: NameRedactor,
    persona_label: String,
    max_sentences: Option<usize>,
}

impl Serializer {
    pub fn new(model_display_name: &str, name_variants: &NameVariantSet) -> Self {
        let variants = name_variants.with(GENERIC_USER_ALIAS);
        Self {
            redactor: NameRedactor::new(&variants),
            variants,
            persona_label: persona_label(model_display_name),
            max_sentences: None,
        }
    }

    /// `None` or `Some(0)` keeps every sentence.
    pub fn max_sentences(mut self, max_sentences: Option<usize>) -> Self {
        self.max_sentences = max_sentences.filter(|&max| max > 0);
        self
    }

    pub fn placeholder(mut self, placeholder: &str) -> Self {
        self.redactor = NameRedactor::with_placeholder(&self.variants, placeholder);
        self
    }

    pub fn persona_label(&self) -> &str {
        &self.persona_label
    }

    fn render_message(&self, content: &str) -> Option<String> {
        let prepared = prepare_content(content);
        let body = prepared.trim();
        if body.is_empty() {
            return None;
        }
        let mut sentences: Vec<String> = split_sentences(body)
            .into_iter()
            .map(|sentence| self.redactor.redact(sentence))
            .collect();
        if let Some(max) = self.max_sentences {
            sentences.truncate(max);
        }
        let mut joined = sentences.join(" ");
        if !joined.ends_with(['.', '?', '!', '>']) {
            joined.push('.');
        }
        Some(joined)
    }

    fn render_line(role: Role, parts: &[String]) -> String {
        let body = if parts.is_empty() {
            BLANK_CONTENT.to_string()
        } else {
            parts.join(" ")
        };
        format!("{}: {body}", role.label())
    }

    pub fn render(&self, history: &[Message]) -> String {
        let synthetic = Message::user(BLANK_CONTENT);
        let leading = history
            .first()
            .filter(|message| !message.role.is_user())
            .map(|_| &synthetic);

        let mut lines: Vec<String> = Vec::new();
        let mut current: Option<(Role, Vec<String>)> = None;
        for message in leading.into_iter().chain(history) {
            let same_role = current
                .as_ref()
                .is_some_and(|(role, _)| *role == message.role);
            if !same_role {
                if let Some((role, parts)) = current.take() {
                    lines.push(Self::render_line(role, &parts));
                }
                current = Some((message.role, Vec::new()));
            }
            if let (Some((_, parts)), Some(text)) =
                (current.as_mut(), self.render_message(&message.content))
            {
                parts.push(text);
            }
        }
        if let Some((role, parts)) = current {
            lines.push(Self::render_line(role, &parts));
        }

        let transcript = lines.join("\n");
        let label = format!("{}:", self.persona_label);
        persona_label_pattern()
            .replace_all(&transcript, NoExpand(&label))
            .trim()
            .to_string()
    }
}

/// Serializes `history` with the default `[usr]` placeholder.
pub fn serialize(
    history: &[Message],
    model_display_name: &str,
    name_variants: &NameVariantSet,
    max_sentences_per_turn: Option<usize>,
) -> String {
    Serializer::new(model_display_name, name_variants)
        .max_sentences(max_sentences_per_turn)
        .render(history)
}
