//! Replaces end-user name variants in free text with a placeholder token.

use regex::{NoExpand, Regex, RegexBuilder};

use histfold_contracts::names::NameVariantSet;

pub const USER_PLACEHOLDER: &str = "[usr]";

pub(crate) fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}

fn is_apostrophe(ch: char) -> bool {
    matches!(ch, '\'' | '\u{2019}')
}

/// Escaped literal with `\b` on each edge that is a word character.
pub(crate) fn word_pattern(literal: &str) -> String {
    let lead = if literal.chars().next().is_some_and(is_word_char) {
        r"\b"
    } else {
        ""
    };
    let tail = if literal.chars().next_back().is_some_and(is_word_char) {
        r"\b"
    } else {
        ""
    };
    format!("{lead}{}{tail}", regex::escape(literal))
}

/// Compiled redaction patterns for one variant set.
#[derive(Debug, Clone)]
pub struct NameRedactor {
    patterns: Vec<Regex>,
    placeholder: String,
    collapse: Option<Regex>,
}

impl NameRedactor {
    pub fn new(variants: &NameVariantSet) -> Self {
        Self::with_placeholder(variants, USER_PLACEHOLDER)
    }

    pub fn with_placeholder(variants: &NameVariantSet, placeholder: &str) -> Self {
        let mut patterns = Vec::new();
        for variant in variants.by_length_desc() {
            for part in variant.split_whitespace() {
                if let Ok(pattern) = RegexBuilder::new(&word_pattern(part))
                    .case_insensitive(true)
                    .build()
                {
                    patterns.push(pattern);
                }
            }
        }
        let escaped = regex::escape(placeholder);
        let collapse = if placeholder.is_empty() {
            None
        } else {
            Regex::new(&format!(r"{escaped}(?:\s*{escaped})+")).ok()
        };
        Self {
            patterns,
            placeholder: placeholder.to_string(),
            collapse,
        }
    }

    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    pub fn redact(&self, text: &str) -> String {
        if self.patterns.is_empty() {
            return text.to_string();
        }
        let mut out = text.to_string();
        for pattern in &self.patterns {
            out = self.replace_guarded(&out, pattern);
        }
        match &self.collapse {
            Some(collapse) => collapse
                .replace_all(&out, NoExpand(&self.placeholder))
                .into_owned(),
            None => out,
        }
    }

    // Skips matches touching a word character or an apostrophe ("don't" vs "t"),
    // and matches inside an already placed placeholder.
    fn replace_guarded(&self, text: &str, pattern: &Regex) -> String {
        let protected: Vec<(usize, usize)> = if self.placeholder.is_empty() {
            Vec::new()
        } else {
            text.match_indices(self.placeholder.as_str())
                .map(|(start, token)| (start, start + token.len()))
                .collect()
        };

        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for found in pattern.find_iter(text) {
            if found.as_str().is_empty() {
                continue;
            }
            let before = text[..found.start()].chars().next_back();
            let after = text[found.end()..].chars().next();
            let guarded =
                |ch: Option<char>| ch.is_some_and(|ch| is_word_char(ch) || is_apostrophe(ch));
            if guarded(before) || guarded(after) {
                continue;
            }
            if protected
                .iter()
                .any(|&(start, end)| found.start() < end && start < found.end())
            {
                continue;
            }
            out.push_str(&text[last..found.start()]);
            out.push_str(&self.placeholder);
            last = found.end();
        }
        out.push_str(&text[last..]);
        out
    }
}

pub fn redact_names(text: &str, variants: &NameVariantSet) -> String {
    NameRedactor::new(variants).redact(text)
}
