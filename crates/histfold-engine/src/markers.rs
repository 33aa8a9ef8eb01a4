//! `INFORMATION: ... ENDINFORMATION` side-channel annotations inside message content.

use std::sync::OnceLock;

use regex::Regex;

use histfold_contracts::history::Message;

pub const INFO_OPEN: &str = "INFORMATION: ";
pub const INFO_CLOSE: &str = " ENDINFORMATION";

fn span_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?s)INFORMATION:\s*(.*?)\s*ENDINFORMATION").expect("valid marker regex")
    })
}

pub fn wrap_information(text: &str) -> String {
    format!("{INFO_OPEN}{}{INFO_CLOSE}", text.trim())
}

/// Number of well-formed marker spans in `content`.
pub fn count_markers(content: &str) -> usize {
    span_pattern().find_iter(content).count()
}

/// Strips stray sentinels until none remain; removing one can glue its
/// neighbours into another.
fn clean_part(raw: &str) -> String {
    let mut current = raw.to_string();
    loop {
        let next = current
            .replace("ENDINFORMATION", "")
            .replace("INFORMATION:", "");
        if next == current {
            break;
        }
        current = next;
    }
    current.split_whitespace().collect::<Vec<&str>>().join(" ")
}

fn existing_parts(content: &str) -> Vec<String> {
    span_pattern()
        .captures_iter(content)
        .filter_map(|caps| caps.get(1))
        .map(|inner| clean_part(inner.as_str()))
        .filter(|part| !part.is_empty())
        .collect()
}

fn incoming_parts(new_info: &str) -> Vec<String> {
    if count_markers(new_info) > 0 {
        return existing_parts(new_info);
    }
    let part = clean_part(new_info);
    if part.is_empty() {
        Vec::new()
    } else {
        vec![part]
    }
}

/// Joins clauses with `". "`, dropping trailing periods on all but the last one.
pub(crate) fn join_clauses<S: AsRef<str>>(parts: &[S]) -> String {
    let cleaned: Vec<&str> = parts
        .iter()
        .map(|part| part.as_ref().trim())
        .filter(|part| !part.is_empty())
        .collect();
    let last = cleaned.len().saturating_sub(1);
    cleaned
        .iter()
        .enumerate()
        .map(|(index, part)| {
            if index < last {
                part.trim_end_matches('.').trim_end()
            } else {
                part
            }
        })
        .collect::<Vec<&str>>()
        .join(". ")
}

fn strip_markers(content: &str) -> String {
    span_pattern()
        .split(content)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .collect::<Vec<&str>>()
        .join(" ")
}

/// Folds `new_info` into the annotations of `content`, leaving exactly one marker span.
///
/// Existing annotations come first. Content without markers just gets the new
/// marker appended after a space.
pub fn merge_information_markers(content: &str, new_info: &str) -> String {
    let incoming = incoming_parts(new_info);
    if incoming.is_empty() {
        return content.to_string();
    }

    let mut parts = existing_parts(content);
    let base = if count_markers(content) > 0 {
        strip_markers(content)
    } else {
        content.trim_end().to_string()
    };
    parts.extend(incoming);

    let marker = wrap_information(&join_clauses(parts.as_slice()));
    if base.trim().is_empty() {
        marker
    } else {
        format!("{base} {marker}")
    }
}

/// Merges `info` into the last user message; histories without one are returned as-is.
pub fn inject_information(history: &[Message], info: &str) -> Vec<Message> {
    let mut out = history.to_vec();
    if let Some(message) = out.iter_mut().rev().find(|message| message.role.is_user()) {
        message.content = merge_information_markers(&message.content, info);
    }
    out
}
