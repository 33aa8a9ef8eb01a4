//! Rewrites persona name variants to the account's canonical first/last name.

use regex::{Captures, NoExpand, RegexBuilder};

use histfold_contracts::history::Message;
use histfold_contracts::names::NameVariantSet;
use histfold_contracts::request::PersonaNames;

use crate::redact::word_pattern;

pub fn normalize_influencer_name(
    canonical_name: &str,
    variants: &NameVariantSet,
    text: &str,
) -> String {
    let tokens: Vec<&str> = canonical_name.split_whitespace().collect();
    match tokens.as_slice() {
        [] => text.to_string(),
        [single] => replace_full_variants(single, variants, text),
        [first, rest @ ..] => replace_first_last(first, &rest.join(" "), variants, text),
    }
}

fn replace_full_variants(canonical: &str, variants: &NameVariantSet, text: &str) -> String {
    let sources = variants.by_length_desc();
    if sources.is_empty() {
        return text.to_string();
    }
    let alternation = sources
        .iter()
        .map(|variant| word_pattern(variant))
        .collect::<Vec<String>>()
        .join("|");
    match RegexBuilder::new(&alternation).build() {
        Ok(pattern) => pattern.replace_all(text, NoExpand(canonical)).into_owned(),
        Err(_) => text.to_string(),
    }
}

// The first two-token variant is the template; its first and last tokens are
// replaced independently in a single pass.
fn replace_first_last(first: &str, last: &str, variants: &NameVariantSet, text: &str) -> String {
    let template = variants
        .original_order()
        .iter()
        .map(|variant| variant.split_whitespace().collect::<Vec<&str>>())
        .find(|parts| parts.len() == 2);
    let Some(template) = template else {
        return text.to_string();
    };

    let mut mapping: Vec<(&str, &str)> = vec![(template[0], first)];
    if template[1] != template[0] {
        mapping.push((template[1], last));
    }
    mapping.sort_by(|left, right| right.0.chars().count().cmp(&left.0.chars().count()));

    let alternation = mapping
        .iter()
        .map(|(source, _)| format!("({})", word_pattern(source)))
        .collect::<Vec<String>>()
        .join("|");
    let Ok(pattern) = RegexBuilder::new(&alternation).build() else {
        return text.to_string();
    };
    pattern
        .replace_all(text, |caps: &Captures<'_>| {
            mapping
                .iter()
                .enumerate()
                .find(|(index, _)| caps.get(index + 1).is_some())
                .map(|(_, (_, target))| (*target).to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Applies the persona override to the most recent user message only.
pub fn normalize_last_user_message(history: &[Message], persona: &PersonaNames) -> Vec<Message> {
    let mut out = history.to_vec();
    if let Some(message) = out.iter_mut().rev().find(|message| message.role.is_user()) {
        message.content =
            normalize_influencer_name(&persona.canonical_name, &persona.variants, &message.content);
    }
    out
}

#[cfg(test)]
mod tests {
    use histfold_contracts::history::Message;
    use histfold_contracts::names::NameVariantSet;
    use histfold_contracts::request::PersonaNames;

    use super::{normalize_influencer_name, normalize_last_user_message};

    fn names(raw: &[&str]) -> NameVariantSet {
        NameVariantSet::new(raw.iter().copied())
    }

    #[test]
    fn single_token_replaces_full_variants_longest_first() {
        let variants = names(&["Lana", "Lana Rose"]);
        assert_eq!(
            normalize_influencer_name("Bella", &variants, "Lana Rose here, call me Lana"),
            "Bella here, call me Bella"
        );
    }

    #[test]
    fn single_token_is_case_sensitive() {
        let variants = names(&["Rose"]);
        assert_eq!(
            normalize_influencer_name("Bella", &variants, "Rose picked a rose"),
            "Bella picked a rose"
        );
    }

    #[test]
    fn two_tokens_use_first_two_token_variant_as_template() {
        let variants = names(&["Lana", "Lana Rose", "Lana Maria Rose"]);
        assert_eq!(
            normalize_influencer_name("Bella Stone", &variants, "I'm Lana. Lana Rose. Rose!"),
            "I'm Bella. Bella Stone. Stone!"
        );
    }

    #[test]
    fn two_tokens_swap_in_one_pass() {
        let variants = names(&["Ann Lee"]);
        assert_eq!(
            normalize_influencer_name("Lee Ann", &variants, "Ann Lee"),
            "Lee Ann"
        );
    }

    #[test]
    fn two_tokens_without_template_is_noop() {
        let variants = names(&["Lana"]);
        assert_eq!(
            normalize_influencer_name("Bella Stone", &variants, "hi Lana"),
            "hi Lana"
        );
    }

    #[test]
    fn canonical_with_dollar_is_literal() {
        let variants = names(&["Lana"]);
        assert_eq!(normalize_influencer_name("$1", &variants, "hi Lana"), "hi $1");
    }

    #[test]
    fn only_last_user_message_is_touched() {
        let persona = PersonaNames {
            canonical_name: "Bella".to_string(),
            variants: names(&["Lana"]),
        };
        let history = vec![
            Message::user("Lana?"),
            Message::influencer("Lana here"),
            Message::user("hi Lana"),
            Message::influencer("Lana again"),
        ];
        let out = normalize_last_user_message(&history, &persona);
        assert_eq!(out[0].content, "Lana?");
        assert_eq!(out[1].content, "Lana here");
        assert_eq!(out[2].content, "hi Bella");
        assert_eq!(out[3].content, "Lana again");
    }
}
