//! Media tag aggregation and caption/transcript folding.

use indexmap::IndexMap;

use histfold_contracts::history::tags::{
    has_kind, is_tag_string, parse_tags, render_tag_group, tag_items, MediaKind, MediaTag,
};
use histfold_contracts::history::{Message, Role};

use crate::markers::{join_clauses, merge_information_markers, wrap_information};

const BOTH_MEDIA_PHRASE: &str = "usr sent image(s) and / or video(s). The media shows:";
const IMAGE_PHRASE: &str = "usr sent image(s). The image(s) show:";
const VIDEO_PHRASE: &str = "usr sent video(s). The video(s) show:";

fn is_tag_message(message: &Message) -> bool {
    message.role.is_user()
        && (message.content.trim().is_empty() || is_tag_string(&message.content))
}

fn merge_run(run: &[&Message]) -> Message {
    let items: Vec<String> = run
        .iter()
        .flat_map(|message| tag_items(&message.content))
        .collect();
    let descriptions: Vec<&str> = run
        .iter()
        .filter_map(|message| message.description_text())
        .collect();
    Message {
        id: run[0].id.clone(),
        role: run[0].role,
        content: if items.is_empty() {
            String::new()
        } else {
            render_tag_group(&items)
        },
        attachments: run
            .iter()
            .flat_map(|message| message.attachments.iter().cloned())
            .collect(),
        description: (!descriptions.is_empty()).then(|| join_clauses(descriptions.as_slice())),
    }
}

fn flush_run(run: &mut Vec<&Message>, out: &mut Vec<Message>) {
    match run.as_slice() {
        [] => {}
        [single] => out.push((*single).clone()),
        group => out.push(merge_run(group)),
    }
    run.clear();
}

/// Collapses consecutive user messages that are only media tags (or empty) into one.
///
/// The merged message takes the first member's id and position; a lone tag
/// message passes through untouched, so applying this twice changes nothing.
pub fn aggregate_tagged_messages(history: &[Message]) -> Vec<Message> {
    let mut out = Vec::with_capacity(history.len());
    let mut run: Vec<&Message> = Vec::new();
    for message in history {
        if is_tag_message(message) {
            run.push(message);
            continue;
        }
        flush_run(&mut run, &mut out);
        out.push(message.clone());
    }
    flush_run(&mut run, &mut out);
    out
}

/// Sets `description` from the id-keyed map; blank entries are ignored.
pub fn attach_descriptions(
    history: &[Message],
    descriptions_by_id: &IndexMap<String, String>,
) -> Vec<Message> {
    history
        .iter()
        .map(|message| {
            let found = message
                .id
                .as_ref()
                .and_then(|id| descriptions_by_id.get(id.as_str()))
                .map(|value| value.trim())
                .filter(|value| !value.is_empty());
            let mut message = message.clone();
            if let Some(description) = found {
                message.description = Some(description.to_string());
            }
            message
        })
        .collect()
}

fn context_phrase(tags: &[MediaTag]) -> &'static str {
    match (has_kind(tags, MediaKind::Image), has_kind(tags, MediaKind::Video)) {
        (true, true) => BOTH_MEDIA_PHRASE,
        (true, false) => IMAGE_PHRASE,
        (false, true) => VIDEO_PHRASE,
        (false, false) => "",
    }
}

fn join_space(left: &str, right: &str) -> String {
    if left.is_empty() {
        right.to_string()
    } else {
        format!("{left} {right}")
    }
}

/// Folds an attached description into the content and consumes it.
pub fn merge_description(message: &Message) -> Message {
    let Some(description) = message.description_text() else {
        return message.clone();
    };
    let base = message.content.trim_end();
    let content = match message.role {
        Role::Influencer => join_space(base, description),
        Role::User if message.content.contains("audio") => join_space(base, description),
        Role::User => {
            let phrase = context_phrase(&parse_tags(base));
            let inner = join_space(phrase, description);
            format!(
                "{}\n",
                merge_information_markers(base, &wrap_information(&inner))
            )
        }
    };
    Message {
        content,
        description: None,
        ..message.clone()
    }
}

pub fn fold_descriptions(history: &[Message]) -> Vec<Message> {
    history.iter().map(merge_description).collect()
}

/// Attaches descriptions by id, then folds them into content.
pub fn apply_descriptions(
    history: &[Message],
    descriptions_by_id: &IndexMap<String, String>,
) -> Vec<Message> {
    fold_descriptions(&attach_descriptions(history, descriptions_by_id))
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;

    use histfold_contracts::history::Message;

    use super::{
        aggregate_tagged_messages, apply_descriptions, attach_descriptions, merge_description,
    };

    fn descriptions(rows: &[(&str, &str)]) -> IndexMap<String, String> {
        rows.iter()
            .map(|(id, text)| (id.to_string(), text.to_string()))
            .collect()
    }

    #[test]
    fn merges_consecutive_tag_messages() {
        let history = vec![
            Message::user("hi").with_id("1"),
            Message::user("<image>")
                .with_id("2")
                .with_attachment("image", "https://cdn/a.jpg")
                .with_description("a dog."),
            Message::user("  ").with_id("3"),
            Message::user("<video> <purchased_image>")
                .with_id("4")
                .with_attachment("video", "https://cdn/b.mp4")
                .with_description("a cat"),
            Message::user("bye").with_id("5"),
        ];
        let out = aggregate_tagged_messages(&history);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].content, "hi");
        assert_eq!(out[1].id.as_ref().map(|id| id.as_str()), Some("2"));
        assert_eq!(out[1].content, "<image, video, purchased_image>");
        assert_eq!(out[1].attachments.len(), 2);
        assert_eq!(out[1].attachments[1].url, "https://cdn/b.mp4");
        assert_eq!(out[1].description.as_deref(), Some("a dog. a cat"));
        assert_eq!(out[2].content, "bye");
    }

    #[test]
    fn persona_and_text_messages_break_runs() {
        let history = vec![
            Message::user("<image>"),
            Message::influencer("<image>"),
            Message::user("<image>"),
            Message::user("<image> look"),
            Message::user("<image>"),
        ];
        assert_eq!(aggregate_tagged_messages(&history), history);
    }

    #[test]
    fn aggregation_is_idempotent() {
        let history = vec![
            Message::user(""),
            Message::user(""),
            Message::user("<image>"),
            Message::user("<gif>").with_description("dance"),
            Message::influencer("nice"),
            Message::user("<audio>"),
            Message::user(""),
        ];
        let once = aggregate_tagged_messages(&history);
        let twice = aggregate_tagged_messages(&once);
        assert_eq!(once, twice);
        assert_eq!(once[0].content, "<image, gif>");
        assert_eq!(once[2].content, "<audio>");

        let empties = aggregate_tagged_messages(&[Message::user(""), Message::user(" ")]);
        assert_eq!(empties, vec![Message::user("")]);
    }

    #[test]
    fn user_media_gets_information_marker() {
        let image = merge_description(&Message::user("<image>").with_description("a beach"));
        assert_eq!(
            image.content,
            "<image> INFORMATION: usr sent image(s). The image(s) show: a beach ENDINFORMATION\n"
        );
        assert_eq!(image.description, None);

        let both =
            merge_description(&Message::user("<image, video>").with_description("a beach"));
        assert!(both.content.contains(
            "INFORMATION: usr sent image(s) and / or video(s). The media shows: a beach"
        ));

        let video =
            merge_description(&Message::user("<purchased_video>").with_description("waves"));
        assert!(video.content.contains("usr sent video(s). The video(s) show: waves"));

        let gif = merge_description(&Message::user("<gif>").with_description("dance"));
        assert_eq!(gif.content, "<gif> INFORMATION: dance ENDINFORMATION\n");
    }

    #[test]
    fn audio_and_persona_descriptions_are_plain() {
        let audio = merge_description(&Message::user("<audio>").with_description("hey babe"));
        assert_eq!(audio.content, "<audio> hey babe");

        let persona = merge_description(&Message::influencer("<image>").with_description("me"));
        assert_eq!(persona.content, "<image> me");
    }

    #[test]
    fn existing_marker_is_merged_not_duplicated() {
        let message = Message::user("<image> INFORMATION: tipped ENDINFORMATION")
            .with_description("a beach");
        let merged = merge_description(&message);
        assert_eq!(
            merged.content,
            "<image> INFORMATION: tipped. usr sent image(s). \
             The image(s) show: a beach ENDINFORMATION\n"
        );
    }

    #[test]
    fn apply_descriptions_uses_ids() {
        let history = vec![
            Message::user("<image>").with_id("m1"),
            Message::user("<image>").with_id("m2"),
            Message::influencer("hi").with_id("m3"),
            Message::user("no id"),
        ];
        let map = descriptions(&[("m2", "sunset"), ("m3", "  "), ("zz", "unused")]);
        let attached = attach_descriptions(&history, &map);
        assert_eq!(attached[1].description.as_deref(), Some("sunset"));
        assert_eq!(attached[2].description, None);

        let out = apply_descriptions(&history, &map);
        assert_eq!(out[0].content, "<image>");
        assert!(out[1].content.contains("The image(s) show: sunset"));
        assert_eq!(out[2].content, "hi");
        assert_eq!(out[3].content, "no id");
    }

    #[test]
    fn messages_without_description_are_unchanged() {
        let message = Message::user("<image>");
        assert_eq!(merge_description(&message), message);
    }
}
