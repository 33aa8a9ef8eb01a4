//! Media tag vocabulary used inside message content (`<image>`, `<purchased_video, gif>`).

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
    Audio,
    Gif,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Purchase {
    Free,
    Purchased,
    Unpurchased,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaTag {
    pub raw: String,
    pub kind: Option<MediaKind>,
    pub purchase: Purchase,
}

impl MediaTag {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim().to_string();
        let lowered = raw.to_ascii_lowercase();
        let (purchase, base) = if let Some(rest) = lowered.strip_prefix("unpurchased_") {
            (Purchase::Unpurchased, rest)
        } else if let Some(rest) = lowered.strip_prefix("purchased_") {
            (Purchase::Purchased, rest)
        } else {
            (Purchase::Free, lowered.as_str())
        };
        let kind = match base {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            "audio" => Some(MediaKind::Audio),
            "gif" => Some(MediaKind::Gif),
            _ => None,
        };
        Self {
            raw,
            kind,
            purchase,
        }
    }

    pub fn is_known(&self) -> bool {
        self.kind.is_some()
    }
}

/// Splits content into its `<...>` groups and the text outside of them.
fn tag_groups(content: &str) -> (Vec<&str>, String) {
    let mut groups = Vec::new();
    let mut outside = String::new();
    let mut rest = content;
    while let Some(open) = rest.find('<') {
        let Some(close) = rest[open + 1..].find(['<', '>']) else {
            break;
        };
        let close = open + 1 + close;
        if rest.as_bytes()[close] == b'<' {
            outside.push_str(&rest[..close]);
            rest = &rest[close..];
            continue;
        }
        outside.push_str(&rest[..open]);
        groups.push(&rest[open + 1..close]);
        rest = &rest[close + 1..];
    }
    outside.push_str(rest);
    (groups, outside)
}

fn split_items(group: &str) -> impl Iterator<Item = &str> {
    group.split(',').map(str::trim).filter(|item| !item.is_empty())
}

/// Every item of every `<...>` group in `content`, in order.
pub fn parse_tags(content: &str) -> Vec<MediaTag> {
    let (groups, _) = tag_groups(content);
    groups
        .into_iter()
        .flat_map(split_items)
        .map(MediaTag::parse)
        .collect()
}

/// True when `content` is nothing but one or more `<...>` groups of known media tags.
pub fn is_tag_string(content: &str) -> bool {
    let (groups, outside) = tag_groups(content);
    if groups.is_empty() || !outside.trim().is_empty() {
        return false;
    }
    groups.iter().all(|group| {
        let mut items = split_items(group).peekable();
        items.peek().is_some() && items.all(|item| MediaTag::parse(item).is_known())
    })
}

/// Raw items of every group, for re-wrapping into a single group.
pub fn tag_items(content: &str) -> Vec<String> {
    parse_tags(content).into_iter().map(|tag| tag.raw).collect()
}

pub fn render_tag_group(items: &[String]) -> String {
    format!("<{}>", items.join(", "))
}

pub fn has_kind(tags: &[MediaTag], kind: MediaKind) -> bool {
    tags.iter().any(|tag| tag.kind == Some(kind))
}
