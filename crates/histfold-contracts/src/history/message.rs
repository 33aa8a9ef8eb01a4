use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Content of the synthetic user turn put in front of persona-first histories.
pub const BLANK_CONTENT: &str = "<blank>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum Role {
    #[default]
    User,
    Influencer,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "usr",
            Role::Influencer => "influencer",
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }
}

// Anything that is not the end user is the persona side.
impl From<String> for Role {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("user") {
            Role::User
        } else {
            Role::Influencer
        }
    }
}

/// Message ids arrive as strings or integers; they are compared by string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<i64> for MessageId {
    fn from(value: i64) -> Self {
        Self(value.to_string())
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Int(i64),
            UInt(u64),
            Float(f64),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(value) => MessageId(value),
            RawId::Int(value) => MessageId(value.to_string()),
            RawId::UInt(value) => MessageId(value.to_string()),
            RawId::Float(value) => MessageId(value.to_string()),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(rename = "type", default, deserialize_with = "null_as_default")]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<MessageId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_default")]
    pub content: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn influencer(content: impl Into<String>) -> Self {
        Self::new(Role::Influencer, content)
    }

    pub fn with_id(mut self, id: impl Into<MessageId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_attachment(mut self, kind: &str, url: &str) -> Self {
        self.attachments.push(Attachment {
            kind: kind.to_string(),
            url: url.to_string(),
        });
        self
    }

    /// Trimmed description, `None` when missing or blank.
    pub fn description_text(&self) -> Option<&str> {
        self.description
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{Message, MessageId, Role};

    #[test]
    fn message_tolerates_null_and_missing_fields() -> anyhow::Result<()> {
        let message: Message = serde_json::from_value(json!({
            "id": 42,
            "role": "user",
            "content": null,
            "attachments": null
        }))?;
        assert_eq!(message.id, Some(MessageId::new("42")));
        assert_eq!(message.content, "");
        assert!(message.attachments.is_empty());
        assert_eq!(message.description, None);

        let bare: Message = serde_json::from_value(json!({"content": "hi"}))?;
        assert_eq!(bare.role, Role::User);
        assert_eq!(bare.id, None);

        let null_role: Message = serde_json::from_value(json!({"role": null, "content": "hi"}))?;
        assert_eq!(null_role.role, Role::User);
        assert_eq!(null_role.content, "hi");
        Ok(())
    }

    #[test]
    fn large_numeric_ids_keep_their_digits() -> anyhow::Result<()> {
        let message: Message =
            serde_json::from_value(json!({"id": 18446744073709551615u64, "content": "hi"}))?;
        assert_eq!(message.id, Some(MessageId::new("18446744073709551615")));

        let negative: Message = serde_json::from_value(json!({"id": -7, "content": "hi"}))?;
        assert_eq!(negative.id, Some(MessageId::new("-7")));
        Ok(())
    }

    #[test]
    fn any_non_user_role_is_persona() -> anyhow::Result<()> {
        for raw in ["influencer", "assistant", "creator", "Influencer"] {
            let role: Role = serde_json::from_value(json!(raw))?;
            assert_eq!(role, Role::Influencer, "{raw}");
        }
        let role: Role = serde_json::from_value(json!("USER"))?;
        assert_eq!(role, Role::User);
        assert_eq!(serde_json::to_value(Role::Influencer)?, json!("influencer"));
        Ok(())
    }

    #[test]
    fn attachments_keep_type_field_name() -> anyhow::Result<()> {
        let message: Message = serde_json::from_value(json!({
            "id": "m1",
            "role": "user",
            "content": "<image>",
            "attachments": [{"type": "image", "url": "https://cdn/a.jpg"}]
        }))?;
        assert_eq!(message.attachments[0].kind, "image");
        let back = serde_json::to_value(&message)?;
        assert_eq!(back["attachments"][0]["type"], json!("image"));
        assert_eq!(back["id"], json!("m1"));
        Ok(())
    }

    #[test]
    fn blank_description_is_absent() {
        let message = Message::user("<image>").with_description("   ");
        assert_eq!(message.description_text(), None);
        let message = Message::user("<image>").with_description(" a dog ");
        assert_eq!(message.description_text(), Some("a dog"));
    }
}
