//! Payloads published by the scraper on the ingestion topics.
//!
//! Field names follow the scraper's wire format (`MessageURL`, `FromID`, ...),
//! so every struct renames explicitly instead of relying on a case rule.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The two topics the ingestion side consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Channels,
    Messages,
}

impl Topic {
    pub const ALL: [Topic; 2] = [Topic::Channels, Topic::Messages];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Channels => "channels.get",
            Self::Messages => "messages.get",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "channels.get" => Some(Self::Channels),
            "messages.get" => Some(Self::Messages),
            _ => None,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `channels.get`: a channel seen by the scraper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelEvent {
    /// `Username`, or `Name` from older scrapers. A payload carrying both is
    /// rejected as a duplicate field.
    #[serde(rename = "Username", alias = "Name")]
    pub name: String,
    #[serde(rename = "Title", default)]
    pub title: String,
    #[serde(rename = "ImageURL", default)]
    pub image_url: String,
}

/// `messages.get`: one message with its author, target channel and replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TgMessage {
    #[serde(rename = "Message", default)]
    pub message: String,
    #[serde(rename = "MessageURL", default)]
    pub message_url: String,
    #[serde(rename = "ImageURL", default)]
    pub image_url: String,
    #[serde(rename = "FromID")]
    pub from_id: TgAuthor,
    #[serde(rename = "PeerID")]
    pub peer_id: TgPeer,
    #[serde(rename = "Replies", default)]
    pub replies: TgReplies,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TgAuthor {
    #[serde(rename = "Username")]
    pub username: String,
    #[serde(rename = "Fullname", default)]
    pub fullname: String,
    #[serde(rename = "ImageURL", default)]
    pub image_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TgPeer {
    #[serde(rename = "Username")]
    pub username: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TgReplies {
    /// Reply count as reported by the scraper. Informational only: the stored
    /// count is always derived from `messages`.
    #[serde(rename = "Count", default)]
    pub count: i64,
    #[serde(rename = "Messages", default)]
    pub messages: Vec<TgReply>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TgReply {
    #[serde(rename = "FromID")]
    pub from_id: TgAuthor,
    #[serde(rename = "Message", default)]
    pub message: String,
    #[serde(rename = "ImageURL", default)]
    pub image_url: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_scraper_message_payload() {
        let raw = r#"{
            "Message": "Anyone using tokio?",
            "MessageURL": "https://t.me/rust_ua/42",
            "ImageURL": "https://img/42.png",
            "FromID": {"Username": "ivan", "Fullname": "Ivan P", "ImageURL": "https://img/ivan.png"},
            "PeerID": {"Username": "rust_ua"},
            "Replies": {"Count": 1, "Messages": [
                {"FromID": {"Username": "olga", "Fullname": "Olga", "ImageURL": ""}, "Message": "yes", "ImageURL": ""}
            ]}
        }"#;

        let msg: TgMessage = serde_json::from_str(raw).unwrap();
        assert_eq!(msg.peer_id.username, "rust_ua");
        assert_eq!(msg.from_id.fullname, "Ivan P");
        assert_eq!(msg.message_url, "https://t.me/rust_ua/42");
        assert_eq!(msg.replies.messages.len(), 1);
        assert_eq!(msg.replies.messages[0].from_id.username, "olga");
    }

    #[test]
    fn replies_block_is_optional() {
        let raw = r#"{"Message": "hi", "FromID": {"Username": "ivan"}, "PeerID": {"Username": "c"}}"#;
        let msg: TgMessage = serde_json::from_str(raw).unwrap();
        assert!(msg.replies.messages.is_empty());
        assert_eq!(msg.image_url, "");
    }

    #[test]
    fn channel_event_accepts_name_alias() {
        let a: ChannelEvent = serde_json::from_str(r#"{"Username": "go_go", "Title": "Go UA"}"#).unwrap();
        let b: ChannelEvent = serde_json::from_str(r#"{"Name": "go_go"}"#).unwrap();
        assert_eq!(a.name, b.name);
        assert_eq!(a.title, "Go UA");
        assert_eq!(b.title, "");
    }

    #[test]
    fn channel_event_with_both_name_keys_is_rejected() {
        let err = serde_json::from_str::<ChannelEvent>(r#"{"Username": "go_go", "Name": "go_go"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("duplicate field"));
    }

    #[test]
    fn topic_names() {
        for topic in Topic::ALL {
            assert_eq!(Topic::from_name(topic.as_str()), Some(topic));
        }
        assert_eq!(Topic::from_name("users.get"), None);
    }
}
