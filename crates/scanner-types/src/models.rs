use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: i64,
    pub name: String,
    pub title: String,
    pub image_url: String,
}

/// A scraped author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub username: String,
    pub fullname: String,
    pub image_url: String,
}

/// A message joined with its channel, its author and the number of replies.
/// `replies` is only populated by the single-message lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullMessage {
    pub id: i64,
    pub title: String,
    pub message_url: String,
    pub message_image_url: String,

    pub channel_id: i64,
    pub channel_name: String,
    pub channel_title: String,
    pub channel_image_url: String,

    pub user_id: i64,
    pub user_fullname: String,
    pub user_image_url: String,

    pub replies_count: i64,
    #[serde(default)]
    pub replies: Vec<FullReply>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullReply {
    pub id: i64,
    pub message_id: i64,
    pub title: String,
    pub image_url: String,
    pub user_id: i64,
    pub user_fullname: String,
    pub user_image_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Saved {
    pub id: i64,
    pub user_id: i64,
    pub message_id: i64,
    pub created_at: DateTime<Utc>,
}
