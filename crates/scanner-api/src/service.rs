use std::sync::Arc;

use anyhow::{Context, anyhow};
use scanner_db::Database;
use scanner_types::models::{Channel, FullMessage, FullReply, User};
use thiserror::Error;

use crate::pagination::PageWindower;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Read-side queries over the store. Every call runs on the blocking pool and
/// wraps store failures with the name of the operation.
#[derive(Clone)]
pub struct ReadService {
    db: Arc<Database>,
    pages: PageWindower,
}

impl ReadService {
    pub fn new(db: Arc<Database>, pages: PageWindower) -> Self {
        Self { db, pages }
    }

    pub fn pages(&self) -> PageWindower {
        self.pages
    }

    async fn run<T, F>(&self, op: &'static str, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        let result = tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| anyhow!("spawn_blocking join error: {}", e))?;
        Ok(result.context(op)?)
    }

    // -- Channels --

    pub async fn get_channels_count(&self) -> Result<i64, ServiceError> {
        self.run("channel service: get channels count", |db| db.count_channels())
            .await
    }

    pub async fn get_channels_by_page(&self, page: i64) -> Result<Vec<Channel>, ServiceError> {
        let w = self.pages.window(page);
        let channels = self
            .run("channel service: get channels by page", move |db| {
                db.get_channels_page(w.limit, w.offset)
            })
            .await?;
        non_empty(channels, "channels")
    }

    pub async fn get_channel_by_name(&self, name: &str) -> Result<Channel, ServiceError> {
        let name = name.to_string();
        self.run("channel service: get channel by name", move |db| {
            db.get_channel_by_name(&name)
        })
        .await?
        .ok_or(ServiceError::NotFound("channel"))
    }

    // -- Messages --

    pub async fn get_messages_count(&self) -> Result<i64, ServiceError> {
        self.run("message service: get messages count", |db| db.count_messages())
            .await
    }

    pub async fn get_messages_count_by_channel_id(
        &self,
        channel_id: i64,
    ) -> Result<i64, ServiceError> {
        self.run("message service: get messages count by channel id", move |db| {
            db.count_messages_by_channel(channel_id)
        })
        .await
    }

    pub async fn get_full_messages_by_page(
        &self,
        page: i64,
    ) -> Result<Vec<FullMessage>, ServiceError> {
        let w = self.pages.window(page);
        let messages = self
            .run("message service: get full messages by page", move |db| {
                db.get_full_messages_page(w.limit, w.offset)
            })
            .await?;
        non_empty(messages, "full messages")
    }

    pub async fn get_full_messages_by_channel_id_and_page(
        &self,
        channel_id: i64,
        page: i64,
    ) -> Result<Vec<FullMessage>, ServiceError> {
        let w = self.pages.window(page);
        let messages = self
            .run(
                "message service: get full messages by channel id and page",
                move |db| db.get_full_messages_by_channel(channel_id, w.limit, w.offset),
            )
            .await?;
        non_empty(messages, "full messages")
    }

    pub async fn get_full_messages_by_user_id(
        &self,
        user_id: i64,
    ) -> Result<Vec<FullMessage>, ServiceError> {
        let messages = self
            .run("message service: get full messages by user id", move |db| {
                db.get_full_messages_by_user(user_id)
            })
            .await?;
        non_empty(messages, "full messages")
    }

    /// The message with its replies attached, newest reply first.
    pub async fn get_full_message_by_id(&self, id: i64) -> Result<FullMessage, ServiceError> {
        self.run("message service: get full message by id", move |db| {
            let Some(mut message) = db.get_full_message_by_id(id)? else {
                return Ok(None);
            };
            message.replies = db.get_full_replies_by_message(id)?;
            Ok(Some(message))
        })
        .await?
        .ok_or(ServiceError::NotFound("full message"))
    }

    // -- Replies --

    pub async fn get_full_replies_by_message_id(
        &self,
        message_id: i64,
    ) -> Result<Vec<FullReply>, ServiceError> {
        let replies = self
            .run("reply service: get full replies by message id", move |db| {
                db.get_full_replies_by_message(message_id)
            })
            .await?;
        non_empty(replies, "full replies")
    }

    // -- Users --

    pub async fn get_user_by_id(&self, id: i64) -> Result<User, ServiceError> {
        self.run("user service: get user by id", move |db| db.get_user_by_id(id))
            .await?
            .ok_or(ServiceError::NotFound("user"))
    }
}

fn non_empty<T>(items: Vec<T>, what: &'static str) -> Result<Vec<T>, ServiceError> {
    if items.is_empty() {
        return Err(ServiceError::NotFound(what));
    }
    Ok(items)
}
