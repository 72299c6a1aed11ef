use std::sync::Arc;

use anyhow::{Context, Result};
use scanner_db::{Database, queries};
use scanner_types::events::{ChannelEvent, TgMessage};

use crate::resolver::{EntityResolver, Resolved};

/// Ids written for one message event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenGraph {
    pub channel_id: i64,
    pub user_id: i64,
    pub message_id: i64,
    pub reply_ids: Vec<i64>,
}

/// Persists ingestion events. Each event is one transaction: a failure on any
/// row rolls back the whole subgraph, so readers never see a message with only
/// some of its replies.
#[derive(Clone)]
pub struct GraphWriter {
    db: Arc<Database>,
    resolver: EntityResolver,
}

impl GraphWriter {
    pub fn new(db: Arc<Database>, resolver: EntityResolver) -> Self {
        Self { db, resolver }
    }

    pub fn write_channel(&self, event: &ChannelEvent) -> Result<Resolved> {
        self.db
            .with_tx(|conn| {
                self.resolver
                    .resolve_channel(conn, &event.name, &event.title, &event.image_url)
            })
            .with_context(|| format!("graph writer: channel={:?}", event.name))
    }

    pub fn write_message(&self, event: &TgMessage) -> Result<WrittenGraph> {
        self.db
            .with_tx(|conn| {
                // A message may arrive before its channel's own event; create on demand.
                let channel = self
                    .resolver
                    .resolve_channel(conn, &event.peer_id.username, "", "")?;

                let author = self.resolver.resolve_user(
                    conn,
                    &event.from_id.username,
                    &event.from_id.fullname,
                    &event.from_id.image_url,
                )?;

                let message_id = queries::create_message(
                    conn,
                    channel.id,
                    author.id,
                    &event.message,
                    &event.message_url,
                    &event.image_url,
                )?;

                let mut reply_ids = Vec::with_capacity(event.replies.messages.len());
                for reply in &event.replies.messages {
                    let reply_author = self.resolver.resolve_user(
                        conn,
                        &reply.from_id.username,
                        &reply.from_id.fullname,
                        &reply.from_id.image_url,
                    )?;
                    reply_ids.push(queries::create_reply(
                        conn,
                        message_id,
                        reply_author.id,
                        &reply.message,
                        &reply.image_url,
                    )?);
                }

                Ok(WrittenGraph {
                    channel_id: channel.id,
                    user_id: author.id,
                    message_id,
                    reply_ids,
                })
            })
            .with_context(|| {
                format!(
                    "graph writer: channel={:?} author={:?} url={:?}",
                    event.peer_id.username, event.from_id.username, event.message_url
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scanner_types::events::{TgAuthor, TgPeer, TgReplies, TgReply};

    fn author(username: &str) -> TgAuthor {
        TgAuthor {
            username: username.into(),
            fullname: format!("{username} full"),
            image_url: String::new(),
        }
    }

    fn event(channel: &str, replies: &[&str]) -> TgMessage {
        TgMessage {
            message: "Anyone using tokio?".into(),
            message_url: "https://t.me/rust_ua/42".into(),
            image_url: "https://img/42.png".into(),
            from_id: author("ivan"),
            peer_id: TgPeer { username: channel.into() },
            replies: TgReplies {
                count: replies.len() as i64,
                messages: replies
                    .iter()
                    .map(|u| TgReply {
                        from_id: author(u),
                        message: format!("reply from {u}"),
                        image_url: String::new(),
                    })
                    .collect(),
            },
        }
    }

    fn writer() -> (Arc<Database>, GraphWriter) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let writer = GraphWriter::new(db.clone(), EntityResolver::default());
        (db, writer)
    }

    #[test]
    fn writes_message_and_every_reply() {
        let (db, writer) = writer();

        let written = writer.write_message(&event("rust_ua", &["olga", "petro", "olga"])).unwrap();
        assert_eq!(written.reply_ids.len(), 3);

        let replies = db.get_full_replies_by_message(written.message_id).unwrap();
        assert_eq!(replies.len(), 3);
        assert!(replies.iter().all(|r| r.message_id == written.message_id));

        // ivan, olga, petro
        let users: i64 = db
            .with_conn(|c| Ok(c.query_row("SELECT COUNT(*) FROM tg_users", [], |r| r.get(0))?))
            .unwrap();
        assert_eq!(users, 3);
    }

    #[test]
    fn reuses_channel_and_author_across_events() {
        let (db, writer) = writer();
        db.create_channel("rust_ua", "Rust UA", "c.png").unwrap();

        let a = writer.write_message(&event("rust_ua", &[])).unwrap();
        let b = writer.write_message(&event("rust_ua", &["ivan"])).unwrap();

        assert_eq!(a.channel_id, b.channel_id);
        assert_eq!(a.user_id, b.user_id);
        assert_ne!(a.message_id, b.message_id);

        let channel = db.get_channel_by_name("rust_ua").unwrap().unwrap();
        assert_eq!(channel.title, "Rust UA");
    }

    #[test]
    fn round_trips_through_full_message_read() {
        let (db, writer) = writer();
        let written = writer.write_message(&event("rust_ua", &["olga", "petro"])).unwrap();

        let msg = db.get_full_message_by_id(written.message_id).unwrap().unwrap();
        assert_eq!(msg.replies_count, 2);
        assert_eq!(msg.title, "Anyone using tokio?");
        assert_eq!(msg.message_url, "https://t.me/rust_ua/42");
        assert_eq!(msg.message_image_url, "https://img/42.png");
        assert_eq!(msg.channel_name, "rust_ua");
    }

    #[test]
    fn late_channel_event_leaves_on_demand_channel_untouched() {
        let (db, writer) = writer();
        writer.write_message(&event("rust_ua", &[])).unwrap();
        let before = db.get_channel_by_name("rust_ua").unwrap().unwrap();

        let resolved = writer
            .write_channel(&ChannelEvent {
                name: "rust_ua".into(),
                title: "Rust UA".into(),
                image_url: "c.png".into(),
            })
            .unwrap();

        let after = db.get_channel_by_name("rust_ua").unwrap().unwrap();
        assert_eq!(resolved, Resolved { id: before.id, created: false });
        assert_eq!(before, after);
        assert_eq!(after.title, "");
    }

    #[test]
    fn failed_reply_rolls_back_whole_graph() {
        let (db, writer) = writer();
        db.with_conn_mut(|c| Ok(c.execute_batch("DROP TABLE replies")?)).unwrap();

        let err = writer.write_message(&event("rust_ua", &["olga"])).unwrap_err();
        assert!(format!("{err:#}").contains("graph writer: channel=\"rust_ua\""));

        assert_eq!(db.count_messages().unwrap(), 0);
        assert!(db.get_channel_by_name("rust_ua").unwrap().is_none());
        assert!(db.get_user_by_username("ivan").unwrap().is_none());
    }
}
