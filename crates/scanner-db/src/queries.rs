use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use scanner_types::models::{Channel, FullMessage, FullReply, User};

use crate::Database;

impl Database {
    // -- Channels --

    pub fn create_channel(&self, name: &str, title: &str, image_url: &str) -> Result<i64> {
        self.with_conn_mut(|conn| create_channel(conn, name, title, image_url))
    }

    pub fn get_channel_by_name(&self, name: &str) -> Result<Option<Channel>> {
        self.with_conn(|conn| get_channel_by_name(conn, name))
    }

    pub fn get_channels_page(&self, limit: i64, offset: i64) -> Result<Vec<Channel>> {
        self.with_conn(|conn| channels_page(conn, limit, offset))
    }

    pub fn count_channels(&self) -> Result<i64> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM channels", [], |row| row.get(0))
                .context("count channels")
        })
    }

    // -- Users --

    pub fn create_user(&self, username: &str, fullname: &str, image_url: &str) -> Result<i64> {
        self.with_conn_mut(|conn| create_user(conn, username, fullname, image_url))
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.with_conn(|conn| get_user_by_username(conn, username))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, fullname, image_url FROM tg_users WHERE id = ?1",
                [id],
                user_from_row,
            )
            .optional()
            .context("get user by id")
        })
    }

    // -- Messages --

    pub fn create_message(
        &self,
        channel_id: i64,
        user_id: i64,
        title: &str,
        message_url: &str,
        image_url: &str,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            create_message(conn, channel_id, user_id, title, message_url, image_url)
        })
    }

    pub fn count_messages(&self) -> Result<i64> {
        self.with_conn(|conn| {
            conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))
                .context("count messages")
        })
    }

    pub fn count_messages_by_channel(&self, channel_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM messages WHERE channel_id = ?1",
                [channel_id],
                |row| row.get(0),
            )
            .context("count messages by channel")
        })
    }

    pub fn get_full_messages_page(&self, limit: i64, offset: i64) -> Result<Vec<FullMessage>> {
        self.with_conn(|conn| {
            let sql = format!("{FULL_MESSAGE_SELECT} ORDER BY m.id DESC LIMIT ?1 OFFSET ?2");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![limit, offset], full_message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("get full messages page")?;
            Ok(rows)
        })
    }

    pub fn get_full_messages_by_channel(
        &self,
        channel_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FullMessage>> {
        self.with_conn(|conn| {
            let sql = format!(
                "{FULL_MESSAGE_SELECT} WHERE m.channel_id = ?1 ORDER BY m.id DESC LIMIT ?2 OFFSET ?3"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params![channel_id, limit, offset], full_message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("get full messages by channel")?;
            Ok(rows)
        })
    }

    pub fn get_full_messages_by_user(&self, user_id: i64) -> Result<Vec<FullMessage>> {
        self.with_conn(|conn| {
            let sql = format!("{FULL_MESSAGE_SELECT} WHERE m.user_id = ?1 ORDER BY m.id DESC");
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], full_message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("get full messages by user")?;
            Ok(rows)
        })
    }

    pub fn get_full_message_by_id(&self, id: i64) -> Result<Option<FullMessage>> {
        self.with_conn(|conn| {
            let sql = format!("{FULL_MESSAGE_SELECT} WHERE m.id = ?1");
            conn.query_row(&sql, [id], full_message_from_row)
                .optional()
                .context("get full message by id")
        })
    }

    // -- Replies --

    pub fn create_reply(
        &self,
        message_id: i64,
        user_id: i64,
        title: &str,
        image_url: &str,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| create_reply(conn, message_id, user_id, title, image_url))
    }

    pub fn get_full_replies_by_message(&self, message_id: i64) -> Result<Vec<FullReply>> {
        self.with_conn(|conn| full_replies_by_message(conn, message_id))
    }
}

// JOIN channels and authors in a single query, reply count as a subselect
const FULL_MESSAGE_SELECT: &str = "
    SELECT m.id, m.title, m.message_url, m.image_url,
           c.id, c.name, c.title, c.image_url,
           u.id, u.fullname, u.image_url,
           (SELECT COUNT(*) FROM replies r WHERE r.message_id = m.id)
    FROM messages m
    JOIN channels c ON c.id = m.channel_id
    JOIN tg_users u ON u.id = m.user_id";

pub fn create_channel(conn: &Connection, name: &str, title: &str, image_url: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO channels (name, title, image_url) VALUES (?1, ?2, ?3)",
        params![name, title, image_url],
    )
    .with_context(|| format!("create channel {name:?}"))?;
    Ok(conn.last_insert_rowid())
}

pub fn get_channel_by_name(conn: &Connection, name: &str) -> Result<Option<Channel>> {
    conn.query_row(
        "SELECT id, name, title, image_url FROM channels WHERE name = ?1",
        [name],
        channel_from_row,
    )
    .optional()
    .with_context(|| format!("get channel by name {name:?}"))
}

pub fn update_channel_display(
    conn: &Connection,
    id: i64,
    title: &str,
    image_url: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE channels SET title = ?2, image_url = ?3 WHERE id = ?1",
        params![id, title, image_url],
    )
    .with_context(|| format!("update channel {id}"))?;
    Ok(())
}

pub fn channels_page(conn: &Connection, limit: i64, offset: i64) -> Result<Vec<Channel>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, title, image_url FROM channels ORDER BY id LIMIT ?1 OFFSET ?2",
    )?;
    let rows = stmt
        .query_map(params![limit, offset], channel_from_row)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("get channels page")?;
    Ok(rows)
}

pub fn create_user(conn: &Connection, username: &str, fullname: &str, image_url: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO tg_users (username, fullname, image_url) VALUES (?1, ?2, ?3)",
        params![username, fullname, image_url],
    )
    .with_context(|| format!("create user {username:?}"))?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    conn.query_row(
        "SELECT id, username, fullname, image_url FROM tg_users WHERE username = ?1",
        [username],
        user_from_row,
    )
    .optional()
    .with_context(|| format!("get user by username {username:?}"))
}

pub fn update_user_display(
    conn: &Connection,
    id: i64,
    fullname: &str,
    image_url: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE tg_users SET fullname = ?2, image_url = ?3 WHERE id = ?1",
        params![id, fullname, image_url],
    )
    .with_context(|| format!("update user {id}"))?;
    Ok(())
}

pub fn create_message(
    conn: &Connection,
    channel_id: i64,
    user_id: i64,
    title: &str,
    message_url: &str,
    image_url: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO messages (channel_id, user_id, title, message_url, image_url)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![channel_id, user_id, title, message_url, image_url],
    )
    .with_context(|| format!("create message {message_url:?}"))?;
    Ok(conn.last_insert_rowid())
}

pub fn create_reply(
    conn: &Connection,
    message_id: i64,
    user_id: i64,
    title: &str,
    image_url: &str,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO replies (message_id, user_id, title, image_url) VALUES (?1, ?2, ?3, ?4)",
        params![message_id, user_id, title, image_url],
    )
    .with_context(|| format!("create reply for message {message_id}"))?;
    Ok(conn.last_insert_rowid())
}

pub fn full_replies_by_message(conn: &Connection, message_id: i64) -> Result<Vec<FullReply>> {
    let mut stmt = conn.prepare(
        "SELECT r.id, r.message_id, r.title, r.image_url, u.id, u.fullname, u.image_url
         FROM replies r
         JOIN tg_users u ON u.id = r.user_id
         WHERE r.message_id = ?1
         ORDER BY r.id DESC",
    )?;
    let rows = stmt
        .query_map([message_id], |row| {
            Ok(FullReply {
                id: row.get(0)?,
                message_id: row.get(1)?,
                title: row.get(2)?,
                image_url: row.get(3)?,
                user_id: row.get(4)?,
                user_fullname: row.get(5)?,
                user_image_url: row.get(6)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("get full replies by message")?;
    Ok(rows)
}

fn channel_from_row(row: &Row<'_>) -> rusqlite::Result<Channel> {
    Ok(Channel {
        id: row.get(0)?,
        name: row.get(1)?,
        title: row.get(2)?,
        image_url: row.get(3)?,
    })
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        fullname: row.get(2)?,
        image_url: row.get(3)?,
    })
}

fn full_message_from_row(row: &Row<'_>) -> rusqlite::Result<FullMessage> {
    Ok(FullMessage {
        id: row.get(0)?,
        title: row.get(1)?,
        message_url: row.get(2)?,
        message_image_url: row.get(3)?,
        channel_id: row.get(4)?,
        channel_name: row.get(5)?,
        channel_title: row.get(6)?,
        channel_image_url: row.get(7)?,
        user_id: row.get(8)?,
        user_fullname: row.get(9)?,
        user_image_url: row.get(10)?,
        replies_count: row.get(11)?,
        replies: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(db: &Database) -> (i64, i64) {
        let channel = db.create_channel("rust_ua", "Rust UA", "c.png").unwrap();
        let user = db.create_user("ivan", "Ivan P", "u.png").unwrap();
        (channel, user)
    }

    #[test]
    fn full_message_joins_channel_author_and_reply_count() {
        let db = Database::open_in_memory().unwrap();
        let (channel, user) = seed(&db);

        let id = db.create_message(channel, user, "hello", "https://t.me/1", "m.png").unwrap();
        db.create_reply(id, user, "first", "").unwrap();
        db.create_reply(id, user, "second", "").unwrap();

        let msg = db.get_full_message_by_id(id).unwrap().unwrap();
        assert_eq!(msg.title, "hello");
        assert_eq!(msg.channel_name, "rust_ua");
        assert_eq!(msg.channel_title, "Rust UA");
        assert_eq!(msg.user_fullname, "Ivan P");
        assert_eq!(msg.replies_count, 2);
        assert!(msg.replies.is_empty());

        let replies = db.get_full_replies_by_message(id).unwrap();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].title, "second");
    }

    #[test]
    fn message_pages_are_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let (channel, user) = seed(&db);
        for i in 0..15 {
            db.create_message(channel, user, &format!("m{i}"), "", "").unwrap();
        }

        let first = db.get_full_messages_page(10, 0).unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first[0].title, "m14");

        let second = db.get_full_messages_page(10, 10).unwrap();
        assert_eq!(second.len(), 5);
        assert_eq!(second[4].title, "m0");

        assert!(db.get_full_messages_page(10, 1000).unwrap().is_empty());
    }

    #[test]
    fn filters_by_channel_and_user() {
        let db = Database::open_in_memory().unwrap();
        let (rust, ivan) = seed(&db);
        let go = db.create_channel("go_go", "", "").unwrap();
        let olga = db.create_user("olga", "", "").unwrap();

        db.create_message(rust, ivan, "a", "", "").unwrap();
        db.create_message(go, olga, "b", "", "").unwrap();
        db.create_message(go, ivan, "c", "", "").unwrap();

        assert_eq!(db.get_full_messages_by_channel(go, 10, 0).unwrap().len(), 2);
        assert_eq!(db.count_messages_by_channel(go).unwrap(), 2);
        assert_eq!(db.get_full_messages_by_user(ivan).unwrap().len(), 2);
        assert_eq!(db.count_messages().unwrap(), 3);
    }

    #[test]
    fn message_requires_live_channel_and_user() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.create_message(42, 43, "orphan", "", "").is_err());
    }

    #[test]
    fn missing_rows_are_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_channel_by_name("nope").unwrap().is_none());
        assert!(db.get_user_by_username("nope").unwrap().is_none());
        assert!(db.get_user_by_id(7).unwrap().is_none());
        assert!(db.get_full_message_by_id(7).unwrap().is_none());
    }
}
