use anyhow::{Context, Result};
use rusqlite::{OptionalExtension, params};

use crate::Database;
use crate::models::{SavedRow, WebUserRow};

impl Database {
    // -- Web users --

    pub fn create_web_user(&self, email: &str, password_hash: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO web_users (email, password) VALUES (?1, ?2)",
                (email, password_hash),
            )
            .context("create web user")?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_web_user_by_email(&self, email: &str) -> Result<Option<WebUserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, email, password, created_at FROM web_users WHERE email = ?1",
                [email],
                |row| {
                    Ok(WebUserRow {
                        id: row.get(0)?,
                        email: row.get(1)?,
                        password: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()
            .context("get web user by email")
        })
    }

    // -- Saved messages --

    pub fn create_saved(&self, user_id: i64, message_id: i64) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO saved (user_id, message_id) VALUES (?1, ?2)",
                params![user_id, message_id],
            )
            .context("create saved message")?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_saved_by_user(&self, user_id: i64) -> Result<Vec<SavedRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, user_id, message_id, created_at FROM saved
                 WHERE user_id = ?1
                 ORDER BY id DESC",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(SavedRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        message_id: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("get saved messages by user")?;
            Ok(rows)
        })
    }

    /// Delete a bookmark owned by `user_id`. Returns false when no such row exists.
    pub fn delete_saved(&self, id: i64, user_id: i64) -> Result<bool> {
        self.with_conn_mut(|conn| {
            let deleted = conn
                .execute(
                    "DELETE FROM saved WHERE id = ?1 AND user_id = ?2",
                    params![id, user_id],
                )
                .context("delete saved message")?;
            Ok(deleted > 0)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::Database;

    #[test]
    fn saved_messages_are_scoped_to_owner() {
        let db = Database::open_in_memory().unwrap();
        let alice = db.create_web_user("alice@test.com", "hash").unwrap();
        let bob = db.create_web_user("bob@test.com", "hash").unwrap();

        let channel = db.create_channel("rust_ua", "", "").unwrap();
        let author = db.create_user("ivan", "", "").unwrap();
        let message = db.create_message(channel, author, "hi", "", "").unwrap();

        let saved = db.create_saved(alice, message).unwrap();
        assert_eq!(db.get_saved_by_user(alice).unwrap().len(), 1);
        assert!(db.get_saved_by_user(bob).unwrap().is_empty());

        assert!(!db.delete_saved(saved, bob).unwrap());
        assert!(db.delete_saved(saved, alice).unwrap());
        assert!(db.get_saved_by_user(alice).unwrap().is_empty());
    }

    #[test]
    fn web_user_email_is_unique() {
        let db = Database::open_in_memory().unwrap();
        db.create_web_user("alice@test.com", "hash").unwrap();
        let err = db.create_web_user("alice@test.com", "other").unwrap_err();
        assert!(crate::is_unique_violation(&err));

        let row = db.get_web_user_by_email("alice@test.com").unwrap().unwrap();
        assert_eq!(row.password, "hash");
    }
}
