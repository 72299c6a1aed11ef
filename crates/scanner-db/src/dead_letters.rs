use anyhow::{Context, Result};
use rusqlite::params;

use crate::Database;
use crate::models::DeadLetterRow;

impl Database {
    /// Park a payload the ingestion side gave up on.
    pub fn insert_dead_letter(
        &self,
        topic: &str,
        partition: i32,
        offset: i64,
        payload: &[u8],
        reason: &str,
    ) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO dead_letters (topic, queue_partition, queue_offset, payload, reason)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![topic, partition, offset, payload, reason],
            )
            .context("insert dead letter")?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_dead_letters(&self, topic: &str, limit: i64) -> Result<Vec<DeadLetterRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, topic, queue_partition, queue_offset, payload, reason, created_at
                 FROM dead_letters
                 WHERE topic = ?1
                 ORDER BY id
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(params![topic, limit], |row| {
                    Ok(DeadLetterRow {
                        id: row.get(0)?,
                        topic: row.get(1)?,
                        partition: row.get(2)?,
                        offset: row.get(3)?,
                        payload: row.get(4)?,
                        reason: row.get(5)?,
                        created_at: row.get(6)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("get dead letters")?;
            Ok(rows)
        })
    }
}
