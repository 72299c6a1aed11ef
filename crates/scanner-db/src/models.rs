//! Database row types for the tables that carry timestamps or secrets.
//! Channel, user and message reads map straight to scanner-types models.

pub struct WebUserRow {
    pub id: i64,
    pub email: String,
    pub password: String,
    pub created_at: String,
}

pub struct SavedRow {
    pub id: i64,
    pub user_id: i64,
    pub message_id: i64,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct DeadLetterRow {
    pub id: i64,
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    pub payload: Vec<u8>,
    pub reason: String,
    pub created_at: String,
}
