use anyhow::{Result, anyhow};
use rusqlite::Connection;
use scanner_db::{is_unique_violation, queries};
use tracing::debug;

/// What a re-sighting of a known channel or user does to its display fields
/// (channel title/image, user full name/image).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefreshPolicy {
    /// Rows are never written after creation; re-sightings only reuse the id.
    #[default]
    Keep,
    /// A re-sighting fills display fields that are still empty and leaves
    /// the others alone.
    FillBlanks,
    /// Every sighting that carries a non-empty value overwrites the stored one.
    LastWriteWins,
}

impl RefreshPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "keep" | "first-write-wins" | "first" => Some(Self::Keep),
            "fill-blanks" | "fill" => Some(Self::FillBlanks),
            "last-write-wins" | "last" => Some(Self::LastWriteWins),
            _ => None,
        }
    }

    /// Value to store for one field, or `None` to leave it alone.
    fn merge<'a>(&self, stored: &str, incoming: &'a str) -> Option<&'a str> {
        if incoming.is_empty() || incoming == stored {
            return None;
        }
        match self {
            Self::Keep => None,
            Self::FillBlanks if stored.is_empty() => Some(incoming),
            Self::FillBlanks => None,
            Self::LastWriteWins => Some(incoming),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolved {
    pub id: i64,
    pub created: bool,
}

/// Find-by-natural-key, else create, for channels (by name) and users (by username).
///
/// Works on a borrowed connection so a caller can run several resolutions and
/// the writes that depend on them inside one transaction.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntityResolver {
    policy: RefreshPolicy,
}

impl EntityResolver {
    pub fn new(policy: RefreshPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> RefreshPolicy {
        self.policy
    }

    pub fn resolve_channel(
        &self,
        conn: &Connection,
        name: &str,
        title: &str,
        image_url: &str,
    ) -> Result<Resolved> {
        if let Some(existing) = queries::get_channel_by_name(conn, name)? {
            let new_title = self.policy.merge(&existing.title, title);
            let new_image = self.policy.merge(&existing.image_url, image_url);
            if new_title.is_some() || new_image.is_some() {
                queries::update_channel_display(
                    conn,
                    existing.id,
                    new_title.unwrap_or(existing.title.as_str()),
                    new_image.unwrap_or(existing.image_url.as_str()),
                )?;
                debug!(channel = name, id = existing.id, "refreshed channel display fields");
            }
            return Ok(Resolved { id: existing.id, created: false });
        }

        insert_channel_or_reread(conn, name, title, image_url)
    }

    pub fn resolve_user(
        &self,
        conn: &Connection,
        username: &str,
        fullname: &str,
        image_url: &str,
    ) -> Result<Resolved> {
        if let Some(existing) = queries::get_user_by_username(conn, username)? {
            let new_fullname = self.policy.merge(&existing.fullname, fullname);
            let new_image = self.policy.merge(&existing.image_url, image_url);
            if new_fullname.is_some() || new_image.is_some() {
                queries::update_user_display(
                    conn,
                    existing.id,
                    new_fullname.unwrap_or(existing.fullname.as_str()),
                    new_image.unwrap_or(existing.image_url.as_str()),
                )?;
                debug!(user = username, id = existing.id, "refreshed user display fields");
            }
            return Ok(Resolved { id: existing.id, created: false });
        }

        insert_user_or_reread(conn, username, fullname, image_url)
    }
}

// Lookup missed. A concurrent writer may still insert the same key first; in
// that case the insert hits the UNIQUE constraint and the winner's row is used.

fn insert_channel_or_reread(
    conn: &Connection,
    name: &str,
    title: &str,
    image_url: &str,
) -> Result<Resolved> {
    match queries::create_channel(conn, name, title, image_url) {
        Ok(id) => {
            debug!(channel = name, id, "created channel");
            Ok(Resolved { id, created: true })
        }
        Err(e) if is_unique_violation(&e) => {
            let existing = queries::get_channel_by_name(conn, name)?
                .ok_or_else(|| anyhow!("channel {name:?} conflicted on insert but is not readable"))?;
            debug!(channel = name, id = existing.id, "lost channel insert race, reusing row");
            Ok(Resolved { id: existing.id, created: false })
        }
        Err(e) => Err(e),
    }
}

fn insert_user_or_reread(
    conn: &Connection,
    username: &str,
    fullname: &str,
    image_url: &str,
) -> Result<Resolved> {
    match queries::create_user(conn, username, fullname, image_url) {
        Ok(id) => {
            debug!(user = username, id, "created user");
            Ok(Resolved { id, created: true })
        }
        Err(e) if is_unique_violation(&e) => {
            let existing = queries::get_user_by_username(conn, username)?
                .ok_or_else(|| anyhow!("user {username:?} conflicted on insert but is not readable"))?;
            debug!(user = username, id = existing.id, "lost user insert race, reusing row");
            Ok(Resolved { id: existing.id, created: false })
        }
        Err(e) => Err(e),
    }
}
