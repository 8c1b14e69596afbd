//! SQLite-backed bookmark storage.

use std::path::Path;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::info;

use crate::texts::{MAX_CHAPTER, PSALM_119};

/// Errors from the bookmark store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to create database directory: {0}")]
    Io(#[from] std::io::Error),
}

/// A user's saved reading position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    /// Chapter number, always within [1, 150].
    pub chapter: u32,

    /// Sub-part index, present only for Psalm 119.
    pub part: Option<u32>,
}

impl Position {
    /// The position every new user starts from.
    #[must_use]
    pub const fn initial() -> Self {
        Self {
            chapter: 1,
            part: None,
        }
    }
}

/// Per-user bookmark persistence.
///
/// The connection is guarded by an async mutex; each command reads or writes
/// a single row by primary key, so no further locking discipline is needed.
pub struct BookmarkStore {
    conn: Mutex<Connection>,
}

impl BookmarkStore {
    /// Opens (and if needed creates) the bookmark database.
    ///
    /// # Errors
    ///
    /// Returns an error if the file or schema cannot be created.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        info!("Opened bookmark database at {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens an in-memory store (used in tests).
    ///
    /// # Errors
    ///
    /// Returns an error if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_schema(conn: &Connection) -> Result<(), StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS bookmarks (
                user_id INTEGER PRIMARY KEY,
                chapter INTEGER NOT NULL DEFAULT 1,
                part INTEGER,
                updated_at TEXT NOT NULL
            )",
            [],
        )?;
        Ok(())
    }

    /// Returns the saved position for a user, defaulting to chapter 1.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub async fn position(&self, user_id: i64) -> Result<Position, StoreError> {
        let conn = self.conn.lock().await;
        let row = conn
            .query_row(
                "SELECT chapter, part FROM bookmarks WHERE user_id = ?1",
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, Option<i64>>(1)?,
                    ))
                },
            )
            .optional()?;

        Ok(row.map_or(Position::initial(), |(chapter, part)| Position {
            chapter: clamp_chapter(chapter),
            part: part.and_then(|p| u32::try_from(p).ok()),
        }))
    }

    /// Saves a user's position, clamping the chapter into [1, 150].
    ///
    /// The part index is dropped unless the chapter is Psalm 119, keeping
    /// the stored invariant intact no matter what the caller passes.
    ///
    /// # Errors
    ///
    /// Returns an error on database failure.
    pub async fn set_position(
        &self,
        user_id: i64,
        chapter: u32,
        part: Option<u32>,
    ) -> Result<Position, StoreError> {
        let chapter = chapter.clamp(1, MAX_CHAPTER);
        let part = if chapter == PSALM_119 { part } else { None };
        let now = Utc::now().to_rfc3339();

        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO bookmarks (user_id, chapter, part, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(user_id) DO UPDATE SET
                 chapter = excluded.chapter,
                 part = excluded.part,
                 updated_at = excluded.updated_at",
            params![user_id, i64::from(chapter), part.map(i64::from), now],
        )?;

        Ok(Position { chapter, part })
    }
}

/// Clamps a raw database value into the valid chapter range.
fn clamp_chapter(raw: i64) -> u32 {
    u32::try_from(raw.clamp(1, i64::from(MAX_CHAPTER))).unwrap_or(1)
}

impl std::fmt::Debug for BookmarkStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookmarkStore").finish_non_exhaustive()
    }
}
