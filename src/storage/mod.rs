//! Persistent per-user reading positions.
//!
//! One SQLite row per user, surviving restarts. Positions are created on
//! first interaction and never deleted.

mod bookmarks;

pub use bookmarks::{BookmarkStore, Position, StoreError};
