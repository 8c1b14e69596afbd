//! Tehillim text storage and acquisition.
//!
//! The full text lives in a JSON file keyed by chapter number, with a second
//! file holding the traditional four-way split of Psalm 119 used on days
//! 25–28 of the monthly cycle.

mod loader;
mod store;

pub use loader::{LoadError, TextLoader};
pub use store::{TextError, TextStore, write_parts_template};

/// Number of chapters in the Book of Psalms.
pub const MAX_CHAPTER: u32 = 150;

/// The one chapter long enough to be traditionally subdivided.
pub const PSALM_119: u32 = 119;
