//! In-memory text store backed by JSON files.

use std::collections::HashMap;
use std::path::Path;

use thiserror::Error;
use tracing::{info, warn};

use super::MAX_CHAPTER;

/// Errors that can occur while loading or validating text files.
#[derive(Debug, Error)]
pub enum TextError {
    #[error("Failed to read text file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse text file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid chapter key in text file: {0}")]
    InvalidKey(String),

    #[error("Chapter number out of range: {0} (valid: 1–{MAX_CHAPTER})")]
    OutOfRange(u32),
}

/// Read-only store of chapter texts and Psalm 119 parts.
///
/// Shared between all users; replaced wholesale after a successful
/// `/load_texts`.
#[derive(Debug, Default)]
pub struct TextStore {
    /// Chapter number → full chapter text (verse lines joined with '\n').
    chapters: HashMap<u32, String>,

    /// Monthly day (25–28) → Psalm 119 part text.
    parts: HashMap<u32, String>,
}

impl TextStore {
    /// Loads the store from the chapters file and the Psalm 119 parts file.
    ///
    /// A missing chapters file yields an empty store (the admin has not run
    /// `/load_texts` yet); a missing parts file just disables the per-day
    /// Psalm 119 split. Malformed files are real errors.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load(
        data_path: impl AsRef<Path>,
        parts_path: impl AsRef<Path>,
    ) -> Result<Self, TextError> {
        let data_path = data_path.as_ref();
        let parts_path = parts_path.as_ref();

        let chapters = if data_path.exists() {
            let map = read_keyed_file(data_path)?;
            info!(
                "Loaded Tehillim ({} chapters) from {}",
                map.len(),
                data_path.display()
            );
            map
        } else {
            warn!(
                "{} not found; starting with an empty text store",
                data_path.display()
            );
            HashMap::new()
        };

        let parts = if parts_path.exists() {
            let map = read_keyed_file(parts_path)?;
            info!("Loaded Psalm 119 parts from {}", parts_path.display());
            map
        } else {
            info!(
                "No {} found; days 25–28 will fall back to the full chapter",
                parts_path.display()
            );
            HashMap::new()
        };

        Ok(Self { chapters, parts })
    }

    /// Builds a store directly from maps (used in tests).
    #[must_use]
    pub fn from_maps(chapters: HashMap<u32, String>, parts: HashMap<u32, String>) -> Self {
        Self { chapters, parts }
    }

    /// Returns the text of a chapter, if loaded.
    #[must_use]
    pub fn chapter(&self, number: u32) -> Option<&str> {
        self.chapters.get(&number).map(String::as_str)
    }

    /// Returns the Psalm 119 part assigned to a monthly day (25–28).
    #[must_use]
    pub fn part_for_day(&self, day: u32) -> Option<&str> {
        self.parts.get(&day).map(String::as_str)
    }

    /// Number of loaded chapters.
    #[must_use]
    pub fn chapter_count(&self) -> usize {
        self.chapters.len()
    }

    /// Whether no chapter text has been loaded at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }

    /// Validates that all 150 chapters are present and non-empty.
    ///
    /// # Errors
    ///
    /// Returns the first offending chapter number.
    pub fn validate_complete(&self) -> Result<(), TextError> {
        for n in 1..=MAX_CHAPTER {
            match self.chapters.get(&n) {
                Some(text) if !text.trim().is_empty() => {}
                _ => return Err(TextError::OutOfRange(n)),
            }
        }
        Ok(())
    }
}

/// Reads a JSON object with stringified numeric keys into a map.
fn read_keyed_file(path: &Path) -> Result<HashMap<u32, String>, TextError> {
    let content = std::fs::read_to_string(path)?;
    let raw: HashMap<String, String> = serde_json::from_str(&content)?;

    let mut map = HashMap::with_capacity(raw.len());
    for (key, value) in raw {
        let number: u32 = key
            .parse()
            .map_err(|_| TextError::InvalidKey(key.clone()))?;
        map.insert(number, value);
    }
    Ok(map)
}

/// Writes an editable Psalm 119 parts template if the file does not exist.
///
/// The admin is expected to paste the four traditional parts into it.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_parts_template(path: impl AsRef<Path>) -> Result<bool, TextError> {
    let path = path.as_ref();
    if path.exists() {
        return Ok(false);
    }

    let template: std::collections::BTreeMap<String, String> = (1u32..=4)
        .map(|i| {
            (
                (24 + i).to_string(),
                format!("הדבק כאן חלק {i} של קי\"ט."),
            )
        })
        .collect();

    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(&template)?;
    std::fs::write(path, json)?;
    info!("Wrote Psalm 119 parts template to {}", path.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_store() -> TextStore {
        let chapters = (1..=MAX_CHAPTER)
            .map(|n| (n, format!("טקסט פרק {n}")))
            .collect();
        let parts = (25..=28).map(|d| (d, format!("חלק יום {d}"))).collect();
        TextStore::from_maps(chapters, parts)
    }

    #[test]
    fn test_chapter_lookup() {
        let store = sample_store();
        assert_eq!(store.chapter(1), Some("טקסט פרק 1"));
        assert_eq!(store.chapter(150), Some("טקסט פרק 150"));
        assert_eq!(store.chapter(151), None);
    }

    #[test]
    fn test_part_lookup() {
        let store = sample_store();
        assert_eq!(store.part_for_day(25), Some("חלק יום 25"));
        assert_eq!(store.part_for_day(24), None);
    }

    #[test]
    fn test_validate_complete() {
        assert!(sample_store().validate_complete().is_ok());

        let mut chapters: HashMap<u32, String> = (1..=MAX_CHAPTER)
            .map(|n| (n, "x".to_owned()))
            .collect();
        chapters.remove(&42);
        let store = TextStore::from_maps(chapters, HashMap::new());
        assert!(matches!(
            store.validate_complete(),
            Err(TextError::OutOfRange(42))
        ));
    }

    #[test]
    fn test_load_missing_files_yields_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = TextStore::load(
            dir.path().join("tehillim.json"),
            dir.path().join("psalm119_parts.json"),
        )
        .unwrap();
        assert!(store.is_empty());
        assert_eq!(store.part_for_day(25), None);
    }

    #[test]
    fn test_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("tehillim.json");
        std::fs::write(&data_path, r#"{"1": "אשרי האיש", "2": "למה רגשו"}"#).unwrap();

        let store = TextStore::load(&data_path, dir.path().join("missing.json")).unwrap();
        assert_eq!(store.chapter_count(), 2);
        assert_eq!(store.chapter(1), Some("אשרי האיש"));
    }

    #[test]
    fn test_load_rejects_bad_keys() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("tehillim.json");
        std::fs::write(&data_path, r#"{"abc": "text"}"#).unwrap();

        let err = TextStore::load(&data_path, dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, TextError::InvalidKey(k) if k == "abc"));
    }

    #[test]
    fn test_parts_template_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("psalm119_parts.json");

        assert!(write_parts_template(&path).unwrap());
        let content = std::fs::read_to_string(&path).unwrap();
        for day in 25..=28 {
            assert!(content.contains(&format!("\"{day}\"")));
        }

        // Second call leaves the (possibly edited) file alone.
        assert!(!write_parts_template(&path).unwrap());
    }
}
