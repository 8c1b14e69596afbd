//! One-shot downloader for the canonical Tehillim text.
//!
//! Fetches all 150 chapters from the Sefaria API, cleans the HTML markup out
//! of each verse, numbers the verses with Hebrew numerals and writes the
//! result to the chapters file. The write is all-or-nothing: the new file is
//! assembled in memory and swapped in with a rename, so a mid-run failure
//! never leaves a partially updated file behind.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::OnceLock;
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

use super::MAX_CHAPTER;
use super::store::write_parts_template;

/// Sefaria text endpoint; `{n}` is the chapter number.
const API_BASE: &str = "https://www.sefaria.org/api/texts";

/// Per-request timeout, matching what Sefaria comfortably serves.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Errors that can occur while downloading or persisting texts.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to fetch from Sefaria: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Sefaria returned no Hebrew verses for chapter {0}")]
    EmptyChapter(u32),

    #[error("Failed to write text file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize texts: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Relevant slice of a Sefaria `texts` API response.
#[derive(Debug, Deserialize)]
struct SefariaResponse {
    /// Hebrew verses of the requested chapter.
    #[serde(default)]
    he: Vec<String>,
}

/// Downloads and assembles the canonical text.
pub struct TextLoader {
    http: reqwest::Client,
    api_base: String,
}

impl TextLoader {
    /// Creates a loader with a default HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn new() -> Result<Self, LoadError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            api_base: API_BASE.to_owned(),
        })
    }

    /// Fetches a single chapter and renders it as numbered verse lines.
    ///
    /// # Errors
    ///
    /// Returns an error on network failure or if the response holds no
    /// Hebrew verses.
    pub async fn fetch_chapter(&self, number: u32) -> Result<String, LoadError> {
        let url = format!("{}/Psalms.{number}?lang=he", self.api_base);
        debug!("Fetching chapter {} from {}", number, url);

        let response: SefariaResponse = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.he.is_empty() {
            return Err(LoadError::EmptyChapter(number));
        }

        let lines: Vec<String> = response
            .he
            .iter()
            .enumerate()
            .map(|(i, verse)| {
                let numeral = to_hebrew_numeral(i as u32 + 1);
                format!("{numeral}. {}", clean_verse(verse))
            })
            .collect();

        Ok(lines.join("\n").trim().to_owned())
    }

    /// Fetches chapters 1–150 into an ordered map.
    ///
    /// # Errors
    ///
    /// Fails on the first chapter that cannot be fetched; nothing is written
    /// to disk by this method.
    pub async fn fetch_all(&self) -> Result<BTreeMap<u32, String>, LoadError> {
        let mut chapters = BTreeMap::new();
        for n in 1..=MAX_CHAPTER {
            chapters.insert(n, self.fetch_chapter(n).await?);
            if n % 25 == 0 {
                info!("Fetched {}/{} chapters", n, MAX_CHAPTER);
            }
        }
        Ok(chapters)
    }

    /// Fetches everything and persists it.
    ///
    /// Only after all 150 chapters have been fetched is the chapters file
    /// replaced; the Psalm 119 parts template is then created if absent.
    /// Returns the number of chapters written.
    ///
    /// # Errors
    ///
    /// Returns an error on fetch or write failure; the existing chapters
    /// file is left untouched in either case.
    pub async fn download_to(
        &self,
        data_path: impl AsRef<Path>,
        parts_path: impl AsRef<Path>,
    ) -> Result<usize, LoadError> {
        let data_path = data_path.as_ref();

        let chapters = self.fetch_all().await?;
        let json = serde_json::to_string_pretty(&chapters)?;
        write_atomic(data_path, &json)?;
        info!(
            "Wrote {} chapters to {}",
            chapters.len(),
            data_path.display()
        );

        if write_parts_template(&parts_path).map_err(io_from_text_error)? {
            info!("Created Psalm 119 parts template; fill it in manually");
        }

        Ok(chapters.len())
    }
}

/// Maps template-write errors into this module's error type.
fn io_from_text_error(err: super::TextError) -> LoadError {
    match err {
        super::TextError::Io(e) => LoadError::Io(e),
        other => LoadError::Io(std::io::Error::other(other.to_string())),
    }
}

/// Writes `content` to `path` via a temporary sibling file and a rename.
fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);

    std::fs::write(&tmp, content)?;
    std::fs::rename(&tmp, path)
}

/// Strips Sefaria's HTML markup and cantillation marks from a verse.
///
/// `<br>` tags become newlines, remaining tags are dropped, HTML entities
/// are decoded, ta'amei hamikra (U+0591–U+05AF and friends) are removed and
/// exotic spaces are normalized.
fn clean_verse(raw: &str) -> String {
    static BR_RE: OnceLock<Regex> = OnceLock::new();
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    static CANTILLATION_RE: OnceLock<Regex> = OnceLock::new();
    static SPACE_RE: OnceLock<Regex> = OnceLock::new();

    let br = BR_RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
    let tag = TAG_RE.get_or_init(|| Regex::new(r"<[^>]+>").unwrap());
    let cantillation = CANTILLATION_RE
        .get_or_init(|| Regex::new("[\u{0591}-\u{05AF}\u{05BD}\u{05BF}]").unwrap());
    let spaces = SPACE_RE.get_or_init(|| Regex::new(r"[ \t]+").unwrap());

    let text = br.replace_all(raw, "\n");
    let text = tag.replace_all(&text, "");
    let text = html_unescape(&text);
    let text = cantillation.replace_all(&text, "");
    let text = text
        .replace('\u{2009}', " ") // thin space
        .replace('\u{200a}', " ") // hair space
        .replace('\u{202f}', " ") // narrow no-break space
        .replace('\u{a0}', " "); // non-breaking space
    let text = spaces.replace_all(&text, " ");

    text.lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_owned()
}

/// Decodes the handful of HTML entities Sefaria actually emits.
fn html_unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        rest = &rest[start..];

        let Some(end) = rest.find(';') else {
            break;
        };
        let entity = &rest[1..end];
        let decoded = match entity {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" | "#39" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            "thinsp" => Some('\u{2009}'),
            _ => entity
                .strip_prefix('#')
                .and_then(|num| {
                    num.strip_prefix('x')
                        .or_else(|| num.strip_prefix('X'))
                        .map_or_else(|| num.parse::<u32>().ok(), |hex| {
                            u32::from_str_radix(hex, 16).ok()
                        })
                })
                .and_then(char::from_u32),
        };

        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &rest[end + 1..];
            }
            None => {
                // Not a recognized entity; keep the ampersand literally.
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

/// Renders a chapter or verse number as a Hebrew numeral.
///
/// 15 and 16 use the traditional טו/טז forms to avoid spelling the divine
/// name.
#[must_use]
pub fn to_hebrew_numeral(n: u32) -> String {
    const UNITS: [&str; 10] = ["", "א", "ב", "ג", "ד", "ה", "ו", "ז", "ח", "ט"];
    const TENS: [&str; 10] = ["", "י", "כ", "ל", "מ", "נ", "ס", "ע", "פ", "צ"];
    const HUNDREDS: [&str; 5] = ["", "ק", "ר", "ש", "ת"];

    if n == 0 || n > 499 {
        return n.to_string();
    }

    let mut parts = String::new();
    parts.push_str(HUNDREDS[(n / 100) as usize]);

    let mut rem = n % 100;
    if rem == 15 {
        parts.push_str("טו");
        rem = 0;
    } else if rem == 16 {
        parts.push_str("טז");
        rem = 0;
    }

    parts.push_str(TENS[(rem / 10) as usize]);
    parts.push_str(UNITS[(rem % 10) as usize]);

    if parts.is_empty() {
        "א".to_owned()
    } else {
        parts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hebrew_numeral_basic() {
        assert_eq!(to_hebrew_numeral(1), "א");
        assert_eq!(to_hebrew_numeral(9), "ט");
        assert_eq!(to_hebrew_numeral(10), "י");
        assert_eq!(to_hebrew_numeral(23), "כג");
        assert_eq!(to_hebrew_numeral(100), "ק");
        assert_eq!(to_hebrew_numeral(119), "קיט");
        assert_eq!(to_hebrew_numeral(150), "קנ");
    }

    #[test]
    fn test_hebrew_numeral_divine_name_avoidance() {
        assert_eq!(to_hebrew_numeral(15), "טו");
        assert_eq!(to_hebrew_numeral(16), "טז");
        assert_eq!(to_hebrew_numeral(115), "קטו");
        assert_eq!(to_hebrew_numeral(116), "קטז");
    }

    #[test]
    fn test_hebrew_numeral_out_of_range_falls_back() {
        assert_eq!(to_hebrew_numeral(0), "0");
        assert_eq!(to_hebrew_numeral(500), "500");
    }

    #[test]
    fn test_clean_verse_strips_tags_and_br() {
        assert_eq!(
            clean_verse("שורה ראשונה<br/>שורה <b>שנייה</b>"),
            "שורה ראשונה\nשורה שנייה"
        );
    }

    #[test]
    fn test_clean_verse_decodes_entities() {
        assert_eq!(clean_verse("א&thinsp;ב&nbsp;ג"), "א ב ג");
        assert_eq!(clean_verse("a &amp; b"), "a & b");
    }

    #[test]
    fn test_clean_verse_removes_cantillation() {
        // Shema with an etnachta (U+0591) and a meteg (U+05BD).
        assert_eq!(clean_verse("שְׁמַ\u{0591}ע יִ\u{05BD}שְׂרָאֵל"), "שְׁמַע יִשְׂרָאֵל");
    }

    #[test]
    fn test_clean_verse_collapses_spaces() {
        assert_eq!(clean_verse("מילה   אחת\t שתיים  "), "מילה אחת שתיים");
    }

    #[test]
    fn test_html_unescape_numeric() {
        assert_eq!(html_unescape("&#1488;"), "א");
        assert_eq!(html_unescape("&#x5D0;"), "א");
        assert_eq!(html_unescape("no entities"), "no entities");
        assert_eq!(html_unescape("broken &entity"), "broken &entity");
    }

    #[test]
    fn test_write_atomic_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("tehillim.json");

        write_atomic(&path, "first").unwrap();
        write_atomic(&path, "second").unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "second");
        assert!(!path.with_extension("json.tmp").exists());
    }
}
