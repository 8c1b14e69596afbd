//! Application settings loaded from the environment.

use std::path::PathBuf;

use chrono::{FixedOffset, NaiveDate, Utc};

/// Default UTC offset for deciding "today" (Israel standard time).
const DEFAULT_TZ_OFFSET_HOURS: i32 = 3;

/// Bot settings.
#[derive(Debug, Clone)]
pub struct BotSettings {
    /// Telegram Bot API token.
    pub bot_token: String,

    /// Path to the chapters JSON file.
    pub data_path: PathBuf,

    /// Path to the Psalm 119 parts JSON file.
    pub parts_path: PathBuf,

    /// Path to the bookmarks SQLite database.
    pub db_path: PathBuf,

    /// Fixed UTC offset used to compute the local date for schedules.
    pub tz_offset: FixedOffset,

    /// User id allowed to run `/load_texts`. `None` disables the command.
    pub admin_user_id: Option<i64>,
}

impl BotSettings {
    /// Creates settings from environment variables.
    ///
    /// Expects `BOT_TOKEN` to be set; everything else has defaults
    /// (`DATA_PATH`, `PS119_PARTS_PATH`, `DB_PATH`, `TZ_OFFSET_HOURS`,
    /// `ADMIN_USER_ID`).
    ///
    /// # Errors
    ///
    /// Returns an error if `BOT_TOKEN` is missing or a value is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bot_token =
            std::env::var("BOT_TOKEN").map_err(|_| ConfigError::MissingEnvVar("BOT_TOKEN"))?;

        let data_path = std::env::var("DATA_PATH")
            .map_or_else(|_| PathBuf::from("data/tehillim.json"), PathBuf::from);
        let parts_path = std::env::var("PS119_PARTS_PATH")
            .map_or_else(|_| PathBuf::from("data/psalm119_parts.json"), PathBuf::from);
        let db_path =
            std::env::var("DB_PATH").map_or_else(|_| PathBuf::from("bookmarks.db"), PathBuf::from);

        let offset_hours = match std::env::var("TZ_OFFSET_HOURS") {
            Ok(raw) => raw.parse().map_err(|_| ConfigError::InvalidTzOffset)?,
            Err(_) => DEFAULT_TZ_OFFSET_HOURS,
        };
        let tz_offset =
            FixedOffset::east_opt(offset_hours * 3600).ok_or(ConfigError::InvalidTzOffset)?;

        let admin_user_id = match std::env::var("ADMIN_USER_ID") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse()
                    .map_err(|_| ConfigError::InvalidAdminId)?,
            ),
            _ => None,
        };

        Ok(Self {
            bot_token,
            data_path,
            parts_path,
            db_path,
            tz_offset,
            admin_user_id,
        })
    }

    /// Today's date in the configured timezone.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.tz_offset).date_naive()
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Invalid TZ_OFFSET_HOURS (must be a whole number of hours within UTC±23)")]
    InvalidTzOffset,

    #[error("Invalid ADMIN_USER_ID (must be a numeric Telegram user id)")]
    InvalidAdminId,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(admin_user_id: Option<i64>) -> BotSettings {
        BotSettings {
            bot_token: "test-token".to_owned(),
            data_path: PathBuf::from("data/tehillim.json"),
            parts_path: PathBuf::from("data/psalm119_parts.json"),
            db_path: PathBuf::from("bookmarks.db"),
            tz_offset: FixedOffset::east_opt(3 * 3600).unwrap(),
            admin_user_id,
        }
    }

    #[test]
    fn test_offset_is_applied() {
        assert_eq!(settings(None).tz_offset.local_minus_utc(), 3 * 3600);
    }

    #[test]
    fn test_admin_id_is_optional() {
        assert_eq!(settings(Some(42)).admin_user_id, Some(42));
        assert_eq!(settings(None).admin_user_id, None);
    }
}
