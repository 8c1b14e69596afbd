//! Configuration module for the Tehillim bot.
//!
//! All settings come from the environment (optionally via a `.env` file):
//! bot token, data file locations, timezone offset and the admin user id
//! that gates `/load_texts`.

mod settings;

pub use settings::{BotSettings, ConfigError};
