//! Tehillim Bot - Main Entry Point
//!
//! A Telegram bot for reading Tehillim sequentially with a persistent
//! bookmark and the traditional weekly/monthly reading schedules.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use teloxide::Bot;
use tokio::sync::RwLock;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use tehillim_bot::commands::CommandHandler;
use tehillim_bot::config::BotSettings;
use tehillim_bot::storage::BookmarkStore;
use tehillim_bot::texts::{TextStore, write_parts_template};

/// Telegram bot for sequential Tehillim reading.
#[derive(Parser, Debug)]
#[command(name = "tehillim_bot")]
#[command(about = "Read Tehillim chapter by chapter over Telegram")]
#[command(version)]
struct Args {
    /// Path to the .env file for environment variables.
    #[arg(long, default_value = ".env")]
    env_file: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Write the Psalm 119 parts template (if absent) and exit.
    #[arg(long)]
    write_parts_template: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    init_logging(&args.log_level);

    // Load environment variables
    if let Err(e) = dotenvy::from_filename(&args.env_file) {
        debug!("Could not load .env file ({}): {}", args.env_file, e);
    }

    // Template generation needs only the parts path, not a bot token.
    if args.write_parts_template {
        let parts_path = std::env::var("PS119_PARTS_PATH")
            .map_or_else(|_| "data/psalm119_parts.json".into(), PathBuf::from);
        return generate_parts_template(&parts_path);
    }

    let settings = BotSettings::from_env().context("Failed to load settings from environment")?;

    // Load the chapter texts; an empty store only means /load_texts has not
    // run yet, so it is not fatal.
    let texts = TextStore::load(&settings.data_path, &settings.parts_path)
        .context("Failed to load text files")?;
    info!(
        "Text store ready ({} chapters loaded)",
        texts.chapter_count()
    );

    let bookmarks = BookmarkStore::open(&settings.db_path)
        .context("Failed to open the bookmark database")?;

    if settings.admin_user_id.is_none() {
        info!("No ADMIN_USER_ID configured; /load_texts is disabled");
    }

    let bot = Bot::new(settings.bot_token.clone());
    let handler = Arc::new(CommandHandler::new(
        Arc::new(RwLock::new(texts)),
        Arc::new(bookmarks),
        settings,
    ));

    info!("Starting Tehillim bot...");
    tehillim_bot::bot::run(bot, handler).await;

    info!("Shut down");
    Ok(())
}

/// Initializes the logging subsystem.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Writes the Psalm 119 parts template for the admin to fill in.
fn generate_parts_template(parts_path: &Path) -> Result<()> {
    let written =
        write_parts_template(parts_path).context("Failed to write the parts template")?;

    if written {
        println!("✓ Parts template written to: {}", parts_path.display());
        println!("\nPaste the four traditional parts of Psalm 119 into it");
        println!("(keys 25-28, one part per monthly reading day).");
    } else {
        println!("Parts file already exists: {}", parts_path.display());
    }

    Ok(())
}
