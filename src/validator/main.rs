//! Standalone validator for the Tehillim data files.
//!
//! Checks that a chapters file parses, covers all 150 chapters with
//! non-empty text, and (optionally) that the Psalm 119 parts file has the
//! four reading-day entries.

use std::process::ExitCode;

use clap::Parser;

use tehillim_bot::texts::{MAX_CHAPTER, TextStore};

/// Tehillim data file validator.
#[derive(Parser, Debug)]
#[command(name = "validate_texts")]
#[command(about = "Validates the chapter and Psalm 119 parts files for the Tehillim bot")]
#[command(version)]
struct Args {
    /// Path to the chapters JSON file to validate.
    #[arg(short, long, default_value = "data/tehillim.json")]
    file: String,

    /// Path to the Psalm 119 parts JSON file.
    #[arg(short, long, default_value = "data/psalm119_parts.json")]
    parts: String,

    /// Show per-chapter detail.
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();

    println!("Validating: {}", args.file);

    let store = match TextStore::load(&args.file, &args.parts) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("✗ Failed to load data files: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut missing = Vec::new();
    let mut empty = Vec::new();

    for n in 1..=MAX_CHAPTER {
        match store.chapter(n) {
            None => missing.push(n),
            Some(text) if text.trim().is_empty() => empty.push(n),
            Some(text) => {
                if args.verbose {
                    let lines = text.lines().count();
                    println!("  פרק {n}: {lines} verses, {} chars", text.chars().count());
                }
            }
        }
    }

    let mut part_days_missing = Vec::new();
    for day in 25..=28 {
        if store.part_for_day(day).is_none() {
            part_days_missing.push(day);
        }
    }

    println!();

    if missing.is_empty() && empty.is_empty() {
        println!("✓ All {MAX_CHAPTER} chapters are present and non-empty");
    } else {
        if !missing.is_empty() {
            println!("✗ Missing chapters ({}): {:?}", missing.len(), missing);
        }
        if !empty.is_empty() {
            println!("✗ Empty chapters ({}): {:?}", empty.len(), empty);
        }
    }

    if part_days_missing.is_empty() {
        println!("✓ Psalm 119 parts present for days 25-28");
    } else {
        println!(
            "⚠ Psalm 119 parts missing for days {part_days_missing:?} \
             (days 25-28 will fall back to the full chapter)"
        );
    }

    if missing.is_empty() && empty.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
