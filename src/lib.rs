//! Tehillim Bot Library
//!
//! A Telegram bot for reading Tehillim (the Book of Psalms) sequentially.
//!
//! This crate provides the core functionality for:
//! - Loading the chapter texts and the Psalm 119 parts from disk
//! - Persisting each user's reading position across restarts
//! - Computing the traditional weekly and monthly reading portions
//! - Handling user commands and inline keyboard navigation
//! - Downloading the canonical text from Sefaria on admin request

pub mod bot;
pub mod commands;
pub mod config;
pub mod schedule;
pub mod storage;
pub mod texts;
