//! Command handling module.
//!
//! Parses and executes user commands (`/start`, `/next`, `/prev`, `/where`,
//! `/goto`, `/daily`, `/weekly`, `/load_texts`) and the inline keyboard
//! actions that mirror them.

mod handler;
mod types;

pub use handler::CommandHandler;
pub use types::{CallbackAction, Command, CommandReply};
