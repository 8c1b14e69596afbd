//! Command types and definitions.

use teloxide::utils::command::BotCommands;

/// Commands the bot accepts over Telegram.
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "הפקודות הזמינות:")]
pub enum Command {
    /// Send the bookmarked chapter.
    #[command(description = "הצגת הפרק שבסימנייה")]
    Start,

    /// Advance the bookmark and send the next chapter.
    #[command(description = "הפרק הבא")]
    Next,

    /// Move the bookmark back and send the previous chapter.
    #[command(description = "הפרק הקודם")]
    Prev,

    /// Report the bookmarked chapter without sending its text.
    #[command(description = "איפה הסימנייה שלי")]
    Where,

    /// Jump to an explicit chapter.
    #[command(description = "קפיצה לפרק: ‎/goto <מספר>")]
    Goto(String),

    /// Today's portion of the monthly (30-day) division.
    #[command(description = "החלוקה היומית (ל' בחודש)")]
    Daily,

    /// Today's portion of the weekly division.
    #[command(description = "החלוקה השבועית")]
    Weekly,

    /// Re-download the canonical text (admin only).
    #[command(description = "משיכת הטקסטים מחדש (מנהל בלבד)")]
    LoadTexts,
}

/// Actions reachable from the inline navigation keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Prev,
    Next,
    Goto,
    Reset,
    Daily,
    Weekly,
}

impl CallbackAction {
    /// Parses a callback payload.
    #[must_use]
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "prev" => Some(Self::Prev),
            "next" => Some(Self::Next),
            "goto" => Some(Self::Goto),
            "reset" => Some(Self::Reset),
            "daily" => Some(Self::Daily),
            "weekly" => Some(Self::Weekly),
            _ => None,
        }
    }

    /// The payload string placed on the keyboard button.
    #[must_use]
    pub const fn data(self) -> &'static str {
        match self {
            Self::Prev => "prev",
            Self::Next => "next",
            Self::Goto => "goto",
            Self::Reset => "reset",
            Self::Daily => "daily",
            Self::Weekly => "weekly",
        }
    }
}

/// Result of command execution: the outbound messages, in order.
#[derive(Debug, Clone)]
pub struct CommandReply {
    /// Whether the command succeeded.
    pub success: bool,

    /// Messages to send, already split to fit the platform limit.
    pub messages: Vec<String>,

    /// Whether to attach the navigation keyboard to the last message.
    pub with_nav_keyboard: bool,
}

impl CommandReply {
    /// A successful single-message reply.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            success: true,
            messages: vec![message.into()],
            with_nav_keyboard: false,
        }
    }

    /// A successful multi-message reply ending with the navigation keyboard.
    #[must_use]
    pub fn success_with_nav(messages: Vec<String>) -> Self {
        Self {
            success: true,
            messages,
            with_nav_keyboard: true,
        }
    }

    /// An error reply shown to the user.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            messages: vec![message.into()],
            with_nav_keyboard: false,
        }
    }

    /// The first message, for convenience in tests and logging.
    #[must_use]
    pub fn first_message(&self) -> &str {
        self.messages.first().map_or("", String::as_str)
    }
}
