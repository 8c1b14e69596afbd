//! Command handler implementation.
//!
//! Executes parsed commands against the text store, the bookmark store and
//! the schedule calculator, and produces the outbound reply messages. All
//! Telegram I/O happens elsewhere, which keeps every command path testable.

use std::sync::Arc;

use chrono::NaiveDate;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use super::types::{CallbackAction, Command, CommandReply};
use crate::config::BotSettings;
use crate::schedule::{self, ChapterRange};
use crate::storage::BookmarkStore;
use crate::texts::{MAX_CHAPTER, TextLoader, TextStore};

/// Maximum characters per outbound message; chapters are split on line
/// boundaries below this, comfortably under the platform's 4096 limit.
const CHUNK_LIMIT: usize = 3500;

/// Handles bot commands and keyboard callbacks.
pub struct CommandHandler {
    /// Shared chapter texts, replaced after a successful `/load_texts`.
    texts: Arc<RwLock<TextStore>>,

    /// Per-user reading positions.
    bookmarks: Arc<BookmarkStore>,

    /// Bot settings (data paths, admin id, timezone offset).
    settings: BotSettings,
}

impl CommandHandler {
    /// Creates a new command handler.
    #[must_use]
    pub fn new(
        texts: Arc<RwLock<TextStore>>,
        bookmarks: Arc<BookmarkStore>,
        settings: BotSettings,
    ) -> Self {
        Self {
            texts,
            bookmarks,
            settings,
        }
    }

    /// Whether the given user may run `/load_texts`.
    #[must_use]
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.settings.admin_user_id == Some(user_id)
    }

    /// Executes a parsed command for a user.
    pub async fn execute(&self, user_id: i64, command: Command) -> CommandReply {
        debug!("Handling {:?} for user {}", command, user_id);

        let reply = match command {
            Command::Start => self.handle_start(user_id).await,
            Command::Next => self.handle_step(user_id, 1).await,
            Command::Prev => self.handle_step(user_id, -1).await,
            Command::Where => self.handle_where(user_id).await,
            Command::Goto(arg) => self.handle_goto(user_id, &arg).await,
            Command::Daily => self.handle_daily().await,
            Command::Weekly => self.handle_weekly().await,
            Command::LoadTexts => self.handle_load_texts(user_id).await,
        };

        info!(
            "Command done: success={}, messages={}",
            reply.success,
            reply.messages.len()
        );
        reply
    }

    /// Executes an inline keyboard action for a user.
    pub async fn execute_callback(&self, user_id: i64, action: CallbackAction) -> CommandReply {
        debug!("Handling callback {:?} for user {}", action, user_id);

        match action {
            CallbackAction::Prev => self.handle_step(user_id, -1).await,
            CallbackAction::Next => self.handle_step(user_id, 1).await,
            CallbackAction::Reset => self.handle_reset(user_id).await,
            CallbackAction::Goto => {
                CommandReply::success("כדי לקפוץ לפרק, שלח/י: ‎/goto <מספר פרק>")
            }
            CallbackAction::Daily => self.handle_daily().await,
            CallbackAction::Weekly => self.handle_weekly().await,
        }
    }

    async fn handle_start(&self, user_id: i64) -> CommandReply {
        match self.bookmarks.position(user_id).await {
            Ok(pos) => self.send_chapter(user_id, pos.chapter).await,
            Err(e) => internal_error(&e),
        }
    }

    /// Moves the bookmark one chapter, saturating at the first and last
    /// chapter (no wraparound).
    async fn handle_step(&self, user_id: i64, delta: i32) -> CommandReply {
        let pos = match self.bookmarks.position(user_id).await {
            Ok(pos) => pos,
            Err(e) => return internal_error(&e),
        };

        let target = if delta > 0 {
            (pos.chapter + 1).min(MAX_CHAPTER)
        } else {
            pos.chapter.saturating_sub(1).max(1)
        };

        self.send_chapter(user_id, target).await
    }

    async fn handle_where(&self, user_id: i64) -> CommandReply {
        match self.bookmarks.position(user_id).await {
            Ok(pos) => match pos.part {
                Some(day) => CommandReply::success(format!(
                    "הסימנייה שלך נמצאת בפרק {} (חלק יום {day}).",
                    pos.chapter
                )),
                None => CommandReply::success(format!(
                    "הסימנייה שלך נמצאת בפרק {}.",
                    pos.chapter
                )),
            },
            Err(e) => internal_error(&e),
        }
    }

    async fn handle_goto(&self, user_id: i64, arg: &str) -> CommandReply {
        let arg = arg.trim();
        if arg.is_empty() {
            return CommandReply::error("שימוש: ‎/goto <מספר פרק>");
        }

        let Ok(chapter) = arg.parse::<u32>() else {
            return CommandReply::error("אנא הזן/י מספר תקין בין 1 ל־150.");
        };

        if !(1..=MAX_CHAPTER).contains(&chapter) {
            return CommandReply::error("טווח חוקי: 1–150.");
        }

        self.send_chapter(user_id, chapter).await
    }

    async fn handle_reset(&self, user_id: i64) -> CommandReply {
        if let Err(e) = self.bookmarks.set_position(user_id, 1, None).await {
            return internal_error(&e);
        }

        let mut reply = self.send_chapter(user_id, 1).await;
        reply
            .messages
            .insert(0, "הסימנייה אופסה לפרק 1.".to_owned());
        reply
    }

    async fn handle_daily(&self) -> CommandReply {
        self.daily_for_date(self.settings.today()).await
    }

    async fn daily_for_date(&self, date: NaiveDate) -> CommandReply {
        let (day, range) = schedule::monthly_portion(date);
        let header = format!("חלוקה יומית (ל' בחודש) — יום {day}: {}\n\n", range.label());

        let texts = self.texts.read().await;

        // Days 25-28 read the traditional quarters of Psalm 119 when the
        // parts file has been filled in; otherwise the full chapter.
        if schedule::is_psalm119_day(day)
            && let Some(part) = texts.part_for_day(day)
        {
            let body = format!("{header}פרק קי\"ט — חלק יום {day}\n\n{part}");
            return CommandReply::success_with_nav(split_to_chunks(&body, CHUNK_LIMIT));
        }

        let body = format!("{header}{}", render_range(&texts, range));
        CommandReply::success_with_nav(split_to_chunks(&body, CHUNK_LIMIT))
    }

    async fn handle_weekly(&self) -> CommandReply {
        self.weekly_for_date(self.settings.today()).await
    }

    async fn weekly_for_date(&self, date: NaiveDate) -> CommandReply {
        let (weekday, range) = schedule::weekly_portion(date);
        let header = format!("חלוקה שבועית — יום {weekday}: {}\n\n", range.label());

        let texts = self.texts.read().await;
        let body = format!("{header}{}", render_range(&texts, range));
        CommandReply::success_with_nav(split_to_chunks(&body, CHUNK_LIMIT))
    }

    async fn handle_load_texts(&self, user_id: i64) -> CommandReply {
        if !self.is_admin(user_id) {
            warn!("User {} tried /load_texts without admin rights", user_id);
            return CommandReply::error("פקודה זו מיועדת למנהל בלבד.");
        }

        let loader = match TextLoader::new() {
            Ok(loader) => loader,
            Err(e) => {
                error!("Failed to build text loader: {}", e);
                return CommandReply::error(format!("שגיאה במשיכת הטקסטים: {e}"));
            }
        };

        match loader
            .download_to(&self.settings.data_path, &self.settings.parts_path)
            .await
        {
            Ok(count) => {
                match TextStore::load(&self.settings.data_path, &self.settings.parts_path) {
                    Ok(new_store) => {
                        *self.texts.write().await = new_store;
                        info!("Text store reloaded after download");
                        CommandReply::success(format!(
                            "הטקסטים נשמרו בהצלחה ({count} פרקים)."
                        ))
                    }
                    Err(e) => {
                        error!("Reload after download failed: {}", e);
                        CommandReply::error(format!(
                            "הטקסטים נשמרו אך הטעינה מחדש נכשלה: {e}"
                        ))
                    }
                }
            }
            Err(e) => {
                error!("Text download failed: {}", e);
                CommandReply::error(format!("שגיאה במשיכת הטקסטים: {e}"))
            }
        }
    }

    /// Sends a chapter to the user and moves their bookmark to it.
    async fn send_chapter(&self, user_id: i64, chapter: u32) -> CommandReply {
        let texts = self.texts.read().await;

        let Some(text) = texts.chapter(chapter) else {
            return CommandReply::error(format!(
                "פרק {chapter} חסר בקובץ הנתונים.\nבקש/י מהמנהל להריץ ‎/load_texts."
            ));
        };

        let body = format!("תהילים — פרק {chapter}\n\n{text}");

        if let Err(e) = self.bookmarks.set_position(user_id, chapter, None).await {
            return internal_error(&e);
        }

        CommandReply::success_with_nav(split_to_chunks(&body, CHUNK_LIMIT))
    }
}

impl std::fmt::Debug for CommandHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandHandler").finish_non_exhaustive()
    }
}

/// Logs a storage failure and produces the generic user-facing error.
fn internal_error(e: &dyn std::fmt::Display) -> CommandReply {
    error!("Bookmark store error: {}", e);
    CommandReply::error("אירעה שגיאה פנימית, נסה/י שוב מאוחר יותר.")
}

/// Renders a range of chapters, marking the ones with no loaded text.
fn render_range(texts: &TextStore, range: ChapterRange) -> String {
    range
        .chapters()
        .map(|ch| match texts.chapter(ch) {
            Some(text) => format!("— פרק {ch} —\n{text}\n"),
            None => format!("[חסר טקסט לפרק {ch}]\n"),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Splits a text into chunks of at most `limit` characters, breaking only
/// on line boundaries. A single line longer than the limit is kept whole.
fn split_to_chunks(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut buf = String::new();
    let mut count = 0usize;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if count + line_len > limit && !buf.is_empty() {
            chunks.push(std::mem::take(&mut buf));
            count = 0;
        }
        buf.push_str(line);
        count += line_len;
    }

    if !buf.is_empty() {
        chunks.push(buf);
    }
    if chunks.is_empty() {
        chunks.push(text.to_owned());
    }
    chunks
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::path::PathBuf;

    use chrono::{FixedOffset, NaiveDate};

    use super::*;
    use crate::storage::Position;

    fn sample_texts() -> TextStore {
        let chapters = (1..=MAX_CHAPTER)
            .map(|n| (n, format!("תוכן פרק {n}")))
            .collect();
        let parts = (25..=28)
            .map(|d| (d, format!("תוכן חלק יום {d}")))
            .collect();
        TextStore::from_maps(chapters, parts)
    }

    fn test_settings(admin_user_id: Option<i64>, data_path: PathBuf) -> BotSettings {
        BotSettings {
            bot_token: "test-token".to_owned(),
            parts_path: data_path.with_file_name("psalm119_parts.json"),
            data_path,
            db_path: PathBuf::from(":memory:"),
            tz_offset: FixedOffset::east_opt(3 * 3600).unwrap(),
            admin_user_id,
        }
    }

    fn handler_with(store: TextStore, admin: Option<i64>) -> CommandHandler {
        let dir = std::env::temp_dir().join("tehillim-handler-tests");
        CommandHandler::new(
            Arc::new(RwLock::new(store)),
            Arc::new(BookmarkStore::open_in_memory().unwrap()),
            test_settings(admin, dir.join("tehillim.json")),
        )
    }

    fn handler() -> CommandHandler {
        handler_with(sample_texts(), None)
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_fresh_user_is_at_chapter_one() {
        let h = handler();
        let reply = h.execute(7, Command::Where).await;
        assert!(reply.success);
        assert!(reply.first_message().contains("פרק 1."));
    }

    #[tokio::test]
    async fn test_goto_sets_position() {
        let h = handler();
        let reply = h.execute(7, Command::Goto("42".to_owned())).await;
        assert!(reply.success);
        assert!(reply.first_message().contains("פרק 42"));

        let reply = h.execute(7, Command::Where).await;
        assert!(reply.first_message().contains("פרק 42."));
    }

    #[tokio::test]
    async fn test_goto_out_of_range_leaves_position() {
        let h = handler();
        h.execute(7, Command::Goto("10".to_owned())).await;

        for bad in ["0", "151", "9999"] {
            let reply = h.execute(7, Command::Goto(bad.to_owned())).await;
            assert!(!reply.success, "expected error for {bad}");
        }

        assert_eq!(h.bookmarks.position(7).await.unwrap().chapter, 10);
    }

    #[tokio::test]
    async fn test_goto_non_numeric_is_rejected() {
        let h = handler();
        let reply = h.execute(7, Command::Goto("abc".to_owned())).await;
        assert!(!reply.success);

        let reply = h.execute(7, Command::Goto(String::new())).await;
        assert!(!reply.success);

        assert_eq!(h.bookmarks.position(7).await.unwrap(), Position::initial());
    }

    #[tokio::test]
    async fn test_next_three_times_reaches_chapter_four() {
        let h = handler();
        for _ in 0..3 {
            let reply = h.execute(7, Command::Next).await;
            assert!(reply.success);
        }
        assert_eq!(h.bookmarks.position(7).await.unwrap().chapter, 4);
    }

    #[tokio::test]
    async fn test_next_saturates_at_last_chapter() {
        let h = handler();
        h.execute(7, Command::Goto("150".to_owned())).await;

        let reply = h.execute(7, Command::Next).await;
        assert!(reply.success);
        assert!(reply.first_message().contains("פרק 150"));
        assert_eq!(h.bookmarks.position(7).await.unwrap().chapter, 150);
    }

    #[tokio::test]
    async fn test_prev_saturates_at_first_chapter() {
        let h = handler();
        let reply = h.execute(7, Command::Prev).await;
        assert!(reply.success);
        assert_eq!(h.bookmarks.position(7).await.unwrap().chapter, 1);
    }

    #[tokio::test]
    async fn test_daily_is_deterministic_and_leaves_bookmark() {
        let h = handler();
        let d = date(2024, 3, 5);

        let a = h.daily_for_date(d).await;
        let b = h.daily_for_date(d).await;
        assert_eq!(a.messages, b.messages);
        assert!(a.first_message().contains("יום 5"));
        assert!(a.first_message().contains("פרקים 29–34"));

        assert_eq!(h.bookmarks.position(7).await.unwrap(), Position::initial());
    }

    #[tokio::test]
    async fn test_daily_uses_psalm119_part() {
        let h = handler();
        let reply = h.daily_for_date(date(2024, 3, 26)).await;
        assert!(reply.success);
        assert!(reply.first_message().contains("תוכן חלק יום 26"));
    }

    #[tokio::test]
    async fn test_daily_falls_back_to_full_psalm119() {
        let chapters = (1..=MAX_CHAPTER)
            .map(|n| (n, format!("תוכן פרק {n}")))
            .collect();
        let h = handler_with(TextStore::from_maps(chapters, HashMap::new()), None);

        let reply = h.daily_for_date(date(2024, 3, 26)).await;
        assert!(reply.success);
        assert!(reply.first_message().contains("תוכן פרק 119"));
    }

    #[tokio::test]
    async fn test_weekly_monday_portion() {
        let h = handler();
        // 2024-01-01 was a Monday.
        let reply = h.weekly_for_date(date(2024, 1, 1)).await;
        assert!(reply.success);
        assert!(reply.first_message().contains("יום 1"));
        assert!(reply.first_message().contains("פרקים 1–29"));
    }

    #[tokio::test]
    async fn test_load_texts_rejected_for_non_admin() {
        let h = handler_with(sample_texts(), Some(1));
        let reply = h.execute(2, Command::LoadTexts).await;
        assert!(!reply.success);
        assert!(reply.first_message().contains("מנהל"));
        // The gate fires before any fetch, so nothing is written.
        assert!(!h.settings.data_path.exists());
    }

    #[tokio::test]
    async fn test_load_texts_rejected_when_no_admin_configured() {
        let h = handler();
        let reply = h.execute(1, Command::LoadTexts).await;
        assert!(!reply.success);
    }

    #[tokio::test]
    async fn test_missing_chapter_suggests_load() {
        let h = handler_with(TextStore::default(), None);
        let reply = h.execute(7, Command::Start).await;
        assert!(!reply.success);
        assert!(reply.first_message().contains("load_texts"));
    }

    #[tokio::test]
    async fn test_long_chapter_is_chunked_with_keyboard() {
        let mut chapters = HashMap::new();
        chapters.insert(1, "שורה ארוכה מאוד\n".repeat(500));
        let h = handler_with(TextStore::from_maps(chapters, HashMap::new()), None);

        let reply = h.execute(7, Command::Start).await;
        assert!(reply.success);
        assert!(reply.messages.len() > 1);
        assert!(reply.with_nav_keyboard);
        for chunk in &reply.messages {
            assert!(chunk.chars().count() <= CHUNK_LIMIT);
        }
    }

    #[tokio::test]
    async fn test_callback_reset_returns_to_chapter_one() {
        let h = handler();
        h.execute(7, Command::Goto("99".to_owned())).await;

        let reply = h.execute_callback(7, CallbackAction::Reset).await;
        assert!(reply.success);
        assert!(reply.first_message().contains("אופסה"));
        assert_eq!(h.bookmarks.position(7).await.unwrap().chapter, 1);
    }

    #[tokio::test]
    async fn test_callback_goto_explains_usage() {
        let h = handler();
        let reply = h.execute_callback(7, CallbackAction::Goto).await;
        assert!(reply.success);
        assert!(reply.first_message().contains("/goto"));
    }

    #[test]
    fn test_split_to_chunks_respects_lines() {
        let text = "אאא\nבבב\nגגג\n";
        let chunks = split_to_chunks(text, 8);
        assert_eq!(chunks, vec!["אאא\nבבב\n", "גגג\n"]);
    }

    #[test]
    fn test_split_to_chunks_short_text_single_chunk() {
        assert_eq!(split_to_chunks("קצר", 100), vec!["קצר"]);
    }

    #[test]
    fn test_split_to_chunks_long_line_kept_whole() {
        let line = "א".repeat(50);
        let chunks = split_to_chunks(&line, 10);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], line);
    }
}
