//! Telegram bot wiring.
//!
//! Bridges the teloxide dispatcher to the [`CommandHandler`]: commands and
//! inline keyboard callbacks are routed to it, and its replies are sent back
//! in order, with the navigation keyboard attached to the last chunk of a
//! chapter.

use std::sync::Arc;

use teloxide::dispatching::UpdateFilterExt;
use teloxide::prelude::*;
use teloxide::types::{CallbackQuery, InlineKeyboardButton, InlineKeyboardMarkup};
use teloxide::utils::command::BotCommands as _;
use tracing::{info, warn};

use crate::commands::{CallbackAction, Command, CommandHandler, CommandReply};

/// Runs the dispatcher until ctrl-c.
pub async fn run(bot: Bot, handler: Arc<CommandHandler>) {
    if let Err(e) = bot.set_my_commands(Command::bot_commands()).await {
        warn!("Could not register the command menu: {}", e);
    }

    let commands_handler = Arc::clone(&handler);
    let callbacks_handler = Arc::clone(&handler);

    let tree = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(move |bot: Bot, msg: Message, cmd: Command| {
                    let handler = Arc::clone(&commands_handler);
                    async move { handle_command(bot, msg, cmd, handler).await }
                }),
        )
        .branch(
            Update::filter_callback_query().endpoint(move |bot: Bot, q: CallbackQuery| {
                let handler = Arc::clone(&callbacks_handler);
                async move { handle_callback(bot, q, handler).await }
            }),
        )
        .branch(
            Update::filter_message()
                .filter(|msg: Message| msg.text().is_some_and(|t| t.starts_with('/')))
                .endpoint(handle_unknown_command),
        );

    info!("Bot is running; send /start to begin");

    Dispatcher::builder(bot, tree)
        .default_handler(|update| async move {
            warn!("Unhandled update: {:?}", update);
        })
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

/// Handles a parsed command from a message.
async fn handle_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    handler: Arc<CommandHandler>,
) -> ResponseResult<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let Ok(user_id) = i64::try_from(user.id.0) else {
        return Ok(());
    };

    // The full download takes a while; acknowledge before starting.
    if matches!(cmd, Command::LoadTexts) && handler.is_admin(user_id) {
        bot.send_message(msg.chat.id, "מתחיל למשוך טקסטים (1–150)...")
            .await?;
    }

    let reply = handler.execute(user_id, cmd).await;
    send_reply(&bot, msg.chat.id, reply).await
}

/// Handles an inline keyboard press.
async fn handle_callback(
    bot: Bot,
    q: CallbackQuery,
    handler: Arc<CommandHandler>,
) -> ResponseResult<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let Some(action) = q.data.as_deref().and_then(CallbackAction::parse) else {
        warn!("Unknown callback payload: {:?}", q.data);
        return Ok(());
    };
    let Some(message) = q.message.as_ref() else {
        return Ok(());
    };
    let Ok(user_id) = i64::try_from(q.from.id.0) else {
        return Ok(());
    };

    let reply = handler.execute_callback(user_id, action).await;
    send_reply(&bot, message.chat().id, reply).await
}

/// Replies to `/commands` that did not parse.
async fn handle_unknown_command(bot: Bot, msg: Message) -> ResponseResult<()> {
    if let Some(text) = msg.text() {
        let cmd = text.split_whitespace().next().unwrap_or(text);
        bot.send_message(
            msg.chat.id,
            format!("פקודה לא מוכרת: {cmd}\n\n{}", Command::descriptions()),
        )
        .await?;
    }
    Ok(())
}

/// Sends the reply messages in order, keyboard on the last one if asked.
async fn send_reply(bot: &Bot, chat_id: ChatId, reply: CommandReply) -> ResponseResult<()> {
    let last = reply.messages.len().saturating_sub(1);
    for (i, text) in reply.messages.into_iter().enumerate() {
        let request = bot.send_message(chat_id, text);
        if reply.with_nav_keyboard && i == last {
            request.reply_markup(nav_keyboard()).await?;
        } else {
            request.await?;
        }
    }
    Ok(())
}

/// The reading navigation keyboard, mirroring the command set.
fn nav_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("◀️ הקודם", CallbackAction::Prev.data()),
            InlineKeyboardButton::callback("▶️ הבא", CallbackAction::Next.data()),
        ],
        vec![
            InlineKeyboardButton::callback("🔢 קפיצה לפרק", CallbackAction::Goto.data()),
            InlineKeyboardButton::callback("♻️ איפוס", CallbackAction::Reset.data()),
        ],
        vec![
            InlineKeyboardButton::callback("🗓️ יומי", CallbackAction::Daily.data()),
            InlineKeyboardButton::callback("📅 שבועי", CallbackAction::Weekly.data()),
        ],
    ])
}
