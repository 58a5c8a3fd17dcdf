use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use teloxide::prelude::*;
use teloxide::types::{KeyboardButton, KeyboardMarkup};
use teloxide::update_listeners::Polling;
use tracing::{info, warn};

use crate::bot::{ReplyKeyboard, WeatherBot};
use crate::config::TelegramConfig;
use crate::platform::IncomingMessage;

/// Extra headroom on the HTTP client so a full long poll never times out locally
const CLIENT_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

/// Create the Telegram client and verify the session with `getMe`.
pub async fn connect(config: &TelegramConfig) -> Result<Bot> {
    let client = teloxide::net::default_reqwest_settings()
        .timeout(config.poll_timeout() + CLIENT_TIMEOUT_MARGIN)
        .build()
        .context("Failed to build Telegram HTTP client")?;

    let bot = Bot::with_client(&config.bot_token, client);

    let me = bot
        .get_me()
        .await
        .context("Failed to establish Telegram session")?;
    info!("Bot @{} started", me.username());

    Ok(bot)
}

fn keyboard_markup(keyboard: ReplyKeyboard) -> KeyboardMarkup {
    let rows = keyboard
        .rows()
        .into_iter()
        .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    KeyboardMarkup::new(rows).resize_keyboard()
}

/// Run the Telegram platform until the process is killed.
/// Updates from one chat are handled in order; different chats run concurrently.
pub async fn run(bot: Bot, weather_bot: Arc<WeatherBot>, config: &TelegramConfig) -> Result<()> {
    info!(
        "Starting Telegram long polling (timeout {}s)...",
        config.poll_timeout_secs
    );

    let listener = Polling::builder(bot.clone())
        .timeout(config.poll_timeout())
        .build();

    let handler = Update::filter_message().endpoint(handle_message);

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![weather_bot])
        .default_handler(|upd| async move {
            warn!("Unhandled update: {:?}", upd.id);
        })
        .error_handler(LoggingErrorHandler::with_custom_text("telegram"))
        .build()
        .dispatch_with_listener(
            listener,
            LoggingErrorHandler::with_custom_text("telegram update listener"),
        )
        .await;

    Ok(())
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    weather_bot: Arc<WeatherBot>,
) -> ResponseResult<()> {
    let text = match msg.text() {
        Some(t) => t.to_string(),
        None => return Ok(()),
    };

    let user_name = msg
        .from
        .as_ref()
        .map(|user| user.first_name.clone())
        .unwrap_or_default();

    info!(
        "Telegram message from {} (chat {}): {}",
        user_name, msg.chat.id, text
    );

    let incoming = IncomingMessage {
        chat_id: msg.chat.id.0,
        user_name,
        text,
    };

    let reply = weather_bot.process_message(&incoming).await;

    let request = bot.send_message(msg.chat.id, reply.text);
    match reply.keyboard {
        Some(keyboard) => request.reply_markup(keyboard_markup(keyboard)).await?,
        None => request.await?,
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yes_no_markup() {
        let markup = keyboard_markup(ReplyKeyboard::YesNo);

        let labels: Vec<Vec<&str>> = markup
            .keyboard
            .iter()
            .map(|row| row.iter().map(|b| b.text.as_str()).collect())
            .collect();
        assert_eq!(labels, vec![vec!["Да", "Нет"]]);
        assert!(markup.resize_keyboard);
    }
}
