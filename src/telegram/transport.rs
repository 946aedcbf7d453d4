//! [`ChatTransport`] over the Telegram Bot API

use async_trait::async_trait;
use teloxide::prelude::*;
use teloxide::types::{KeyboardButton, KeyboardMarkup, KeyboardRemove};

use crate::core::error::AppResult;
use crate::flow::{ChatTransport, Keyboard};

/// Sends conversation replies through a teloxide [`Bot`].
#[derive(Debug, Clone)]
pub struct TelegramTransport {
    bot: Bot,
}

impl TelegramTransport {
    pub fn new(bot: Bot) -> Self {
        Self { bot }
    }
}

fn reply_markup(rows: Vec<Vec<String>>, one_time: bool) -> KeyboardMarkup {
    let markup = KeyboardMarkup::new(
        rows.into_iter()
            .map(|row| row.into_iter().map(KeyboardButton::new).collect::<Vec<_>>()),
    )
    .resize_keyboard();
    if one_time {
        markup.one_time_keyboard()
    } else {
        markup
    }
}

#[async_trait]
impl ChatTransport for TelegramTransport {
    async fn send_text(&self, chat_id: i64, text: &str, keyboard: Option<Keyboard>) -> AppResult<()> {
        let request = self.bot.send_message(ChatId(chat_id), text);
        match keyboard {
            Some(Keyboard::Reply { rows, one_time }) => {
                request.reply_markup(reply_markup(rows, one_time)).await?;
            }
            Some(Keyboard::Remove) => {
                request.reply_markup(KeyboardRemove::new()).await?;
            }
            None => {
                request.await?;
            }
        }
        Ok(())
    }
}
