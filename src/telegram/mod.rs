//! Telegram Bot API transport.

pub mod api;
pub mod types;

pub use api::{ParseMode, TelegramApi};
pub use types::{
    BotCommand, BotCommandScope, CallbackQuery, Chat, InlineKeyboardButton, InlineKeyboardMarkup,
    Message, Update, User,
};

use thiserror::Error;

/// Telegram transport errors. Network messages are redacted before they
/// are stored, since request URLs embed the bot token.
#[derive(Debug, Error)]
pub enum TelegramError {
    #[error("network error: {0}")]
    Network(String),

    #[error("bot api error: {0}")]
    Api(String),

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for Telegram operations
pub type Result<T> = std::result::Result<T, TelegramError>;

/// Escape text for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
