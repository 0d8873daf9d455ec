//! Telegram Bot API client and wire types.

mod api;
mod types;

pub use api::TelegramApi;
pub use types::{
    ApiResponse, Audio, CallbackQuery, Chat, Document, File, InlineKeyboardButton,
    InlineKeyboardMarkup, Message, PhotoSize, Update, User, Video,
};
