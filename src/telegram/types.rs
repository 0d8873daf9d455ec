//! Serde models for the Bot API subset the bot uses.
//!
//! Field names follow the wire format; anything the bot does not read is
//! simply not modeled. https://core.telegram.org/bots/api

use serde::{Deserialize, Serialize};

/// Telegram Update object (webhook payload).
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Unique update identifier.
    pub update_id: i64,

    /// New incoming message, if this update carries one.
    pub message: Option<Message>,

    /// Inline-button press, if this update carries one.
    pub callback_query: Option<CallbackQuery>,
}

/// Telegram Message object.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    /// Unique message identifier within the chat.
    pub message_id: i64,

    /// Chat the message belongs to.
    pub chat: Chat,

    /// Sender (empty for channel posts).
    pub from: Option<User>,

    /// Message text.
    pub text: Option<String>,

    /// Attached generic file.
    pub document: Option<Document>,

    /// Attached photo, as available sizes sorted smallest first.
    pub photo: Option<Vec<PhotoSize>>,

    /// Attached audio file.
    pub audio: Option<Audio>,

    /// Attached video file.
    pub video: Option<Video>,
}

/// Telegram Chat object.
#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    /// Unique chat identifier.
    pub id: i64,
}

/// Telegram User object.
#[derive(Debug, Clone, Deserialize)]
pub struct User {
    /// Unique user identifier.
    pub id: i64,

    /// True if this is a bot.
    pub is_bot: bool,

    /// User's first name.
    pub first_name: String,
}

/// Inline-button press.
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    /// Query id, needed to acknowledge the press.
    pub id: String,

    /// User who pressed the button.
    pub from: User,

    /// Message the button was attached to.
    pub message: Option<Message>,

    /// The button's callback data string.
    pub data: Option<String>,
}

/// A generic attached file.
#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub file_unique_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

/// One available size of an attached photo.
#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub file_unique_id: String,
    pub file_size: Option<u64>,
}

/// An attached audio file.
#[derive(Debug, Clone, Deserialize)]
pub struct Audio {
    pub file_id: String,
    pub file_unique_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

/// An attached video file.
#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub file_id: String,
    pub file_unique_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

/// Server-side file handle returned by `getFile`.
#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub file_id: String,
    pub file_unique_id: String,
    pub file_size: Option<u64>,
    /// Path under the file download endpoint; valid for about an hour.
    pub file_path: Option<String>,
}

/// Telegram API response wrapper.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    /// True if the request was successful.
    pub ok: bool,

    /// Error description if not ok.
    pub description: Option<String>,

    /// Result on success.
    pub result: Option<T>,
}

/// An inline keyboard attached to an outgoing message.
#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

/// One button of an inline keyboard.
#[derive(Debug, Clone, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_message_update() {
        let json = r#"{
            "update_id": 123,
            "message": {
                "message_id": 456,
                "from": {"id": 789, "is_bot": false, "first_name": "Dara"},
                "chat": {"id": 789, "type": "private"},
                "text": "/start"
            }
        }"#;

        let update: Update = serde_json::from_str(json).unwrap();
        assert_eq!(update.update_id, 123);

        let message = update.message.unwrap();
        assert_eq!(message.message_id, 456);
        assert_eq!(message.chat.id, 789);
        assert_eq!(message.text.unwrap(), "/start");
        assert!(update.callback_query.is_none());
    }

    #[test]
    fn parses_document_update() {
        let json = r#"{
            "update_id": 1,
            "message": {
                "message_id": 2,
                "chat": {"id": 3, "type": "private"},
                "document": {
                    "file_id": "f1",
                    "file_unique_id": "u1",
                    "file_name": "report.pdf",
                    "mime_type": "application/pdf",
                    "file_size": 1024
                }
            }
        }"#;

        let update: Update = serde_json::from_str(json).unwrap();
        let doc = update.message.unwrap().document.unwrap();
        assert_eq!(doc.file_name.as_deref(), Some("report.pdf"));
        assert_eq!(doc.file_size, Some(1024));
    }

    #[test]
    fn parses_callback_update() {
        let json = r#"{
            "update_id": 1,
            "callback_query": {
                "id": "cb1",
                "from": {"id": 7, "is_bot": false, "first_name": "Dara"},
                "message": {"message_id": 9, "chat": {"id": 7, "type": "private"}},
                "data": "merge_pdf"
            }
        }"#;

        let update: Update = serde_json::from_str(json).unwrap();
        let cb = update.callback_query.unwrap();
        assert_eq!(cb.id, "cb1");
        assert_eq!(cb.data.as_deref(), Some("merge_pdf"));
        assert_eq!(cb.message.unwrap().chat.id, 7);
    }

    #[test]
    fn keyboard_serializes_to_wire_shape() {
        let markup = InlineKeyboardMarkup {
            inline_keyboard: vec![vec![InlineKeyboardButton::new("Merge PDFs", "merge_pdf")]],
        };
        let json = serde_json::to_value(&markup).unwrap();
        assert_eq!(
            json["inline_keyboard"][0][0]["callback_data"],
            "merge_pdf"
        );
    }
}
