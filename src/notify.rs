//! Outbound surface: replies, menus, status messages, artifacts.
//!
//! The controller and the job runner talk to the user exclusively through
//! the [`Notifier`] trait, so flow tests can swap in a recording mock.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TelegramError;
use crate::telegram::{InlineKeyboardMarkup, TelegramApi};

/// Handle to an ephemeral status message, owned by the job that created it.
#[derive(Debug, Clone)]
pub struct StatusTicket {
    pub chat_id: i64,
    pub message_id: i64,
}

/// Everything the bot can say or send.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Plain text reply.
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), TelegramError>;

    /// Text with an inline keyboard.
    async fn send_menu(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<(), TelegramError>;

    /// Acknowledge a button press. Best effort; failures are logged only.
    async fn ack_callback(&self, callback_id: &str);

    /// Post a progress message and return a handle to it.
    async fn begin_status(&self, chat_id: i64, text: &str)
        -> Result<StatusTicket, TelegramError>;

    /// Replace the text of a progress message.
    async fn update_status(&self, ticket: &StatusTicket, text: &str)
        -> Result<(), TelegramError>;

    /// Delete a progress message. Best effort; never surfaced.
    async fn discard_status(&self, ticket: &StatusTicket);

    /// Send a document with a presentation file name.
    async fn send_document(
        &self,
        chat_id: i64,
        path: &Path,
        file_name: &str,
    ) -> Result<(), TelegramError>;

    /// Send a photo.
    async fn send_photo(&self, chat_id: i64, path: &Path) -> Result<(), TelegramError>;

    /// Send an audio file.
    async fn send_audio(&self, chat_id: i64, path: &Path) -> Result<(), TelegramError>;

    /// Send a video file.
    async fn send_video(&self, chat_id: i64, path: &Path) -> Result<(), TelegramError>;
}

/// Notifier backed by the Telegram Bot API.
pub struct TelegramNotifier {
    api: Arc<TelegramApi>,
}

impl TelegramNotifier {
    pub fn new(api: Arc<TelegramApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        self.api.send_message(chat_id, text, None).await?;
        Ok(())
    }

    async fn send_menu(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: InlineKeyboardMarkup,
    ) -> Result<(), TelegramError> {
        self.api.send_message(chat_id, text, Some(&keyboard)).await?;
        Ok(())
    }

    async fn ack_callback(&self, callback_id: &str) {
        if let Err(e) = self.api.answer_callback_query(callback_id).await {
            tracing::debug!(error = %e, "failed to answer callback query");
        }
    }

    async fn begin_status(
        &self,
        chat_id: i64,
        text: &str,
    ) -> Result<StatusTicket, TelegramError> {
        let message = self.api.send_message(chat_id, text, None).await?;
        Ok(StatusTicket {
            chat_id,
            message_id: message.message_id,
        })
    }

    async fn update_status(
        &self,
        ticket: &StatusTicket,
        text: &str,
    ) -> Result<(), TelegramError> {
        self.api
            .edit_message_text(ticket.chat_id, ticket.message_id, text)
            .await
    }

    async fn discard_status(&self, ticket: &StatusTicket) {
        if let Err(e) = self
            .api
            .delete_message(ticket.chat_id, ticket.message_id)
            .await
        {
            tracing::debug!(error = %e, "failed to delete status message");
        }
    }

    async fn send_document(
        &self,
        chat_id: i64,
        path: &Path,
        file_name: &str,
    ) -> Result<(), TelegramError> {
        self.api.send_document(chat_id, path, file_name).await?;
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, path: &Path) -> Result<(), TelegramError> {
        self.api.send_photo(chat_id, path).await?;
        Ok(())
    }

    async fn send_audio(&self, chat_id: i64, path: &Path) -> Result<(), TelegramError> {
        self.api.send_audio(chat_id, path).await?;
        Ok(())
    }

    async fn send_video(&self, chat_id: i64, path: &Path) -> Result<(), TelegramError> {
        self.api.send_video(chat_id, path).await?;
        Ok(())
    }
}
