//! Thin reqwest client over the Telegram Bot API.
//!
//! Every method returns `Result`; an `ok: false` response surfaces the API's
//! own `description` text. The base URL is overridable so tests can point the
//! client at a local stub.

use std::path::Path;

use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tokio::io::AsyncWriteExt;

use crate::error::TelegramError;
use crate::telegram::types::{ApiResponse, File, InlineKeyboardMarkup, Message};

/// Default Bot API endpoint.
const DEFAULT_BASE_URL: &str = "https://api.telegram.org";

/// Telegram Bot API client.
#[derive(Clone)]
pub struct TelegramApi {
    client: reqwest::Client,
    token: SecretString,
    base_url: String,
}

impl TelegramApi {
    /// Create a client against the production endpoint.
    pub fn new(token: SecretString) -> Self {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    /// Create a client against an arbitrary endpoint (for tests).
    pub fn with_base_url(token: SecretString, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token,
            base_url: base_url.into(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.base_url,
            self.token.expose_secret(),
            method
        )
    }

    fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.base_url,
            self.token.expose_secret(),
            file_path
        )
    }

    fn unwrap_response<T>(method: &str, response: ApiResponse<T>) -> Result<T, TelegramError> {
        if !response.ok {
            return Err(TelegramError::Api {
                method: method.to_string(),
                description: response
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        response.result.ok_or_else(|| TelegramError::MissingResult {
            method: method.to_string(),
        })
    }

    /// POST a JSON body to a Bot API method and unwrap the response.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &impl Serialize,
    ) -> Result<T, TelegramError> {
        let response: ApiResponse<T> = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await?
            .json()
            .await?;
        Self::unwrap_response(method, response)
    }

    /// POST a multipart form (file upload) to a Bot API method.
    async fn call_multipart<T: DeserializeOwned>(
        &self,
        method: &str,
        form: Form,
    ) -> Result<T, TelegramError> {
        let response: ApiResponse<T> = self
            .client
            .post(self.method_url(method))
            .multipart(form)
            .send()
            .await?
            .json()
            .await?;
        Self::unwrap_response(method, response)
    }

    /// Send a text message, optionally with an inline keyboard.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<Message, TelegramError> {
        #[derive(Serialize)]
        struct Body<'a> {
            chat_id: i64,
            text: &'a str,
            #[serde(skip_serializing_if = "Option::is_none")]
            reply_markup: Option<&'a InlineKeyboardMarkup>,
        }

        self.call(
            "sendMessage",
            &Body {
                chat_id,
                text,
                reply_markup,
            },
        )
        .await
    }

    /// Replace the text of a previously sent message.
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
    ) -> Result<(), TelegramError> {
        // The API returns the edited Message; nothing in it is needed here.
        let _: serde_json::Value = self
            .call(
                "editMessageText",
                &json!({ "chat_id": chat_id, "message_id": message_id, "text": text }),
            )
            .await?;
        Ok(())
    }

    /// Delete a message.
    pub async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<(), TelegramError> {
        let _: bool = self
            .call(
                "deleteMessage",
                &json!({ "chat_id": chat_id, "message_id": message_id }),
            )
            .await?;
        Ok(())
    }

    /// Acknowledge an inline-button press so the client stops its spinner.
    pub async fn answer_callback_query(&self, callback_id: &str) -> Result<(), TelegramError> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                &json!({ "callback_query_id": callback_id }),
            )
            .await?;
        Ok(())
    }

    /// Register the webhook URL with Telegram.
    pub async fn set_webhook(&self, url: &str) -> Result<(), TelegramError> {
        let _: bool = self
            .call(
                "setWebhook",
                &json!({ "url": url, "allowed_updates": ["message", "callback_query"] }),
            )
            .await?;
        Ok(())
    }

    /// Resolve a file id to a server-side handle.
    pub async fn get_file(&self, file_id: &str) -> Result<File, TelegramError> {
        self.call("getFile", &json!({ "file_id": file_id })).await
    }

    /// Download a resolved file, streaming it to a local path so large
    /// media never sits fully in memory.
    pub async fn download_file(
        &self,
        file_path: &str,
        dest: &Path,
    ) -> Result<(), TelegramError> {
        let mut stream = self
            .client
            .get(self.file_url(file_path))
            .send()
            .await?
            .error_for_status()?
            .bytes_stream();

        let mut file = tokio::fs::File::create(dest).await?;
        while let Some(chunk) = stream.next().await {
            file.write_all(&chunk?).await?;
        }
        file.flush().await?;
        Ok(())
    }

    async fn send_file(
        &self,
        method: &str,
        field: &str,
        chat_id: i64,
        path: &Path,
        file_name: &str,
    ) -> Result<Message, TelegramError> {
        let bytes = tokio::fs::read(path).await?;
        let part = Part::bytes(bytes).file_name(file_name.to_string());
        let form = Form::new()
            .text("chat_id", chat_id.to_string())
            .part(field.to_string(), part);
        self.call_multipart(method, form).await
    }

    /// Upload a document attachment.
    pub async fn send_document(
        &self,
        chat_id: i64,
        path: &Path,
        file_name: &str,
    ) -> Result<Message, TelegramError> {
        self.send_file("sendDocument", "document", chat_id, path, file_name)
            .await
    }

    /// Upload a photo attachment.
    pub async fn send_photo(&self, chat_id: i64, path: &Path) -> Result<Message, TelegramError> {
        let name = file_name_of(path);
        self.send_file("sendPhoto", "photo", chat_id, path, &name)
            .await
    }

    /// Upload an audio attachment.
    pub async fn send_audio(&self, chat_id: i64, path: &Path) -> Result<Message, TelegramError> {
        let name = file_name_of(path);
        self.send_file("sendAudio", "audio", chat_id, path, &name)
            .await
    }

    /// Upload a video attachment.
    pub async fn send_video(&self, chat_id: i64, path: &Path) -> Result<Message, TelegramError> {
        let name = file_name_of(path);
        self.send_file("sendVideo", "video", chat_id, path, &name)
            .await
    }
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string())
}
