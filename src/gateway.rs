//! File transfer gateway: persists accepted uploads to local temp storage.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::bot::Upload;
use crate::error::GatewayError;
use crate::telegram::TelegramApi;

/// Downloads inbound files into the shared temp namespace.
///
/// The size limit is enforced by the controller from upload metadata before
/// `fetch` is ever called, so the gateway only moves bytes.
#[async_trait]
pub trait FileGateway: Send + Sync {
    /// Persist the upload locally and return its path.
    async fn fetch(&self, upload: &Upload, chat_id: i64) -> Result<PathBuf, GatewayError>;
}

/// Gateway backed by the Bot API file endpoints.
pub struct TelegramGateway {
    api: Arc<TelegramApi>,
    temp_dir: PathBuf,
}

impl TelegramGateway {
    pub fn new(api: Arc<TelegramApi>, temp_dir: PathBuf) -> Self {
        Self { api, temp_dir }
    }
}

#[async_trait]
impl FileGateway for TelegramGateway {
    async fn fetch(&self, upload: &Upload, chat_id: i64) -> Result<PathBuf, GatewayError> {
        let file = self.api.get_file(&upload.file_id).await?;
        let remote_path = file.file_path.ok_or_else(|| GatewayError::NoFilePath {
            file_id: upload.file_id.clone(),
        })?;

        let dest = self
            .temp_dir
            .join(local_name(upload, chat_id, &remote_path));
        self.api.download_file(&remote_path, &dest).await?;

        tracing::debug!(chat_id, path = %dest.display(), "stored inbound file");
        Ok(dest)
    }
}

/// Build a collision-free local name: chat id plus a fresh uuid, keeping the
/// original name (sanitized) so downstream extension sniffing still works.
fn local_name(upload: &Upload, chat_id: i64, remote_path: &str) -> String {
    let original = upload
        .file_name
        .as_deref()
        .map(sanitize)
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| {
            // Photos and some media carry no name; fall back to the server
            // path's last segment, which at least has an extension.
            Path::new(remote_path)
                .file_name()
                .map(|n| sanitize(&n.to_string_lossy()))
                .unwrap_or_else(|| "file".to_string())
        });

    format!("{}_{}_{}", chat_id, Uuid::new_v4(), original)
}

/// Keep only characters that are safe in a flat temp-file name.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect()
}
