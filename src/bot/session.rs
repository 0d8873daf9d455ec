//! Per-chat conversation scratch state.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;

/// Where a conversation currently stands.
///
/// The original menu tree has sixteen steps; the format-selection and
/// archive sub-menu steps all live inside `SelectAction`, distinguished by
/// the callback data of the button pressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatState {
    /// Showing a menu; nothing collected yet.
    #[default]
    SelectAction,
    /// PDF→image: format chosen, waiting for the PDF.
    AwaitingPdfForImages,
    /// Merge: accumulating PDFs until `/done`.
    AwaitingMergeFiles,
    /// Split: waiting for the PDF.
    AwaitingSplitFile,
    /// Split: PDF held, waiting for the page-range text.
    AwaitingSplitRange,
    /// Compress: waiting for the PDF.
    AwaitingCompressFile,
    /// Image→PDF: accumulating images until `/done`.
    AwaitingImagesForPdf,
    /// OCR: waiting for the image.
    AwaitingImageForText,
    /// Audio transcode: format chosen, waiting for the file.
    AwaitingAudioFile,
    /// Video transcode: format chosen, waiting for the file.
    AwaitingVideoFile,
    /// ZIP: accumulating files until `/done`.
    AwaitingZipFiles,
    /// Extract: waiting for the archive.
    AwaitingArchiveFile,
}

/// Scratch state for one chat.
///
/// Created on first contact and reset (not removed) whenever a flow ends,
/// so a cleared session always reads as freshly created.
#[derive(Debug, Clone, Default)]
pub struct Session {
    pub state: ChatState,
    /// Downloaded files accumulated by a collection flow, in arrival order.
    pub pending_files: Vec<PathBuf>,
    /// Output format chosen from a sub-menu (pdf→img, audio, video).
    pub selected_format: Option<String>,
    /// The single file held between the split upload and its range text.
    pub pending_file: Option<PathBuf>,
}

impl Session {
    /// Reset all flow state, keeping the session's identity.
    pub fn clear(&mut self) {
        self.state = ChatState::SelectAction;
        self.pending_files.clear();
        self.selected_format = None;
        self.pending_file = None;
    }
}

/// Session store keyed by chat id.
///
/// The controller is the only writer; jobs never touch sessions. Entries
/// live for the process lifetime.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<i64, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot the session for a chat, creating an empty one on first
    /// access.
    pub async fn snapshot(&self, chat_id: i64) -> Session {
        {
            let sessions = self.inner.read().await;
            if let Some(session) = sessions.get(&chat_id) {
                return session.clone();
            }
        }

        let mut sessions = self.inner.write().await;
        sessions.entry(chat_id).or_default().clone()
    }

    /// Mutate the live session for a chat.
    pub async fn update(&self, chat_id: i64, f: impl FnOnce(&mut Session)) {
        let mut sessions = self.inner.write().await;
        f(sessions.entry(chat_id).or_default());
    }

    /// Reset a chat's session fields; the entry itself stays.
    pub async fn clear(&self, chat_id: i64) {
        let mut sessions = self.inner.write().await;
        sessions.entry(chat_id).or_default().clear();
    }
}
