//! Boundary decoding: raw Telegram updates become closed unions.
//!
//! Commands and callback data are decoded exactly once, here; the controller
//! then matches exhaustively and never sees a raw string tag. Unknown
//! commands and unknown callback data decode to `None` and are dropped.

use crate::convert::media::{AUDIO_FORMATS, VIDEO_FORMATS};
use crate::convert::ImageFormat;
use crate::telegram::Update;

/// Slash commands the bot understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Cancel,
    Done,
    PdfToImages,
    MergePdfs,
    SplitPdf,
    CompressPdf,
    ImagesToPdf,
    ImageToText,
    AudioConverter,
    VideoConverter,
    ArchiveManager,
}

impl Command {
    /// Parse a message text starting with `/`. A trailing `@botname` on the
    /// command token is ignored, as Telegram appends it in group chats.
    pub fn parse(text: &str) -> Option<Self> {
        let token = text.strip_prefix('/')?;
        let token = token.split_whitespace().next()?;
        let token = token.split('@').next()?;

        match token {
            "start" => Some(Command::Start),
            "help" => Some(Command::Help),
            "cancel" => Some(Command::Cancel),
            "done" => Some(Command::Done),
            "pdf_to_img" => Some(Command::PdfToImages),
            "merge_pdf" => Some(Command::MergePdfs),
            "split_pdf" => Some(Command::SplitPdf),
            "compress_pdf" => Some(Command::CompressPdf),
            "img_to_pdf" => Some(Command::ImagesToPdf),
            "img_to_text" => Some(Command::ImageToText),
            "audio_converter" => Some(Command::AudioConverter),
            "video_converter" => Some(Command::VideoConverter),
            "archive_manager" => Some(Command::ArchiveManager),
            _ => None,
        }
    }
}

/// Inline-menu selections, decoded from callback data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuChoice {
    PdfToImages,
    PdfImageFormat(ImageFormat),
    MergePdfs,
    SplitPdf,
    CompressPdf,
    ImagesToPdf,
    ImageToText,
    AudioConverter,
    AudioFormat(String),
    VideoConverter,
    VideoFormat(String),
    ArchiveManager,
    ArchiveCreate,
    ArchiveExtract,
    MainMenu,
}

impl MenuChoice {
    /// Decode a callback-data string. Format selections are validated
    /// against the known format lists.
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            "pdf_to_img" => return Some(MenuChoice::PdfToImages),
            "fmt_jpeg" => return Some(MenuChoice::PdfImageFormat(ImageFormat::Jpeg)),
            "fmt_png" => return Some(MenuChoice::PdfImageFormat(ImageFormat::Png)),
            "merge_pdf" => return Some(MenuChoice::MergePdfs),
            "split_pdf" => return Some(MenuChoice::SplitPdf),
            "compress_pdf" => return Some(MenuChoice::CompressPdf),
            "img_to_pdf" => return Some(MenuChoice::ImagesToPdf),
            "img_to_text" => return Some(MenuChoice::ImageToText),
            "audio_converter" => return Some(MenuChoice::AudioConverter),
            "video_converter" => return Some(MenuChoice::VideoConverter),
            "archive_manager" => return Some(MenuChoice::ArchiveManager),
            "archive_create" => return Some(MenuChoice::ArchiveCreate),
            "archive_extract" => return Some(MenuChoice::ArchiveExtract),
            "main_menu" => return Some(MenuChoice::MainMenu),
            _ => {}
        }

        if let Some(fmt) = data.strip_prefix("audio_") {
            if AUDIO_FORMATS.contains(&fmt) {
                return Some(MenuChoice::AudioFormat(fmt.to_string()));
            }
        }
        if let Some(fmt) = data.strip_prefix("video_") {
            if VIDEO_FORMATS.contains(&fmt) {
                return Some(MenuChoice::VideoFormat(fmt.to_string()));
            }
        }
        None
    }

    /// The callback-data string a button for this choice carries.
    pub fn callback_data(&self) -> String {
        match self {
            MenuChoice::PdfToImages => "pdf_to_img".to_string(),
            MenuChoice::PdfImageFormat(ImageFormat::Jpeg) => "fmt_jpeg".to_string(),
            MenuChoice::PdfImageFormat(ImageFormat::Png) => "fmt_png".to_string(),
            MenuChoice::MergePdfs => "merge_pdf".to_string(),
            MenuChoice::SplitPdf => "split_pdf".to_string(),
            MenuChoice::CompressPdf => "compress_pdf".to_string(),
            MenuChoice::ImagesToPdf => "img_to_pdf".to_string(),
            MenuChoice::ImageToText => "img_to_text".to_string(),
            MenuChoice::AudioConverter => "audio_converter".to_string(),
            MenuChoice::AudioFormat(fmt) => format!("audio_{fmt}"),
            MenuChoice::VideoConverter => "video_converter".to_string(),
            MenuChoice::VideoFormat(fmt) => format!("video_{fmt}"),
            MenuChoice::ArchiveManager => "archive_manager".to_string(),
            MenuChoice::ArchiveCreate => "archive_create".to_string(),
            MenuChoice::ArchiveExtract => "archive_extract".to_string(),
            MenuChoice::MainMenu => "main_menu".to_string(),
        }
    }
}

/// What kind of payload an upload arrived as.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Document,
    Photo,
    Audio,
    Video,
}

/// Metadata of an inbound file, before anything is downloaded.
#[derive(Debug, Clone)]
pub struct Upload {
    pub kind: UploadKind,
    pub file_id: String,
    pub unique_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    /// Size in bytes; 0 when Telegram did not report one.
    pub size: u64,
}

impl Upload {
    /// Whether this looks like a PDF document.
    pub fn is_pdf(&self) -> bool {
        if self.kind != UploadKind::Document {
            return false;
        }
        self.mime_type.as_deref() == Some("application/pdf")
            || self
                .file_name
                .as_deref()
                .is_some_and(|n| n.to_lowercase().ends_with(".pdf"))
    }

    /// Whether this looks like an image (photo or image document).
    pub fn is_image(&self) -> bool {
        match self.kind {
            UploadKind::Photo => true,
            UploadKind::Document => {
                self.mime_type
                    .as_deref()
                    .is_some_and(|m| m.starts_with("image/"))
                    || self.file_name.as_deref().is_some_and(|n| {
                        let lower = n.to_lowercase();
                        [".jpg", ".jpeg", ".png", ".webp", ".bmp", ".tiff"]
                            .iter()
                            .any(|ext| lower.ends_with(ext))
                    })
            }
            _ => false,
        }
    }

    /// Whether this is acceptable input for the audio converter.
    pub fn is_audio_candidate(&self) -> bool {
        matches!(self.kind, UploadKind::Audio | UploadKind::Document)
    }

    /// Whether this is acceptable input for the video converter.
    pub fn is_video_candidate(&self) -> bool {
        matches!(self.kind, UploadKind::Video | UploadKind::Document)
    }
}

/// A decoded inbound event.
#[derive(Debug, Clone)]
pub enum Event {
    Command(Command),
    Menu(MenuChoice),
    Upload(Upload),
    Text(String),
}

/// An event plus its routing context.
#[derive(Debug, Clone)]
pub struct Inbound {
    pub chat_id: i64,
    /// Callback query id to acknowledge, when the event came from a button.
    pub callback_id: Option<String>,
    pub event: Event,
}

/// Decode a raw update into an [`Inbound`] event, or `None` when the update
/// carries nothing the bot reacts to.
pub fn decode_update(update: Update) -> Option<Inbound> {
    if let Some(callback) = update.callback_query {
        let chat_id = callback.message.as_ref()?.chat.id;
        let choice = MenuChoice::parse(callback.data.as_deref()?)?;
        return Some(Inbound {
            chat_id,
            callback_id: Some(callback.id),
            event: Event::Menu(choice),
        });
    }

    let message = update.message?;
    let chat_id = message.chat.id;

    let event = if let Some(doc) = message.document {
        Event::Upload(Upload {
            kind: UploadKind::Document,
            file_id: doc.file_id,
            unique_id: doc.file_unique_id,
            file_name: doc.file_name,
            mime_type: doc.mime_type,
            size: doc.file_size.unwrap_or(0),
        })
    } else if let Some(photos) = message.photo {
        // Sizes are sorted ascending; take the largest.
        let photo = photos.into_iter().next_back()?;
        Event::Upload(Upload {
            kind: UploadKind::Photo,
            file_id: photo.file_id,
            unique_id: photo.file_unique_id,
            file_name: None,
            mime_type: Some("image/jpeg".to_string()),
            size: photo.file_size.unwrap_or(0),
        })
    } else if let Some(audio) = message.audio {
        Event::Upload(Upload {
            kind: UploadKind::Audio,
            file_id: audio.file_id,
            unique_id: audio.file_unique_id,
            file_name: audio.file_name,
            mime_type: audio.mime_type,
            size: audio.file_size.unwrap_or(0),
        })
    } else if let Some(video) = message.video {
        Event::Upload(Upload {
            kind: UploadKind::Video,
            file_id: video.file_id,
            unique_id: video.file_unique_id,
            file_name: video.file_name,
            mime_type: video.mime_type,
            size: video.file_size.unwrap_or(0),
        })
    } else if let Some(text) = message.text {
        if text.starts_with('/') {
            Event::Command(Command::parse(&text)?)
        } else {
            Event::Text(text)
        }
    } else {
        return None;
    };

    Some(Inbound {
        chat_id,
        callback_id: None,
        event,
    })
}
