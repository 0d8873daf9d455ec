//! The conversation state machine.
//!
//! `dispatch` maps (current state, inbound event) to replies, a session
//! mutation, and possibly a job submission. Transitions are deterministic
//! given the session snapshot and never wait on a conversion: terminal
//! transitions clear the session first, hand the job to the runner, and
//! return. Events are fed in one at a time from a single dispatch loop.

use std::sync::Arc;

use crate::bot::event::{Command, Event, Inbound, MenuChoice, Upload};
use crate::bot::menus;
use crate::bot::session::{ChatState, SessionStore};
use crate::convert::ImageFormat;
use crate::error::TelegramError;
use crate::gateway::FileGateway;
use crate::jobs::{ConversionJob, ConversionRequest, JobRunner};
use crate::notify::Notifier;

/// Upper bound on files accumulated by a collection flow (merge, img→pdf,
/// zip). The original bot is unbounded; this closes the obvious
/// resource-exhaustion hole.
pub const MAX_COLLECTED_FILES: usize = 32;

/// Routes decoded events through the per-chat state machine.
pub struct Controller {
    sessions: SessionStore,
    gateway: Arc<dyn FileGateway>,
    notifier: Arc<dyn Notifier>,
    jobs: JobRunner,
    max_file_size: u64,
}

impl Controller {
    pub fn new(
        sessions: SessionStore,
        gateway: Arc<dyn FileGateway>,
        notifier: Arc<dyn Notifier>,
        jobs: JobRunner,
        max_file_size: u64,
    ) -> Self {
        Self {
            sessions,
            gateway,
            notifier,
            jobs,
            max_file_size,
        }
    }

    /// Current state of a chat, for tests and diagnostics.
    pub async fn state_of(&self, chat_id: i64) -> ChatState {
        self.sessions.snapshot(chat_id).await.state
    }

    /// Handle one inbound event. Errors reaching this level are outbound
    /// transport failures; they are logged, not propagated further.
    pub async fn dispatch(&self, inbound: Inbound) {
        let Inbound {
            chat_id,
            callback_id,
            event,
        } = inbound;

        if let Some(id) = &callback_id {
            self.notifier.ack_callback(id).await;
        }

        let result = match event {
            Event::Command(command) => self.on_command(chat_id, command).await,
            Event::Menu(choice) => self.on_menu(chat_id, choice).await,
            Event::Upload(upload) => self.on_upload(chat_id, upload).await,
            Event::Text(text) => self.on_text(chat_id, &text).await,
        };

        if let Err(e) = result {
            tracing::warn!(chat_id, error = %e, "failed to handle event");
        }
    }

    fn size_limit_mb(&self) -> u64 {
        self.max_file_size / 1024 / 1024
    }

    async fn show_main_menu(&self, chat_id: i64) -> Result<(), TelegramError> {
        self.sessions.clear(chat_id).await;
        self.notifier
            .send_menu(chat_id, "Hi! Pick an action:", menus::main_menu())
            .await
    }

    async fn submit(&self, chat_id: i64, request: ConversionRequest) {
        // Clear first so stale state can never double-submit.
        self.sessions.clear(chat_id).await;
        self.jobs.submit(ConversionJob { chat_id, request }).await;
    }

    /// Enter a waiting state after wiping any leftover flow state.
    async fn enter(&self, chat_id: i64, state: ChatState, format: Option<String>) {
        self.sessions
            .update(chat_id, |session| {
                session.clear();
                session.state = state;
                session.selected_format = format;
            })
            .await;
    }

    async fn prompt_single_file(
        &self,
        chat_id: i64,
        state: ChatState,
        format: Option<String>,
        what: &str,
    ) -> Result<(), TelegramError> {
        self.enter(chat_id, state, format).await;
        self.notifier
            .send_text(
                chat_id,
                &format!(
                    "Send me {} (up to {} MB). /cancel to abort.",
                    what,
                    self.size_limit_mb()
                ),
            )
            .await
    }

    async fn prompt_collection(
        &self,
        chat_id: i64,
        state: ChatState,
        what: &str,
    ) -> Result<(), TelegramError> {
        self.enter(chat_id, state, None).await;
        self.notifier
            .send_text(
                chat_id,
                &format!(
                    "Send me {} one at a time (each up to {} MB). Type /done when finished.",
                    what,
                    self.size_limit_mb()
                ),
            )
            .await
    }

    async fn on_command(&self, chat_id: i64, command: Command) -> Result<(), TelegramError> {
        match command {
            Command::Start => self.show_main_menu(chat_id).await,
            Command::Help => self.notifier.send_text(chat_id, menus::help_text()).await,
            Command::Cancel => {
                self.sessions.clear(chat_id).await;
                self.notifier.send_text(chat_id, "Operation cancelled.").await
            }
            Command::Done => self.on_done(chat_id).await,
            // Feature commands are shortcuts into the same flows the menu
            // buttons start.
            Command::PdfToImages => self.on_menu(chat_id, MenuChoice::PdfToImages).await,
            Command::MergePdfs => self.on_menu(chat_id, MenuChoice::MergePdfs).await,
            Command::SplitPdf => self.on_menu(chat_id, MenuChoice::SplitPdf).await,
            Command::CompressPdf => self.on_menu(chat_id, MenuChoice::CompressPdf).await,
            Command::ImagesToPdf => self.on_menu(chat_id, MenuChoice::ImagesToPdf).await,
            Command::ImageToText => self.on_menu(chat_id, MenuChoice::ImageToText).await,
            Command::AudioConverter => self.on_menu(chat_id, MenuChoice::AudioConverter).await,
            Command::VideoConverter => self.on_menu(chat_id, MenuChoice::VideoConverter).await,
            Command::ArchiveManager => self.on_menu(chat_id, MenuChoice::ArchiveManager).await,
        }
    }

    async fn on_menu(&self, chat_id: i64, choice: MenuChoice) -> Result<(), TelegramError> {
        match choice {
            MenuChoice::MainMenu => self.show_main_menu(chat_id).await,

            MenuChoice::PdfToImages => {
                self.notifier
                    .send_menu(chat_id, "Pick an image format:", menus::pdf_format_menu())
                    .await
            }
            MenuChoice::PdfImageFormat(format) => {
                self.prompt_single_file(
                    chat_id,
                    ChatState::AwaitingPdfForImages,
                    Some(format.as_str().to_string()),
                    &format!("the PDF to render as {}", format.as_str().to_uppercase()),
                )
                .await
            }

            MenuChoice::MergePdfs => {
                self.prompt_collection(chat_id, ChatState::AwaitingMergeFiles, "the PDFs to merge")
                    .await
            }
            MenuChoice::SplitPdf => {
                self.prompt_single_file(
                    chat_id,
                    ChatState::AwaitingSplitFile,
                    None,
                    "the PDF you want to split",
                )
                .await
            }
            MenuChoice::CompressPdf => {
                self.prompt_single_file(
                    chat_id,
                    ChatState::AwaitingCompressFile,
                    None,
                    "the PDF you want to compress",
                )
                .await
            }
            MenuChoice::ImagesToPdf => {
                self.prompt_collection(
                    chat_id,
                    ChatState::AwaitingImagesForPdf,
                    "the images to combine into a PDF",
                )
                .await
            }
            MenuChoice::ImageToText => {
                self.prompt_single_file(
                    chat_id,
                    ChatState::AwaitingImageForText,
                    None,
                    "the image to extract text from",
                )
                .await
            }

            MenuChoice::AudioConverter => {
                self.notifier
                    .send_menu(
                        chat_id,
                        "Pick the audio format you want:",
                        menus::audio_format_menu(),
                    )
                    .await
            }
            MenuChoice::AudioFormat(format) => {
                let what = format!("the audio file to convert to {}", format.to_uppercase());
                self.prompt_single_file(chat_id, ChatState::AwaitingAudioFile, Some(format), &what)
                    .await
            }
            MenuChoice::VideoConverter => {
                self.notifier
                    .send_menu(
                        chat_id,
                        "Pick the video format you want:",
                        menus::video_format_menu(),
                    )
                    .await
            }
            MenuChoice::VideoFormat(format) => {
                let what = format!("the video to convert to {}", format.to_uppercase());
                self.prompt_single_file(chat_id, ChatState::AwaitingVideoFile, Some(format), &what)
                    .await
            }

            MenuChoice::ArchiveManager => {
                self.notifier
                    .send_menu(chat_id, "Archives - what would you like?", menus::archive_menu())
                    .await
            }
            MenuChoice::ArchiveCreate => {
                self.prompt_collection(chat_id, ChatState::AwaitingZipFiles, "the files to zip")
                    .await
            }
            MenuChoice::ArchiveExtract => {
                self.prompt_single_file(
                    chat_id,
                    ChatState::AwaitingArchiveFile,
                    None,
                    "the archive to extract (ZIP or TAR/TAR.GZ)",
                )
                .await
            }
        }
    }

    /// `/done` closes a collection flow if its minimum is met. In any other
    /// state it is ignored.
    async fn on_done(&self, chat_id: i64) -> Result<(), TelegramError> {
        let session = self.sessions.snapshot(chat_id).await;
        match session.state {
            ChatState::AwaitingMergeFiles => {
                if session.pending_files.len() < 2 {
                    return self
                        .notifier
                        .send_text(chat_id, "Send at least two PDFs before /done.")
                        .await;
                }
                self.submit(
                    chat_id,
                    ConversionRequest::MergePdfs {
                        inputs: session.pending_files,
                    },
                )
                .await;
                Ok(())
            }
            ChatState::AwaitingImagesForPdf => {
                if session.pending_files.is_empty() {
                    return self
                        .notifier
                        .send_text(chat_id, "Send at least one image before /done.")
                        .await;
                }
                self.submit(
                    chat_id,
                    ConversionRequest::ImagesToPdf {
                        inputs: session.pending_files,
                    },
                )
                .await;
                Ok(())
            }
            ChatState::AwaitingZipFiles => {
                if session.pending_files.is_empty() {
                    return self
                        .notifier
                        .send_text(chat_id, "Send at least one file before /done.")
                        .await;
                }
                self.submit(
                    chat_id,
                    ConversionRequest::CreateZip {
                        inputs: session.pending_files,
                    },
                )
                .await;
                Ok(())
            }
            _ => {
                tracing::debug!(chat_id, "ignoring /done outside a collection flow");
                Ok(())
            }
        }
    }

    async fn on_upload(&self, chat_id: i64, upload: Upload) -> Result<(), TelegramError> {
        let session = self.sessions.snapshot(chat_id).await;
        let state = session.state;

        // Wrong payload kind: re-prompt, state unchanged.
        let acceptable = match state {
            ChatState::SelectAction | ChatState::AwaitingSplitRange => {
                tracing::debug!(chat_id, ?state, "ignoring unexpected upload");
                return Ok(());
            }
            ChatState::AwaitingPdfForImages
            | ChatState::AwaitingMergeFiles
            | ChatState::AwaitingSplitFile
            | ChatState::AwaitingCompressFile => upload.is_pdf(),
            ChatState::AwaitingImagesForPdf | ChatState::AwaitingImageForText => upload.is_image(),
            ChatState::AwaitingAudioFile => upload.is_audio_candidate(),
            ChatState::AwaitingVideoFile => upload.is_video_candidate(),
            ChatState::AwaitingZipFiles | ChatState::AwaitingArchiveFile => {
                upload.kind == crate::bot::event::UploadKind::Document
            }
        };
        if !acceptable {
            let hint = match state {
                ChatState::AwaitingPdfForImages
                | ChatState::AwaitingMergeFiles
                | ChatState::AwaitingSplitFile
                | ChatState::AwaitingCompressFile => "Please send a PDF document.",
                ChatState::AwaitingImagesForPdf | ChatState::AwaitingImageForText => {
                    "Please send an image, either as a photo or as a file."
                }
                ChatState::AwaitingAudioFile => "Please send an audio file.",
                ChatState::AwaitingVideoFile => "Please send a video file.",
                _ => "Please send the file as a document.",
            };
            return self.notifier.send_text(chat_id, hint).await;
        }

        // Size gate, before anything is persisted. Rejection leaves the
        // session exactly as it was.
        if upload.size > self.max_file_size {
            return self
                .notifier
                .send_text(
                    chat_id,
                    &format!(
                        "That file is too large. The limit is {} MB.",
                        self.size_limit_mb()
                    ),
                )
                .await;
        }

        // Collection cap, same shape as an oversized rejection.
        let collecting = matches!(
            state,
            ChatState::AwaitingMergeFiles
                | ChatState::AwaitingImagesForPdf
                | ChatState::AwaitingZipFiles
        );
        if collecting && session.pending_files.len() >= MAX_COLLECTED_FILES {
            return self
                .notifier
                .send_text(
                    chat_id,
                    &format!("That's {MAX_COLLECTED_FILES} files already - type /done to finish."),
                )
                .await;
        }

        // Persist through the gateway.
        let path = match self.gateway.fetch(&upload, chat_id).await {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!(chat_id, error = %e, "failed to store upload");
                return self
                    .notifier
                    .send_text(chat_id, "I couldn't download that file. Please try again.")
                    .await;
            }
        };

        match state {
            ChatState::AwaitingPdfForImages => {
                let format = session
                    .selected_format
                    .as_deref()
                    .and_then(ImageFormat::from_name)
                    .unwrap_or(ImageFormat::Jpeg);
                self.submit(chat_id, ConversionRequest::PdfToImages { input: path, format })
                    .await;
                Ok(())
            }
            ChatState::AwaitingSplitFile => {
                self.sessions
                    .update(chat_id, |s| {
                        s.pending_file = Some(path);
                        s.state = ChatState::AwaitingSplitRange;
                    })
                    .await;
                self.notifier
                    .send_text(
                        chat_id,
                        "Got the PDF. Now send the pages you want, e.g. '2-5' or '1,3,8'.",
                    )
                    .await
            }
            ChatState::AwaitingCompressFile => {
                self.submit(chat_id, ConversionRequest::CompressPdf { input: path })
                    .await;
                Ok(())
            }
            ChatState::AwaitingImageForText => {
                self.submit(chat_id, ConversionRequest::ImageToText { input: path })
                    .await;
                Ok(())
            }
            ChatState::AwaitingAudioFile => {
                let format = session
                    .selected_format
                    .clone()
                    .unwrap_or_else(|| "mp3".to_string());
                self.submit(
                    chat_id,
                    ConversionRequest::TranscodeAudio { input: path, format },
                )
                .await;
                Ok(())
            }
            ChatState::AwaitingVideoFile => {
                let format = session
                    .selected_format
                    .clone()
                    .unwrap_or_else(|| "mp4".to_string());
                self.submit(
                    chat_id,
                    ConversionRequest::TranscodeVideo { input: path, format },
                )
                .await;
                Ok(())
            }
            ChatState::AwaitingArchiveFile => {
                self.submit(chat_id, ConversionRequest::ExtractArchive { input: path })
                    .await;
                Ok(())
            }
            ChatState::AwaitingMergeFiles
            | ChatState::AwaitingImagesForPdf
            | ChatState::AwaitingZipFiles => {
                let mut count = 0;
                self.sessions
                    .update(chat_id, |s| {
                        s.pending_files.push(path);
                        count = s.pending_files.len();
                    })
                    .await;
                self.notifier
                    .send_text(
                        chat_id,
                        &format!("Received file {count}. Send more, or type /done."),
                    )
                    .await
            }
            ChatState::SelectAction | ChatState::AwaitingSplitRange => unreachable!(),
        }
    }

    async fn on_text(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        let session = self.sessions.snapshot(chat_id).await;
        if session.state != ChatState::AwaitingSplitRange {
            tracing::debug!(chat_id, "ignoring free text outside the split flow");
            return Ok(());
        }

        let Some(input) = session.pending_file else {
            // Shouldn't happen; recover by restarting the flow.
            self.sessions.clear(chat_id).await;
            return self
                .notifier
                .send_text(chat_id, "Something went wrong - please start over with /start.")
                .await;
        };

        self.submit(
            chat_id,
            ConversionRequest::SplitPdf {
                input,
                range: text.trim().to_string(),
            },
        )
        .await;
        Ok(())
    }
}
