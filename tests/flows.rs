//! End-to-end conversation flows against recording doubles.
//!
//! The controller and job runner are exercised with a recording notifier and
//! a tempdir-backed gateway, so these tests cover routing, state transitions,
//! rejection paths, and the cleanup guarantee without talking to Telegram.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use tokio::sync::Mutex;

use filewright::bot::{
    ChatState, Command, Controller, Event, Inbound, MenuChoice, SessionStore, Upload, UploadKind,
    MAX_COLLECTED_FILES,
};
use filewright::error::{GatewayError, TelegramError};
use filewright::gateway::FileGateway;
use filewright::jobs::JobRunner;
use filewright::notify::{Notifier, StatusTicket};
use filewright::telegram::InlineKeyboardMarkup;

const LIMIT: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq)]
enum Sent {
    Text(i64, String),
    Menu(i64, String),
    StatusBegin(i64, String),
    StatusUpdate(i64, String),
    StatusDiscard(i64),
    Document(i64, String),
    Photo(i64),
    Audio(i64),
    Video(i64),
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
    next_message_id: AtomicI64,
}

impl RecordingNotifier {
    async fn log(&self) -> Vec<Sent> {
        self.sent.lock().await.clone()
    }

    async fn texts(&self) -> Vec<String> {
        self.log()
            .await
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text(_, text) => Some(text),
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        self.sent.lock().await.push(Sent::Text(chat_id, text.into()));
        Ok(())
    }

    async fn send_menu(
        &self,
        chat_id: i64,
        text: &str,
        _keyboard: InlineKeyboardMarkup,
    ) -> Result<(), TelegramError> {
        self.sent.lock().await.push(Sent::Menu(chat_id, text.into()));
        Ok(())
    }

    async fn ack_callback(&self, _callback_id: &str) {}

    async fn begin_status(
        &self,
        chat_id: i64,
        text: &str,
    ) -> Result<StatusTicket, TelegramError> {
        self.sent
            .lock()
            .await
            .push(Sent::StatusBegin(chat_id, text.into()));
        Ok(StatusTicket {
            chat_id,
            message_id: self.next_message_id.fetch_add(1, Ordering::SeqCst),
        })
    }

    async fn update_status(
        &self,
        ticket: &StatusTicket,
        text: &str,
    ) -> Result<(), TelegramError> {
        self.sent
            .lock()
            .await
            .push(Sent::StatusUpdate(ticket.chat_id, text.into()));
        Ok(())
    }

    async fn discard_status(&self, ticket: &StatusTicket) {
        self.sent
            .lock()
            .await
            .push(Sent::StatusDiscard(ticket.chat_id));
    }

    async fn send_document(
        &self,
        chat_id: i64,
        _path: &Path,
        file_name: &str,
    ) -> Result<(), TelegramError> {
        self.sent
            .lock()
            .await
            .push(Sent::Document(chat_id, file_name.into()));
        Ok(())
    }

    async fn send_photo(&self, chat_id: i64, _path: &Path) -> Result<(), TelegramError> {
        self.sent.lock().await.push(Sent::Photo(chat_id));
        Ok(())
    }

    async fn send_audio(&self, chat_id: i64, _path: &Path) -> Result<(), TelegramError> {
        self.sent.lock().await.push(Sent::Audio(chat_id));
        Ok(())
    }

    async fn send_video(&self, chat_id: i64, _path: &Path) -> Result<(), TelegramError> {
        self.sent.lock().await.push(Sent::Video(chat_id));
        Ok(())
    }
}

/// Gateway double that materializes every fetch as a real temp file.
struct StubGateway {
    dir: PathBuf,
    fetches: AtomicUsize,
}

#[async_trait]
impl FileGateway for StubGateway {
    async fn fetch(&self, upload: &Upload, chat_id: i64) -> Result<PathBuf, GatewayError> {
        let n = self.fetches.fetch_add(1, Ordering::SeqCst);
        let name = upload
            .file_name
            .clone()
            .unwrap_or_else(|| format!("file_{n}.bin"));
        let path = self.dir.join(format!("{chat_id}_{n}_{name}"));
        tokio::fs::write(&path, b"stub contents").await?;
        Ok(path)
    }
}

struct Harness {
    controller: Controller,
    sessions: SessionStore,
    notifier: Arc<RecordingNotifier>,
    gateway: Arc<StubGateway>,
    jobs: JobRunner,
    _tmp: tempfile::TempDir,
}

fn harness() -> Harness {
    let tmp = tempfile::tempdir().unwrap();
    let notifier = Arc::new(RecordingNotifier::default());
    let gateway = Arc::new(StubGateway {
        dir: tmp.path().to_path_buf(),
        fetches: AtomicUsize::new(0),
    });
    let jobs = JobRunner::new(notifier.clone(), tmp.path().to_path_buf());
    let sessions = SessionStore::new();
    let controller = Controller::new(
        sessions.clone(),
        gateway.clone(),
        notifier.clone(),
        jobs.clone(),
        LIMIT,
    );
    Harness {
        controller,
        sessions,
        notifier,
        gateway,
        jobs,
        _tmp: tmp,
    }
}

fn command(chat_id: i64, command: Command) -> Inbound {
    Inbound {
        chat_id,
        callback_id: None,
        event: Event::Command(command),
    }
}

fn menu(chat_id: i64, choice: MenuChoice) -> Inbound {
    Inbound {
        chat_id,
        callback_id: Some("cb".to_string()),
        event: Event::Menu(choice),
    }
}

fn text(chat_id: i64, body: &str) -> Inbound {
    Inbound {
        chat_id,
        callback_id: None,
        event: Event::Text(body.to_string()),
    }
}

fn pdf_upload(chat_id: i64, name: &str, size: u64) -> Inbound {
    Inbound {
        chat_id,
        callback_id: None,
        event: Event::Upload(Upload {
            kind: UploadKind::Document,
            file_id: format!("id-{name}"),
            unique_id: format!("uid-{name}"),
            file_name: Some(name.to_string()),
            mime_type: Some("application/pdf".to_string()),
            size,
        }),
    }
}

fn photo_upload(chat_id: i64) -> Inbound {
    Inbound {
        chat_id,
        callback_id: None,
        event: Event::Upload(Upload {
            kind: UploadKind::Photo,
            file_id: "photo".to_string(),
            unique_id: "photo-u".to_string(),
            file_name: None,
            mime_type: Some("image/jpeg".to_string()),
            size: 1024,
        }),
    }
}

#[tokio::test]
async fn start_shows_the_main_menu() {
    let h = harness();
    h.controller.dispatch(command(1, Command::Start)).await;

    let log = h.notifier.log().await;
    assert!(matches!(&log[0], Sent::Menu(1, _)));
    assert_eq!(h.controller.state_of(1).await, ChatState::SelectAction);
}

#[tokio::test]
async fn merge_flow_collects_and_submits_on_done() {
    let h = harness();

    h.controller.dispatch(menu(7, MenuChoice::MergePdfs)).await;
    assert_eq!(h.controller.state_of(7).await, ChatState::AwaitingMergeFiles);

    h.controller.dispatch(pdf_upload(7, "a.pdf", 100)).await;
    h.controller.dispatch(pdf_upload(7, "b.pdf", 100)).await;

    let session = h.sessions.snapshot(7).await;
    assert_eq!(session.pending_files.len(), 2);
    let inputs = session.pending_files.clone();
    for path in &inputs {
        assert!(path.exists(), "gateway should have stored {path:?}");
    }

    h.controller.dispatch(command(7, Command::Done)).await;

    // Session is cleared before the job runs, so a new flow can start.
    let session = h.sessions.snapshot(7).await;
    assert_eq!(session.state, ChatState::SelectAction);
    assert!(session.pending_files.is_empty());

    h.jobs.join_all().await;

    // Whatever the conversion's outcome, the inputs are gone and the status
    // message was posted and dropped.
    for path in &inputs {
        assert!(!path.exists(), "input {path:?} must be deleted");
    }
    let log = h.notifier.log().await;
    assert!(log.iter().any(|s| matches!(s, Sent::StatusBegin(7, _))));
    assert!(log.iter().any(|s| matches!(s, Sent::StatusDiscard(7))));
}

#[tokio::test]
async fn done_with_one_merge_file_is_rejected() {
    let h = harness();

    h.controller.dispatch(menu(7, MenuChoice::MergePdfs)).await;
    h.controller.dispatch(pdf_upload(7, "only.pdf", 100)).await;
    h.controller.dispatch(command(7, Command::Done)).await;

    let texts = h.notifier.texts().await;
    assert!(texts.iter().any(|t| t.contains("at least two")));

    let session = h.sessions.snapshot(7).await;
    assert_eq!(session.state, ChatState::AwaitingMergeFiles);
    assert_eq!(session.pending_files.len(), 1);
}

#[tokio::test]
async fn done_outside_a_collection_flow_is_ignored() {
    let h = harness();
    h.controller.dispatch(command(5, Command::Done)).await;
    assert!(h.notifier.log().await.is_empty());
}

#[tokio::test]
async fn oversized_upload_is_rejected_without_download() {
    let h = harness();

    h.controller
        .dispatch(menu(9, MenuChoice::AudioFormat("mp3".to_string())))
        .await;
    assert_eq!(h.controller.state_of(9).await, ChatState::AwaitingAudioFile);

    let mut inbound = pdf_upload(9, "big.mp3", LIMIT + 1);
    if let Event::Upload(upload) = &mut inbound.event {
        upload.kind = UploadKind::Audio;
        upload.mime_type = Some("audio/mpeg".to_string());
    }
    h.controller.dispatch(inbound).await;

    let texts = h.notifier.texts().await;
    assert!(texts.iter().any(|t| t.contains("too large")));
    assert_eq!(h.gateway.fetches.load(Ordering::SeqCst), 0);
    // Rejection leaves the flow where it was.
    assert_eq!(h.controller.state_of(9).await, ChatState::AwaitingAudioFile);
}

#[tokio::test]
async fn wrong_payload_kind_reprompts_without_state_change() {
    let h = harness();

    h.controller.dispatch(menu(3, MenuChoice::MergePdfs)).await;
    h.controller.dispatch(photo_upload(3)).await;

    let texts = h.notifier.texts().await;
    assert!(texts.iter().any(|t| t.contains("PDF document")));
    assert_eq!(h.controller.state_of(3).await, ChatState::AwaitingMergeFiles);
    assert_eq!(h.gateway.fetches.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn split_flow_holds_the_file_until_the_range_arrives() {
    let h = harness();

    h.controller.dispatch(menu(4, MenuChoice::SplitPdf)).await;
    h.controller.dispatch(pdf_upload(4, "doc.pdf", 100)).await;

    assert_eq!(h.controller.state_of(4).await, ChatState::AwaitingSplitRange);
    let held = h.sessions.snapshot(4).await.pending_file.unwrap();
    assert!(held.exists());

    h.controller.dispatch(text(4, "abc")).await;
    assert_eq!(h.controller.state_of(4).await, ChatState::SelectAction);

    h.jobs.join_all().await;

    // The range is garbage, so the job fails validation; the held file is
    // still cleaned up and the status message dropped.
    assert!(!held.exists());
    let log = h.notifier.log().await;
    assert!(log
        .iter()
        .any(|s| matches!(s, Sent::StatusUpdate(4, t) if t.contains("not usable"))));
    assert!(log.iter().any(|s| matches!(s, Sent::StatusDiscard(4))));
}

#[tokio::test]
async fn failed_extraction_leaves_no_files_behind() {
    let h = harness();

    h.controller
        .dispatch(menu(14, MenuChoice::ArchiveExtract))
        .await;
    h.controller.dispatch(pdf_upload(14, "broken.zip", 64)).await;
    assert_eq!(h.controller.state_of(14).await, ChatState::SelectAction);

    h.jobs.join_all().await;

    // The stub wrote garbage, so extraction fails; the input and the
    // scratch output directory must both be gone from the temp dir.
    let mut leftovers = Vec::new();
    let mut entries = tokio::fs::read_dir(h._tmp.path()).await.unwrap();
    while let Some(entry) = entries.next_entry().await.unwrap() {
        leftovers.push(entry.path());
    }
    assert!(
        leftovers.is_empty(),
        "files left after a failed job: {leftovers:?}"
    );

    let log = h.notifier.log().await;
    assert!(log
        .iter()
        .any(|s| matches!(s, Sent::StatusUpdate(14, t) if t.contains("failed") || t.contains("not usable"))));
    assert!(log.iter().any(|s| matches!(s, Sent::StatusDiscard(14))));
}

#[tokio::test]
async fn cancel_abandons_a_collection_mid_flight() {
    let h = harness();

    h.controller.dispatch(menu(6, MenuChoice::MergePdfs)).await;
    h.controller.dispatch(pdf_upload(6, "a.pdf", 100)).await;
    h.controller.dispatch(command(6, Command::Cancel)).await;

    let texts = h.notifier.texts().await;
    assert!(texts.iter().any(|t| t.contains("cancelled")));

    let session = h.sessions.snapshot(6).await;
    assert_eq!(session.state, ChatState::SelectAction);
    assert!(session.pending_files.is_empty());
}

#[tokio::test]
async fn free_text_outside_the_split_flow_is_ignored() {
    let h = harness();
    h.controller.dispatch(text(8, "hello there")).await;
    assert!(h.notifier.log().await.is_empty());
}

#[tokio::test]
async fn collection_stops_accepting_at_the_cap() {
    let h = harness();

    h.controller.dispatch(menu(2, MenuChoice::ArchiveCreate)).await;
    for i in 0..MAX_COLLECTED_FILES {
        h.controller
            .dispatch(pdf_upload(2, &format!("f{i}.txt"), 10))
            .await;
    }
    h.controller
        .dispatch(pdf_upload(2, "one-too-many.txt", 10))
        .await;

    let session = h.sessions.snapshot(2).await;
    assert_eq!(session.pending_files.len(), MAX_COLLECTED_FILES);

    let texts = h.notifier.texts().await;
    assert!(texts.iter().any(|t| t.contains("/done to finish")));
}

#[tokio::test]
async fn sessions_do_not_bleed_between_chats() {
    let h = harness();

    h.controller.dispatch(menu(10, MenuChoice::MergePdfs)).await;
    h.controller.dispatch(menu(11, MenuChoice::CompressPdf)).await;

    assert_eq!(h.controller.state_of(10).await, ChatState::AwaitingMergeFiles);
    assert_eq!(
        h.controller.state_of(11).await,
        ChatState::AwaitingCompressFile
    );
}

#[tokio::test]
async fn feature_commands_open_their_flows_directly() {
    let h = harness();

    h.controller.dispatch(command(12, Command::SplitPdf)).await;
    assert_eq!(h.controller.state_of(12).await, ChatState::AwaitingSplitFile);

    h.controller.dispatch(command(12, Command::Cancel)).await;
    h.controller.dispatch(command(12, Command::ImagesToPdf)).await;
    assert_eq!(
        h.controller.state_of(12).await,
        ChatState::AwaitingImagesForPdf
    );
}

#[tokio::test]
async fn starting_a_new_flow_discards_the_previous_one() {
    let h = harness();

    h.controller.dispatch(menu(13, MenuChoice::MergePdfs)).await;
    h.controller.dispatch(pdf_upload(13, "a.pdf", 100)).await;
    h.controller.dispatch(menu(13, MenuChoice::CompressPdf)).await;

    let session = h.sessions.snapshot(13).await;
    assert_eq!(session.state, ChatState::AwaitingCompressFile);
    assert!(session.pending_files.is_empty());
}
