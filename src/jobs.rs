//! Background conversion jobs.
//!
//! Every job, whatever its kind, runs the same shape: post a status message,
//! run the worker, report success or failure, then unconditionally clean up
//! every input and output and drop the status message. Cleanup failures are
//! swallowed; a job's errors are terminal for that job only.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::convert::{self, Artifact, ImageFormat};
use crate::error::ConvertError;
use crate::notify::Notifier;

/// What one job is asked to do, with owned copies of every path.
#[derive(Debug, Clone)]
pub enum ConversionRequest {
    PdfToImages { input: PathBuf, format: ImageFormat },
    MergePdfs { inputs: Vec<PathBuf> },
    SplitPdf { input: PathBuf, range: String },
    CompressPdf { input: PathBuf },
    ImagesToPdf { inputs: Vec<PathBuf> },
    ImageToText { input: PathBuf },
    TranscodeAudio { input: PathBuf, format: String },
    TranscodeVideo { input: PathBuf, format: String },
    CreateZip { inputs: Vec<PathBuf> },
    ExtractArchive { input: PathBuf },
}

impl ConversionRequest {
    /// The input resources this job owns and must delete when it is done.
    pub fn input_paths(&self) -> Vec<PathBuf> {
        match self {
            ConversionRequest::PdfToImages { input, .. }
            | ConversionRequest::SplitPdf { input, .. }
            | ConversionRequest::CompressPdf { input }
            | ConversionRequest::ImageToText { input }
            | ConversionRequest::TranscodeAudio { input, .. }
            | ConversionRequest::TranscodeVideo { input, .. }
            | ConversionRequest::ExtractArchive { input } => vec![input.clone()],
            ConversionRequest::MergePdfs { inputs }
            | ConversionRequest::ImagesToPdf { inputs }
            | ConversionRequest::CreateZip { inputs } => inputs.clone(),
        }
    }

    /// Short label for logs.
    fn kind(&self) -> &'static str {
        match self {
            ConversionRequest::PdfToImages { .. } => "pdf_to_images",
            ConversionRequest::MergePdfs { .. } => "merge_pdfs",
            ConversionRequest::SplitPdf { .. } => "split_pdf",
            ConversionRequest::CompressPdf { .. } => "compress_pdf",
            ConversionRequest::ImagesToPdf { .. } => "images_to_pdf",
            ConversionRequest::ImageToText { .. } => "image_to_text",
            ConversionRequest::TranscodeAudio { .. } => "transcode_audio",
            ConversionRequest::TranscodeVideo { .. } => "transcode_video",
            ConversionRequest::CreateZip { .. } => "create_zip",
            ConversionRequest::ExtractArchive { .. } => "extract_archive",
        }
    }
}

/// A request bound to the chat that asked for it.
#[derive(Debug, Clone)]
pub struct ConversionJob {
    pub chat_id: i64,
    pub request: ConversionRequest,
}

/// Spawns jobs and retains their handles so nothing leaks silently.
#[derive(Clone)]
pub struct JobRunner {
    notifier: Arc<dyn Notifier>,
    temp_dir: PathBuf,
    handles: Arc<Mutex<HashMap<Uuid, JoinHandle<()>>>>,
}

impl JobRunner {
    pub fn new(notifier: Arc<dyn Notifier>, temp_dir: PathBuf) -> Self {
        Self {
            notifier,
            temp_dir,
            handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Submit a job and return immediately. The job runs concurrently with
    /// event handling; a later `/cancel` does not touch it.
    pub async fn submit(&self, job: ConversionJob) -> Uuid {
        let id = Uuid::new_v4();
        let notifier = Arc::clone(&self.notifier);
        let temp_dir = self.temp_dir.clone();

        tracing::info!(job_id = %id, chat_id = job.chat_id, kind = job.request.kind(), "job submitted");
        let handle = tokio::spawn(run_job(notifier, temp_dir, job));

        let mut handles = self.handles.lock().await;
        handles.retain(|_, h| !h.is_finished());
        handles.insert(id, handle);
        id
    }

    /// Wait for every outstanding job. Used on shutdown and in tests.
    pub async fn join_all(&self) {
        let drained: Vec<JoinHandle<()>> = {
            let mut handles = self.handles.lock().await;
            handles.drain().map(|(_, h)| h).collect()
        };
        futures::future::join_all(drained).await;
    }
}

/// Run the conversion for one job and wrap the result as a sendable artifact.
async fn execute(
    request: &ConversionRequest,
    chat_id: i64,
    temp_dir: &Path,
) -> Result<Artifact, ConvertError> {
    // Output names embed the chat id and a fresh tag so parallel jobs never
    // collide in the shared temp directory.
    let tag = Uuid::new_v4();

    match request {
        ConversionRequest::PdfToImages { input, format } => {
            let prefix = format!("pages_{chat_id}_{tag}");
            let paths = convert::pdf::pdf_to_images(input, *format, temp_dir, &prefix).await?;
            Ok(Artifact::Photos { paths })
        }
        ConversionRequest::MergePdfs { inputs } => {
            let output = temp_dir.join(format!("merged_{chat_id}_{tag}.pdf"));
            convert::pdf::merge_pdfs(inputs, &output).await?;
            Ok(Artifact::Document {
                path: output,
                file_name: "Merged.pdf".to_string(),
            })
        }
        ConversionRequest::SplitPdf { input, range } => {
            let output = temp_dir.join(format!("split_{chat_id}_{tag}.pdf"));
            convert::pdf::split_pdf(input, range, &output).await?;
            Ok(Artifact::Document {
                path: output,
                file_name: "Split.pdf".to_string(),
            })
        }
        ConversionRequest::CompressPdf { input } => {
            let output = temp_dir.join(format!("compressed_{chat_id}_{tag}.pdf"));
            convert::pdf::compress_pdf(input, &output).await?;
            Ok(Artifact::Document {
                path: output,
                file_name: "Compressed.pdf".to_string(),
            })
        }
        ConversionRequest::ImagesToPdf { inputs } => {
            let output = temp_dir.join(format!("images_{chat_id}_{tag}.pdf"));
            convert::image::images_to_pdf(inputs, &output).await?;
            Ok(Artifact::Document {
                path: output,
                file_name: "Image_to_PDF.pdf".to_string(),
            })
        }
        ConversionRequest::ImageToText { input } => {
            let content = convert::image::image_to_text(input).await?;
            Ok(Artifact::Text { content })
        }
        ConversionRequest::TranscodeAudio { input, format } => {
            let output = temp_dir.join(format!("converted_{chat_id}_{tag}.{format}"));
            convert::media::transcode(input, &output).await?;
            Ok(Artifact::Audio { path: output })
        }
        ConversionRequest::TranscodeVideo { input, format } => {
            let output = temp_dir.join(format!("converted_{chat_id}_{tag}.{format}"));
            convert::media::transcode(input, &output).await?;
            Ok(Artifact::Video { path: output })
        }
        ConversionRequest::CreateZip { inputs } => {
            let output = temp_dir.join(format!("archive_{chat_id}_{tag}.zip"));
            convert::archive::create_zip(inputs, &output).await?;
            Ok(Artifact::Document {
                path: output,
                file_name: "archive.zip".to_string(),
            })
        }
        ConversionRequest::ExtractArchive { input } => {
            let dir = temp_dir.join(format!("extracted_{chat_id}_{tag}"));
            let files = convert::archive::extract_archive(input, &dir).await?;
            Ok(Artifact::Extracted { dir, files })
        }
    }
}

/// The uniform job body: status, convert, report, then guaranteed cleanup.
pub(crate) async fn run_job(notifier: Arc<dyn Notifier>, temp_dir: PathBuf, job: ConversionJob) {
    let ConversionJob { chat_id, request } = job;
    let kind = request.kind();
    let started = std::time::Instant::now();

    // Step 1: progress message, best effort.
    let ticket = match notifier.begin_status(chat_id, "Got it, working on it...").await {
        Ok(ticket) => Some(ticket),
        Err(e) => {
            tracing::warn!(chat_id, kind, error = %e, "could not post status message");
            None
        }
    };

    // Step 2: convert and report.
    let inputs = request.input_paths();
    let result = execute(&request, chat_id, &temp_dir).await;

    let outputs = match result {
        Ok(artifact) => {
            let outputs = artifact.cleanup_paths();
            if let Some(ticket) = &ticket {
                let _ = notifier.update_status(ticket, "Done! Sending the result...").await;
            }
            if let Err(e) = deliver(&*notifier, chat_id, &artifact).await {
                tracing::warn!(chat_id, kind, error = %e, "failed to deliver result");
                if let Some(ticket) = &ticket {
                    let _ = notifier
                        .update_status(ticket, "Converted, but sending the result failed.")
                        .await;
                }
            } else {
                tracing::info!(chat_id, kind, elapsed_ms = started.elapsed().as_millis() as u64, "job finished");
            }
            outputs
        }
        Err(e) => {
            tracing::warn!(chat_id, kind, error = %e, "job failed");
            if let Some(ticket) = &ticket {
                let _ = notifier.update_status(ticket, &failure_text(&e)).await;
            }
            Vec::new()
        }
    };

    // Step 3: unconditional cleanup; every failure here is swallowed.
    for path in &inputs {
        let _ = tokio::fs::remove_file(path).await;
    }
    for path in &outputs {
        if path.is_dir() {
            let _ = tokio::fs::remove_dir_all(path).await;
        } else {
            let _ = tokio::fs::remove_file(path).await;
        }
    }
    if let Some(ticket) = &ticket {
        notifier.discard_status(ticket).await;
    }
}

/// Send the artifact(s) to the chat.
async fn deliver(
    notifier: &dyn Notifier,
    chat_id: i64,
    artifact: &Artifact,
) -> Result<(), crate::error::TelegramError> {
    match artifact {
        Artifact::Document { path, file_name } => {
            notifier.send_document(chat_id, path, file_name).await
        }
        Artifact::Photos { paths } => {
            for path in paths {
                notifier.send_photo(chat_id, path).await?;
            }
            Ok(())
        }
        Artifact::Audio { path } => notifier.send_audio(chat_id, path).await,
        Artifact::Video { path } => notifier.send_video(chat_id, path).await,
        Artifact::Extracted { files, .. } => {
            for path in files {
                let name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "file".to_string());
                notifier.send_document(chat_id, path, &name).await?;
            }
            Ok(())
        }
        Artifact::Text { content } => {
            if content.trim().is_empty() {
                notifier
                    .send_text(chat_id, "No text could be found in that image.")
                    .await
            } else {
                notifier.send_text(chat_id, content.trim()).await
            }
        }
    }
}

/// Human-readable failure message, naming the kind of failure.
fn failure_text(error: &ConvertError) -> String {
    if error.is_validation() {
        format!("That input is not usable: {error}")
    } else {
        format!("Conversion failed: {error}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn input_paths_cover_every_variant() {
        let single = ConversionRequest::CompressPdf {
            input: PathBuf::from("/tmp/a.pdf"),
        };
        assert_eq!(single.input_paths(), vec![PathBuf::from("/tmp/a.pdf")]);

        let multi = ConversionRequest::MergePdfs {
            inputs: vec![PathBuf::from("/tmp/a.pdf"), PathBuf::from("/tmp/b.pdf")],
        };
        assert_eq!(multi.input_paths().len(), 2);
    }

    #[test]
    fn validation_failures_read_differently_from_tool_failures() {
        let validation = failure_text(&ConvertError::NoPagesMatched);
        assert!(validation.starts_with("That input is not usable"));

        let tool = failure_text(&ConvertError::Tool {
            tool: "ffmpeg",
            stderr: "unknown codec".to_string(),
        });
        assert!(tool.starts_with("Conversion failed"));
        assert!(tool.contains("unknown codec"));
    }
}
