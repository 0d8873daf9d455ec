//! Conversion workers.
//!
//! One worker per conversion kind, all backed by external command-line tools
//! invoked as subprocesses. A worker takes local input path(s) plus
//! parameters and produces an [`Artifact`] or a [`ConvertError`] whose text
//! is fit for showing to the user.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::Output;

use tokio::process::Command;

use crate::error::ConvertError;

pub mod archive;
pub mod image;
pub mod media;
pub mod pdf;

/// Target image format for PDF page rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    /// File extension for rendered pages.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }

    /// Name stored in the session / shown in prompts.
    pub fn as_str(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "jpeg" => Some(ImageFormat::Jpeg),
            "png" => Some(ImageFormat::Png),
            _ => None,
        }
    }
}

/// The product of a successful conversion, ready to send to the user.
#[derive(Debug)]
pub enum Artifact {
    /// A single document with a presentation file name.
    Document { path: PathBuf, file_name: String },
    /// Rendered page images, in page order.
    Photos { paths: Vec<PathBuf> },
    /// A transcoded audio file.
    Audio { path: PathBuf },
    /// A transcoded video file.
    Video { path: PathBuf },
    /// Files extracted from an archive, plus the scratch directory holding them.
    Extracted { dir: PathBuf, files: Vec<PathBuf> },
    /// Text extracted by OCR.
    Text { content: String },
}

impl Artifact {
    /// Everything on disk that belongs to this artifact and must be deleted
    /// once the job is over.
    pub fn cleanup_paths(&self) -> Vec<PathBuf> {
        match self {
            Artifact::Document { path, .. }
            | Artifact::Audio { path }
            | Artifact::Video { path } => vec![path.clone()],
            Artifact::Photos { paths } => paths.clone(),
            Artifact::Extracted { dir, .. } => vec![dir.clone()],
            Artifact::Text { .. } => Vec::new(),
        }
    }
}

/// Run an external tool to completion, mapping a non-zero exit to
/// [`ConvertError::Tool`] with the tool's stderr as the cause.
pub(crate) async fn run_tool(
    tool: &'static str,
    args: &[&OsStr],
) -> Result<Output, ConvertError> {
    tracing::debug!(tool, ?args, "running external tool");

    let output = Command::new(tool)
        .args(args)
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|source| ConvertError::Spawn { tool, source })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        let stderr = if stderr.is_empty() {
            format!("exited with {}", output.status)
        } else {
            stderr
        };
        return Err(ConvertError::Tool { tool, stderr });
    }

    Ok(output)
}

/// Best-effort removal of a partial output after a failed conversion.
pub(crate) async fn discard(path: &Path) {
    let _ = tokio::fs::remove_file(path).await;
}

/// Convenience for building `&[&OsStr]` argument slices.
macro_rules! tool_args {
    ($($arg:expr),* $(,)?) => {
        &[$(AsRef::<std::ffi::OsStr>::as_ref(&$arg)),*]
    };
}
pub(crate) use tool_args;
