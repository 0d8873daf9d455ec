//! Archive workers: ZIP creation and ZIP/TAR extraction.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::convert::{discard, run_tool, tool_args};
use crate::error::ConvertError;

/// Pack the given files into a ZIP archive, flattening directories away.
pub async fn create_zip(inputs: &[PathBuf], output: &Path) -> Result<(), ConvertError> {
    let mut args: Vec<&OsStr> = vec!["-j".as_ref(), output.as_os_str()];
    args.extend(inputs.iter().map(|p| p.as_os_str()));

    if let Err(e) = run_tool("zip", &args).await {
        discard(output).await;
        return Err(e);
    }
    Ok(())
}

/// Which extractor an archive name calls for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArchiveKind {
    Zip,
    Tar,
    TarGz,
}

fn classify(name: &str) -> Option<ArchiveKind> {
    let lower = name.to_lowercase();
    if lower.ends_with(".zip") {
        Some(ArchiveKind::Zip)
    } else if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
        Some(ArchiveKind::TarGz)
    } else if lower.ends_with(".tar") {
        Some(ArchiveKind::Tar)
    } else {
        None
    }
}

/// Extract an archive into `dest_dir` and return the extracted regular
/// files, sorted by name.
///
/// Only the top level of the extracted tree is reported, matching what the
/// bot is willing to send back. An unsupported extension or an archive that
/// yields nothing is a validation error.
pub async fn extract_archive(
    input: &Path,
    dest_dir: &Path,
) -> Result<Vec<PathBuf>, ConvertError> {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let kind = classify(&name).ok_or(ConvertError::UnsupportedArchive { name })?;

    tokio::fs::create_dir_all(dest_dir).await?;

    // The scratch directory exists from here on; a failed extraction must
    // not leave it (or any partial contents) behind.
    match run_extractor(kind, input, dest_dir).await {
        Ok(files) => Ok(files),
        Err(e) => {
            let _ = tokio::fs::remove_dir_all(dest_dir).await;
            Err(e)
        }
    }
}

async fn run_extractor(
    kind: ArchiveKind,
    input: &Path,
    dest_dir: &Path,
) -> Result<Vec<PathBuf>, ConvertError> {
    match kind {
        ArchiveKind::Zip => {
            run_tool("unzip", tool_args!["-o", input, "-d", dest_dir]).await?;
        }
        ArchiveKind::TarGz => {
            run_tool("tar", tool_args!["-xzf", input, "-C", dest_dir]).await?;
        }
        ArchiveKind::Tar => {
            run_tool("tar", tool_args!["-xf", input, "-C", dest_dir]).await?;
        }
    }

    let mut entries = tokio::fs::read_dir(dest_dir).await?;
    let mut files = Vec::new();
    let mut any_entry = false;
    while let Some(entry) = entries.next_entry().await? {
        any_entry = true;
        if entry.file_type().await?.is_file() {
            files.push(entry.path());
        }
    }
    if !any_entry {
        return Err(ConvertError::EmptyArchive);
    }
    files.sort();
    Ok(files)
}
