//! Image workers: image→PDF batching and OCR.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::convert::{discard, run_tool, tool_args};
use crate::error::ConvertError;

/// Combine one or more images into a single PDF, preserving order.
///
/// Delegates to ImageMagick; one image per page.
pub async fn images_to_pdf(inputs: &[PathBuf], output: &Path) -> Result<(), ConvertError> {
    let mut args: Vec<&OsStr> = inputs.iter().map(|p| p.as_os_str()).collect();
    args.push(output.as_os_str());

    if let Err(e) = run_tool("magick", &args).await {
        discard(output).await;
        return Err(e);
    }
    Ok(())
}

/// Extract text from an image with Tesseract OCR.
///
/// Returns whatever the engine produced; callers decide how to present an
/// effectively blank result.
pub async fn image_to_text(input: &Path) -> Result<String, ConvertError> {
    let output = run_tool(
        "tesseract",
        tool_args![input, "stdout", "-l", "khm+eng"],
    )
    .await?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
