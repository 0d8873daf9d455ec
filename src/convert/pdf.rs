//! PDF workers: page rendering, merge, split, compress.
//!
//! Rendering goes through `pdftoppm`, page surgery through `qpdf`, and
//! compression through Ghostscript.

use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::convert::{discard, run_tool, tool_args, ImageFormat};
use crate::error::ConvertError;

/// Render every page of a PDF to an image file.
///
/// Output files land next to `prefix` as `<prefix>-<page>.<ext>` and are
/// returned in page order.
pub async fn pdf_to_images(
    input: &Path,
    format: ImageFormat,
    out_dir: &Path,
    prefix: &str,
) -> Result<Vec<PathBuf>, ConvertError> {
    let format_flag = match format {
        ImageFormat::Jpeg => "-jpeg",
        ImageFormat::Png => "-png",
    };
    let out_prefix = out_dir.join(prefix);

    if let Err(e) = run_tool(
        "pdftoppm",
        tool_args!["-r", "200", format_flag, input, out_prefix],
    )
    .await
    {
        // A render that died partway may have written some pages already.
        sweep_pages(out_dir, prefix).await;
        return Err(e);
    }

    // pdftoppm zero-pads page numbers, so a name sort is page order.
    let mut pages = Vec::new();
    let mut entries = tokio::fs::read_dir(out_dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(prefix) && name.ends_with(format.extension()) {
            pages.push(entry.path());
        }
    }
    pages.sort();

    if pages.is_empty() {
        return Err(ConvertError::MissingOutput {
            tool: "pdftoppm",
            path: out_prefix,
        });
    }
    Ok(pages)
}

/// Best-effort removal of every page file carrying the given prefix.
async fn sweep_pages(out_dir: &Path, prefix: &str) {
    let Ok(mut entries) = tokio::fs::read_dir(out_dir).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_name().to_string_lossy().starts_with(prefix) {
            let _ = tokio::fs::remove_file(entry.path()).await;
        }
    }
}

/// Concatenate two or more PDFs into `output`, in the given order.
pub async fn merge_pdfs(inputs: &[PathBuf], output: &Path) -> Result<(), ConvertError> {
    let mut args: Vec<&OsStr> = vec!["--empty".as_ref(), "--pages".as_ref()];
    for input in inputs {
        args.push(input.as_os_str());
    }
    args.push("--".as_ref());
    args.push(output.as_os_str());

    if let Err(e) = run_tool("qpdf", &args).await {
        discard(output).await;
        return Err(e);
    }
    Ok(())
}

/// Parse a user-supplied page-range expression into a sorted, deduplicated
/// set of zero-indexed page numbers.
///
/// The surface syntax is 1-indexed: `"2-5"` means pages 2 through 5
/// inclusive, `"1,3,8"` individual pages, and the two can mix.
pub fn parse_page_range(expr: &str) -> Result<Vec<usize>, ConvertError> {
    let invalid = |reason: &str| ConvertError::InvalidPageRange {
        input: expr.to_string(),
        reason: reason.to_string(),
    };

    let mut pages = BTreeSet::new();
    for part in expr.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err(invalid("empty segment"));
        }

        if let Some((start, end)) = part.split_once('-') {
            let start: usize = start
                .trim()
                .parse()
                .map_err(|_| invalid("expected a number"))?;
            let end: usize = end
                .trim()
                .parse()
                .map_err(|_| invalid("expected a number"))?;
            if start == 0 || end == 0 {
                return Err(invalid("pages are numbered from 1"));
            }
            if start > end {
                return Err(invalid("range start is after its end"));
            }
            for page in start..=end {
                pages.insert(page - 1);
            }
        } else {
            let page: usize = part.parse().map_err(|_| invalid("expected a number"))?;
            if page == 0 {
                return Err(invalid("pages are numbered from 1"));
            }
            pages.insert(page - 1);
        }
    }

    Ok(pages.into_iter().collect())
}

/// Extract the requested pages of a PDF into `output`.
///
/// Pages beyond the end of the document are dropped; at least one page must
/// survive or the request fails as a validation error.
pub async fn split_pdf(
    input: &Path,
    range_expr: &str,
    output: &Path,
) -> Result<(), ConvertError> {
    let requested = parse_page_range(range_expr)?;

    let page_count = page_count(input).await?;
    let surviving: Vec<usize> = requested.into_iter().filter(|&p| p < page_count).collect();
    if surviving.is_empty() {
        return Err(ConvertError::NoPagesMatched);
    }

    // qpdf's page selection is 1-indexed.
    let selection = surviving
        .iter()
        .map(|p| (p + 1).to_string())
        .collect::<Vec<_>>()
        .join(",");

    if let Err(e) = run_tool(
        "qpdf",
        tool_args!["--empty", "--pages", input, selection, "--", output],
    )
    .await
    {
        discard(output).await;
        return Err(e);
    }
    Ok(())
}

/// Rewrite a PDF through Ghostscript to shrink it.
pub async fn compress_pdf(input: &Path, output: &Path) -> Result<(), ConvertError> {
    let out_flag = {
        let mut flag = std::ffi::OsString::from("-sOutputFile=");
        flag.push(output);
        flag
    };

    if let Err(e) = run_tool(
        "gs",
        tool_args![
            "-sDEVICE=pdfwrite",
            "-dCompatibilityLevel=1.4",
            "-dPDFSETTINGS=/ebook",
            "-dNOPAUSE",
            "-dQUIET",
            "-dBATCH",
            out_flag,
            input,
        ],
    )
    .await
    {
        discard(output).await;
        return Err(e);
    }
    Ok(())
}

/// Number of pages in a PDF, via `qpdf --show-npages`.
async fn page_count(input: &Path) -> Result<usize, ConvertError> {
    let output = run_tool("qpdf", tool_args!["--show-npages", input]).await?;
    let text = String::from_utf8_lossy(&output.stdout);
    text.trim().parse().map_err(|_| ConvertError::Tool {
        tool: "qpdf",
        stderr: format!("unparseable page count: {}", text.trim()),
    })
}
