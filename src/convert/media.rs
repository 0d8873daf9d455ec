//! Audio/video transcoding through ffmpeg.

use std::path::Path;

use crate::convert::{discard, run_tool, tool_args};
use crate::error::ConvertError;

/// Output formats offered in the audio menu.
pub const AUDIO_FORMATS: [&str; 11] = [
    "aac", "aiff", "flac", "m4a", "m4r", "mmf", "mp3", "ogg", "opus", "wav", "wma",
];

/// Output formats offered in the video menu.
pub const VIDEO_FORMATS: [&str; 11] = [
    "3g2", "3gp", "avi", "flv", "mkv", "mov", "mp4", "mpg", "ogv", "webm", "wmv",
];

/// Transcode a media file; the target format is taken from the output
/// path's extension, which is how ffmpeg picks its muxer.
pub async fn transcode(input: &Path, output: &Path) -> Result<(), ConvertError> {
    if let Err(e) = run_tool("ffmpeg", tool_args!["-y", "-i", input, output]).await {
        discard(output).await;
        return Err(e);
    }
    Ok(())
}
