//! Inline keyboards and user-facing copy.

use crate::bot::event::MenuChoice;
use crate::convert::media::{AUDIO_FORMATS, VIDEO_FORMATS};
use crate::convert::ImageFormat;
use crate::telegram::{InlineKeyboardButton, InlineKeyboardMarkup};

/// Buttons per row in format grids.
const GRID_COLUMNS: usize = 3;

fn button(label: &str, choice: MenuChoice) -> InlineKeyboardButton {
    InlineKeyboardButton::new(label, choice.callback_data())
}

fn back_row() -> Vec<InlineKeyboardButton> {
    vec![button("⬅️ Back", MenuChoice::MainMenu)]
}

/// The main action menu shown on `/start`.
pub fn main_menu() -> InlineKeyboardMarkup {
    let rows = vec![
        vec![button("📄 PDF → images", MenuChoice::PdfToImages)],
        vec![button("🖇️ Merge PDFs", MenuChoice::MergePdfs)],
        vec![button("✂️ Split PDF", MenuChoice::SplitPdf)],
        vec![button("📦 Compress PDF", MenuChoice::CompressPdf)],
        vec![button("🖼️ Images → PDF", MenuChoice::ImagesToPdf)],
        vec![button("📖 Image → text", MenuChoice::ImageToText)],
        vec![button("🎵 Convert audio", MenuChoice::AudioConverter)],
        vec![button("🎬 Convert video", MenuChoice::VideoConverter)],
        vec![button("🗜️ Archives", MenuChoice::ArchiveManager)],
    ];
    InlineKeyboardMarkup {
        inline_keyboard: rows,
    }
}

/// Output format menu for PDF→image.
pub fn pdf_format_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![
            vec![button("➡️ JPG", MenuChoice::PdfImageFormat(ImageFormat::Jpeg))],
            vec![button("➡️ PNG", MenuChoice::PdfImageFormat(ImageFormat::Png))],
            back_row(),
        ],
    }
}

/// Lay format buttons out in a grid, with a back row at the bottom.
fn format_grid(formats: &[&str], choice: impl Fn(&str) -> MenuChoice) -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = formats
        .iter()
        .map(|fmt| button(&fmt.to_uppercase(), choice(fmt)))
        .collect();

    let mut rows: Vec<Vec<InlineKeyboardButton>> = buttons
        .chunks(GRID_COLUMNS)
        .map(|chunk| chunk.to_vec())
        .collect();
    rows.push(back_row());

    InlineKeyboardMarkup {
        inline_keyboard: rows,
    }
}

/// Output format menu for audio transcoding.
pub fn audio_format_menu() -> InlineKeyboardMarkup {
    format_grid(&AUDIO_FORMATS, |fmt| {
        MenuChoice::AudioFormat(fmt.to_string())
    })
}

/// Output format menu for video transcoding.
pub fn video_format_menu() -> InlineKeyboardMarkup {
    format_grid(&VIDEO_FORMATS, |fmt| {
        MenuChoice::VideoFormat(fmt.to_string())
    })
}

/// The archive sub-menu.
pub fn archive_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![
            vec![button("➕ Create ZIP", MenuChoice::ArchiveCreate)],
            vec![button("➖ Extract archive", MenuChoice::ArchiveExtract)],
            back_row(),
        ],
    }
}

/// Static `/help` text.
pub fn help_text() -> &'static str {
    "Hi! I convert files. Pick an action from /start, or jump straight in:\n\
     \n\
     /pdf_to_img - render PDF pages as images\n\
     /merge_pdf - merge several PDFs into one\n\
     /split_pdf - extract pages from a PDF\n\
     /compress_pdf - shrink a PDF\n\
     /img_to_pdf - combine images into a PDF\n\
     /img_to_text - extract text from an image\n\
     /audio_converter - change an audio file's format\n\
     /video_converter - change a video file's format\n\
     /archive_manager - create or extract archives\n\
     \n\
     /done - finish sending files\n\
     /cancel - abandon the current operation\n\
     /help - show this message again"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn main_menu_covers_all_nine_features() {
        assert_eq!(main_menu().inline_keyboard.len(), 9);
    }

    #[test]
    fn format_grids_have_three_columns_and_a_back_row() {
        let menu = audio_format_menu();
        // 11 formats -> 3+3+3+2, plus the back row.
        assert_eq!(menu.inline_keyboard.len(), 5);
        assert_eq!(menu.inline_keyboard[0].len(), 3);
        assert_eq!(menu.inline_keyboard[3].len(), 2);

        let back = &menu.inline_keyboard[4][0];
        assert_eq!(back.callback_data, "main_menu");
    }

    #[test]
    fn grid_buttons_decode_back_to_their_choice() {
        for row in video_format_menu().inline_keyboard {
            for btn in row {
                assert!(
                    crate::bot::event::MenuChoice::parse(&btn.callback_data).is_some(),
                    "undecodable callback data: {}",
                    btn.callback_data
                );
            }
        }
    }
}
