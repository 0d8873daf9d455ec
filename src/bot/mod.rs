//! Conversation core: boundary decoding, per-chat sessions, and the state
//! machine that routes events to conversion jobs.

mod controller;
mod event;
mod menus;
mod session;

pub use controller::{Controller, MAX_COLLECTED_FILES};
pub use event::{decode_update, Command, Event, Inbound, MenuChoice, Upload, UploadKind};
pub use menus::{archive_menu, audio_format_menu, main_menu, pdf_format_menu, video_format_menu};
pub use session::{ChatState, Session, SessionStore};
