//! filewright - a Telegram bot that converts files.
//!
//! Users pick an action from an inline menu, upload the required files and
//! parameters, and get the converted result back. The conversation logic is a
//! per-chat state machine ([`bot::Controller`]); the actual conversions are
//! delegated to external command-line tools and run as background jobs that
//! always clean up after themselves ([`jobs`]).

pub mod bot;
pub mod config;
pub mod convert;
pub mod error;
pub mod gateway;
pub mod jobs;
pub mod notify;
pub mod server;
pub mod telegram;
