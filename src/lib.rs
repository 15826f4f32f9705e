//! Ulysses Relay — publish note exports to Telegram.

pub mod archive;
pub mod channels;
pub mod config;
pub mod content;
pub mod dispatch;
pub mod error;
pub mod markup;
pub mod server;
