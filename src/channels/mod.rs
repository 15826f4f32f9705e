//! Messaging platform clients.

pub mod client;
pub mod telegram;

pub use client::*;
pub use telegram::{BotInfo, TelegramClient};
