//! # tolmach-channels
//!
//! Messaging platform integrations for Tolmach.

pub mod telegram;

pub use telegram::TelegramChannel;
