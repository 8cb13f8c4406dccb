//! Telegram Bot API channel.
//!
//! Uses long polling via `getUpdates`; replies go out through `sendMessage`
//! or the matching `send<Media>` method when media is re-sent.
//! Docs: <https://core.telegram.org/bots/api>

mod polling;
pub(crate) mod send;
pub(crate) mod types;


use std::sync::Arc;
use tokio::sync::Mutex;
use tolmach_core::config::TelegramConfig;

const API_ROOT: &str = "https://api.telegram.org";

/// Telegram channel using the Bot API with long polling.
pub struct TelegramChannel {
    config: TelegramConfig,
    client: reqwest::Client,
    base_url: String,
    /// Tracks the last update_id to avoid reprocessing.
    last_update_id: Arc<Mutex<Option<i64>>>,
}

impl TelegramChannel {
    /// Create a new Telegram channel from config.
    pub fn new(config: TelegramConfig) -> Self {
        Self::with_api_root(config, API_ROOT)
    }

    /// Same as [`new`](Self::new) against a different API host.
    pub fn with_api_root(config: TelegramConfig, api_root: &str) -> Self {
        let base_url = format!(
            "{}/bot{}",
            api_root.trim_end_matches('/'),
            config.bot_token
        );
        Self {
            config,
            client: reqwest::Client::new(),
            base_url,
            last_update_id: Arc::new(Mutex::new(None)),
        }
    }
}
