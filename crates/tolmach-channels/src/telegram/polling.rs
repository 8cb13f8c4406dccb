//! Long-polling update loop and Channel trait implementation.

use super::types::{TgResponse, TgUpdate};
use super::TelegramChannel;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tolmach_core::{
    error::TolmachError,
    message::{OutgoingMessage, Update},
    traits::Channel,
};
use tracing::{debug, error, info, warn};

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn start(&self) -> Result<mpsc::Receiver<Update>, TolmachError> {
        self.register_commands().await;

        let (tx, rx) = mpsc::channel(64);
        let client = self.client.clone();
        let base_url = self.base_url.clone();
        let allowed_users = self.config.allowed_users.clone();
        let last_update_id = self.last_update_id.clone();

        info!("Telegram channel starting long polling...");

        tokio::spawn(async move {
            let mut backoff_secs: u64 = 1;

            loop {
                let last = last_update_id.lock().await;
                let offset = last.map(|id| id + 1);
                drop(last);

                let mut url = format!("{base_url}/getUpdates?timeout=30");
                if let Some(off) = offset {
                    url.push_str(&format!("&offset={off}"));
                }

                let resp = match client
                    .get(&url)
                    .timeout(Duration::from_secs(35))
                    .send()
                    .await
                {
                    Ok(r) => r,
                    Err(e) => {
                        error!("telegram poll error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                let body: TgResponse<Vec<TgUpdate>> = match resp.json().await {
                    Ok(b) => b,
                    Err(e) => {
                        error!("telegram parse error (retry in {backoff_secs}s): {e}");
                        tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                        backoff_secs = (backoff_secs * 2).min(60);
                        continue;
                    }
                };

                if !body.ok {
                    error!(
                        "telegram API error (retry in {backoff_secs}s): {}",
                        body.description.unwrap_or_default()
                    );
                    tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
                    backoff_secs = (backoff_secs * 2).min(60);
                    continue;
                }

                // Successful poll, reset backoff.
                backoff_secs = 1;

                let updates = body.result.unwrap_or_default();

                if let Some(last_update) = updates.last() {
                    *last_update_id.lock().await = Some(last_update.update_id);
                }

                for update in updates {
                    let Some(update) = accept(update, &allowed_users) else {
                        continue;
                    };
                    if tx.send(update).await.is_err() {
                        info!("telegram channel receiver dropped, stopping poll");
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), TolmachError> {
        let chat_id = parse_chat_id(message.reply_target.as_deref())?;
        match message.media.clone() {
            Some(media) => self.send_media(chat_id, &media, &message).await,
            None => self.send_text(chat_id, &message).await,
        }
    }

    async fn answer_callback(&self, callback_id: &str, text: &str) -> Result<(), TolmachError> {
        self.answer_callback_query(callback_id, text).await
    }

    async fn stop(&self) -> Result<(), TolmachError> {
        info!("Telegram channel stopped");
        Ok(())
    }
}

/// Filter one raw update: known sender, allow-listed, private chat.
pub(super) fn accept(update: TgUpdate, allowed_users: &[i64]) -> Option<Update> {
    let Some(sender) = update.sender_id() else {
        debug!("telegram: skipping update {} without sender", update.update_id);
        return None;
    };

    // Auth check.
    if !allowed_users.is_empty() && !allowed_users.contains(&sender) {
        warn!("ignoring update from unauthorized user {sender}");
        return None;
    }

    // Person-to-person only.
    if update.is_group() {
        debug!("telegram: ignoring group update from user {sender}");
        return None;
    }

    update.into_update()
}

pub(super) fn parse_chat_id(target: Option<&str>) -> Result<i64, TolmachError> {
    let target =
        target.ok_or_else(|| TolmachError::Channel("no reply_target on outgoing message".into()))?;
    target
        .parse()
        .map_err(|e| TolmachError::Channel(format!("invalid telegram chat_id '{target}': {e}")))
}
