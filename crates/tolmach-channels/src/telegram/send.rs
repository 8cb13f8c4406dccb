//! Outbound calls: text, media re-sends, callback answers, command menu.

use super::TelegramChannel;
use serde_json::{json, Value};
use tolmach_core::{
    error::TolmachError,
    message::{Button, Media, MediaKind, OutgoingMessage},
};
use tracing::{debug, info, warn};

/// `sendMessage` text limit, in bytes.
const MAX_TEXT_LEN: usize = 4096;
/// Media caption limit, in characters.
const MAX_CAPTION_CHARS: usize = 1024;

impl TelegramChannel {
    /// POST a Bot API method. Returns the status and the raw body.
    async fn call(&self, method: &str, body: &Value) -> Result<(bool, String), TolmachError> {
        let url = format!("{}/{method}", self.base_url);
        let resp = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| TolmachError::Channel(format!("telegram {method} failed: {e}")))?;
        let ok = resp.status().is_success();
        let text = resp.text().await.unwrap_or_default();
        Ok((ok, text))
    }

    /// POST with `parse_mode: HTML`, retrying once as plain text when
    /// Telegram rejects the markup.
    async fn call_html(&self, method: &str, mut body: Value) -> Result<(), TolmachError> {
        body["parse_mode"] = json!("HTML");
        let (ok, error_text) = self.call(method, &body).await?;
        if ok {
            return Ok(());
        }
        if !error_text.contains("can't parse entities") {
            warn!("telegram {method} failed: {error_text}");
            return Err(TolmachError::Channel(format!(
                "telegram {method} failed: {error_text}"
            )));
        }

        debug!("HTML parse failed, retrying {method} as plain text");
        if let Some(obj) = body.as_object_mut() {
            obj.remove("parse_mode");
        }
        let (ok, error_text) = self.call(method, &body).await?;
        if !ok {
            warn!("telegram {method} (plain) failed: {error_text}");
            return Err(TolmachError::Channel(format!(
                "telegram {method} (plain) failed: {error_text}"
            )));
        }
        Ok(())
    }

    /// Send the text of `message`, split into chunks Telegram accepts.
    ///
    /// Only the first chunk replies to the original message; buttons go on the
    /// last chunk.
    pub(crate) async fn send_text(
        &self,
        chat_id: i64,
        message: &OutgoingMessage,
    ) -> Result<(), TolmachError> {
        let chunks = split_message(&message.text, MAX_TEXT_LEN);
        let last = chunks.len().saturating_sub(1);

        for (i, chunk) in chunks.into_iter().enumerate() {
            let mut body = json!({
                "chat_id": chat_id,
                "text": chunk,
            });
            if i == 0 {
                if let Some(reply_to) = message.reply_to {
                    body["reply_parameters"] = reply_parameters(reply_to);
                }
            }
            if i == last && !message.buttons.is_empty() {
                body["reply_markup"] = inline_keyboard(&message.buttons);
            }
            self.call_html("sendMessage", body).await?;
        }

        Ok(())
    }

    /// Re-send `media` by file ID with the message text as caption.
    ///
    /// Captions over the Telegram limit are dropped from the media and sent as
    /// a follow-up text message instead.
    pub(crate) async fn send_media(
        &self,
        chat_id: i64,
        media: &Media,
        message: &OutgoingMessage,
    ) -> Result<(), TolmachError> {
        let (method, field) = media_method(media.kind);
        let caption_fits = message.text.chars().count() <= MAX_CAPTION_CHARS;

        let mut body = json!({ "chat_id": chat_id });
        body[field] = json!(media.file_id);
        if let Some(reply_to) = message.reply_to {
            body["reply_parameters"] = reply_parameters(reply_to);
        }
        if caption_fits {
            if !message.text.is_empty() {
                body["caption"] = json!(message.text);
            }
            if !message.buttons.is_empty() {
                body["reply_markup"] = inline_keyboard(&message.buttons);
            }
        }
        self.call_html(method, body).await?;

        if !caption_fits {
            debug!("caption too long for {method}, sending as text");
            let follow_up = OutgoingMessage {
                media: None,
                reply_to: None,
                ..message.clone()
            };
            self.send_text(chat_id, &follow_up).await?;
        }
        Ok(())
    }

    /// Acknowledge a button press so the client stops its spinner.
    pub(crate) async fn answer_callback_query(
        &self,
        callback_id: &str,
        text: &str,
    ) -> Result<(), TolmachError> {
        let mut body = json!({ "callback_query_id": callback_id });
        if !text.is_empty() {
            body["text"] = json!(text);
        }
        let (ok, error_text) = self.call("answerCallbackQuery", &body).await?;
        if !ok {
            warn!("telegram answerCallbackQuery failed: {error_text}");
        }
        Ok(())
    }

    /// Register bot commands with Telegram so users see an autocomplete menu.
    /// Best-effort: logs failures but does not propagate errors.
    pub(crate) async fn register_commands(&self) {
        let commands = json!({
            "commands": [
                { "command": "start", "description": "Show what I can do" },
                { "command": "help", "description": "Show available commands" },
                { "command": "detect", "description": "Detect the language of your next message" },
                { "command": "setlang", "description": "Show or set your target language" },
                { "command": "cancel", "description": "Cancel a pending detection" },
            ]
        });

        match self.call("setMyCommands", &commands).await {
            Ok((true, _)) => info!("registered Telegram bot commands"),
            Ok((false, body)) => warn!("failed to register Telegram bot commands: {body}"),
            Err(e) => warn!("failed to register Telegram bot commands: {e}"),
        }
    }
}

fn media_method(kind: MediaKind) -> (&'static str, &'static str) {
    match kind {
        MediaKind::Photo => ("sendPhoto", "photo"),
        MediaKind::Document => ("sendDocument", "document"),
        MediaKind::Audio => ("sendAudio", "audio"),
        MediaKind::Voice => ("sendVoice", "voice"),
        MediaKind::Video => ("sendVideo", "video"),
        MediaKind::Animation => ("sendAnimation", "animation"),
    }
}

fn reply_parameters(message_id: i64) -> Value {
    json!({
        "message_id": message_id,
        "allow_sending_without_reply": true,
    })
}

/// One row of callback buttons.
fn inline_keyboard(buttons: &[Button]) -> Value {
    let row: Vec<Value> = buttons
        .iter()
        .map(|b| json!({ "text": b.label, "callback_data": b.data }))
        .collect();
    json!({ "inline_keyboard": [row] })
}

/// Split a message into chunks of at most `max_len` bytes, never cutting a
/// UTF-8 character.
///
/// Breaks prefer a newline, then other whitespace, and avoid the inside of
/// an HTML tag or entity.
pub(crate) fn split_message(text: &str, max_len: usize) -> Vec<&str> {
    if text.len() <= max_len {
        return vec![text];
    }

    let mut chunks = Vec::new();
    let mut start = 0;

    while start < text.len() {
        let mut end = (start + max_len).min(text.len());
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        let break_at = if end < text.len() {
            start + cut_point(&text[start..end])
        } else {
            end
        };
        // A single character wider than `max_len` still has to go somewhere.
        let break_at = if break_at == start {
            start + text[start..].chars().next().map_or(1, char::len_utf8)
        } else {
            break_at
        };
        chunks.push(&text[start..break_at]);
        start = break_at;
    }

    chunks
}

/// Where to end a chunk taken from the front of `window`.
fn cut_point(window: &str) -> usize {
    // Start of an unclosed `<...>` or `&...;`.
    let mut open: Option<usize> = None;
    let mut newline = None;
    let mut space = None;
    let opened_with =
        |open: Option<usize>, c: char| open.is_some_and(|o| window[o..].starts_with(c));

    for (i, ch) in window.char_indices() {
        match ch {
            '<' | '&' if open.is_none() => open = Some(i),
            '>' if opened_with(open, '<') => open = None,
            ';' if opened_with(open, '&') => open = None,
            // A bare ampersand, not an entity.
            c if c.is_whitespace() && opened_with(open, '&') => open = None,
            '\n' if open.is_none() => newline = Some(i + 1),
            c if c.is_whitespace() && open.is_none() => space = Some(i + c.len_utf8()),
            _ => {}
        }
    }

    newline
        .or(space)
        .or(open.filter(|&o| o > 0))
        .unwrap_or(window.len())
}
