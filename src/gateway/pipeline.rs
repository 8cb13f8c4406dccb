//! Update processing: commands, pending detection, translation, callbacks.

use super::Gateway;
use crate::commands::{self, set_target_language, Command, CommandContext, SetLangOutcome};
use crate::replies;
use tolmach_core::message::{CallbackQuery, IncomingMessage, OutgoingMessage, Update};
use tracing::{info, warn};

impl Gateway {
    pub(super) async fn handle_update(&self, update: Update) {
        match update {
            Update::Message(incoming) => self.handle_message(incoming).await,
            Update::Callback(callback) => self.handle_callback(callback).await,
        }
    }

    /// Process a single incoming message.
    pub(super) async fn handle_message(&self, incoming: IncomingMessage) {
        let preview = if incoming.text.chars().count() > 60 {
            let truncated: String = incoming.text.chars().take(60).collect();
            format!("{truncated}...")
        } else {
            incoming.text.clone()
        };
        info!(
            "[{}] {} says: {}{}",
            incoming.channel,
            incoming.sender_name.as_deref().unwrap_or("unknown"),
            preview,
            incoming
                .media
                .as_ref()
                .map(|m| format!(" [{}]", m.kind.as_str()))
                .unwrap_or_default(),
        );

        // --- 1. COMMANDS ---
        if let Some(cmd) = Command::parse(&incoming.text) {
            let ctx = CommandContext {
                backend: &self.backend,
                settings: &self.settings,
                pending: &self.pending,
                bot_name: &self.bot_name,
                sender_id: incoming.sender_id,
                text: &incoming.text,
            };
            let reply = commands::handle(cmd, &ctx).await;
            self.send(&incoming.channel, OutgoingMessage::reply(&incoming, reply))
                .await;
            return;
        }

        // --- 2. PENDING DETECTION ---
        if self.pending.pop_detect(incoming.sender_id) {
            self.handle_detect(&incoming).await;
            return;
        }

        // --- 3. TRANSLATION ---
        self.handle_translate(&incoming).await;
    }

    /// Answer a message that arrived while detection was armed.
    async fn handle_detect(&self, incoming: &IncomingMessage) {
        let reply = if incoming.text.trim().is_empty() {
            OutgoingMessage::reply(incoming, replies::DETECT_NOTHING)
        } else {
            match self.backend.detect(&incoming.text).await {
                Some(code) => OutgoingMessage::reply(incoming, replies::detected(&code))
                    .with_button(
                        replies::SET_AS_TARGET,
                        format!("{}{code}", replies::SETLANG_PREFIX),
                    ),
                None => OutgoingMessage::reply(incoming, replies::DETECT_FAILED),
            }
        };
        self.send(&incoming.channel, reply).await;
    }

    /// Translate text or a caption into the sender's target language.
    async fn handle_translate(&self, incoming: &IncomingMessage) {
        if incoming.text.trim().is_empty() {
            let reply = match incoming.media.clone() {
                // Nothing to translate: hand the media back as-is.
                Some(media) => OutgoingMessage::reply(incoming, "").with_media(media),
                None => OutgoingMessage::reply(incoming, replies::SEND_TEXT),
            };
            self.send(&incoming.channel, reply).await;
            return;
        }

        let target = match self.settings.get(incoming.sender_id) {
            Ok(s) => s.target_language,
            Err(e) => {
                warn!(
                    "settings unavailable for {}, using default target: {e}",
                    incoming.sender_id
                );
                self.settings.default_language().to_string()
            }
        };

        let reply = match self.backend.translate(&target, &incoming.text).await {
            Some(result) if !result.degraded => {
                let body = replies::translation(incoming.forward_origin.as_ref(), &result);
                let reply = OutgoingMessage::reply(incoming, body);
                match incoming.media.clone() {
                    Some(media) => reply.with_media(media),
                    None => reply,
                }
            }
            _ => OutgoingMessage::reply(incoming, replies::TRANSLATE_FAILED),
        };
        self.send(&incoming.channel, reply).await;
    }

    /// Handle an inline keyboard press.
    pub(super) async fn handle_callback(&self, callback: CallbackQuery) {
        let Some(code) = callback.data.strip_prefix(replies::SETLANG_PREFIX) else {
            warn!("unknown callback data from {}: {:?}", callback.sender_id, callback.data);
            self.answer(&callback, "").await;
            return;
        };

        let outcome =
            set_target_language(&self.backend, &self.settings, callback.sender_id, code).await;
        let notice = match &outcome {
            SetLangOutcome::Set(code) => format!("Target language: {code}"),
            SetLangOutcome::Unsupported(_) => "Unsupported language".to_string(),
            SetLangOutcome::Failed => "Could not save".to_string(),
        };
        self.answer(&callback, &notice).await;

        let reply = OutgoingMessage {
            text: outcome.reply(),
            reply_target: callback.reply_target.clone(),
            reply_to: callback.message_id,
            ..Default::default()
        };
        self.send(&callback.channel, reply).await;
    }

    async fn answer(&self, callback: &CallbackQuery, text: &str) {
        let Some(ch) = self.channels.get(&callback.channel) else {
            warn!("no channel named {}, cannot answer callback", callback.channel);
            return;
        };
        if let Err(e) = ch.answer_callback(&callback.id, text).await {
            warn!("failed to answer callback {}: {e}", callback.id);
        }
    }
}
