//! Telegram Bot API deserialization types.

use serde::Deserialize;
use tolmach_core::message::{
    CallbackQuery, ForwardOrigin, IncomingMessage, Media, MediaKind, Update,
};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub(crate) struct TgResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgUpdate {
    pub update_id: i64,
    pub message: Option<TgMessage>,
    pub callback_query: Option<TgCallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgMessage {
    pub message_id: i64,
    pub from: Option<TgUser>,
    pub chat: TgChat,
    pub text: Option<String>,
    pub caption: Option<String>,
    pub photo: Option<Vec<TgPhotoSize>>,
    pub document: Option<TgFileRef>,
    pub audio: Option<TgFileRef>,
    pub voice: Option<TgFileRef>,
    pub video: Option<TgFileRef>,
    pub animation: Option<TgFileRef>,
    pub forward_origin: Option<TgMessageOrigin>,
}

/// Any file-carrying attachment; only the ID is needed to re-send it.
#[derive(Debug, Deserialize)]
pub(crate) struct TgFileRef {
    pub file_id: String,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub(crate) struct TgPhotoSize {
    pub file_id: String,
    pub width: i64,
    pub height: i64,
    pub file_size: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
pub(crate) struct TgUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
    pub last_name: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgChat {
    pub id: i64,
    /// Chat type: "private", "group", "supergroup", or "channel".
    #[serde(default, rename = "type")]
    pub chat_type: String,
    pub title: Option<String>,
}

/// `forward_origin` of a forwarded message.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum TgMessageOrigin {
    User { sender_user: TgUser },
    HiddenUser { sender_user_name: Option<String> },
    Chat { sender_chat: TgChat },
    Channel { chat: TgChat },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TgCallbackQuery {
    pub id: String,
    pub from: TgUser,
    pub message: Option<TgCallbackMessage>,
    pub data: Option<String>,
}

/// The message a pressed keyboard belongs to. May be inaccessible, so only
/// the always-present fields are read.
#[derive(Debug, Deserialize)]
pub(crate) struct TgCallbackMessage {
    pub message_id: i64,
    pub chat: TgChat,
}

impl TgUser {
    /// "First Last", trimmed.
    pub fn full_name(&self) -> String {
        let last = self.last_name.as_deref().unwrap_or_default();
        format!("{} {last}", self.first_name).trim().to_string()
    }

    /// `@username` when set, otherwise the full name.
    pub fn display_name(&self) -> String {
        match self.username.as_deref() {
            Some(un) if !un.is_empty() => format!("@{un}"),
            _ => self.full_name(),
        }
    }
}

impl TgChat {
    fn title_or_id(&self) -> String {
        self.title
            .clone()
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| self.id.to_string())
    }
}

impl From<TgMessageOrigin> for ForwardOrigin {
    fn from(origin: TgMessageOrigin) -> Self {
        match origin {
            TgMessageOrigin::User { sender_user } => {
                let name = sender_user.full_name();
                if name.is_empty() {
                    ForwardOrigin::HiddenUser { name: None }
                } else {
                    ForwardOrigin::User { name }
                }
            }
            TgMessageOrigin::HiddenUser { sender_user_name } => ForwardOrigin::HiddenUser {
                name: sender_user_name,
            },
            TgMessageOrigin::Chat { sender_chat } => ForwardOrigin::Chat {
                title: sender_chat.title_or_id(),
            },
            TgMessageOrigin::Channel { chat } => ForwardOrigin::Chat {
                title: chat.title_or_id(),
            },
            TgMessageOrigin::Unknown => ForwardOrigin::Unknown,
        }
    }
}

impl TgMessage {
    /// The first attachment found. Telegram sends several photo sizes; the
    /// last is the largest.
    fn media(&self) -> Option<Media> {
        let by_ref = |kind: MediaKind, r: &Option<TgFileRef>| {
            r.as_ref().map(|f| Media {
                kind,
                file_id: f.file_id.clone(),
            })
        };

        self.photo
            .as_ref()
            .and_then(|sizes| sizes.last())
            .map(|largest| Media {
                kind: MediaKind::Photo,
                file_id: largest.file_id.clone(),
            })
            .or_else(|| by_ref(MediaKind::Animation, &self.animation))
            .or_else(|| by_ref(MediaKind::Video, &self.video))
            .or_else(|| by_ref(MediaKind::Voice, &self.voice))
            .or_else(|| by_ref(MediaKind::Audio, &self.audio))
            .or_else(|| by_ref(MediaKind::Document, &self.document))
    }

    /// Convert to the channel-neutral form. `None` when there is no sender.
    pub fn into_incoming(self) -> Option<IncomingMessage> {
        let media = self.media();
        let user = self.from?;
        Some(IncomingMessage {
            id: Uuid::new_v4(),
            channel: "telegram".to_string(),
            sender_id: user.id,
            sender_name: Some(user.display_name()),
            text: self.text.or(self.caption).unwrap_or_default(),
            timestamp: chrono::Utc::now(),
            message_id: Some(self.message_id),
            media,
            forward_origin: self.forward_origin.map(ForwardOrigin::from),
            reply_target: Some(self.chat.id.to_string()),
        })
    }
}

impl TgCallbackQuery {
    pub fn into_callback(self) -> CallbackQuery {
        CallbackQuery {
            id: self.id,
            channel: "telegram".to_string(),
            sender_id: self.from.id,
            reply_target: self.message.as_ref().map(|m| m.chat.id.to_string()),
            message_id: self.message.as_ref().map(|m| m.message_id),
            data: self.data.unwrap_or_default(),
        }
    }
}

impl TgUpdate {
    /// Sender of the update, used for the allow-list check.
    pub fn sender_id(&self) -> Option<i64> {
        match (&self.message, &self.callback_query) {
            (Some(m), _) => m.from.as_ref().map(|u| u.id),
            (None, Some(q)) => Some(q.from.id),
            (None, None) => None,
        }
    }

    /// Whether the update comes from a group chat.
    pub fn is_group(&self) -> bool {
        let chat = match (&self.message, &self.callback_query) {
            (Some(m), _) => Some(&m.chat),
            (None, Some(q)) => q.message.as_ref().map(|m| &m.chat),
            (None, None) => None,
        };
        chat.is_some_and(|c| matches!(c.chat_type.as_str(), "group" | "supergroup"))
    }

    pub fn into_update(self) -> Option<Update> {
        if let Some(msg) = self.message {
            return msg.into_incoming().map(Update::Message);
        }
        self.callback_query
            .map(|q| Update::Callback(q.into_callback()))
    }
}
