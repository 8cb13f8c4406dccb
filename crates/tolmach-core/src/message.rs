use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An inbound event from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Update {
    /// A regular (possibly forwarded) message.
    Message(IncomingMessage),
    /// A press on an inline keyboard button.
    Callback(CallbackQuery),
}

/// An incoming message from a channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub id: Uuid,
    /// Channel name (e.g. "telegram").
    pub channel: String,
    /// Platform-specific user ID.
    pub sender_id: i64,
    /// Human-readable sender name.
    pub sender_name: Option<String>,
    /// Message text, or the caption for media messages. Empty when absent.
    pub text: String,
    pub timestamp: DateTime<Utc>,
    /// Platform message ID, used to reply in-thread.
    pub message_id: Option<i64>,
    /// Attached media, re-sent by reference when translating captions.
    #[serde(default)]
    pub media: Option<Media>,
    /// Where the message was forwarded from, if it was forwarded.
    #[serde(default)]
    pub forward_origin: Option<ForwardOrigin>,
    /// Platform-specific target for routing the response (e.g. Telegram chat_id).
    #[serde(default)]
    pub reply_target: Option<String>,
}

/// A callback from an inline keyboard button.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallbackQuery {
    /// Platform callback ID, needed to acknowledge the press.
    pub id: String,
    pub channel: String,
    pub sender_id: i64,
    /// Chat of the message carrying the keyboard.
    pub reply_target: Option<String>,
    pub message_id: Option<i64>,
    /// Opaque button payload (e.g. `setlang:de`).
    pub data: String,
}

/// Origin of a forwarded message, decided once at ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForwardOrigin {
    /// Forwarded from a user with a visible account.
    User { name: String },
    /// Forwarded from a chat or channel.
    Chat { title: String },
    /// Forwarded from a user who hides their account.
    HiddenUser { name: Option<String> },
    /// The platform reported an origin type we do not know.
    Unknown,
}

impl ForwardOrigin {
    /// Header line shown above a translated forward.
    pub fn label(&self) -> String {
        match self {
            Self::User { name } => format!("\u{1f464} {name}"),
            Self::Chat { title } => format!("\u{1f4ac} {title}"),
            Self::HiddenUser { name: Some(name) } if !name.trim().is_empty() => {
                format!("\u{1f464} {name}")
            }
            Self::HiddenUser { .. } => "\u{1f464} Anonymous".to_string(),
            Self::Unknown => "\u{2139}\u{fe0f} Forwarded".to_string(),
        }
    }
}

/// A media attachment referenced by its platform file ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub kind: MediaKind,
    pub file_id: String,
}

/// Media kinds that can carry a caption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaKind {
    Photo,
    Document,
    Audio,
    Voice,
    Video,
    Animation,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Document => "document",
            Self::Audio => "audio",
            Self::Voice => "voice",
            Self::Video => "video",
            Self::Animation => "animation",
        }
    }
}

/// An inline keyboard button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Button {
    pub label: String,
    pub data: String,
}

/// An outgoing message to send back through a channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutgoingMessage {
    /// HTML-formatted text, or the caption when `media` is set.
    pub text: String,
    /// Platform-specific target for routing (e.g. Telegram chat_id).
    #[serde(default)]
    pub reply_target: Option<String>,
    /// Message to reply to.
    #[serde(default)]
    pub reply_to: Option<i64>,
    /// Media to re-send with `text` as its caption.
    #[serde(default)]
    pub media: Option<Media>,
    /// Single row of inline buttons.
    #[serde(default)]
    pub buttons: Vec<Button>,
}

impl OutgoingMessage {
    /// A text reply addressed to the chat and message of `incoming`.
    pub fn reply(incoming: &IncomingMessage, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            reply_target: incoming.reply_target.clone(),
            reply_to: incoming.message_id,
            ..Default::default()
        }
    }

    pub fn with_media(mut self, media: Media) -> Self {
        self.media = Some(media);
        self
    }

    pub fn with_button(mut self, label: impl Into<String>, data: impl Into<String>) -> Self {
        self.buttons.push(Button {
            label: label.into(),
            data: data.into(),
        });
        self
    }
}
