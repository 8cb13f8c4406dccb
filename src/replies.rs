//! User-facing reply texts. All output is Telegram HTML.

use tolmach_core::message::ForwardOrigin;
use tolmach_translate::{html, TranslationResult};

pub const SEND_TEXT: &str = "Please send or forward a message with text content.";
pub const TRANSLATE_FAILED: &str = "Sorry, I couldn't translate that message.";
pub const DETECT_ARMED: &str =
    "\u{1f50d} Send or forward the message whose language you want to detect.";
pub const DETECT_NOTHING: &str = "This message has no text to detect a language from.";
pub const DETECT_FAILED: &str = "\u{1f937} Could not determine the language of that message.";
pub const CANCELLED: &str = "Pending detection cancelled.";
pub const NOTHING_TO_CANCEL: &str = "Nothing to cancel.";
pub const SETTINGS_FAILED: &str = "\u{26a0}\u{fe0f} Could not save your settings. Please try again later.";
pub const SET_AS_TARGET: &str = "Set as target language";

/// Callback payload prefix for the "set as target" button.
pub const SETLANG_PREFIX: &str = "setlang:";

pub fn help(name: &str, default_target: &str) -> String {
    format!(
        "\u{1f31f} <b>{}</b> \u{1f31f}\n\n\
         I translate the messages you send or forward to me.\n\n\
         <b>How to use:</b>\n\
         \u{2022} Send me any text message\n\
         \u{2022} Forward a message to me\n\
         \u{2022} Send media with a caption and I'll translate the caption\n\
         \u{2022} Links are kept exactly as they were\n\n\
         <b>Commands:</b>\n\
         /start - Show this message\n\
         /help - Show help\n\
         /detect - Detect the language of your next message\n\
         /setlang &lt;code&gt; - Change target language (e.g. <code>/setlang es</code>)\n\
         /cancel - Cancel a pending detection\n\n\
         Default target language: <b>{}</b>",
        html::escape(name),
        html::escape(default_target),
    )
}

pub fn current_target(code: &str) -> String {
    format!(
        "Your target language is <b>{}</b>.\nUsage: <code>/setlang es</code>",
        html::escape(code)
    )
}

pub fn target_set(code: &str) -> String {
    format!("\u{2705} Target language changed to: <b>{}</b>", html::escape(code))
}

pub fn unsupported_language(code: &str) -> String {
    format!(
        "\u{26a0}\u{fe0f} <code>{}</code> is not a supported language code. Example: <code>/setlang es</code>",
        html::escape(code)
    )
}

pub fn detected(code: &str) -> String {
    format!("\u{1f50e} Detected language: <b>{}</b>", html::escape(code))
}

/// Reply body for a successful translation, with an optional forward header.
pub fn translation(origin: Option<&ForwardOrigin>, result: &TranslationResult) -> String {
    let mut parts = Vec::with_capacity(3);
    if let Some(origin) = origin {
        parts.push(format!("<i>{}</i>\n", html::escape(&origin.label())));
    }
    let source = result.source_language.as_deref().unwrap_or("auto");
    parts.push(format!(
        "<b>Translated ({} \u{2192} {}):</b>",
        html::escape(source),
        html::escape(&result.target_language)
    ));
    parts.push(result.translated_text.clone());
    parts.join("\n")
}
