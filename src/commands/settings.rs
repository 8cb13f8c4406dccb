//! /setlang and the matching inline button.

use crate::backend::Backend;
use crate::replies;
use tolmach_memory::SettingsStore;
use tracing::error;

/// Result of trying to change a user's target language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SetLangOutcome {
    Set(String),
    Unsupported(String),
    Failed,
}

impl SetLangOutcome {
    pub(crate) fn reply(&self) -> String {
        match self {
            Self::Set(code) => replies::target_set(code),
            Self::Unsupported(code) => replies::unsupported_language(code),
            Self::Failed => replies::SETTINGS_FAILED.to_string(),
        }
    }
}

/// Validate `raw` against the language catalog, then persist it.
///
/// Nothing is written when the code is not supported.
pub(crate) async fn set_target_language(
    backend: &Backend,
    settings: &SettingsStore,
    sender_id: i64,
    raw: &str,
) -> SetLangOutcome {
    let code = raw.trim().to_lowercase();
    if code.is_empty() || !backend.is_supported(&code).await {
        return SetLangOutcome::Unsupported(code);
    }
    match settings.set_target_language(sender_id, &code) {
        Ok(()) => SetLangOutcome::Set(code),
        Err(e) => {
            error!("failed to save target language for {sender_id}: {e}");
            SetLangOutcome::Failed
        }
    }
}
