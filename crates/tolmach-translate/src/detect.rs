//! Language detection via the backend `detect` endpoint.

use crate::{client::BackendClient, credentials::Credential};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

/// The detect endpoint only looks at this many characters.
pub const DETECT_MAX_CHARS: usize = 1000;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectRequest<'a> {
    text: &'a str,
    #[serde(skip_serializing_if = "<[String]>::is_empty")]
    language_code_hints: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    folder_id: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DetectResponse {
    #[serde(default)]
    language_code: Option<String>,
}

/// Guesses the language of a text. Stateless: every call hits the backend.
#[derive(Clone)]
pub struct Detector {
    client: Arc<BackendClient>,
}

impl Detector {
    pub fn new(client: Arc<BackendClient>) -> Self {
        Self { client }
    }

    /// Detect the language of `text`.
    ///
    /// Returns `None` when the language could not be determined for any
    /// reason (blank input, transport error, bad status, bad payload). Errors
    /// are logged here and never reach the caller.
    pub async fn detect(
        &self,
        text: &str,
        credential: &Credential,
        hints: &[String],
    ) -> Option<String> {
        let text = truncate_chars(text.trim(), DETECT_MAX_CHARS);
        if text.is_empty() {
            return None;
        }

        let body = DetectRequest {
            text,
            language_code_hints: hints,
            folder_id: self.client.folder_id(),
        };

        match self
            .client
            .post::<_, DetectResponse>("detect", &body, credential)
            .await
        {
            Ok(resp) => {
                let code = resp
                    .language_code
                    .map(|c| c.trim().to_lowercase())
                    .filter(|c| !c.is_empty());
                if code.is_none() {
                    warn!("detect: backend returned no language code");
                }
                code
            }
            Err(e) => {
                error!("detect failed: {e}");
                None
            }
        }
    }
}

/// Cut `s` to at most `max` characters on a char boundary.
pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
