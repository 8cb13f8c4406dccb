//! The translate call and the URL-preserving, HTML-safe pipeline around it.

use crate::{client::BackendClient, credentials::Credential, html, shield};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tolmach_core::error::TolmachError;
use tracing::{debug, error};

/// What to translate and into which language.
#[derive(Debug, Clone)]
pub struct TranslationRequest {
    /// `None` lets the backend detect the source language.
    pub source_language: Option<String>,
    pub target_language: String,
    pub raw_text: String,
}

impl TranslationRequest {
    pub fn new(target_language: &str, raw_text: &str) -> Self {
        Self {
            source_language: None,
            target_language: target_language.trim().to_lowercase(),
            raw_text: raw_text.to_string(),
        }
    }

    pub fn from_language(mut self, source: &str) -> Self {
        let source = source.trim().to_lowercase();
        self.source_language = (!source.is_empty()).then_some(source);
        self
    }
}

/// Outcome of [`Translator::translate`].
#[derive(Debug, Clone)]
pub struct TranslationResult {
    pub original_text: String,
    /// HTML-escaped text with every URL from the original left verbatim.
    pub translated_text: String,
    /// Requested source language, or the one the backend detected.
    pub source_language: Option<String>,
    pub target_language: String,
    pub urls_found: Vec<String>,
    /// The backend failed: `translated_text` holds the escaped original.
    pub degraded: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TranslateBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    source_language_code: Option<&'a str>,
    target_language_code: &'a str,
    format: &'static str,
    texts: [&'a str; 1],
    #[serde(skip_serializing_if = "Option::is_none")]
    folder_id: Option<&'a str>,
    speller: bool,
}

#[derive(Deserialize)]
struct TranslateResponse {
    #[serde(default)]
    translations: Vec<TranslatedText>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranslatedText {
    text: Option<String>,
    #[serde(default)]
    detected_language_code: Option<String>,
}

/// Translation with a single, successful backend answer.
struct Translated {
    html: String,
    detected_language: Option<String>,
}

/// Calls the backend translate endpoint.
#[derive(Clone)]
pub struct Translator {
    client: Arc<BackendClient>,
    speller: bool,
}

impl Translator {
    pub fn new(client: Arc<BackendClient>, speller: bool) -> Self {
        Self { client, speller }
    }

    async fn request(
        &self,
        source: Option<&str>,
        target: &str,
        html_text: &str,
        credential: &Credential,
    ) -> Result<Translated, TolmachError> {
        let body = TranslateBody {
            source_language_code: source.filter(|s| !s.is_empty()),
            target_language_code: target,
            format: "HTML",
            texts: [html_text],
            folder_id: self.client.folder_id(),
            speller: self.speller,
        };

        let resp: TranslateResponse = self.client.post("translate", &body, credential).await?;
        let first = resp
            .translations
            .into_iter()
            .next()
            .ok_or_else(|| TolmachError::Backend("translate: empty translations".into()))?;
        let html = first
            .text
            .ok_or_else(|| TolmachError::Backend("translate: missing text field".into()))?;

        Ok(Translated {
            html,
            detected_language: first.detected_language_code.filter(|c| !c.is_empty()),
        })
    }

    /// Translate an HTML fragment as-is.
    ///
    /// Blank input returns `None` without calling the backend. On any backend
    /// failure the error is logged and the original input comes back
    /// unchanged, so the caller always has something to show.
    pub async fn translate_html(
        &self,
        source: Option<&str>,
        target: &str,
        html_text: &str,
        credential: &Credential,
    ) -> Option<String> {
        if html_text.trim().is_empty() {
            return None;
        }
        match self.request(source, target, html_text, credential).await {
            Ok(t) => Some(t.html),
            Err(e) => {
                error!("translate failed, returning original text: {e}");
                Some(html_text.to_string())
            }
        }
    }

    /// Translate plain user text, keeping URLs intact.
    ///
    /// URLs are shielded before the call and restored afterwards. The
    /// returned text is HTML-escaped except for the restored URLs.
    pub async fn translate(
        &self,
        request: &TranslationRequest,
        credential: &Credential,
    ) -> Option<TranslationResult> {
        let raw = &request.raw_text;
        if raw.trim().is_empty() {
            return None;
        }

        let (shielded, urls) = shield::shield(raw);
        let outgoing = html::escape(&shielded);
        debug!(
            "translating {} chars to {} ({} urls shielded)",
            raw.chars().count(),
            request.target_language,
            urls.len()
        );

        let source = request.source_language.as_deref();
        let (translated_text, detected, degraded) = match self
            .request(source, &request.target_language, &outgoing, credential)
            .await
        {
            Ok(t) => {
                let plain = html::unescape(&t.html);
                (
                    shield::unshield_html(&plain, &urls),
                    t.detected_language,
                    false,
                )
            }
            Err(e) => {
                error!("translate failed, falling back to original text: {e}");
                (shield::unshield_html(&shielded, &urls), None, true)
            }
        };

        Some(TranslationResult {
            original_text: raw.clone(),
            translated_text,
            source_language: request.source_language.clone().or(detected),
            target_language: request.target_language.clone(),
            urls_found: shield::find_urls(raw),
            degraded,
        })
    }
}
