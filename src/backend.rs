//! Translation services wired from config and shared by the gateway and CLI.

use std::sync::Arc;
use std::time::Duration;
use tolmach_core::{
    config::{CredentialsConfig, TranslateConfig},
    error::TolmachError,
};
use tolmach_translate::{
    BackendClient, Credential, Detector, LanguageCatalog, TokenCache, TranslationRequest,
    TranslationResult, Translator,
};
use tracing::{error, warn};

/// Everything that talks to the translation backend.
pub struct Backend {
    pub translator: Translator,
    pub detector: Detector,
    pub catalog: LanguageCatalog,
    pub tokens: Arc<TokenCache>,
    pub hints: Vec<String>,
}

impl Backend {
    pub fn from_config(
        translate: &TranslateConfig,
        credentials: &CredentialsConfig,
    ) -> Result<Self, TolmachError> {
        let tokens = Arc::new(TokenCache::from_config(credentials)?);
        Ok(Self::new(BackendClient::from_config(translate), tokens, translate))
    }

    pub fn new(client: BackendClient, tokens: Arc<TokenCache>, config: &TranslateConfig) -> Self {
        let client = Arc::new(client);
        Self {
            translator: Translator::new(client.clone(), config.speller),
            detector: Detector::new(client.clone()),
            catalog: LanguageCatalog::new(
                client,
                Duration::from_secs(config.catalog_refresh_secs),
                &config.fallback_languages,
            ),
            tokens,
            hints: config.detect_hints.clone(),
        }
    }

    pub async fn credential(&self) -> Result<Credential, TolmachError> {
        self.tokens.credential().await
    }

    /// Translate `text` into `target`. `None` for blank text or when no
    /// credential could be obtained.
    pub async fn translate(&self, target: &str, text: &str) -> Option<TranslationResult> {
        let credential = match self.credential().await {
            Ok(c) => c,
            Err(e) => {
                error!("no backend credential, cannot translate: {e}");
                return None;
            }
        };
        let result = self
            .translator
            .translate(&TranslationRequest::new(target, text), &credential)
            .await;
        if result.as_ref().is_some_and(|r| r.degraded) {
            // A rejected token is the usual cause; mint afresh next time.
            self.tokens.invalidate().await;
        }
        result
    }

    /// Detected language code, or `None` if it could not be determined.
    pub async fn detect(&self, text: &str) -> Option<String> {
        match self.credential().await {
            Ok(credential) => self.detector.detect(text, &credential, &self.hints).await,
            Err(e) => {
                error!("no backend credential, cannot detect: {e}");
                None
            }
        }
    }

    /// Whether `code` is a supported target language.
    ///
    /// Without a credential the catalog cannot be asked, so only the
    /// fallback set is accepted.
    pub async fn is_supported(&self, code: &str) -> bool {
        match self.credential().await {
            Ok(credential) => self.catalog.is_supported(code, &credential).await,
            Err(e) => {
                warn!("no backend credential, validating against fallback set: {e}");
                self.catalog
                    .fallback()
                    .contains(&code.trim().to_lowercase())
            }
        }
    }
}
