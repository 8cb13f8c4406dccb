use serde::{Deserialize, Serialize};

use super::defaults::*;

/// Translation backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Cloud folder the requests are billed to. Empty = omitted from requests.
    #[serde(default)]
    pub folder_id: String,
    /// Per-call timeout applied to translate, detect, and languages calls.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_true")]
    pub speller: bool,
    /// Target language for users who never ran `/setlang`.
    #[serde(default = "default_target_language")]
    pub default_target_language: String,
    /// Codes accepted by `/setlang` while the catalog is unavailable.
    #[serde(default = "default_fallback_languages")]
    pub fallback_languages: Vec<String>,
    /// How long a fetched language catalog stays fresh.
    #[serde(default = "default_catalog_refresh_secs")]
    pub catalog_refresh_secs: u64,
    /// Hints passed to language detection (e.g. `["en", "ru"]`).
    #[serde(default)]
    pub detect_hints: Vec<String>,
}

impl Default for TranslateConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            folder_id: String::new(),
            timeout_secs: default_timeout_secs(),
            speller: true,
            default_target_language: default_target_language(),
            fallback_languages: default_fallback_languages(),
            catalog_refresh_secs: default_catalog_refresh_secs(),
            detect_hints: Vec::new(),
        }
    }
}

/// Where backend credentials come from.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// A pre-minted IAM token (config or `YC_IAM_TOKEN`).
    #[default]
    Static,
    /// A service-account API key (config or `YC_API_KEY`).
    ApiKey,
    /// The compute instance metadata service.
    Metadata,
    /// An external command printing a token (e.g. `yc iam create-token`).
    Command,
    /// A service-account authorized key (`key.json`) exchanged for IAM tokens.
    KeyFile,
}

/// Credential provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default)]
    pub source: CredentialSource,
    /// IAM token or API key, depending on `source`.
    #[serde(default)]
    pub token: String,
    #[serde(default = "default_token_command")]
    pub command: String,
    #[serde(default = "default_metadata_url")]
    pub metadata_url: String,
    /// Path to the service-account `key.json` for the key_file source.
    #[serde(default)]
    pub key_file: String,
    #[serde(default = "default_iam_url")]
    pub iam_url: String,
    /// Assumed lifetime of tokens printed by `command`.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
    /// Re-mint this long before a token expires.
    #[serde(default = "default_refresh_margin_secs")]
    pub refresh_margin_secs: u64,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            source: CredentialSource::default(),
            token: String::new(),
            command: default_token_command(),
            metadata_url: default_metadata_url(),
            key_file: String::new(),
            iam_url: default_iam_url(),
            token_ttl_secs: default_token_ttl_secs(),
            refresh_margin_secs: default_refresh_margin_secs(),
        }
    }
}

/// Per-user settings file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    #[serde(default = "default_settings_path")]
    pub path: String,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: default_settings_path(),
        }
    }
}

/// Pending one-shot actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingConfig {
    /// Seconds an armed `/detect` stays valid. 0 = never expires.
    #[serde(default = "default_detect_ttl_secs")]
    pub detect_ttl_secs: u64,
}

impl Default for PendingConfig {
    fn default() -> Self {
        Self {
            detect_ttl_secs: default_detect_ttl_secs(),
        }
    }
}
