//! Default value functions used by serde for config deserialization.

pub fn default_name() -> String {
    "Tolmach".to_string()
}

pub fn default_data_dir() -> String {
    "~/.tolmach".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}

pub fn default_true() -> bool {
    true
}

pub fn default_base_url() -> String {
    "https://translate.api.cloud.yandex.net/translate/v2".to_string()
}

pub fn default_timeout_secs() -> u64 {
    20
}

pub fn default_target_language() -> String {
    "en".to_string()
}

pub fn default_fallback_languages() -> Vec<String> {
    vec!["en".to_string(), "ru".to_string()]
}

pub fn default_catalog_refresh_secs() -> u64 {
    6 * 60 * 60
}

pub fn default_token_command() -> String {
    "yc iam create-token".to_string()
}

pub fn default_metadata_url() -> String {
    "http://169.254.169.254/computeMetadata/v1/instance/service-accounts/default/token".to_string()
}

pub fn default_iam_url() -> String {
    "https://iam.api.cloud.yandex.net/iam/v1/tokens".to_string()
}

pub fn default_token_ttl_secs() -> u64 {
    11 * 60 * 60
}

pub fn default_refresh_margin_secs() -> u64 {
    5 * 60
}

pub fn default_settings_path() -> String {
    "~/.tolmach/data/user_settings.json".to_string()
}

pub fn default_detect_ttl_secs() -> u64 {
    300
}
