mod backend;
mod channels;
mod defaults;


pub use backend::*;
pub use channels::*;

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

use crate::error::TolmachError;
use defaults::*;

/// Top-level Tolmach configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tolmach: TolmachConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub translate: TranslateConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub pending: PendingConfig,
}

/// General relay settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TolmachConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Also write logs to `{data_dir}/logs/tolmach.log`.
    #[serde(default)]
    pub log_to_file: bool,
}

impl Default for TolmachConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            log_to_file: false,
        }
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Environment variables that override values from the config file.
const ENV_OVERRIDES: &[&str] = &[
    "TELEGRAM_BOT_TOKEN",
    "YC_FOLDER_ID",
    "YC_IAM_TOKEN",
    "YC_API_KEY",
];

/// Apply overrides from a variable lookup (normally the process environment).
///
/// Empty values are ignored. `YC_IAM_TOKEN` only applies to the static
/// source, `YC_API_KEY` only to the api_key source.
pub fn apply_overrides<F>(config: &mut Config, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    for key in ENV_OVERRIDES {
        let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        match *key {
            "TELEGRAM_BOT_TOKEN" => {
                let tg = config
                    .channel
                    .telegram
                    .get_or_insert_with(|| TelegramConfig {
                        enabled: true,
                        ..Default::default()
                    });
                tg.bot_token = value;
            }
            "YC_FOLDER_ID" => config.translate.folder_id = value,
            "YC_IAM_TOKEN" if config.credentials.source == CredentialSource::Static => {
                config.credentials.token = value;
            }
            "YC_API_KEY" if config.credentials.source == CredentialSource::ApiKey => {
                config.credentials.token = value;
            }
            _ => {}
        }
    }
}

/// Load configuration from a TOML file, then apply environment overrides.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, TolmachError> {
    let path = Path::new(path);
    let mut config = if !path.exists() {
        info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        Config::default()
    } else {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TolmachError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        parse(&content)?
    };

    apply_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Parse configuration from TOML text.
pub fn parse(content: &str) -> Result<Config, TolmachError> {
    let config: Config = toml::from_str(content)
        .map_err(|e| TolmachError::Config(format!("failed to parse config: {}", e)))?;

    if config.translate.timeout_secs == 0 {
        return Err(TolmachError::Config(
            "translate.timeout_secs must be greater than zero".into(),
        ));
    }
    if config.translate.default_target_language.trim().is_empty() {
        return Err(TolmachError::Config(
            "translate.default_target_language must not be empty".into(),
        ));
    }

    Ok(config)
}
