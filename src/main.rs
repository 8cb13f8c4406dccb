mod backend;
mod commands;
mod gateway;
mod replies;

use backend::Backend;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tolmach_channels::TelegramChannel;
use tolmach_core::{config, shellexpand, traits::Channel};
use tolmach_memory::{PendingActions, SettingsStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "tolmach",
    version,
    about = "Tolmach: a Telegram translation relay"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file.
    #[arg(short, long, default_value = "config.toml", env = "TOLMACH_CONFIG")]
    config: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the bot.
    Start,
    /// Show configuration and backend health.
    Status,
    /// Translate text once and print the result.
    Translate {
        /// Target language code (e.g. "en").
        lang: String,
        /// The text to translate.
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// Detect the language of a text.
    Detect {
        /// The text to inspect.
        #[arg(trailing_var_arg = true)]
        text: Vec<String>,
    },
    /// List the languages the backend supports.
    Languages,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(&cli.config)?;
    let _log_guard = init_tracing(&cfg.tolmach);

    match cli.command {
        Commands::Start => {
            // Build channels.
            let mut channels: HashMap<String, Arc<dyn Channel>> = HashMap::new();

            if let Some(ref tg) = cfg.channel.telegram {
                if tg.enabled {
                    if tg.bot_token.is_empty() {
                        anyhow::bail!(
                            "Telegram is enabled but bot_token is empty. \
                             Set it in config.toml or TELEGRAM_BOT_TOKEN env var."
                        );
                    }
                    let channel = TelegramChannel::new(tg.clone());
                    channels.insert("telegram".to_string(), Arc::new(channel));
                }
            }

            if channels.is_empty() {
                anyhow::bail!("No channels enabled. Enable at least one channel in config.toml.");
            }

            let backend = Backend::from_config(&cfg.translate, &cfg.credentials)?;
            // Fail fast on a broken credential setup.
            backend.credential().await?;

            let settings =
                SettingsStore::from_config(&cfg.settings, &cfg.translate.default_target_language);
            let pending = PendingActions::from_config(&cfg.pending);

            println!("{} starting...", cfg.tolmach.name);
            let gw = Arc::new(gateway::Gateway::new(
                channels,
                backend,
                settings,
                pending,
                cfg.tolmach.name.clone(),
            ));
            gw.run().await?;
        }
        Commands::Status => {
            println!("{} status check\n", cfg.tolmach.name);
            println!("Config: {}", cli.config);
            println!("Backend: {}", cfg.translate.base_url);
            println!(
                "Folder: {}",
                if cfg.translate.folder_id.is_empty() {
                    "(none)"
                } else {
                    cfg.translate.folder_id.as_str()
                }
            );
            println!("Default target: {}", cfg.translate.default_target_language);
            println!();

            match cfg.channel.telegram {
                Some(ref tg) => println!(
                    "  telegram: {}",
                    if tg.enabled && !tg.bot_token.is_empty() {
                        "configured"
                    } else if tg.enabled {
                        "enabled but missing bot_token"
                    } else {
                        "disabled"
                    }
                ),
                None => println!("  telegram: not configured"),
            }

            let settings =
                SettingsStore::from_config(&cfg.settings, &cfg.translate.default_target_language);
            match settings.user_count() {
                Ok(n) => println!("  settings: {} ({n} users)", settings.path().display()),
                Err(e) => println!("  settings: {e}"),
            }

            match Backend::from_config(&cfg.translate, &cfg.credentials) {
                Ok(backend) => match backend.credential().await {
                    Ok(credential) => {
                        let n = backend.catalog.list_languages(&credential).await.len();
                        println!("  credentials: ok ({})", backend.tokens.source_name());
                        if n > 0 {
                            println!("  backend: reachable ({n} languages)");
                        } else {
                            println!("  backend: unreachable or rejected the credential");
                        }
                    }
                    Err(e) => println!("  credentials: {e}"),
                },
                Err(e) => println!("  credentials: {e}"),
            }
        }
        Commands::Translate { lang, text } => {
            if text.is_empty() {
                anyhow::bail!("no text provided. Usage: tolmach translate <lang> <text>");
            }
            let backend = Backend::from_config(&cfg.translate, &cfg.credentials)?;
            match backend.translate(&lang, &text.join(" ")).await {
                Some(result) if !result.degraded => println!("{}", result.translated_text),
                _ => anyhow::bail!("translation failed"),
            }
        }
        Commands::Detect { text } => {
            if text.is_empty() {
                anyhow::bail!("no text provided. Usage: tolmach detect <text>");
            }
            let backend = Backend::from_config(&cfg.translate, &cfg.credentials)?;
            match backend.detect(&text.join(" ")).await {
                Some(code) => println!("{code}"),
                None => anyhow::bail!("could not determine the language"),
            }
        }
        Commands::Languages => {
            let backend = Backend::from_config(&cfg.translate, &cfg.credentials)?;
            let credential = backend.credential().await?;
            let codes = backend.catalog.list_languages(&credential).await;
            if codes.is_empty() {
                anyhow::bail!("could not fetch the language list");
            }
            for code in codes {
                println!("{code}");
            }
        }
    }

    Ok(())
}

/// Log to stderr, and to `{data_dir}/logs/tolmach.log` when enabled.
///
/// The returned guard flushes the file writer on drop.
fn init_tracing(
    cfg: &config::TolmachConfig,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cfg.log_level));
    let stderr = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    if !cfg.log_to_file {
        tracing_subscriber::registry().with(filter).with(stderr).init();
        return None;
    }

    let log_dir = PathBuf::from(shellexpand(&cfg.data_dir)).join("logs");
    let appender = tracing_appender::rolling::never(&log_dir, "tolmach.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer),
        )
        .init();
    Some(guard)
}
