//! Gateway: the main event loop connecting channels to the translation
//! backend and per-user state.

mod pipeline;

#[cfg(test)]
mod tests;

use crate::backend::Backend;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tolmach_core::{
    message::{OutgoingMessage, Update},
    traits::Channel,
};
use tolmach_memory::{PendingActions, SettingsStore};
use tracing::{error, info, warn};

/// How often expired pending actions are swept.
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

/// The central gateway that routes updates between channels and the backend.
pub struct Gateway {
    pub(super) channels: HashMap<String, Arc<dyn Channel>>,
    pub(super) backend: Backend,
    pub(super) settings: SettingsStore,
    pub(super) pending: Arc<PendingActions>,
    pub(super) bot_name: String,
    pub(super) uptime: Instant,
}

impl Gateway {
    pub fn new(
        channels: HashMap<String, Arc<dyn Channel>>,
        backend: Backend,
        settings: SettingsStore,
        pending: PendingActions,
        bot_name: String,
    ) -> Self {
        Self {
            channels,
            backend,
            settings,
            pending: Arc::new(pending),
            bot_name,
            uptime: Instant::now(),
        }
    }

    /// Run the main event loop until Ctrl-C.
    pub async fn run(self: Arc<Self>) -> anyhow::Result<()> {
        info!(
            "{} gateway running | channels: {} | credentials: {}",
            self.bot_name,
            self.channels.keys().cloned().collect::<Vec<_>>().join(", "),
            self.backend.tokens.source_name(),
        );

        let (tx, mut rx) = mpsc::channel::<Update>(256);

        for (name, channel) in &self.channels {
            let mut channel_rx = channel
                .start()
                .await
                .map_err(|e| anyhow::anyhow!("failed to start channel {name}: {e}"))?;
            let tx = tx.clone();
            let channel_name = name.clone();

            tokio::spawn(async move {
                while let Some(update) = channel_rx.recv().await {
                    if tx.send(update).await.is_err() {
                        info!("gateway receiver dropped, stopping {channel_name} forwarder");
                        break;
                    }
                }
            });

            info!("Channel started: {name}");
        }

        drop(tx);

        let pending = self.pending.clone();
        let purge_handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(PURGE_INTERVAL);
            loop {
                interval.tick().await;
                pending.purge_expired();
            }
        });

        // Main event loop with graceful shutdown.
        loop {
            tokio::select! {
                maybe = rx.recv() => {
                    let Some(update) = maybe else {
                        warn!("all channels closed");
                        break;
                    };
                    let gw = self.clone();
                    tokio::spawn(async move {
                        // Inner task so a panicking handler is reported, not lost.
                        let handler = tokio::spawn(async move { gw.handle_update(update).await });
                        if let Err(e) = handler.await {
                            error!("update handler failed: {e}");
                        }
                    });
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.shutdown(&purge_handle).await;
        Ok(())
    }

    /// Graceful shutdown: stop background work, then the channels.
    async fn shutdown(&self, purge_handle: &tokio::task::JoinHandle<()>) {
        info!("Shutting down...");
        purge_handle.abort();

        for (name, channel) in &self.channels {
            if let Err(e) = channel.stop().await {
                warn!("failed to stop channel {name}: {e}");
            }
        }

        let up = self.uptime.elapsed().as_secs();
        info!("Shutdown complete (up {}h {}m).", up / 3600, (up % 3600) / 60);
    }

    /// Deliver `message` on `channel`. Failures are logged.
    pub(super) async fn send(&self, channel: &str, message: OutgoingMessage) {
        let Some(ch) = self.channels.get(channel) else {
            warn!("no channel named {channel}, dropping reply");
            return;
        };
        if let Err(e) = ch.send(message).await {
            error!("failed to send reply on {channel}: {e}");
        }
    }
}
