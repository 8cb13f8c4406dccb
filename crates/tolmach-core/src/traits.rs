use crate::{
    error::TolmachError,
    message::{OutgoingMessage, Update},
};
use async_trait::async_trait;

/// Messaging Channel trait.
///
/// A messaging platform implements this trait to deliver inbound updates
/// and accept replies (text or re-sent media).
#[async_trait]
pub trait Channel: Send + Sync {
    /// Human-readable channel name.
    fn name(&self) -> &str;

    /// Start listening for incoming updates.
    /// Returns a receiver that yields messages and button callbacks.
    async fn start(&self) -> Result<tokio::sync::mpsc::Receiver<Update>, TolmachError>;

    /// Send a reply back through this channel.
    async fn send(&self, message: OutgoingMessage) -> Result<(), TolmachError>;

    /// Acknowledge a button press, optionally showing a short notice.
    async fn answer_callback(&self, _callback_id: &str, _text: &str) -> Result<(), TolmachError> {
        Ok(())
    }

    /// Graceful shutdown.
    async fn stop(&self) -> Result<(), TolmachError>;
}
