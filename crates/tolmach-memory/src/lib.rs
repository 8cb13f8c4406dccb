//! # tolmach-memory
//!
//! Per-user state for Tolmach: the JSON-backed settings store and the
//! in-memory pending-action tracker.

pub mod pending;
pub mod settings;

pub use pending::PendingActions;
pub use settings::{SettingsStore, UserSettings};
