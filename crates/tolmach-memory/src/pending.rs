//! Per-user pending actions awaiting the user's next message.
//!
//! Only one kind exists today: "detect the language of my next message".
//! State lives in memory and is lost on restart.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tolmach_core::config::PendingConfig;
use tracing::debug;

/// Tracks users who armed `/detect`.
pub struct PendingActions {
    /// `None` means a pending action never expires.
    ttl: Option<Duration>,
    detect: Mutex<HashMap<i64, Instant>>,
}

impl PendingActions {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            detect: Mutex::new(HashMap::new()),
        }
    }

    /// A `detect_ttl_secs` of 0 disables expiry.
    pub fn from_config(config: &PendingConfig) -> Self {
        let ttl = (config.detect_ttl_secs > 0).then(|| Duration::from_secs(config.detect_ttl_secs));
        Self::new(ttl)
    }

    /// Arm detection for `user_id`. Re-arming restarts the expiry clock.
    pub fn set_detect(&self, user_id: i64) {
        self.lock().insert(user_id, Instant::now());
        debug!("detect armed for user {user_id}");
    }

    /// Consume the pending detect for `user_id`.
    ///
    /// True at most once per [`set_detect`](Self::set_detect); expired entries
    /// are dropped and report false.
    pub fn pop_detect(&self, user_id: i64) -> bool {
        match self.lock().remove(&user_id) {
            Some(armed_at) => !self.is_expired(armed_at),
            None => false,
        }
    }

    /// Whether detection is armed and unexpired, without consuming it.
    pub fn is_detect(&self, user_id: i64) -> bool {
        self.lock()
            .get(&user_id)
            .is_some_and(|armed_at| !self.is_expired(*armed_at))
    }

    /// Disarm detection. Returns whether anything unexpired was pending.
    pub fn clear(&self, user_id: i64) -> bool {
        self.lock()
            .remove(&user_id)
            .is_some_and(|armed_at| !self.is_expired(armed_at))
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let mut map = self.lock();
        let before = map.len();
        map.retain(|_, armed_at| !self.is_expired(*armed_at));
        let removed = before - map.len();
        if removed > 0 {
            debug!("purged {removed} expired pending actions");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn is_expired(&self, armed_at: Instant) -> bool {
        self.ttl.is_some_and(|ttl| armed_at.elapsed() >= ttl)
    }

    // A poisoned map is still a valid map of timestamps.
    fn lock(&self) -> MutexGuard<'_, HashMap<i64, Instant>> {
        self.detect.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for PendingActions {
    fn default() -> Self {
        Self::from_config(&PendingConfig::default())
    }
}
