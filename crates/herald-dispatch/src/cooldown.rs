//! Coarse global rate limiting with bulk-cleared cooldowns.

use dashmap::DashSet;
use herald_common::UserId;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::trace;

/// Shared set of users currently on cooldown.
///
/// The set is wiped in bulk on a fixed timer tick rather than per-entry,
/// so the effective cooldown for any user is nondeterministic within
/// `[0, window)`. This trades precision for an O(1) global reset.
#[derive(Default)]
pub struct RateLimiter {
    on_cooldown: DashSet<UserId>,
}

impl RateLimiter {
    /// Creates an empty rate limiter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically marks the user as on cooldown. Returns `true` when the
    /// user was not already marked and may proceed; of two racing calls
    /// for the same user, exactly one wins.
    pub fn try_consume(&self, user: UserId) -> bool {
        self.on_cooldown.insert(user)
    }

    /// Bulk-wipes every cooldown entry.
    pub fn clear(&self) {
        self.on_cooldown.clear();
    }

    /// Number of users currently on cooldown.
    pub fn len(&self) -> usize {
        self.on_cooldown.len()
    }

    /// Whether no user is on cooldown.
    pub fn is_empty(&self) -> bool {
        self.on_cooldown.is_empty()
    }

    /// Spawns the global clear task, wiping the whole set every `window`.
    pub fn spawn_clear_task(self: &Arc<Self>, window: Duration) -> JoinHandle<()> {
        let limiter = Arc::clone(self);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(window);
            // The first tick of a tokio interval fires immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                trace!(cleared = limiter.len(), "cooldown window reset");
                limiter.clear();
            }
        })
    }
}
