//! Live configuration snapshot with lock-free reads.
//!
//! Dispatch reads configuration on the per-message hot path, so the
//! current snapshot sits behind an `ArcSwap` and a reload swaps it
//! wholesale. In-flight readers keep whatever snapshot they loaded.

use crate::schema::Config;
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Holds the live [`Config`] for a running bot process.
pub struct ConfigCache {
    current: ArcSwap<Config>,
}

impl ConfigCache {
    /// Seeds the cache with the validated startup configuration.
    pub fn new(config: Config) -> Self {
        Self {
            current: ArcSwap::from_pointee(config),
        }
    }

    /// The current snapshot. Cheap enough to call per message.
    pub fn current(&self) -> Arc<Config> {
        self.current.load_full()
    }

    /// Atomically replaces the snapshot seen by subsequent readers.
    pub fn replace(&self, config: Config) {
        self.current.store(Arc::new(config));
    }
}
