//! Per-community command prefix resolution with mention fallback.

use async_trait::async_trait;
use dashmap::DashMap;
use herald_common::{CommunityId, HeraldError, UserId};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Persistence seam for prefix overrides. The backing store is an
/// external collaborator and only eventually consistent with the
/// in-memory map.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PrefixStore: Send + Sync {
    /// Persists one community's prefix override.
    async fn persist(&self, community: CommunityId, prefix: &str) -> Result<(), HeraldError>;
}

/// A store that keeps nothing. Used when no persistence is wired.
pub struct NoPrefixStore;

#[async_trait]
impl PrefixStore for NoPrefixStore {
    async fn persist(&self, _community: CommunityId, _prefix: &str) -> Result<(), HeraldError> {
        Ok(())
    }
}

/// Resolves the command prefix for a message: a per-community overlay
/// atop the process-wide default, with a direct bot mention accepted as
/// an alternative prefix.
pub struct PrefixResolver {
    default: String,
    overrides: DashMap<CommunityId, String>,
    bot_id: UserId,
    store: Arc<dyn PrefixStore>,
}

impl PrefixResolver {
    /// Creates a resolver seeded from configuration.
    pub fn new(
        default: impl Into<String>,
        seed: HashMap<CommunityId, String>,
        bot_id: UserId,
        store: Arc<dyn PrefixStore>,
    ) -> Self {
        let overrides = DashMap::new();
        for (community, prefix) in seed {
            overrides.insert(community, prefix);
        }
        Self {
            default: default.into(),
            overrides,
            bot_id,
            store,
        }
    }

    /// The configured prefix for a community; `None` (direct message)
    /// yields the process-wide default.
    pub fn get(&self, community: Option<CommunityId>) -> String {
        community
            .and_then(|c| self.overrides.get(&c).map(|p| p.value().clone()))
            .unwrap_or_else(|| self.default.clone())
    }

    /// Overrides a community's prefix. The in-memory map is updated
    /// atomically before the store write; a store failure is logged and
    /// the in-memory override stands.
    pub async fn set(&self, community: CommunityId, prefix: &str) -> Result<(), HeraldError> {
        if prefix.trim().is_empty() {
            return Err(HeraldError::Dispatch(
                "prefix must not be empty".to_string(),
            ));
        }
        self.overrides.insert(community, prefix.to_string());
        if let Err(e) = self.store.persist(community, prefix).await {
            warn!(%community, error = %e, "failed to persist prefix override");
        }
        Ok(())
    }

    /// If the content starts with the configured prefix or a direct bot
    /// mention, returns the number of bytes consumed by it.
    ///
    /// A mention in either plain `<@id>` or nickname-qualified `<@!id>`
    /// form counts as the prefix, with one following space consumed too.
    pub fn matched_prefix(&self, community: Option<CommunityId>, content: &str) -> Option<usize> {
        let prefix = self.get(community);
        if content.starts_with(&prefix) {
            return Some(prefix.len());
        }
        self.matched_mention(content)
    }

    fn matched_mention(&self, content: &str) -> Option<usize> {
        for mention in [
            format!("<@{}>", self.bot_id),
            format!("<@!{}>", self.bot_id),
        ] {
            if let Some(rest) = content.strip_prefix(&mention) {
                let consumed = if rest.starts_with(' ') {
                    mention.len() + 1
                } else {
                    mention.len()
                };
                return Some(consumed);
            }
        }
        None
    }
}
