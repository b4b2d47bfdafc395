//! Input transformer chain and the community alias transformer.

use crate::behavior::InputTransformer;
use crate::context::ExecutionContext;
use async_trait::async_trait;
use dashmap::DashMap;
use herald_common::CommunityId;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Runs the transformer chain over message content.
///
/// Transformers are mutually exclusive per message: each is tried in
/// priority order, and the first whose output differs from the
/// lower-cased input wins. If none fire, the content passes through
/// unchanged.
pub async fn apply_transformers(
    transformers: &[Arc<dyn InputTransformer>],
    ctx: &ExecutionContext,
    content: &str,
) -> String {
    let lowered = content.to_lowercase();
    for transformer in transformers {
        let output = transformer.transform(ctx, content).await;
        if output != lowered {
            debug!(transformer = transformer.name(), "input transformed");
            return output;
        }
    }
    content.to_string()
}

/// Rewrites per-community shorthand aliases into full command
/// invocations before prefix matching.
pub struct AliasTransformer {
    priority: i32,
    maps: DashMap<CommunityId, HashMap<String, String>>,
}

impl AliasTransformer {
    /// Creates an empty alias transformer with the given priority.
    pub fn new(priority: i32) -> Self {
        Self {
            priority,
            maps: DashMap::new(),
        }
    }

    /// Adds or replaces one community alias. Aliases match the leading
    /// token of the lower-cased input.
    pub fn set_alias(
        &self,
        community: CommunityId,
        shorthand: impl Into<String>,
        expansion: impl Into<String>,
    ) {
        self.maps
            .entry(community)
            .or_default()
            .insert(shorthand.into().to_lowercase(), expansion.into());
    }

    /// Removes a community alias, returning whether it existed.
    pub fn remove_alias(&self, community: CommunityId, shorthand: &str) -> bool {
        self.maps
            .get_mut(&community)
            .map_or(false, |mut map| map.remove(&shorthand.to_lowercase()).is_some())
    }
}

#[async_trait]
impl InputTransformer for AliasTransformer {
    fn priority(&self) -> i32 {
        self.priority
    }

    fn name(&self) -> &'static str {
        "alias"
    }

    async fn transform(&self, ctx: &ExecutionContext, text: &str) -> String {
        let lowered = text.to_lowercase();
        let Some(community) = ctx.community_id else {
            return lowered;
        };
        let Some(map) = self.maps.get(&community) else {
            return lowered;
        };

        let trimmed = lowered.trim_start();
        let (head, rest) = match trimmed.split_once(char::is_whitespace) {
            Some((head, rest)) => (head, rest.trim_start()),
            None => (trimmed, ""),
        };
        match map.get(head) {
            Some(expansion) if rest.is_empty() => expansion.clone(),
            Some(expansion) => format!("{expansion} {rest}"),
            None => lowered,
        }
    }
}
