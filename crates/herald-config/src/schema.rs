//! Configuration schema definitions using serde.

use herald_common::{CommunityId, HeraldError, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Main configuration structure for Herald.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Bot identity configuration.
    pub bot: BotConfig,
    /// Dispatch engine configuration.
    pub dispatch: DispatchConfig,
    /// Command prefix configuration.
    pub prefixes: PrefixConfig,
}

/// Bot identity configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Chat gateway token.
    pub token: String,
    /// The bot's own user ID, used for mention-prefix matching and
    /// self-message filtering.
    pub user_id: UserId,
    /// Owner user ID, used as the synthetic author for programmatic
    /// command replays.
    pub owner_id: UserId,
}

/// Dispatch engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Length of the global cooldown clear window, in seconds. The whole
    /// cooldown set is wiped every tick, so the effective per-user
    /// cooldown is anywhere in `[0, cooldown_window_secs)`.
    pub cooldown_window_secs: u64,
    /// Whether command name matching is case-sensitive unless a command
    /// overrides it.
    pub case_sensitive_default: bool,
}

/// Command prefix configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrefixConfig {
    /// Process-wide default prefix.
    pub default: String,
    /// Per-community prefix overrides, seeded into the prefix resolver
    /// at startup.
    #[serde(default)]
    pub overrides: HashMap<CommunityId, String>,
}

impl Config {
    /// Validates the configuration, returning the first violation found.
    pub fn validate(&self) -> Result<(), HeraldError> {
        if self.bot.token.is_empty() {
            return Err(HeraldError::Config("gateway token must not be empty".to_string()));
        }
        if self.bot.user_id.0 == 0 {
            return Err(HeraldError::Config("bot user id must not be zero".to_string()));
        }
        if self.prefixes.default.trim().is_empty() {
            return Err(HeraldError::Config("default prefix must not be empty".to_string()));
        }
        if self.dispatch.cooldown_window_secs == 0 {
            return Err(HeraldError::Config(
                "cooldown window must be at least one second".to_string(),
            ));
        }
        for (community, prefix) in &self.prefixes.overrides {
            if prefix.trim().is_empty() {
                return Err(HeraldError::Config(format!(
                    "prefix override for community {community} must not be empty"
                )));
            }
        }
        Ok(())
    }
}
