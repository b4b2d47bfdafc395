//! Configuration loading and persistence with atomic file operations.

use crate::schema::Config;
use herald_common::{HeraldError, Result, UserId};
use std::env;
use tracing::debug;

/// Configuration loader with environment-variable overrides.
pub struct ConfigLoader {
    path: std::path::PathBuf,
}

impl ConfigLoader {
    /// Creates a new configuration loader.
    pub fn new(path: impl Into<std::path::PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Loads configuration from a YAML file, then applies environment
    /// overrides and validates the result.
    pub async fn load(&self) -> Result<Config> {
        let mut config = if self.path.exists() {
            let raw = tokio::fs::read_to_string(&self.path).await?;
            serde_yaml::from_str(&raw)
                .map_err(|e| HeraldError::Serialization(e.to_string()))?
        } else {
            debug!(path = %self.path.display(), "config file missing, starting from defaults");
            Config::default()
        };

        apply_env_overrides(&mut config)?;
        config.validate()?;
        Ok(config)
    }

    /// Saves configuration to file atomically via tempfile + rename.
    pub async fn save(&self, config: &Config) -> Result<()> {
        let raw = serde_yaml::to_string(config)
            .map_err(|e| HeraldError::Serialization(e.to_string()))?;
        let dir = self
            .path
            .parent()
            .map_or_else(|| std::path::PathBuf::from("."), std::path::Path::to_path_buf);
        let tmp = tempfile::NamedTempFile::new_in(&dir).map_err(HeraldError::Io)?;
        tokio::fs::write(tmp.path(), raw).await?;
        tmp.persist(&self.path)
            .map_err(|e| HeraldError::Io(e.error))?;
        Ok(())
    }
}

/// Applies `HERALD_*` environment overrides on top of the loaded file.
fn apply_env_overrides(config: &mut Config) -> Result<()> {
    if let Ok(token) = env::var("HERALD_TOKEN") {
        config.bot.token = token;
    }
    if let Ok(raw) = env::var("HERALD_BOT_ID") {
        let id = raw
            .parse::<u64>()
            .map_err(|_| HeraldError::Config(format!("HERALD_BOT_ID is not a user id: {raw}")))?;
        config.bot.user_id = UserId(id);
    }
    if let Ok(raw) = env::var("HERALD_OWNER_ID") {
        let id = raw
            .parse::<u64>()
            .map_err(|_| HeraldError::Config(format!("HERALD_OWNER_ID is not a user id: {raw}")))?;
        config.bot.owner_id = UserId(id);
    }
    if let Ok(prefix) = env::var("HERALD_PREFIX") {
        config.prefixes.default = prefix;
    }
    Ok(())
}
