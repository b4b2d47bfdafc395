//! Default configuration values.

use crate::schema::*;
use herald_common::UserId;
use std::collections::HashMap;

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig::default(),
            dispatch: DispatchConfig::default(),
            prefixes: PrefixConfig::default(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            user_id: UserId(0),
            owner_id: UserId(0),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            cooldown_window_secs: 3,
            case_sensitive_default: false,
        }
    }
}

impl Default for PrefixConfig {
    fn default() -> Self {
        Self {
            default: "!".to_string(),
            overrides: HashMap::new(),
        }
    }
}
