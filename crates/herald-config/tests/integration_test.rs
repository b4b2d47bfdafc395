//! Integration tests for herald-config crate.

use herald_common::{CommunityId, UserId};
use herald_config::{Config, ConfigCache, ConfigLoader};

#[test]
fn test_default_config_validation() {
    let mut config = Config::default();

    // Default config should fail validation due to missing identity
    assert!(config.validate().is_err());

    config.bot.token = "test_token".to_string();
    config.bot.user_id = UserId(42);

    assert!(config.validate().is_ok());
}

#[test]
fn test_empty_prefix_rejected() {
    let mut config = Config::default();
    config.bot.token = "test_token".to_string();
    config.bot.user_id = UserId(42);

    config.prefixes.default = "  ".to_string();
    assert!(config.validate().is_err());

    config.prefixes.default = "!".to_string();
    config
        .prefixes
        .overrides
        .insert(CommunityId(1), String::new());
    assert!(config.validate().is_err());
}

#[test]
fn test_zero_cooldown_window_rejected() {
    let mut config = Config::default();
    config.bot.token = "test_token".to_string();
    config.bot.user_id = UserId(42);
    config.dispatch.cooldown_window_secs = 0;

    assert!(config.validate().is_err());
}

#[test]
fn test_config_cache_swap() {
    let cache = ConfigCache::new(Config::default());
    let before = cache.current();
    assert_eq!(before.prefixes.default, "!");

    let mut next = Config::default();
    next.prefixes.default = "?".to_string();
    cache.replace(next);

    assert_eq!(cache.current().prefixes.default, "?");
    // A snapshot taken before the swap keeps what it loaded.
    assert_eq!(before.prefixes.default, "!");
}

#[tokio::test]
async fn test_loader_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("herald.yaml");

    let mut config = Config::default();
    config.bot.token = "round_trip_token".to_string();
    config.bot.user_id = UserId(42);
    config
        .prefixes
        .overrides
        .insert(CommunityId(7), ">>".to_string());

    let loader = ConfigLoader::new(&path);
    loader.save(&config).await.unwrap();

    let loaded = loader.load().await.unwrap();
    assert_eq!(loaded.bot.token, "round_trip_token");
    assert_eq!(
        loaded.prefixes.overrides.get(&CommunityId(7)).unwrap(),
        ">>"
    );
}
