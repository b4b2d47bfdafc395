//! Integration tests for the herald-bot wiring.

use herald_bot::{register_builtins, HeraldBot};
use herald_common::{ChannelId, CommunityId, UserId};
use herald_config::Config;
use herald_dispatch::{BehaviorRegistry, CommandRegistry, DispatchOutcome};

fn config() -> Config {
    let mut config = Config::default();
    config.bot.token = "test_token".to_string();
    config.bot.user_id = UserId(1000);
    config.bot.owner_id = UserId(1001);
    config
        .prefixes
        .overrides
        .insert(CommunityId(7), ">>".to_string());
    config
}

#[tokio::test]
async fn test_prefix_overrides_seeded_from_config() {
    let mut registry = CommandRegistry::new();
    register_builtins(&mut registry).unwrap();
    let bot = HeraldBot::new(config(), registry, BehaviorRegistry::new());

    assert_eq!(bot.prefixes().get(None), "!");
    assert_eq!(bot.prefixes().get(Some(CommunityId(7))), ">>");
    assert_eq!(bot.prefixes().get(Some(CommunityId(8))), "!");
}

#[tokio::test]
async fn test_builtin_ping_replay() {
    let mut registry = CommandRegistry::new();
    register_builtins(&mut registry).unwrap();
    let bot = HeraldBot::new(config(), registry, BehaviorRegistry::new());

    let outcome = bot.execute_typed(ChannelId(1), None, "ping").await;
    assert!(matches!(outcome, DispatchOutcome::Executed { .. }));

    let outcome = bot.execute_typed(ChannelId(1), None, "nope").await;
    assert!(matches!(outcome, DispatchOutcome::NoMatch));
}
