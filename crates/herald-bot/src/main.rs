//! Main entry point for Herald.

use herald_bot::{register_builtins, BotResult, HeraldBot};
use herald_config::{Config, ConfigLoader};
use herald_dispatch::{BehaviorRegistry, CommandRegistry};
use std::env;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> BotResult<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "herald=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Herald");

    let config = load_config().await?;

    // Startup registration phase: explicit wiring, no scanning. Feature
    // modules would add their commands and hooks here.
    let mut registry = CommandRegistry::new();
    register_builtins(&mut registry)?;
    let behaviors = BehaviorRegistry::new();

    let bot = HeraldBot::new(config, registry, behaviors);

    // The gateway transport is an external collaborator; it pushes
    // inbound messages into this channel.
    let (_gateway_tx, gateway_rx) = mpsc::channel(1024);
    bot.run(gateway_rx).await
}

async fn load_config() -> BotResult<Config> {
    let path = env::var("HERALD_CONFIG").unwrap_or_else(|_| "herald.yaml".to_string());
    let loader = ConfigLoader::new(path);
    let config = loader
        .load()
        .await
        .map_err(|e| herald_common::HeraldError::Config(e.to_string()))?;
    Ok(config)
}
