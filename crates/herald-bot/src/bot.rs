//! Core bot wiring: registration phase, shared state, and the ingestion
//! loop feeding the dispatch engine.

use crate::error::BotResult;
use herald_common::{ChannelId, CommunityId};
use herald_config::{Config, ConfigCache};
use herald_dispatch::{
    Args, BehaviorRegistry, Command, CommandRegistry, DispatchOutcome, ExecutionContext,
    FnHandler, HandlerBuilder, InboundMessage, MessageHandler, NoPrefixStore, PrefixResolver,
    RateLimiter,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

/// Main bot structure. Owns the frozen registries, the shared prefix and
/// cooldown state, the live configuration, and the ready gate.
pub struct HeraldBot {
    config: Arc<ConfigCache>,
    handler: Arc<MessageHandler>,
    limiter: Arc<RateLimiter>,
    prefixes: Arc<PrefixResolver>,
}

impl HeraldBot {
    /// Creates a bot from configuration and the registries populated by
    /// feature modules during the startup registration phase.
    ///
    /// The registries and the prefix seed are frozen here; fields read
    /// per use, such as the cooldown window, follow later reloads.
    pub fn new(config: Config, mut registry: CommandRegistry, behaviors: BehaviorRegistry) -> Self {
        let config = Arc::new(ConfigCache::new(config));
        let startup = config.current();
        registry.set_case_sensitivity(startup.dispatch.case_sensitive_default);

        let prefixes = Arc::new(PrefixResolver::new(
            startup.prefixes.default.clone(),
            startup.prefixes.overrides.clone(),
            startup.bot.user_id,
            Arc::new(NoPrefixStore),
        ));
        let limiter = Arc::new(RateLimiter::new());
        let handler = HandlerBuilder::new(
            Arc::clone(&prefixes),
            startup.bot.user_id,
            startup.bot.owner_id,
        )
        .registry(registry)
        .behaviors(behaviors)
        .limiter(Arc::clone(&limiter))
        .build();

        Self {
            config,
            handler,
            limiter,
            prefixes,
        }
    }

    /// The current configuration snapshot.
    pub fn config(&self) -> Arc<Config> {
        self.config.current()
    }

    /// Validates and installs a new configuration snapshot. Readers that
    /// already hold the previous snapshot are unaffected.
    pub fn reload_config(&self, config: Config) -> BotResult<()> {
        config.validate()?;
        self.config.replace(config);
        info!("configuration reloaded");
        Ok(())
    }

    /// The message handler, for gateways that push messages directly.
    pub fn handler(&self) -> &Arc<MessageHandler> {
        &self.handler
    }

    /// The prefix resolver, for modules implementing prefix commands.
    pub fn prefixes(&self) -> &Arc<PrefixResolver> {
        &self.prefixes
    }

    /// Replays literal command text as if typed in the given channel,
    /// for scheduled automations.
    pub async fn execute_typed(
        &self,
        channel: ChannelId,
        community: Option<CommunityId>,
        text: &str,
    ) -> DispatchOutcome {
        self.handler.execute_typed(channel, community, text).await
    }

    /// Starts the cooldown clear timer, reports ready, and drains the
    /// gateway channel until it closes. Each message becomes its own
    /// unit of concurrent work.
    pub async fn run(&self, mut inbound: mpsc::Receiver<InboundMessage>) -> BotResult<()> {
        let config = self.config.current();
        let window = Duration::from_secs(config.dispatch.cooldown_window_secs);
        let clear_task = self.limiter.spawn_clear_task(window);

        self.handler.mark_ready();
        info!(bot = %config.bot.user_id, "herald ready");

        while let Some(msg) = inbound.recv().await {
            self.handler.handle(msg);
        }

        clear_task.abort();
        Ok(())
    }
}

/// Registers the built-in liveness command. Feature modules register
/// their own commands the same way during startup.
pub fn register_builtins(registry: &mut CommandRegistry) -> BotResult<()> {
    let ping = Command::new(
        "ping",
        "builtin",
        FnHandler(
            |ctx: &ExecutionContext, _: &Args| -> herald_dispatch::HandlerResult {
                info!(user = %ctx.author_id, channel = %ctx.channel_id, "pong");
                Ok(())
            },
        ),
    );
    registry.register(ping)?;
    Ok(())
}
