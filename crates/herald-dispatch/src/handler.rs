//! Message handler: the per-message pipeline orchestrator.
//!
//! Each inbound message becomes an independent, unordered unit of
//! concurrent work. Within one message the stages run strictly
//! sequentially: transformers, early pipeline, prefix matching,
//! resolution, then late executors.

use crate::behavior::BehaviorRegistry;
use crate::context::{ExecutionContext, InboundMessage};
use crate::cooldown::RateLimiter;
use crate::prefix::PrefixResolver;
use crate::report::{DispatchEvent, ExecutionReporter};
use crate::resolve::{DispatchOutcome, Dispatcher};
use crate::transform::apply_transformers;
use chrono::Utc;
use herald_common::{ChannelId, CommunityId, UserId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, trace};

/// Orchestrates one message's trip through the dispatch pipeline.
pub struct MessageHandler {
    dispatcher: Dispatcher,
    behaviors: Arc<BehaviorRegistry>,
    prefixes: Arc<PrefixResolver>,
    reporter: ExecutionReporter,
    bot_id: UserId,
    owner_id: UserId,
    ready: AtomicBool,
}

impl MessageHandler {
    /// Wires the handler over frozen registries and shared state.
    pub fn new(
        dispatcher: Dispatcher,
        behaviors: Arc<BehaviorRegistry>,
        prefixes: Arc<PrefixResolver>,
        reporter: ExecutionReporter,
        bot_id: UserId,
        owner_id: UserId,
    ) -> Self {
        Self {
            dispatcher,
            behaviors,
            prefixes,
            reporter,
            bot_id,
            owner_id,
            ready: AtomicBool::new(false),
        }
    }

    /// Marks the host process ready. Until then every inbound message is
    /// dropped before any pipeline stage.
    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }

    /// Whether the handler accepts inbound messages.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    /// The reporter this handler emits dispatch events through.
    pub fn reporter(&self) -> &ExecutionReporter {
        &self.reporter
    }

    /// Accepts one inbound message as an independent unit of concurrent
    /// work. No ordering is guaranteed between two messages; a stalled
    /// handler only stalls its own unit.
    pub fn handle(self: &Arc<Self>, msg: InboundMessage) {
        let handler = Arc::clone(self);
        tokio::spawn(async move {
            handler.process(msg).await;
        });
    }

    /// Runs the full pipeline for one message.
    pub async fn process(&self, msg: InboundMessage) {
        if !self.is_ready() {
            trace!(channel = %msg.channel_id, "dropping message before ready");
            return;
        }
        if msg.author_is_bot || msg.author_id == self.bot_id {
            return;
        }

        let ctx = ExecutionContext::from_message(&msg);

        // Input transformer chain, first match wins.
        let content = apply_transformers(self.behaviors.transformers(), &ctx, &msg.content).await;

        // Early behavior pipeline: the first hook returning true halts
        // everything, including late executors.
        for hook in self.behaviors.early() {
            debug!(hook = hook.name(), kind = ?hook.kind(), "running early behavior");
            if hook.run(&ctx).await {
                debug!(hook = hook.name(), "message handled by early behavior");
                return;
            }
        }

        let Some(consumed) = self.prefixes.matched_prefix(ctx.community_id, &content) else {
            self.reporter.report(DispatchEvent::NoTrigger {
                channel: ctx.channel_id,
                content: msg.content,
            });
            return;
        };

        let invocation = &content[consumed..];
        let outcome = self.dispatcher.dispatch(&ctx, invocation, true).await;
        self.finish(&ctx, outcome).await;
    }

    /// Executes literal command text as if it had been typed in the
    /// given channel, for non-chat-triggered replays such as scheduled
    /// automations. Bypasses the ready gate, transformers, the early
    /// pipeline, and the rate limit; late blockers still apply.
    pub async fn execute_typed(
        &self,
        channel: ChannelId,
        community: Option<CommunityId>,
        text: &str,
    ) -> DispatchOutcome {
        let ctx = ExecutionContext {
            author_id: self.owner_id,
            channel_id: channel,
            community_id: community,
            content: text.to_string(),
            timestamp: Utc::now(),
        };
        let outcome = self.dispatcher.dispatch(&ctx, text, false).await;
        self.finish(&ctx, outcome.clone()).await;
        outcome
    }

    /// Emits reporter events for the outcome and runs late executors.
    async fn finish(&self, ctx: &ExecutionContext, outcome: DispatchOutcome) {
        match &outcome {
            DispatchOutcome::Executed { command } => {
                self.reporter.report(DispatchEvent::Executed {
                    user: ctx.author_id,
                    channel: ctx.channel_id,
                    community: ctx.community_id,
                    command: command.name.clone(),
                    timestamp: ctx.timestamp,
                });
            }
            DispatchOutcome::Errored { command, error } => {
                self.reporter.report(DispatchEvent::Errored {
                    command: command.name.clone(),
                    channel: ctx.channel_id,
                    error: error.clone(),
                });
            }
            DispatchOutcome::PreconditionFailed { command, reason } => {
                self.reporter.report(DispatchEvent::Errored {
                    command: command.name.clone(),
                    channel: ctx.channel_id,
                    error: reason.clone(),
                });
            }
            DispatchOutcome::ParseFailed {
                command,
                param,
                reason,
            } => {
                self.reporter.report(DispatchEvent::Errored {
                    command: command.name.clone(),
                    channel: ctx.channel_id,
                    error: format!("parameter `{param}`: {reason}"),
                });
            }
            DispatchOutcome::NoMatch => {
                self.reporter.report(DispatchEvent::NoTrigger {
                    channel: ctx.channel_id,
                    content: ctx.content.clone(),
                });
            }
            // Blocked is reported through the outcome, not as an error;
            // rate limiting is fully silent.
            DispatchOutcome::Blocked { .. } | DispatchOutcome::RateLimited { .. } => {}
        }

        // Late executors run unconditionally after resolution, in
        // registration order, isolated from one another.
        for executor in self.behaviors.late_executors() {
            if let Err(e) = executor.run(ctx, &outcome).await {
                tracing::warn!(hook = executor.name(), error = %e, "late executor failed");
            }
        }
    }
}

/// Builder collecting registrations during the startup phase, then
/// freezing them into a ready-to-run [`MessageHandler`].
pub struct HandlerBuilder {
    registry: crate::command::CommandRegistry,
    behaviors: BehaviorRegistry,
    prefixes: Arc<PrefixResolver>,
    limiter: Arc<RateLimiter>,
    reporter: ExecutionReporter,
    bot_id: UserId,
    owner_id: UserId,
}

impl HandlerBuilder {
    /// Starts a builder with the given prefix resolver and identity.
    pub fn new(prefixes: Arc<PrefixResolver>, bot_id: UserId, owner_id: UserId) -> Self {
        Self {
            registry: crate::command::CommandRegistry::new(),
            behaviors: BehaviorRegistry::new(),
            prefixes,
            limiter: Arc::new(RateLimiter::new()),
            reporter: ExecutionReporter::default(),
            bot_id,
            owner_id,
        }
    }

    /// Replaces the command registry.
    #[must_use]
    pub fn registry(mut self, registry: crate::command::CommandRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Replaces the behavior registry.
    #[must_use]
    pub fn behaviors(mut self, behaviors: BehaviorRegistry) -> Self {
        self.behaviors = behaviors;
        self
    }

    /// Replaces the rate limiter.
    #[must_use]
    pub fn limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = limiter;
        self
    }

    /// Replaces the reporter.
    #[must_use]
    pub fn reporter(mut self, reporter: ExecutionReporter) -> Self {
        self.reporter = reporter;
        self
    }

    /// Freezes all registries and builds the handler.
    pub fn build(self) -> Arc<MessageHandler> {
        let behaviors = Arc::new(self.behaviors);
        let dispatcher = Dispatcher::new(
            Arc::new(self.registry),
            Arc::clone(&behaviors),
            self.limiter,
        );
        Arc::new(MessageHandler::new(
            dispatcher,
            behaviors,
            self.prefixes,
            self.reporter,
            self.bot_id,
            self.owner_id,
        ))
    }
}
