//! Integration tests for the dispatch pipeline: prefix matching, early
//! and late hooks, overload selection, rate limiting, and reporting.

use async_trait::async_trait;
use chrono::Utc;
use herald_common::{ChannelId, CommunityId, UserId};
use herald_dispatch::{
    AliasTransformer, Args, BehaviorRegistry, Command, CommandRegistry, DispatchEvent,
    DispatchOutcome, EarlyBehavior, EarlyKind, ExecutionContext, FnHandler, HandlerBuilder,
    InboundMessage, IntReader, LateBlocker, LateExecutor, MemberLookup, MemberMatch,
    MentionReader, MessageHandler, NoPrefixStore, ParamSpec, PrefixResolver, RateLimiter,
    RequireCommunity, StringReader,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast::error::TryRecvError;

const BOT: UserId = UserId(1000);
const OWNER: UserId = UserId(1001);
const ALICE: UserId = UserId(99);

struct Directory;

impl MemberLookup for Directory {
    fn resolve(&self, _community: Option<CommunityId>, name: &str) -> Vec<MemberMatch> {
        if name == "alice" {
            vec![MemberMatch {
                user: ALICE,
                score: 0.9,
            }]
        } else {
            Vec::new()
        }
    }
}

fn counting_command(
    name: &str,
    priority: i32,
    params: Vec<ParamSpec>,
) -> (Command, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    let handler = FnHandler(
        move |_: &ExecutionContext, _: &Args| -> herald_dispatch::HandlerResult {
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        },
    );
    let mut command = Command::new(name, "test", handler).priority(priority);
    for param in params {
        command = command.param(param);
    }
    (command, count)
}

fn prefixes() -> Arc<PrefixResolver> {
    let mut seed = HashMap::new();
    seed.insert(CommunityId(7), ">>".to_string());
    Arc::new(PrefixResolver::new(
        "!",
        seed,
        BOT,
        Arc::new(NoPrefixStore),
    ))
}

fn message(author: UserId, channel: ChannelId, content: &str) -> InboundMessage {
    InboundMessage {
        author_id: author,
        author_is_bot: false,
        channel_id: channel,
        community_id: None,
        content: content.to_string(),
        timestamp: Utc::now(),
    }
}

fn drain(rx: &mut tokio::sync::broadcast::Receiver<DispatchEvent>) -> Vec<DispatchEvent> {
    let mut events = Vec::new();
    loop {
        match rx.try_recv() {
            Ok(event) => events.push(event),
            Err(TryRecvError::Empty | TryRecvError::Closed) => break,
            Err(TryRecvError::Lagged(_)) => {}
        }
    }
    events
}

fn build(
    registry: CommandRegistry,
    behaviors: BehaviorRegistry,
    limiter: Arc<RateLimiter>,
) -> Arc<MessageHandler> {
    let handler = HandlerBuilder::new(prefixes(), BOT, OWNER)
        .registry(registry)
        .behaviors(behaviors)
        .limiter(limiter)
        .build();
    handler.mark_ready();
    handler
}

#[tokio::test]
async fn test_ping_executes_exactly_once() {
    let mut registry = CommandRegistry::new();
    let (ping, count) = counting_command("ping", 0, vec![]);
    registry.register(ping).unwrap();

    let handler = build(registry, BehaviorRegistry::new(), Arc::new(RateLimiter::new()));
    let mut rx = handler.reporter().subscribe();

    handler.process(message(UserId(1), ChannelId(5), "!ping")).await;

    assert_eq!(count.load(Ordering::SeqCst), 1);
    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(
        &events[0],
        DispatchEvent::Executed { command, .. } if command == "ping"
    ));
}

#[tokio::test]
async fn test_higher_priority_overload_always_wins() {
    let mut registry = CommandRegistry::new();
    let (low, low_count) = counting_command(
        "top",
        0,
        vec![ParamSpec::required("value", IntReader)],
    );
    let (high, high_count) = counting_command(
        "top",
        5,
        vec![ParamSpec::required("value", StringReader)],
    );
    registry.register(low).unwrap();
    registry.register(high).unwrap();

    let handler = build(registry, BehaviorRegistry::new(), Arc::new(RateLimiter::new()));
    // The int parse scores 1.0 against the string reader's 0.5, but
    // priority 5 dominates any argument-score difference.
    handler.process(message(UserId(1), ChannelId(5), "!top 42")).await;

    assert_eq!(low_count.load(Ordering::SeqCst), 0);
    assert_eq!(high_count.load(Ordering::SeqCst), 1);
}

struct Blacklist;

#[async_trait]
impl EarlyBehavior for Blacklist {
    fn priority(&self) -> i32 {
        10
    }

    fn kind(&self) -> EarlyKind {
        EarlyKind::Blocker
    }

    fn name(&self) -> &'static str {
        "blacklist"
    }

    async fn run(&self, ctx: &ExecutionContext) -> bool {
        ctx.author_id == UserId(666)
    }
}

struct FlagExecutor(Arc<AtomicUsize>);

#[async_trait]
impl LateExecutor for FlagExecutor {
    fn name(&self) -> &'static str {
        "flag"
    }

    async fn run(&self, _ctx: &ExecutionContext, _outcome: &DispatchOutcome) -> anyhow::Result<()> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[tokio::test]
async fn test_early_blocker_halts_everything() {
    let mut registry = CommandRegistry::new();
    let (ping, count) = counting_command("ping", 0, vec![]);
    registry.register(ping).unwrap();

    let late_runs = Arc::new(AtomicUsize::new(0));
    let mut behaviors = BehaviorRegistry::new();
    behaviors.register_early(Blacklist);
    behaviors.register_late_executor(FlagExecutor(Arc::clone(&late_runs)));

    let handler = build(registry, behaviors, Arc::new(RateLimiter::new()));
    let mut rx = handler.reporter().subscribe();

    handler.process(message(UserId(666), ChannelId(5), "!ping")).await;

    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(late_runs.load(Ordering::SeqCst), 0);
    assert!(drain(&mut rx).is_empty());

    // A non-blacklisted user still gets through, and the late executor runs.
    handler.process(message(UserId(1), ChannelId(5), "!ping")).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(late_runs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_cooldown_window_allows_exactly_one() {
    let mut registry = CommandRegistry::new();
    let (ping, count) = counting_command("ping", 0, vec![]);
    registry.register(ping).unwrap();

    let limiter = Arc::new(RateLimiter::new());
    let handler = build(registry, BehaviorRegistry::new(), Arc::clone(&limiter));
    let mut rx = handler.reporter().subscribe();

    handler.process(message(UserId(1), ChannelId(5), "!ping")).await;
    handler.process(message(UserId(1), ChannelId(5), "!ping")).await;

    // Exactly one execution and one fully silent no-op.
    assert_eq!(count.load(Ordering::SeqCst), 1);
    assert_eq!(drain(&mut rx).len(), 1);

    // After the window resets, a subsequent attempt succeeds.
    limiter.clear();
    handler.process(message(UserId(1), ChannelId(5), "!ping")).await;
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_mention_overload_beats_string_on_tie() {
    let mut registry = CommandRegistry::new();
    let (as_mention, mention_count) = counting_command(
        "give",
        0,
        vec![
            ParamSpec::required("amount", IntReader),
            ParamSpec::required("user", MentionReader::new(Arc::new(Directory))),
        ],
    );
    let (as_string, string_count) = counting_command(
        "give",
        0,
        vec![
            ParamSpec::required("amount", IntReader),
            ParamSpec::required("user", StringReader),
        ],
    );
    registry.register(as_mention).unwrap();
    registry.register(as_string).unwrap();

    let handler = build(registry, BehaviorRegistry::new(), Arc::new(RateLimiter::new()));
    handler
        .process(message(UserId(1), ChannelId(5), "!give 5 @alice"))
        .await;

    // Equal priority; the unambiguous mention match (0.9) outranks the
    // generic string match (0.5).
    assert_eq!(mention_count.load(Ordering::SeqCst), 1);
    assert_eq!(string_count.load(Ordering::SeqCst), 0);
}

struct ChannelVeto(ChannelId);

#[async_trait]
impl LateBlocker for ChannelVeto {
    fn priority(&self) -> i32 {
        0
    }

    fn name(&self) -> &'static str {
        "channel_veto"
    }

    async fn block(&self, ctx: &ExecutionContext, command: &Command) -> bool {
        command.name == "roll" && ctx.channel_id == self.0
    }
}

#[tokio::test]
async fn test_late_blocker_is_channel_scoped() {
    let mut registry = CommandRegistry::new();
    let (roll, count) = counting_command("roll", 0, vec![]);
    registry.register(roll).unwrap();

    let mut behaviors = BehaviorRegistry::new();
    behaviors.register_late_blocker(ChannelVeto(ChannelId(5)));

    let handler = build(registry, behaviors, Arc::new(RateLimiter::new()));
    let mut rx = handler.reporter().subscribe();

    // Channel X: no execution and no error event.
    handler.process(message(UserId(1), ChannelId(5), "!roll")).await;
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert!(drain(&mut rx).is_empty());

    // Channel Y: executes normally.
    handler.process(message(UserId(2), ChannelId(6), "!roll")).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_parse_failure_names_the_parameter() {
    let mut registry = CommandRegistry::new();
    let (as_mention, _) = counting_command(
        "give",
        0,
        vec![
            ParamSpec::required("amount", IntReader),
            ParamSpec::required("user", MentionReader::new(Arc::new(Directory))),
        ],
    );
    let (as_string, _) = counting_command(
        "give",
        0,
        vec![
            ParamSpec::required("amount", IntReader),
            ParamSpec::required("user", StringReader),
        ],
    );
    registry.register(as_mention).unwrap();
    registry.register(as_string).unwrap();

    let handler = build(registry, BehaviorRegistry::new(), Arc::new(RateLimiter::new()));
    let mut rx = handler.reporter().subscribe();

    handler
        .process(message(UserId(1), ChannelId(5), "!give abc @alice"))
        .await;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    match &events[0] {
        DispatchEvent::Errored { command, error, .. } => {
            assert_eq!(command, "give");
            assert!(error.contains("amount"), "error should name the parameter: {error}");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_community_prefix_override_and_mention_prefix() {
    let mut registry = CommandRegistry::new();
    let (ping, count) = counting_command("ping", 0, vec![]);
    registry.register(ping).unwrap();

    let handler = build(registry, BehaviorRegistry::new(), Arc::new(RateLimiter::new()));

    let mut in_community = message(UserId(1), ChannelId(5), "!ping");
    in_community.community_id = Some(CommunityId(7));
    handler.process(in_community).await;
    // "!": not the override prefix for community 7.
    assert_eq!(count.load(Ordering::SeqCst), 0);

    let mut overridden = message(UserId(2), ChannelId(5), ">>ping");
    overridden.community_id = Some(CommunityId(7));
    handler.process(overridden).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);

    // Mentioning the bot works everywhere, regardless of prefix.
    let mut mentioned = message(UserId(3), ChannelId(5), format!("<@{}> ping", BOT.0).as_str());
    mentioned.community_id = Some(CommunityId(7));
    handler.process(mentioned).await;
    assert_eq!(count.load(Ordering::SeqCst), 2);
}

struct AlwaysFail(&'static str);

#[async_trait]
impl herald_dispatch::Precondition for AlwaysFail {
    fn name(&self) -> &'static str {
        "always_fail"
    }

    async fn check(&self, _ctx: &ExecutionContext) -> herald_dispatch::PreconditionResult {
        herald_dispatch::PreconditionResult::fail(self.0)
    }
}

#[tokio::test]
async fn test_precondition_failure_reports_highest_priority_reason() {
    let mut registry = CommandRegistry::new();
    let (low, low_count) = counting_command("mod", 0, vec![]);
    let (high, high_count) = counting_command("mod", 3, vec![]);
    registry
        .register(low.precondition(AlwaysFail("low gate closed")))
        .unwrap();
    registry
        .register(high.precondition(AlwaysFail("high gate closed")))
        .unwrap();

    let handler = build(registry, BehaviorRegistry::new(), Arc::new(RateLimiter::new()));
    let mut rx = handler.reporter().subscribe();

    handler.process(message(UserId(1), ChannelId(5), "!mod")).await;

    // Neither overload may execute, and the surfaced reason belongs to
    // the highest-priority failing candidate.
    assert_eq!(low_count.load(Ordering::SeqCst), 0);
    assert_eq!(high_count.load(Ordering::SeqCst), 0);
    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    match &events[0] {
        DispatchEvent::Errored { command, error, .. } => {
            assert_eq!(command, "mod");
            assert_eq!(error, "high gate closed");
        }
        other => panic!("unexpected event: {other:?}"),
    }
}

#[tokio::test]
async fn test_dm_restricted_command_fails_in_dm() {
    let mut registry = CommandRegistry::new();
    let (cmd, count) = counting_command("purge", 0, vec![]);
    registry.register(cmd.precondition(RequireCommunity)).unwrap();

    let handler = build(registry, BehaviorRegistry::new(), Arc::new(RateLimiter::new()));
    let mut rx = handler.reporter().subscribe();

    // Direct message: the community gate fails.
    handler.process(message(UserId(1), ChannelId(5), "!purge")).await;
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert!(matches!(&drain(&mut rx)[..], [DispatchEvent::Errored { .. }]));

    // Community channel: it runs.
    let mut msg = message(UserId(2), ChannelId(5), "!purge");
    msg.community_id = Some(CommunityId(3));
    handler.process(msg).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_messages_dropped_until_ready() {
    let mut registry = CommandRegistry::new();
    let (ping, count) = counting_command("ping", 0, vec![]);
    registry.register(ping).unwrap();

    let handler = HandlerBuilder::new(prefixes(), BOT, OWNER)
        .registry(registry)
        .build();
    let mut rx = handler.reporter().subscribe();

    handler.process(message(UserId(1), ChannelId(5), "!ping")).await;
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert!(drain(&mut rx).is_empty());

    handler.mark_ready();
    handler.process(message(UserId(1), ChannelId(5), "!ping")).await;
    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_bot_authors_ignored() {
    let mut registry = CommandRegistry::new();
    let (ping, count) = counting_command("ping", 0, vec![]);
    registry.register(ping).unwrap();

    let handler = build(registry, BehaviorRegistry::new(), Arc::new(RateLimiter::new()));

    let mut from_bot = message(UserId(33), ChannelId(5), "!ping");
    from_bot.author_is_bot = true;
    handler.process(from_bot).await;

    handler.process(message(BOT, ChannelId(5), "!ping")).await;
    assert_eq!(count.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_alias_transformer_rewrites_before_matching() {
    let mut registry = CommandRegistry::new();
    let (ping, count) = counting_command("ping", 0, vec![]);
    registry.register(ping).unwrap();

    let aliases = AliasTransformer::new(0);
    aliases.set_alias(CommunityId(3), "knock", "!ping");
    let mut behaviors = BehaviorRegistry::new();
    behaviors.register_transformer(aliases);

    let handler = build(registry, behaviors, Arc::new(RateLimiter::new()));

    let mut msg = message(UserId(1), ChannelId(5), "knock");
    msg.community_id = Some(CommunityId(3));
    handler.process(msg).await;

    assert_eq!(count.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_execute_typed_replay() {
    let mut registry = CommandRegistry::new();
    let (ping, count) = counting_command("ping", 0, vec![]);
    registry.register(ping).unwrap();

    let limiter = Arc::new(RateLimiter::new());
    let handler = HandlerBuilder::new(prefixes(), BOT, OWNER)
        .registry(registry)
        .limiter(Arc::clone(&limiter))
        .build();

    // Replays bypass the ready gate and the rate limit.
    let outcome = handler.execute_typed(ChannelId(5), None, "ping").await;
    assert!(matches!(outcome, DispatchOutcome::Executed { .. }));
    let outcome = handler.execute_typed(ChannelId(5), None, "ping").await;
    assert!(matches!(outcome, DispatchOutcome::Executed { .. }));

    assert_eq!(count.load(Ordering::SeqCst), 2);
    assert!(limiter.is_empty());
}

#[tokio::test]
async fn test_unknown_command_goes_to_no_trigger() {
    let registry = CommandRegistry::new();
    let handler = build(registry, BehaviorRegistry::new(), Arc::new(RateLimiter::new()));
    let mut rx = handler.reporter().subscribe();

    handler.process(message(UserId(1), ChannelId(5), "!mystery")).await;

    let events = drain(&mut rx);
    assert_eq!(events.len(), 1);
    assert!(matches!(&events[0], DispatchEvent::NoTrigger { .. }));
}
