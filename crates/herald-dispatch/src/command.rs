//! Command definitions, preconditions, and the command registry.

use crate::context::ExecutionContext;
use crate::error::HandlerResult;
use crate::readers::TypeReader;
use crate::resolve::Args;
use async_trait::async_trait;
use herald_common::{HeraldError, UserId};
use std::collections::HashSet;
use std::sync::Arc;

/// How a parameter consumes input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Consumes exactly one token; missing token fails the parse.
    Required,
    /// Consumes every remaining token, one read per token. Only legal in
    /// last position, may be empty.
    Variadic,
    /// Consumes the untokenized remainder of the line as one value. Only
    /// legal in last position.
    Remainder,
}

/// One declared parameter of a command signature.
#[derive(Clone)]
pub struct ParamSpec {
    /// Parameter name, also used in parse-failure reasons.
    pub name: &'static str,
    /// Consumption mode.
    pub kind: ParamKind,
    /// The type reader binding tokens to values.
    pub reader: Arc<dyn TypeReader>,
}

impl ParamSpec {
    /// A required single-token parameter.
    pub fn required(name: &'static str, reader: impl TypeReader + 'static) -> Self {
        Self {
            name,
            kind: ParamKind::Required,
            reader: Arc::new(reader),
        }
    }

    /// A variadic trailing parameter.
    pub fn variadic(name: &'static str, reader: impl TypeReader + 'static) -> Self {
        Self {
            name,
            kind: ParamKind::Variadic,
            reader: Arc::new(reader),
        }
    }

    /// A remainder-of-line parameter.
    pub fn remainder(name: &'static str, reader: impl TypeReader + 'static) -> Self {
        Self {
            name,
            kind: ParamKind::Remainder,
            reader: Arc::new(reader),
        }
    }
}

impl std::fmt::Debug for ParamSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParamSpec")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("reader", &self.reader.name())
            .finish()
    }
}

/// Result of one precondition check, scoped to one candidate.
#[derive(Debug, Clone)]
pub struct PreconditionResult {
    /// Whether the precondition passed.
    pub success: bool,
    /// Human-readable failure reason when it did not.
    pub reason: Option<String>,
}

impl PreconditionResult {
    /// A passing result.
    pub fn ok() -> Self {
        Self {
            success: true,
            reason: None,
        }
    }

    /// A failing result with a reason.
    pub fn fail(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: Some(reason.into()),
        }
    }
}

/// Gate evaluated against the context before a candidate may be parsed.
#[async_trait]
pub trait Precondition: Send + Sync {
    /// Precondition name, for logging.
    fn name(&self) -> &'static str;

    /// Checks the gate against the invoking context.
    async fn check(&self, ctx: &ExecutionContext) -> PreconditionResult;
}

/// Restricts a command to community channels.
pub struct RequireCommunity;

#[async_trait]
impl Precondition for RequireCommunity {
    fn name(&self) -> &'static str {
        "require_community"
    }

    async fn check(&self, ctx: &ExecutionContext) -> PreconditionResult {
        if ctx.community_id.is_some() {
            PreconditionResult::ok()
        } else {
            PreconditionResult::fail("this command cannot be used in direct messages")
        }
    }
}

/// Restricts a command to direct messages.
pub struct RequireDirectMessage;

#[async_trait]
impl Precondition for RequireDirectMessage {
    fn name(&self) -> &'static str {
        "require_direct_message"
    }

    async fn check(&self, ctx: &ExecutionContext) -> PreconditionResult {
        if ctx.community_id.is_none() {
            PreconditionResult::ok()
        } else {
            PreconditionResult::fail("this command can only be used in direct messages")
        }
    }
}

/// Restricts a command to an explicit allow-list of users.
pub struct RequireUser {
    allowed: HashSet<UserId>,
}

impl RequireUser {
    /// Creates the gate from an allow-list.
    pub fn new(allowed: impl IntoIterator<Item = UserId>) -> Self {
        Self {
            allowed: allowed.into_iter().collect(),
        }
    }
}

#[async_trait]
impl Precondition for RequireUser {
    fn name(&self) -> &'static str {
        "require_user"
    }

    async fn check(&self, ctx: &ExecutionContext) -> PreconditionResult {
        if self.allowed.contains(&ctx.author_id) {
            PreconditionResult::ok()
        } else {
            PreconditionResult::fail("you are not allowed to use this command")
        }
    }
}

/// The action behind a command.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    /// Runs the command with bound arguments.
    async fn run(&self, ctx: &ExecutionContext, args: &Args) -> HandlerResult;
}

/// Adapts a plain closure into a [`CommandHandler`].
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> CommandHandler for FnHandler<F>
where
    F: Fn(&ExecutionContext, &Args) -> HandlerResult + Send + Sync,
{
    async fn run(&self, ctx: &ExecutionContext, args: &Args) -> HandlerResult {
        (self.0)(ctx, args)
    }
}

/// A registered command overload.
pub struct Command {
    /// Primary command name.
    pub name: String,
    /// Alternative invocation names.
    pub aliases: Vec<String>,
    /// Declared parameter signature, in consumption order.
    pub params: Vec<ParamSpec>,
    /// Declared priority; dominates parse quality in overload scoring.
    pub priority: i32,
    /// Name of the owning feature module.
    pub module: &'static str,
    /// Whether name matching is case-sensitive for this command.
    pub case_sensitive: bool,
    /// Gates evaluated before argument parsing.
    pub preconditions: Vec<Arc<dyn Precondition>>,
    handler: Arc<dyn CommandHandler>,
}

impl Command {
    /// Starts building a command with the given name, owning module, and
    /// handler.
    pub fn new(
        name: impl Into<String>,
        module: &'static str,
        handler: impl CommandHandler + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            params: Vec::new(),
            priority: 0,
            module,
            case_sensitive: false,
            preconditions: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    /// Adds an invocation alias.
    #[must_use]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Sets the declared priority.
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Appends a parameter to the signature.
    #[must_use]
    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    /// Makes name matching case-sensitive for this command.
    #[must_use]
    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }

    /// Adds a precondition gate.
    #[must_use]
    pub fn precondition(mut self, precondition: impl Precondition + 'static) -> Self {
        self.preconditions.push(Arc::new(precondition));
        self
    }

    /// The handler behind this command.
    pub fn handler(&self) -> &Arc<dyn CommandHandler> {
        &self.handler
    }

    /// Whether the given invocation token names this command.
    /// `sensitive_default` is the registry-wide matching default; a
    /// command's own flag can only tighten it.
    pub fn matches(&self, token: &str, sensitive_default: bool) -> bool {
        let sensitive = self.case_sensitive || sensitive_default;
        let name_eq = |name: &str| {
            if sensitive {
                name == token
            } else {
                name.eq_ignore_ascii_case(token)
            }
        };
        name_eq(&self.name) || self.aliases.iter().any(|a| name_eq(a))
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("priority", &self.priority)
            .field("module", &self.module)
            .field("params", &self.params)
            .finish()
    }
}

/// Registry of all command overloads, populated during the startup
/// registration phase and frozen afterwards.
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<Arc<Command>>,
    case_sensitive_default: bool,
}

impl CommandRegistry {
    /// Creates an empty registry with case-insensitive matching.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty registry with the given matching default.
    pub fn with_case_sensitivity(case_sensitive_default: bool) -> Self {
        Self {
            commands: Vec::new(),
            case_sensitive_default,
        }
    }

    /// Sets the registry-wide case-sensitivity default.
    pub fn set_case_sensitivity(&mut self, case_sensitive_default: bool) {
        self.case_sensitive_default = case_sensitive_default;
    }

    /// Registers a command overload. Rejects signatures with a variadic
    /// or remainder parameter anywhere but last position.
    pub fn register(&mut self, command: Command) -> Result<(), HeraldError> {
        for (i, param) in command.params.iter().enumerate() {
            let last = i + 1 == command.params.len();
            if param.kind != ParamKind::Required && !last {
                return Err(HeraldError::Dispatch(format!(
                    "command `{}`: parameter `{}` must be last in the signature",
                    command.name, param.name
                )));
            }
        }
        self.commands.push(Arc::new(command));
        Ok(())
    }

    /// Finds every overload whose name or alias matches the invocation
    /// token, in registration order.
    pub fn search(&self, token: &str) -> Vec<Arc<Command>> {
        self.commands
            .iter()
            .filter(|c| c.matches(token, self.case_sensitive_default))
            .cloned()
            .collect()
    }

    /// All registered overloads.
    pub fn commands(&self) -> &[Arc<Command>] {
        &self.commands
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::{IntReader, StringReader};

    fn noop() -> FnHandler<impl Fn(&ExecutionContext, &Args) -> HandlerResult + Send + Sync> {
        FnHandler(|_: &ExecutionContext, _: &Args| -> HandlerResult { Ok(()) })
    }

    #[test]
    fn test_matches_is_case_insensitive_by_default() {
        let cmd = Command::new("ping", "test", noop()).alias("p");
        assert!(cmd.matches("ping", false));
        assert!(cmd.matches("PING", false));
        assert!(cmd.matches("P", false));
        assert!(!cmd.matches("pong", false));
    }

    #[test]
    fn test_case_sensitive_opt_in() {
        let cmd = Command::new("Ping", "test", noop()).case_sensitive();
        assert!(cmd.matches("Ping", false));
        assert!(!cmd.matches("ping", false));
    }

    #[test]
    fn test_registry_wide_case_sensitivity() {
        let mut registry = CommandRegistry::with_case_sensitivity(true);
        registry.register(Command::new("Ping", "test", noop())).unwrap();
        assert_eq!(registry.search("Ping").len(), 1);
        assert!(registry.search("ping").is_empty());
    }

    #[test]
    fn test_register_rejects_inner_variadic() {
        let mut registry = CommandRegistry::new();
        let bad = Command::new("give", "test", noop())
            .param(ParamSpec::variadic("amounts", IntReader))
            .param(ParamSpec::required("user", StringReader));
        assert!(registry.register(bad).is_err());
    }

    #[test]
    fn test_search_returns_all_overloads() {
        let mut registry = CommandRegistry::new();
        registry
            .register(Command::new("give", "test", noop()).param(ParamSpec::required(
                "amount",
                IntReader,
            )))
            .unwrap();
        registry
            .register(Command::new("give", "test", noop()).param(ParamSpec::required(
                "what",
                StringReader,
            )))
            .unwrap();
        registry.register(Command::new("ping", "test", noop())).unwrap();

        assert_eq!(registry.search("give").len(), 2);
        assert_eq!(registry.search("GIVE").len(), 2);
        assert_eq!(registry.search("ping").len(), 1);
        assert!(registry.search("roll").is_empty());
    }
}
