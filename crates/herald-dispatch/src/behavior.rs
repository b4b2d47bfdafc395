//! Behavior hooks: the priority-ordered extension points around command
//! resolution.
//!
//! Hooks are registered once during the startup registration phase via
//! explicit wiring (no scanning) and live for the process lifetime. The
//! registry sorts its pipelines when it is frozen into an `Arc`.

use crate::command::Command;
use crate::context::ExecutionContext;
use crate::resolve::DispatchOutcome;
use async_trait::async_trait;
use std::sync::Arc;

/// Whether an early behavior blocks or fully owns a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyKind {
    /// Pure veto, e.g. blacklist filtering.
    Blocker,
    /// Takes over the message entirely, e.g. trigger/response systems.
    Executor,
}

/// A hook that runs before any command matching. Returning `true` halts
/// all further processing of the message: no matching, no execution, no
/// late hooks.
#[async_trait]
pub trait EarlyBehavior: Send + Sync {
    /// Run-order priority; higher runs first.
    fn priority(&self) -> i32;

    /// Whether this hook blocks or executes.
    fn kind(&self) -> EarlyKind;

    /// Hook name, logged on every invocation.
    fn name(&self) -> &'static str;

    /// Runs the hook. `true` short-circuits the pipeline.
    async fn run(&self, ctx: &ExecutionContext) -> bool;
}

/// Rewrites message text before prefix and command matching.
///
/// Contract: a transformer that does not apply must return the
/// lower-cased input unchanged; the chain accepts the first transformer
/// whose output differs from it.
#[async_trait]
pub trait InputTransformer: Send + Sync {
    /// Run-order priority; higher runs first.
    fn priority(&self) -> i32;

    /// Transformer name, for logging.
    fn name(&self) -> &'static str;

    /// Rewrites the text, or returns the lower-cased input to pass.
    async fn transform(&self, ctx: &ExecutionContext, text: &str) -> String;
}

/// A post-match, pre-execution veto hook.
#[async_trait]
pub trait LateBlocker: Send + Sync {
    /// Run-order priority; higher runs first.
    fn priority(&self) -> i32;

    /// Blocker name, reported when the veto fires.
    fn name(&self) -> &'static str;

    /// Returns `true` to veto execution of the chosen command.
    async fn block(&self, ctx: &ExecutionContext, command: &Command) -> bool;
}

/// An unconditional post-execution hook. Late executors run in
/// registration order with per-hook error isolation.
#[async_trait]
pub trait LateExecutor: Send + Sync {
    /// Executor name, for logging.
    fn name(&self) -> &'static str;

    /// Observes the outcome of one message's dispatch.
    async fn run(&self, ctx: &ExecutionContext, outcome: &DispatchOutcome) -> anyhow::Result<()>;
}

/// Ordered registries for every hook capability. Built mutably during
/// startup, then frozen behind an `Arc` for the process lifetime.
#[derive(Default)]
pub struct BehaviorRegistry {
    early: Vec<Arc<dyn EarlyBehavior>>,
    transformers: Vec<Arc<dyn InputTransformer>>,
    late_blockers: Vec<Arc<dyn LateBlocker>>,
    late_executors: Vec<Arc<dyn LateExecutor>>,
}

impl BehaviorRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an early blocker or executor.
    pub fn register_early(&mut self, hook: impl EarlyBehavior + 'static) {
        self.early.push(Arc::new(hook));
        self.early.sort_by_key(|h| std::cmp::Reverse(h.priority()));
    }

    /// Registers an input transformer.
    pub fn register_transformer(&mut self, hook: impl InputTransformer + 'static) {
        self.transformers.push(Arc::new(hook));
        self.transformers
            .sort_by_key(|h| std::cmp::Reverse(h.priority()));
    }

    /// Registers a late blocker.
    pub fn register_late_blocker(&mut self, hook: impl LateBlocker + 'static) {
        self.late_blockers.push(Arc::new(hook));
        self.late_blockers
            .sort_by_key(|h| std::cmp::Reverse(h.priority()));
    }

    /// Registers a late executor. Late executors keep registration order.
    pub fn register_late_executor(&mut self, hook: impl LateExecutor + 'static) {
        self.late_executors.push(Arc::new(hook));
    }

    /// Early hooks, highest priority first.
    pub fn early(&self) -> &[Arc<dyn EarlyBehavior>] {
        &self.early
    }

    /// Input transformers, highest priority first.
    pub fn transformers(&self) -> &[Arc<dyn InputTransformer>] {
        &self.transformers
    }

    /// Late blockers, highest priority first.
    pub fn late_blockers(&self) -> &[Arc<dyn LateBlocker>] {
        &self.late_blockers
    }

    /// Late executors, in registration order.
    pub fn late_executors(&self) -> &[Arc<dyn LateExecutor>] {
        &self.late_executors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Early(&'static str, i32);

    #[async_trait]
    impl EarlyBehavior for Early {
        fn priority(&self) -> i32 {
            self.1
        }

        fn kind(&self) -> EarlyKind {
            EarlyKind::Blocker
        }

        fn name(&self) -> &'static str {
            self.0
        }

        async fn run(&self, _ctx: &ExecutionContext) -> bool {
            false
        }
    }

    #[test]
    fn test_early_hooks_sorted_by_priority_descending() {
        let mut registry = BehaviorRegistry::new();
        registry.register_early(Early("low", -5));
        registry.register_early(Early("high", 10));
        registry.register_early(Early("mid", 0));

        let names: Vec<_> = registry.early().iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["high", "mid", "low"]);
    }

    struct Late(&'static str);

    #[async_trait]
    impl LateExecutor for Late {
        fn name(&self) -> &'static str {
            self.0
        }

        async fn run(
            &self,
            _ctx: &ExecutionContext,
            _outcome: &DispatchOutcome,
        ) -> anyhow::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_late_executors_keep_registration_order() {
        let mut registry = BehaviorRegistry::new();
        registry.register_late_executor(Late("first"));
        registry.register_late_executor(Late("second"));

        let names: Vec<_> = registry.late_executors().iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }
}
