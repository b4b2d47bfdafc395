//! The command resolution engine: candidate search, precondition
//! evaluation, scored argument parsing, overload selection, and
//! execution.

use crate::behavior::BehaviorRegistry;
use crate::command::{Command, CommandRegistry, ParamKind};
use crate::context::ExecutionContext;
use crate::cooldown::RateLimiter;
use crate::error::HandlerError;
use crate::readers::{ArgValue, ReadOutcome, TypeReaderValue};
use herald_common::{tokenize, UserId};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Arguments bound to a command's parameters after a successful parse.
#[derive(Debug, Clone, Default)]
pub struct Args {
    values: HashMap<&'static str, ArgValue>,
    variadic: Vec<ArgValue>,
}

impl Args {
    /// The value bound to a named parameter.
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values.get(name)
    }

    /// The integer bound to a named parameter.
    pub fn int(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(ArgValue::as_int)
    }

    /// The text bound to a named parameter.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ArgValue::as_text)
    }

    /// The user bound to a named parameter.
    pub fn user(&self, name: &str) -> Option<UserId> {
        self.get(name).and_then(ArgValue::as_user)
    }

    /// Values collected by a trailing variadic parameter.
    pub fn variadic(&self) -> &[ArgValue] {
        &self.variadic
    }
}

/// The outcome of one message's trip through resolution and execution.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// The selected overload executed successfully.
    Executed {
        /// The executed command.
        command: Arc<Command>,
    },
    /// The selected overload's handler failed. Caught and logged, never
    /// propagated.
    Errored {
        /// The command whose handler failed.
        command: Arc<Command>,
        /// Human-readable error.
        error: String,
    },
    /// A late blocker vetoed the selected overload. Not an error.
    Blocked {
        /// The vetoed command.
        command: Arc<Command>,
        /// Name of the vetoing hook.
        hook: &'static str,
    },
    /// The invoking user is on cooldown. Fully silent.
    RateLimited {
        /// The command that would have run.
        command: Arc<Command>,
    },
    /// No registered command matched the invocation token.
    NoMatch,
    /// Every candidate failed its preconditions.
    PreconditionFailed {
        /// The highest-priority failing candidate.
        command: Arc<Command>,
        /// That candidate's failure reason.
        reason: String,
    },
    /// No candidate parsed successfully.
    ParseFailed {
        /// The best-scoring failing candidate.
        command: Arc<Command>,
        /// Name of the parameter that failed to parse.
        param: String,
        /// Human-readable parse failure.
        reason: String,
    },
}

/// Computes the overload selection score.
///
/// Declared integer priority dominates; the parse-quality term is scaled
/// by 0.99 so it stays strictly below 1.0 and can never let a
/// lower-priority overload outrank a higher-priority one, while still
/// breaking ties between equal-priority overloads by specificity of the
/// argument match. A parameter kind the command lacks contributes 0.
pub fn overload_score(priority: i32, required_scores: &[f32], variadic_scores: &[f32]) -> f32 {
    let avg = |scores: &[f32]| {
        if scores.is_empty() {
            0.0
        } else {
            scores.iter().sum::<f32>() / scores.len() as f32
        }
    };
    priority as f32 + 0.99 * (avg(required_scores) + avg(variadic_scores)) / 2.0
}

/// A candidate that parsed successfully, ready for selection.
struct ParsedCandidate {
    command: Arc<Command>,
    args: Args,
    score: f32,
}

/// A candidate whose argument parse failed, with the partial score used
/// to pick which failure to report.
struct FailedParse {
    command: Arc<Command>,
    param: String,
    reason: String,
    score: f32,
}

/// Collapses multiple interpretations of one parameter under the "best"
/// multi-match policy: the single highest-scored value, first on ties.
fn best_value(values: Vec<TypeReaderValue>) -> Option<TypeReaderValue> {
    let mut best: Option<TypeReaderValue> = None;
    for value in values {
        match &best {
            Some(current) if value.score <= current.score => {}
            _ => best = Some(value),
        }
    }
    best
}

/// Parses one candidate's parameter list from the text after the
/// invocation token.
fn parse_candidate(
    command: &Arc<Command>,
    ctx: &ExecutionContext,
    rest: &str,
) -> Result<ParsedCandidate, FailedParse> {
    let tokens = tokenize(rest);
    let mut args = Args::default();
    let mut required_scores = Vec::new();
    let mut variadic_scores = Vec::new();
    let mut idx = 0;

    let fail = |param: &str, reason: String, req: &[f32], var: &[f32]| FailedParse {
        command: Arc::clone(command),
        param: param.to_string(),
        reason,
        score: overload_score(command.priority, req, var),
    };

    for param in &command.params {
        match param.kind {
            ParamKind::Required => {
                let Some((_, token)) = tokens.get(idx) else {
                    return Err(fail(
                        param.name,
                        format!("missing required parameter `{}`", param.name),
                        &required_scores,
                        &variadic_scores,
                    ));
                };
                match param.reader.read(ctx, token) {
                    ReadOutcome::Matched(values) => {
                        let Some(best) = best_value(values) else {
                            return Err(fail(
                                param.name,
                                format!("no interpretation for parameter `{}`", param.name),
                                &required_scores,
                                &variadic_scores,
                            ));
                        };
                        args.values.insert(param.name, best.value);
                        required_scores.push(best.score);
                        idx += 1;
                    }
                    ReadOutcome::Failed(reason) => {
                        return Err(fail(param.name, reason, &required_scores, &variadic_scores));
                    }
                }
            }
            ParamKind::Remainder => {
                let remainder = tokens
                    .get(idx)
                    .map(|(start, _)| rest[*start..].trim_end())
                    .unwrap_or("");
                if remainder.is_empty() {
                    return Err(fail(
                        param.name,
                        format!("missing required parameter `{}`", param.name),
                        &required_scores,
                        &variadic_scores,
                    ));
                }
                match param.reader.read(ctx, remainder) {
                    ReadOutcome::Matched(values) => {
                        let Some(best) = best_value(values) else {
                            return Err(fail(
                                param.name,
                                format!("no interpretation for parameter `{}`", param.name),
                                &required_scores,
                                &variadic_scores,
                            ));
                        };
                        args.values.insert(param.name, best.value);
                        required_scores.push(best.score);
                        idx = tokens.len();
                    }
                    ReadOutcome::Failed(reason) => {
                        return Err(fail(param.name, reason, &required_scores, &variadic_scores));
                    }
                }
            }
            ParamKind::Variadic => {
                while idx < tokens.len() {
                    let (_, token) = tokens[idx];
                    match param.reader.read(ctx, token) {
                        ReadOutcome::Matched(values) => {
                            let Some(best) = best_value(values) else {
                                return Err(fail(
                                    param.name,
                                    format!("no interpretation for parameter `{}`", param.name),
                                    &required_scores,
                                    &variadic_scores,
                                ));
                            };
                            args.variadic.push(best.value);
                            variadic_scores.push(best.score);
                            idx += 1;
                        }
                        ReadOutcome::Failed(reason) => {
                            return Err(fail(
                                param.name,
                                reason,
                                &required_scores,
                                &variadic_scores,
                            ));
                        }
                    }
                }
            }
        }
    }

    if idx < tokens.len() {
        return Err(fail(
            "arguments",
            format!("unexpected trailing input `{}`", rest[tokens[idx].0..].trim_end()),
            &required_scores,
            &variadic_scores,
        ));
    }

    let score = overload_score(command.priority, &required_scores, &variadic_scores);
    Ok(ParsedCandidate {
        command: Arc::clone(command),
        args,
        score,
    })
}

/// Splits an invocation into its leading token and the remaining text.
fn split_invocation(input: &str) -> Option<(&str, &str)> {
    let trimmed = input.trim_start();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.split_once(char::is_whitespace) {
        Some((token, rest)) => Some((token, rest.trim_start())),
        None => Some((trimmed, "")),
    }
}

/// The resolution engine: selects and executes exactly one command
/// overload per message, or none.
pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    behaviors: Arc<BehaviorRegistry>,
    limiter: Arc<RateLimiter>,
}

impl Dispatcher {
    /// Creates a dispatcher over frozen registries.
    pub fn new(
        registry: Arc<CommandRegistry>,
        behaviors: Arc<BehaviorRegistry>,
        limiter: Arc<RateLimiter>,
    ) -> Self {
        Self {
            registry,
            behaviors,
            limiter,
        }
    }

    /// Resolves and executes the invocation text remaining after prefix
    /// stripping. `enforce_cooldown` is false for programmatic replays.
    pub async fn dispatch(
        &self,
        ctx: &ExecutionContext,
        invocation: &str,
        enforce_cooldown: bool,
    ) -> DispatchOutcome {
        let Some((token, rest)) = split_invocation(invocation) else {
            return DispatchOutcome::NoMatch;
        };

        let candidates = self.registry.search(token);
        if candidates.is_empty() {
            return DispatchOutcome::NoMatch;
        }
        debug!(token, candidates = candidates.len(), "resolving command");

        // Precondition evaluation; a failing candidate never reaches
        // argument scoring.
        let mut passing = Vec::new();
        let mut failures: Vec<(Arc<Command>, String)> = Vec::new();
        'candidates: for command in candidates {
            for precondition in &command.preconditions {
                let result = precondition.check(ctx).await;
                if !result.success {
                    let reason = result
                        .reason
                        .unwrap_or_else(|| format!("precondition {} failed", precondition.name()));
                    failures.push((command, reason));
                    continue 'candidates;
                }
            }
            passing.push(command);
        }

        if passing.is_empty() {
            // Report the reason of the highest-priority failing candidate.
            failures.sort_by_key(|(command, _)| Reverse(command.priority));
            let (command, reason) = failures
                .into_iter()
                .next()
                .unwrap_or_else(|| unreachable!("candidates were nonempty"));
            return DispatchOutcome::PreconditionFailed { command, reason };
        }

        // Scored argument parsing across surviving overloads.
        let mut parsed = Vec::new();
        let mut failed = Vec::new();
        for command in passing {
            match parse_candidate(&command, ctx, rest) {
                Ok(candidate) => parsed.push(candidate),
                Err(failure) => failed.push(failure),
            }
        }

        if parsed.is_empty() {
            failed.sort_by(|a, b| b.score.total_cmp(&a.score));
            let best = failed
                .into_iter()
                .next()
                .unwrap_or_else(|| unreachable!("passing candidates were nonempty"));
            return DispatchOutcome::ParseFailed {
                command: best.command,
                param: best.param,
                reason: best.reason,
            };
        }

        parsed.sort_by(|a, b| b.score.total_cmp(&a.score));
        let chosen = parsed.swap_remove(0);
        debug!(
            command = %chosen.command.name,
            score = chosen.score,
            "overload selected"
        );

        if enforce_cooldown && !self.limiter.try_consume(ctx.author_id) {
            // Fully silent: no log, no event.
            return DispatchOutcome::RateLimited {
                command: chosen.command,
            };
        }

        for blocker in self.behaviors.late_blockers() {
            if blocker.block(ctx, &chosen.command).await {
                info!(
                    hook = blocker.name(),
                    command = %chosen.command.name,
                    user = %ctx.author_id,
                    "command blocked by late blocker"
                );
                return DispatchOutcome::Blocked {
                    command: chosen.command,
                    hook: blocker.name(),
                };
            }
        }

        match chosen.command.handler().run(ctx, &chosen.args).await {
            Ok(()) => DispatchOutcome::Executed {
                command: chosen.command,
            },
            Err(HandlerError::PermissionDenied(message)) => {
                // Expected operational condition, not a bug.
                warn!(
                    command = %chosen.command.name,
                    user = %ctx.author_id,
                    channel = %ctx.channel_id,
                    "transport denied permission: {message}"
                );
                DispatchOutcome::Errored {
                    command: chosen.command,
                    error: format!("permission denied by transport: {message}"),
                }
            }
            Err(err) => {
                error!(
                    command = %chosen.command.name,
                    user = %ctx.author_id,
                    community = ?ctx.community_id,
                    channel = %ctx.channel_id,
                    content = %ctx.content,
                    error = %err,
                    "command handler failed"
                );
                DispatchOutcome::Errored {
                    command: chosen.command,
                    error: err.to_string(),
                }
            }
        }
    }
}
