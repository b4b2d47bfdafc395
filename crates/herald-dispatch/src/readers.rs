//! Type readers: per-type argument parsers with confidence scoring.
//!
//! A reader turns one token (or the remainder of the line) into zero or
//! more typed interpretations, each carrying a confidence score in
//! `[0, 1]`. Ambiguous reads yield several interpretations; the
//! resolution engine collapses them under the "best" multi-match policy.

use crate::context::ExecutionContext;
use herald_common::{CommunityId, UserId};
use std::sync::Arc;

/// A typed argument value bound to a parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ArgValue {
    /// A signed integer.
    Int(i64),
    /// Free-form text.
    Text(String),
    /// A resolved user reference.
    User(UserId),
}

impl ArgValue {
    /// The integer payload, if this value is an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// The text payload, if this value is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }

    /// The user payload, if this value is a user reference.
    pub fn as_user(&self) -> Option<UserId> {
        match self {
            Self::User(v) => Some(*v),
            _ => None,
        }
    }
}

/// One interpretation of a token, with its confidence score.
#[derive(Debug, Clone)]
pub struct TypeReaderValue {
    /// The parsed value.
    pub value: ArgValue,
    /// Confidence in `[0, 1]` that this interpretation is the intended one.
    pub score: f32,
}

/// Outcome of applying a type reader to a token.
#[derive(Debug, Clone)]
pub enum ReadOutcome {
    /// One or more legal interpretations.
    Matched(Vec<TypeReaderValue>),
    /// The token cannot be read as this type; carries the reason.
    Failed(String),
}

impl ReadOutcome {
    /// A single interpretation with the given score.
    pub fn single(value: ArgValue, score: f32) -> Self {
        Self::Matched(vec![TypeReaderValue { value, score }])
    }
}

/// Parses one token of input into a typed value.
pub trait TypeReader: Send + Sync {
    /// Reader name, used in parse-failure reasons.
    fn name(&self) -> &'static str;

    /// Reads a token in the given context.
    fn read(&self, ctx: &ExecutionContext, token: &str) -> ReadOutcome;
}

/// Exact integer parser. Scores 1.0 on success.
pub struct IntReader;

impl TypeReader for IntReader {
    fn name(&self) -> &'static str {
        "int"
    }

    fn read(&self, _ctx: &ExecutionContext, token: &str) -> ReadOutcome {
        match token.parse::<i64>() {
            Ok(value) => ReadOutcome::single(ArgValue::Int(value), 1.0),
            Err(_) => ReadOutcome::Failed(format!("`{token}` is not an integer")),
        }
    }
}

/// Accepts any token as text. The weak 0.5 score lets more specific
/// readers win overload ties against it.
pub struct StringReader;

impl TypeReader for StringReader {
    fn name(&self) -> &'static str {
        "string"
    }

    fn read(&self, _ctx: &ExecutionContext, token: &str) -> ReadOutcome {
        ReadOutcome::single(ArgValue::Text(token.to_string()), 0.5)
    }
}

/// A candidate member returned by a name lookup.
#[derive(Debug, Clone)]
pub struct MemberMatch {
    /// The matched user.
    pub user: UserId,
    /// Match confidence in `[0, 1]`.
    pub score: f32,
}

/// Seam to the community member directory, used to resolve bare names
/// into user references. The directory itself is an external collaborator.
pub trait MemberLookup: Send + Sync {
    /// Resolves a bare name within a community. May return several
    /// candidates with differing confidence.
    fn resolve(&self, community: Option<CommunityId>, name: &str) -> Vec<MemberMatch>;
}

/// A lookup that never resolves anyone. Used when no directory is wired.
pub struct NoMemberLookup;

impl MemberLookup for NoMemberLookup {
    fn resolve(&self, _community: Option<CommunityId>, _name: &str) -> Vec<MemberMatch> {
        Vec::new()
    }
}

/// Reads user mentions. An explicit `<@id>` or nickname-qualified `<@!id>`
/// mention scores 1.0; a bare `@name` or plain name goes through the
/// member directory and may yield several scored interpretations.
pub struct MentionReader {
    lookup: Arc<dyn MemberLookup>,
}

impl MentionReader {
    /// Creates a mention reader backed by the given member directory.
    pub fn new(lookup: Arc<dyn MemberLookup>) -> Self {
        Self { lookup }
    }
}

impl TypeReader for MentionReader {
    fn name(&self) -> &'static str {
        "mention"
    }

    fn read(&self, ctx: &ExecutionContext, token: &str) -> ReadOutcome {
        if let Some(id) = parse_mention(token) {
            return ReadOutcome::single(ArgValue::User(id), 1.0);
        }

        let name = token.strip_prefix('@').unwrap_or(token);
        let matches = self.lookup.resolve(ctx.community_id, name);
        if matches.is_empty() {
            return ReadOutcome::Failed(format!("`{token}` does not name a known user"));
        }
        ReadOutcome::Matched(
            matches
                .into_iter()
                .map(|m| TypeReaderValue {
                    value: ArgValue::User(m.user),
                    score: m.score.clamp(0.0, 1.0),
                })
                .collect(),
        )
    }
}

/// Parses `<@123>` and `<@!123>` mention forms.
pub fn parse_mention(token: &str) -> Option<UserId> {
    let inner = token.strip_prefix("<@")?.strip_suffix('>')?;
    let digits = inner.strip_prefix('!').unwrap_or(inner);
    if digits.is_empty() {
        return None;
    }
    digits.parse::<u64>().ok().map(UserId)
}
