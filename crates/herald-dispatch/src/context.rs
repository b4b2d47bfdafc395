//! Per-message execution context and the inbound gateway event shape.

use chrono::{DateTime, Utc};
use herald_common::{ChannelId, CommunityId, UserId};

/// A raw "message received" event from the chat gateway.
///
/// This is the only inbound surface of the engine; the transport that
/// produces these events is an external collaborator.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// The message author.
    pub author_id: UserId,
    /// Whether the gateway flagged the author as a bot account.
    pub author_is_bot: bool,
    /// The channel the message arrived in.
    pub channel_id: ChannelId,
    /// The owning community, absent for direct messages.
    pub community_id: Option<CommunityId>,
    /// Raw message text.
    pub content: String,
    /// Gateway receive timestamp.
    pub timestamp: DateTime<Utc>,
}

/// Context for one message's trip through the pipeline.
///
/// Created per inbound message and discarded after pipeline completion.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// The invoking user.
    pub author_id: UserId,
    /// The channel the invocation happened in.
    pub channel_id: ChannelId,
    /// The owning community; `None` means a direct message.
    pub community_id: Option<CommunityId>,
    /// The raw message text as received, before any transformation.
    pub content: String,
    /// When the message was received.
    pub timestamp: DateTime<Utc>,
}

impl ExecutionContext {
    /// Builds a context from an inbound gateway message.
    pub fn from_message(msg: &InboundMessage) -> Self {
        Self {
            author_id: msg.author_id,
            channel_id: msg.channel_id,
            community_id: msg.community_id,
            content: msg.content.clone(),
            timestamp: msg.timestamp,
        }
    }

    /// True when the context is a direct message rather than a community
    /// channel.
    pub fn is_direct_message(&self) -> bool {
        self.community_id.is_none()
    }
}
