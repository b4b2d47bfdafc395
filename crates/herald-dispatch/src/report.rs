//! Execution reporting over a broadcast channel.
//!
//! The dispatch core emits events without knowing its subscribers;
//! logging, metrics, or moderation observers attach by subscribing.

use chrono::{DateTime, Utc};
use herald_common::{ChannelId, CommunityId, UserId};
use tokio::sync::broadcast;

/// An event emitted for one dispatch attempt.
#[derive(Debug, Clone)]
pub enum DispatchEvent {
    /// A command executed successfully.
    Executed {
        /// The invoking user.
        user: UserId,
        /// The channel of the invocation.
        channel: ChannelId,
        /// The owning community, if any.
        community: Option<CommunityId>,
        /// The executed command's name.
        command: String,
        /// When the triggering message was received.
        timestamp: DateTime<Utc>,
    },
    /// A dispatch attempt failed with a user-relevant reason.
    Errored {
        /// The best-matching command's name.
        command: String,
        /// The channel of the invocation.
        channel: ChannelId,
        /// Human-readable failure reason. Never empty.
        error: String,
    },
    /// A non-bot message matched no prefix or command.
    NoTrigger {
        /// The channel the message arrived in.
        channel: ChannelId,
        /// The raw message content.
        content: String,
    },
}

/// Emits dispatch events to any number of subscribers.
#[derive(Clone)]
pub struct ExecutionReporter {
    tx: broadcast::Sender<DispatchEvent>,
}

impl ExecutionReporter {
    /// Creates a reporter with the given subscriber buffer capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribes to dispatch events.
    pub fn subscribe(&self) -> broadcast::Receiver<DispatchEvent> {
        self.tx.subscribe()
    }

    /// Emits one event. A send with no live subscribers is not an error.
    pub fn report(&self, event: DispatchEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for ExecutionReporter {
    fn default() -> Self {
        Self::new(64)
    }
}
