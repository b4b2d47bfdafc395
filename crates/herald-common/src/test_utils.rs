//! Test utilities and shared test helpers for Herald.
//!
//! This module provides common testing utilities, fixtures, and helper
//! functions used across all crates in the workspace for unit and
//! integration testing.

use std::sync::Once;

#[cfg(feature = "tracing-subscriber")]
use tracing_subscriber::{fmt, EnvFilter};

/// Initialize test logging once per test run.
static INIT: Once = Once::new();

/// Initialize logging for tests with a sensible default configuration.
/// This function is safe to call multiple times and will only initialize once.
#[cfg(feature = "tracing-subscriber")]
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

        fmt().with_test_writer().with_env_filter(filter).init();
    });
}

/// No-op version when tracing-subscriber is not available.
#[cfg(not(feature = "tracing-subscriber"))]
pub fn init_test_logging() {
    let _ = &INIT;
}

/// Chat-platform test fixtures.
pub mod chat_fixtures {
    use crate::{ChannelId, CommunityId, UserId};

    /// Create a test channel ID.
    pub fn test_channel_id() -> ChannelId {
        ChannelId(123_456_789_012_345_678)
    }

    /// Create a test user ID.
    pub fn test_user_id() -> UserId {
        UserId(987_654_321_098_765_432)
    }

    /// Create a test community ID.
    pub fn test_community_id() -> CommunityId {
        CommunityId(555_444_333_222_111_000)
    }

    /// Create multiple distinct test user IDs.
    pub fn test_user_ids(count: usize) -> Vec<UserId> {
        (0..count)
            .map(|i| UserId(100_000_000_000_000_000 + i as u64))
            .collect()
    }
}

/// Property-based testing utilities using proptest.
#[cfg(feature = "proptest")]
pub mod property_testing {
    use crate::{ChannelId, CommunityId, UserId};
    use proptest::prelude::*;

    /// Strategy for generating valid channel IDs.
    pub fn channel_id_strategy() -> impl Strategy<Value = ChannelId> {
        (100_000_000_000_000_000_u64..=999_999_999_999_999_999_u64).prop_map(ChannelId)
    }

    /// Strategy for generating valid user IDs.
    pub fn user_id_strategy() -> impl Strategy<Value = UserId> {
        (100_000_000_000_000_000_u64..=999_999_999_999_999_999_u64).prop_map(UserId)
    }

    /// Strategy for generating valid community IDs.
    pub fn community_id_strategy() -> impl Strategy<Value = CommunityId> {
        (100_000_000_000_000_000_u64..=999_999_999_999_999_999_u64).prop_map(CommunityId)
    }

    /// Strategy for generating valid command names.
    pub fn command_name_strategy() -> impl Strategy<Value = String> {
        r"[a-z][a-z0-9_]{1,15}".prop_map(|s| s.to_string())
    }

    /// Strategy for generating argument confidence scores.
    pub fn score_strategy() -> impl Strategy<Value = f32> {
        0.0_f32..=1.0_f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_multiple_calls() {
        // Should not panic when called multiple times
        init_test_logging();
        init_test_logging();
        init_test_logging();
    }

    #[test]
    fn test_fixture_ids_are_distinct() {
        let ids = chat_fixtures::test_user_ids(5);
        assert_eq!(ids.len(), 5);
        for window in ids.windows(2) {
            assert_ne!(window[0], window[1]);
        }
    }
}
