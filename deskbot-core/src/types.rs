//! Identifier and timestamp helpers shared across deskbot.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new ID with a UUIDv7 (time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }
    };
}

record_id!(
    /// Unique identifier for a knowledge entry.
    KnowledgeId
);
record_id!(
    /// Unique identifier for a support ticket.
    TicketId
);
record_id!(
    /// Unique identifier for a generated bot response.
    ResponseId
);
record_id!(
    /// Unique identifier for a feedback row.
    FeedbackId
);
record_id!(
    /// Unique identifier for a paused-channel record.
    PausedChannelId
);

/// Current time at the microsecond precision the store keeps, so a record
/// handed back to a caller equals the row read later.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
