//! Per-channel pause gate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{PausedChannelId, now};

/// Presence of this record suppresses automated responses in a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PausedChannel {
    pub id: PausedChannelId,
    pub channel_id: String,
    pub guild_id: String,
    pub channel_name: String,
    pub paused_at: DateTime<Utc>,
}

impl PausedChannel {
    pub fn new(
        channel_id: impl Into<String>,
        guild_id: impl Into<String>,
        channel_name: impl Into<String>,
    ) -> Self {
        Self {
            id: PausedChannelId::new(),
            channel_id: channel_id.into(),
            guild_id: guild_id.into(),
            channel_name: channel_name.into(),
            paused_at: now(),
        }
    }
}
