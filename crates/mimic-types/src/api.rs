use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// -- Channel indexing --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IndexChannelRequest {
    pub guild_external_id: String,
}

// -- Replay --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReplayRequest {
    pub author_external_id: String,
    pub channel_external_id: Option<String>,
}

// -- Session inspection --

/// Read-only view of one segmented session: what a replay would deliver,
/// without mutating anything.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub started_at: DateTime<Utc>,
    pub message_count: usize,
    pub last_timestamp: DateTime<Utc>,
}
