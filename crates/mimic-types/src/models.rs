use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat-platform user seen by the archive. Created on the first archived
/// message from that user; the external id never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Author {
    pub id: i64,
    pub external_id: String,
    pub name: String,
    pub discriminator: String,
}

/// A channel that has been explicitly opted into indexing. The existence of
/// this record is the sole gate for whether inbound messages are archived.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub external_id: String,
    pub guild_external_id: String,
}

/// An archived message. `replayed_at`/`edited_at` stay `None` until the
/// message is replayed into its channel or superseded by an edit.
///
/// The channel and author external ids are denormalized onto the record so
/// that replay can address the outbound sink without extra lookups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub content: String,
    pub origin_timestamp: DateTime<Utc>,
    pub external_id: String,
    pub channel_id: i64,
    pub author_id: i64,
    pub channel_external_id: String,
    pub author_external_id: String,
    pub replayed_at: Option<DateTime<Utc>>,
    pub edited_at: Option<DateTime<Utc>>,
}
