//! Database row types. These map directly to SQLite rows.
//! Distinct from the mimic-types API models to keep the DB layer independent.

use chrono::{DateTime, Utc};
use mimic_types::models::{Author, Channel, Message};
use tracing::warn;

pub struct AuthorRow {
    pub id: i64,
    pub external_id: String,
    pub name: String,
    pub discriminator: String,
}

pub struct ChannelRow {
    pub id: i64,
    pub external_id: String,
    pub guild_external_id: String,
}

/// Message row with the channel/author external ids joined in, so callers
/// never do a second lookup to address the outbound sink.
pub struct MessageRow {
    pub id: i64,
    pub content: String,
    pub origin_micros: i64,
    pub external_id: String,
    pub channel_id: i64,
    pub author_id: i64,
    pub channel_external_id: String,
    pub author_external_id: String,
    pub replayed_micros: Option<i64>,
    pub edited_micros: Option<i64>,
}

pub fn micros_to_utc(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_else(|| {
        warn!("Timestamp {} out of range, clamping to epoch", micros);
        DateTime::default()
    })
}

impl From<AuthorRow> for Author {
    fn from(row: AuthorRow) -> Self {
        Author {
            id: row.id,
            external_id: row.external_id,
            name: row.name,
            discriminator: row.discriminator,
        }
    }
}

impl From<ChannelRow> for Channel {
    fn from(row: ChannelRow) -> Self {
        Channel {
            id: row.id,
            external_id: row.external_id,
            guild_external_id: row.guild_external_id,
        }
    }
}

impl From<MessageRow> for Message {
    fn from(row: MessageRow) -> Self {
        Message {
            id: row.id,
            content: row.content,
            origin_timestamp: micros_to_utc(row.origin_micros),
            external_id: row.external_id,
            channel_id: row.channel_id,
            author_id: row.author_id,
            channel_external_id: row.channel_external_id,
            author_external_id: row.author_external_id,
            replayed_at: row.replayed_micros.map(micros_to_utc),
            edited_at: row.edited_micros.map(micros_to_utc),
        }
    }
}
