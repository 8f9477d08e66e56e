use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Author metadata carried on inbound events, used to upsert the Author row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorRef {
    pub external_id: String,
    pub name: String,
    #[serde(default)]
    pub discriminator: String,
}

/// A "message created" event from the chat platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageCreated {
    pub external_id: String,
    pub channel_external_id: String,
    pub author: AuthorRef,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// A "message edited" event from the chat platform.
///
/// The platform omits the edited timestamp on some gateway payloads; the
/// reconciler treats that as a contract violation rather than defaulting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEdited {
    pub external_id: String,
    pub content: String,
    pub edited_timestamp: Option<DateTime<Utc>>,
}
