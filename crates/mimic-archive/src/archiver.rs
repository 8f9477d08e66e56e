use std::sync::Arc;

use mimic_db::Database;
use mimic_types::events::{MessageCreated, MessageEdited};
use mimic_types::models::{Channel, Message};
use tracing::{debug, info};

use crate::ArchiveError;

/// Outcome of ingesting one inbound message event.
#[derive(Debug)]
pub enum IngestOutcome {
    /// A new record was created.
    Archived(Message),
    /// The external id was already archived; this is the existing record.
    Duplicate(Message),
    /// The channel was never opted into indexing; the message is
    /// intentionally dropped without any writes.
    Skipped,
}

#[derive(Clone)]
pub struct Archiver {
    db: Arc<Database>,
}

impl Archiver {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Archive one inbound message: channel gate, author upsert, dedup by
    /// external id, then create. At most one author row and one message row
    /// per call; no writes on the skip path.
    pub fn ingest(&self, event: &MessageCreated) -> Result<IngestOutcome, ArchiveError> {
        let channel = match self.db.channel_by_external_id(&event.channel_external_id)? {
            Some(channel) => channel,
            None => {
                debug!(
                    channel = %event.channel_external_id,
                    message = %event.external_id,
                    "Channel not indexed, skipping message"
                );
                return Ok(IngestOutcome::Skipped);
            }
        };

        let author = self.db.upsert_author(
            &event.author.external_id,
            &event.author.name,
            &event.author.discriminator,
        )?;

        if let Some(existing) = self.db.original_message_by_external_id(&event.external_id)? {
            debug!(message = %event.external_id, "Already archived, returning existing record");
            return Ok(IngestOutcome::Duplicate(existing.into()));
        }

        let row = self.db.insert_message(
            &event.content,
            event.timestamp.timestamp_micros(),
            &event.external_id,
            channel.id,
            author.id,
        )?;
        info!(
            message = %event.external_id,
            author = %author.external_id,
            channel = %channel.external_id,
            "Archived message"
        );
        Ok(IngestOutcome::Archived(row.into()))
    }

    /// Record an edit event: a successor record is created with the edited
    /// content and the original is stamped edited, atomically. The original
    /// stays in the archive as the record of what was first said.
    pub fn reconcile_edit(&self, event: &MessageEdited) -> Result<Message, ArchiveError> {
        let edited_at = event
            .edited_timestamp
            .ok_or_else(|| ArchiveError::MissingEditTimestamp(event.external_id.clone()))?;

        match self.db.reconcile_edit(
            &event.external_id,
            &event.content,
            edited_at.timestamp_micros(),
        )? {
            Some(successor) => {
                info!(message = %event.external_id, "Reconciled edit");
                Ok(successor.into())
            }
            None => Err(ArchiveError::UnknownMessage(event.external_id.clone())),
        }
    }

    /// The explicit opt-in that makes a channel archivable. Never invoked
    /// implicitly by ingestion.
    pub fn index_channel(
        &self,
        external_id: &str,
        guild_external_id: &str,
    ) -> Result<Channel, ArchiveError> {
        let row = self.db.index_channel(external_id, guild_external_id)?;
        info!(channel = %external_id, guild = %guild_external_id, "Channel indexed");
        Ok(row.into())
    }

    /// Oldest archived message in a channel, if the channel is indexed and
    /// non-empty. Used as the anchor when backfilling further into history.
    pub fn earliest_archived(&self, channel_external_id: &str) -> Result<Option<Message>, ArchiveError> {
        let channel = match self.db.channel_by_external_id(channel_external_id)? {
            Some(channel) => channel,
            None => return Ok(None),
        };
        Ok(self.db.earliest_message_in_channel(channel.id)?.map(Into::into))
    }
}
