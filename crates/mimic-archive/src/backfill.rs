use async_trait::async_trait;
use mimic_types::events::MessageCreated;
use tracing::{debug, info};

use crate::{ArchiveError, Archiver, IngestOutcome};

/// Largest page the chat platform serves per history request.
pub const MAX_PAGE_SIZE: usize = 100;

/// Capability for reading a channel's message history, newest first.
/// `anchor` is the external id to page backwards from; `None` starts at the
/// channel's most recent message.
#[async_trait]
pub trait HistorySource: Send + Sync {
    async fn fetch_before(
        &self,
        channel_external_id: &str,
        anchor: Option<&str>,
        limit: usize,
    ) -> anyhow::Result<Vec<MessageCreated>>;
}

/// Pages through a channel's history and feeds every message through the
/// archiver. Ingestion dedup makes re-running a backfill harmless.
pub struct Backfiller {
    archiver: Archiver,
}

impl Backfiller {
    pub fn new(archiver: Archiver) -> Self {
        Self { archiver }
    }

    /// Archive up to `max_messages` from the channel's history, paging
    /// backwards from `anchor`. Returns how many messages were newly
    /// archived. Stops early when the source runs out of history.
    pub async fn backfill(
        &self,
        source: &dyn HistorySource,
        channel_external_id: &str,
        anchor: Option<String>,
        max_messages: usize,
    ) -> Result<usize, ArchiveError> {
        let mut archived = 0;
        let mut anchor = anchor;

        while archived < max_messages {
            let limit = (max_messages - archived).min(MAX_PAGE_SIZE);
            let page = source
                .fetch_before(channel_external_id, anchor.as_deref(), limit)
                .await?;
            if page.is_empty() {
                debug!(channel = %channel_external_id, "History exhausted");
                break;
            }

            for event in &page {
                if let IngestOutcome::Archived(_) = self.archiver.ingest(event)? {
                    archived += 1;
                }
                // Pages are newest-first, so the last event seen is the
                // oldest and anchors the next page.
                anchor = Some(event.external_id.clone());
            }
        }

        info!(channel = %channel_external_id, archived, "Backfill complete");
        Ok(archived)
    }

    /// Continue a previous backfill: anchor on the oldest message already
    /// archived in the channel and page further into the past.
    pub async fn backfill_more(
        &self,
        source: &dyn HistorySource,
        channel_external_id: &str,
        max_messages: usize,
    ) -> Result<usize, ArchiveError> {
        let anchor = self
            .archiver
            .earliest_archived(channel_external_id)?
            .map(|message| message.external_id);
        self.backfill(source, channel_external_id, anchor, max_messages)
            .await
    }
}
