use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mimic_archive::{ArchiveError, Archiver, Backfiller, HistorySource, IngestOutcome};
use mimic_db::Database;
use mimic_types::events::{AuthorRef, MessageCreated, MessageEdited};

fn setup() -> (tempfile::TempDir, Arc<Database>, Archiver) {
    let dir = tempfile::tempdir().unwrap();
    let db = Arc::new(Database::open(&dir.path().join("archive.db")).unwrap());
    let archiver = Archiver::new(db.clone());
    (dir, db, archiver)
}

fn message_event(external_id: &str, channel: &str, author: &str, content: &str, minute: u32) -> MessageCreated {
    MessageCreated {
        external_id: external_id.to_string(),
        channel_external_id: channel.to_string(),
        author: AuthorRef {
            external_id: author.to_string(),
            name: "ronny".to_string(),
            discriminator: "0420".to_string(),
        },
        content: content.to_string(),
        timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, minute, 0).unwrap(),
    }
}

#[test]
fn ingesting_same_message_twice_results_in_one_record() {
    let (_dir, db, archiver) = setup();
    archiver.index_channel("chan-1", "guild-1").unwrap();

    let event = message_event("msg-1", "chan-1", "100", "hello", 0);

    let first = match archiver.ingest(&event).unwrap() {
        IngestOutcome::Archived(message) => message,
        other => panic!("expected a new record, got {:?}", other),
    };
    assert!(first.replayed_at.is_none());

    let second = match archiver.ingest(&event).unwrap() {
        IngestOutcome::Duplicate(message) => message,
        other => panic!("expected the existing record, got {:?}", other),
    };
    assert_eq!(first.id, second.id);

    assert_eq!(db.messages_by_external_id("msg-1").unwrap().len(), 1);
}

#[test]
fn unindexed_channel_skips_without_writes() {
    let (_dir, db, archiver) = setup();

    let event = message_event("msg-1", "never-indexed", "100", "hello", 0);
    match archiver.ingest(&event).unwrap() {
        IngestOutcome::Skipped => {}
        other => panic!("unindexed channel must skip, got {:?}", other),
    }

    assert!(db.messages_by_external_id("msg-1").unwrap().is_empty());
    // The skip path writes nothing, not even the author
    let authors: i64 = db
        .with_conn(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM authors", [], |r| r.get(0))?))
        .unwrap();
    assert_eq!(authors, 0);
}

#[test]
fn edit_creates_successor_and_preserves_original() {
    let (_dir, db, archiver) = setup();
    archiver.index_channel("chan-1", "guild-1").unwrap();
    archiver.ingest(&message_event("msg-1", "chan-1", "100", "hi hi hi", 0)).unwrap();

    let edit = MessageEdited {
        external_id: "msg-1".to_string(),
        content: "hi hi hi hi".to_string(),
        edited_timestamp: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 3, 0).unwrap()),
    };
    let successor = archiver.reconcile_edit(&edit).unwrap();
    assert_eq!(successor.content, "hi hi hi hi");
    assert_eq!(successor.external_id, "msg-1");

    let all = db.messages_by_external_id("msg-1").unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].content, "hi hi hi");
    assert!(all[0].edited_micros.is_some());
    assert!(all[1].edited_micros.is_none());
}

#[test]
fn edit_without_timestamp_writes_nothing() {
    let (_dir, db, archiver) = setup();
    archiver.index_channel("chan-1", "guild-1").unwrap();
    archiver.ingest(&message_event("msg-1", "chan-1", "100", "hi hi hi", 0)).unwrap();

    let edit = MessageEdited {
        external_id: "msg-1".to_string(),
        content: "hi hi hi hi".to_string(),
        edited_timestamp: None,
    };
    match archiver.reconcile_edit(&edit) {
        Err(ArchiveError::MissingEditTimestamp(id)) => assert_eq!(id, "msg-1"),
        other => panic!("expected MissingEditTimestamp, got {:?}", other.map(|m| m.id)),
    }

    let all = db.messages_by_external_id("msg-1").unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].content, "hi hi hi");
    assert!(all[0].edited_micros.is_none());
}

#[test]
fn edit_of_unknown_message_is_rejected() {
    let (_dir, _db, archiver) = setup();

    let edit = MessageEdited {
        external_id: "never-seen".to_string(),
        content: "whatever".to_string(),
        edited_timestamp: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()),
    };
    match archiver.reconcile_edit(&edit) {
        Err(ArchiveError::UnknownMessage(id)) => assert_eq!(id, "never-seen"),
        other => panic!("expected UnknownMessage, got {:?}", other.map(|m| m.id)),
    }
}

/// History source serving a fixed timeline, newest first, with anchor paging
/// and a counter so tests can see how many round-trips happened.
struct FixedHistory {
    timeline: Vec<MessageCreated>,
    calls: AtomicUsize,
}

impl FixedHistory {
    fn new(mut timeline: Vec<MessageCreated>) -> Self {
        // newest first, like the platform serves it
        timeline.sort_by_key(|m| std::cmp::Reverse(m.timestamp));
        Self { timeline, calls: AtomicUsize::new(0) }
    }
}

#[async_trait]
impl HistorySource for FixedHistory {
    async fn fetch_before(
        &self,
        _channel_external_id: &str,
        anchor: Option<&str>,
        limit: usize,
    ) -> anyhow::Result<Vec<MessageCreated>> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let start = match anchor {
            Some(anchor) => self
                .timeline
                .iter()
                .position(|m| m.external_id == anchor)
                .map(|i| i + 1)
                .unwrap_or(self.timeline.len()),
            None => 0,
        };
        Ok(self.timeline.iter().skip(start).take(limit).cloned().collect())
    }
}

#[tokio::test]
async fn backfill_stops_at_max_messages() {
    let (_dir, db, archiver) = setup();
    archiver.index_channel("chan-1", "guild-1").unwrap();

    let timeline: Vec<_> = (0..8)
        .map(|i| message_event(&format!("msg-{}", i), "chan-1", "100", "old message", i))
        .collect();
    let source = FixedHistory::new(timeline);

    let backfiller = Backfiller::new(archiver);
    let archived = backfiller.backfill(&source, "chan-1", None, 5).await.unwrap();
    assert_eq!(archived, 5);
    // One page was enough for the whole budgeted fetch
    assert_eq!(source.calls.load(Ordering::Relaxed), 1);

    // Newest five of the eight: msg-7 down to msg-3
    for i in 3..8 {
        assert_eq!(db.messages_by_external_id(&format!("msg-{}", i)).unwrap().len(), 1);
    }
    assert!(db.messages_by_external_id("msg-2").unwrap().is_empty());
}

#[tokio::test]
async fn backfill_more_anchors_on_earliest_archived() {
    let (_dir, db, archiver) = setup();
    archiver.index_channel("chan-1", "guild-1").unwrap();

    let timeline: Vec<_> = (0..6)
        .map(|i| message_event(&format!("msg-{}", i), "chan-1", "100", "old message", i))
        .collect();
    let source = FixedHistory::new(timeline);

    let backfiller = Backfiller::new(archiver);
    backfiller.backfill(&source, "chan-1", None, 2).await.unwrap();
    // First pass took msg-5 and msg-4; "more" continues from msg-4 backwards
    let archived = backfiller.backfill_more(&source, "chan-1", 2).await.unwrap();
    assert_eq!(archived, 2);
    assert_eq!(db.messages_by_external_id("msg-3").unwrap().len(), 1);
    assert_eq!(db.messages_by_external_id("msg-2").unwrap().len(), 1);
    assert!(db.messages_by_external_id("msg-1").unwrap().is_empty());
}

#[tokio::test]
async fn backfill_is_idempotent_across_runs() {
    let (_dir, db, archiver) = setup();
    archiver.index_channel("chan-1", "guild-1").unwrap();

    let timeline: Vec<_> = (0..4)
        .map(|i| message_event(&format!("msg-{}", i), "chan-1", "100", "old message", i))
        .collect();
    let source = FixedHistory::new(timeline);

    let backfiller = Backfiller::new(archiver);
    let first = backfiller.backfill(&source, "chan-1", None, 10).await.unwrap();
    assert_eq!(first, 4);
    // Re-running finds everything deduplicated
    let second = backfiller.backfill(&source, "chan-1", None, 10).await.unwrap();
    assert_eq!(second, 0);

    for i in 0..4 {
        assert_eq!(db.messages_by_external_id(&format!("msg-{}", i)).unwrap().len(), 1);
    }
}
