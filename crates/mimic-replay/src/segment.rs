use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use mimic_db::Database;
use mimic_db::models::{MessageRow, micros_to_utc};
use mimic_types::models::Message;

use crate::ReplayError;

/// Two messages further apart than this never share a session.
pub const SESSION_GAP_MICROS: i64 = 5 * 60 * 1_000_000;

/// Sessions keyed by their start timestamp, each holding its messages in
/// origin-timestamp order.
pub type Segmentation = BTreeMap<DateTime<Utc>, Vec<Message>>;

/// Partition the author's un-replayed, un-edited messages into conversational
/// bursts. A new session starts at a silence of more than five minutes, or
/// when someone else has spoken in the same channel since the current session
/// began.
pub fn segment_sessions(
    db: &Database,
    author_external_id: &str,
    channel_external_id: Option<&str>,
) -> Result<Segmentation, ReplayError> {
    let candidates = db.replay_candidates(author_external_id, channel_external_id)?;

    let mut sessions = Segmentation::new();
    let Some(first) = candidates.first() else {
        return Ok(sessions);
    };
    let interruptions = InterruptionIndex::load(db, first.author_id, &candidates)?;

    let mut session_start = None;
    for message in candidates {
        let starts_new = match session_start {
            None => true,
            Some(start) => {
                message.origin_micros - start > SESSION_GAP_MICROS
                    || interruptions.any_between(message.channel_id, start, message.origin_micros)
            }
        };
        if starts_new {
            session_start = Some(message.origin_micros);
        }
        if let Some(start) = session_start {
            sessions
                .entry(micros_to_utc(start))
                .or_default()
                .push(message.into());
        }
    }
    Ok(sessions)
}

/// Foreign-message timestamps per channel, covering the whole candidate
/// window in one query per channel rather than one point query per candidate.
struct InterruptionIndex {
    by_channel: HashMap<i64, Vec<i64>>,
}

impl InterruptionIndex {
    fn load(
        db: &Database,
        author_id: i64,
        candidates: &[MessageRow],
    ) -> Result<Self, ReplayError> {
        let mut by_channel = HashMap::new();
        let (Some(first), Some(last)) = (candidates.first(), candidates.last()) else {
            return Ok(Self { by_channel });
        };

        for message in candidates {
            if !by_channel.contains_key(&message.channel_id) {
                let timestamps = db.foreign_timestamps_between(
                    message.channel_id,
                    author_id,
                    first.origin_micros,
                    last.origin_micros,
                )?;
                by_channel.insert(message.channel_id, timestamps);
            }
        }
        Ok(Self { by_channel })
    }

    /// Whether anyone else spoke in the channel strictly between the two
    /// timestamps.
    fn any_between(&self, channel_id: i64, start_micros: i64, end_micros: i64) -> bool {
        let Some(timestamps) = self.by_channel.get(&channel_id) else {
            return false;
        };
        let next = timestamps.partition_point(|&t| t <= start_micros);
        timestamps.get(next).is_some_and(|&t| t < end_micros)
    }
}

#[cfg(test)]
mod tests {
    use super::InterruptionIndex;
    use std::collections::HashMap;

    fn index(channel_id: i64, timestamps: Vec<i64>) -> InterruptionIndex {
        let mut by_channel = HashMap::new();
        by_channel.insert(channel_id, timestamps);
        InterruptionIndex { by_channel }
    }

    #[test]
    fn between_is_strict_on_both_ends() {
        let idx = index(1, vec![100, 200, 300]);
        assert!(idx.any_between(1, 150, 250));
        // equal to an endpoint does not interrupt
        assert!(!idx.any_between(1, 200, 300));
        assert!(!idx.any_between(1, 100, 200));
        assert!(idx.any_between(1, 99, 101));
    }

    #[test]
    fn unknown_channel_never_interrupts() {
        let idx = index(1, vec![100]);
        assert!(!idx.any_between(2, 0, 1_000));
    }

    #[test]
    fn empty_window_never_interrupts() {
        let idx = index(1, vec![]);
        assert!(!idx.any_between(1, 0, 1_000));
    }
}
