use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use mimic_db::Database;
use mimic_types::models::Message;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::ReplayError;
use crate::segment::segment_sessions;
use crate::select::{SelectionPolicy, select_session};
use crate::sink::MessageSink;

/// Drives playback: segments the author's archive, selects one session, and
/// delivers it message by message through the sink.
///
/// Failure is asymmetric here: each message is marked replayed *before* its
/// delivery attempt, and marks are never rolled back. A delivery failure
/// therefore leaves one marked-but-undelivered row behind, and `replay`
/// returns only the prefix that actually went out.
pub struct Player {
    db: Arc<Database>,
    sink: Arc<dyn MessageSink>,
    policy: SelectionPolicy,
    throttle: Duration,
    playback_lock: Mutex<()>,
}

impl Player {
    pub fn new(
        db: Arc<Database>,
        sink: Arc<dyn MessageSink>,
        policy: SelectionPolicy,
        throttle: Duration,
    ) -> Self {
        Self {
            db,
            sink,
            policy,
            throttle,
            playback_lock: Mutex::new(()),
        }
    }

    /// Replay one of the author's sessions into its channel. Returns the
    /// messages actually delivered, in origin-timestamp order. The whole
    /// select-then-deliver sequence holds a process-wide lock, so concurrent
    /// replay requests serialize.
    pub async fn replay(
        &self,
        author_external_id: &str,
        channel_external_id: Option<&str>,
    ) -> Result<Vec<Message>, ReplayError> {
        let _guard = self.playback_lock.lock().await;

        let sessions = segment_sessions(&self.db, author_external_id, channel_external_id)?;
        let session = select_session(&sessions, self.policy)
            .ok_or_else(|| ReplayError::NoSessionsAvailable(author_external_id.to_string()))?;

        info!(
            author = %author_external_id,
            messages = session.len(),
            "Replaying session"
        );

        let mut delivered = Vec::new();
        for message in session {
            // Mark first; marks are never rolled back.
            if let Err(e) = self.db.mark_replayed(message.id, Utc::now().timestamp_micros()) {
                warn!(message = message.id, "Failed to mark message replayed, skipping: {}", e);
                continue;
            }

            if let Err(e) = self
                .sink
                .send(&message.channel_external_id, &message.content)
                .await
            {
                error!(message = message.id, "Delivery failed, aborting session: {}", e);
                return Ok(delivered);
            }
            delivered.push(message.clone());

            if !self.throttle.is_zero() {
                tokio::time::sleep(self.throttle).await;
            }
        }
        Ok(delivered)
    }
}
