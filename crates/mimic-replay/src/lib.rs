pub mod player;
pub mod segment;
pub mod select;
pub mod sink;

pub use player::Player;
pub use segment::{Segmentation, segment_sessions};
pub use select::{SelectionPolicy, select_session};
pub use sink::{MessageSink, WebhookSink};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReplayError {
    /// The author has no un-replayed, un-edited sessions to choose from.
    #[error("no sessions available for author {0}")]
    NoSessionsAvailable(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
