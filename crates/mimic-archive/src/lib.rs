pub mod archiver;
pub mod backfill;

pub use archiver::{Archiver, IngestOutcome};
pub use backfill::{Backfiller, HistorySource};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    /// An edit event arrived without an edited timestamp. This is a contract
    /// violation on the input, not a race; nothing is written.
    #[error("edit event for message {0} carries no edited timestamp")]
    MissingEditTimestamp(String),

    /// An edit references an external id that was never archived.
    #[error("no archived message with external id {0}")]
    UnknownMessage(String),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}
