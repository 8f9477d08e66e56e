use mimic_types::models::Message;
use rand::seq::IndexedRandom;

use crate::segment::Segmentation;

/// How a replay request picks among the segmented sessions. This is
/// user-visible behavior, configured at startup; the default replays the
/// author's most recently started burst.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SelectionPolicy {
    #[default]
    MostRecent,
    Random,
}

impl std::str::FromStr for SelectionPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "most_recent" => Ok(Self::MostRecent),
            "random" => Ok(Self::Random),
            other => Err(anyhow::anyhow!("unknown selection policy '{}'", other)),
        }
    }
}

/// Pick one session. `None` when the segmentation is empty.
pub fn select_session(sessions: &Segmentation, policy: SelectionPolicy) -> Option<&[Message]> {
    match policy {
        SelectionPolicy::MostRecent => sessions.values().next_back().map(Vec::as_slice),
        SelectionPolicy::Random => {
            let keys: Vec<_> = sessions.keys().copied().collect();
            let key = keys.choose(&mut rand::rng())?;
            sessions.get(key).map(Vec::as_slice)
        }
    }
}
