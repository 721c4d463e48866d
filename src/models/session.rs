use crate::models::torrent::Torrent;
use serde::{Deserialize, Serialize};

/// Persisted snapshot of the whole session
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub dark_mode: bool,
    #[serde(default = "default_next_id")]
    pub next_id: u64,
    /// Tracked torrents in insertion order
    #[serde(default)]
    pub torrents: Vec<Torrent>,
}

fn default_next_id() -> u64 {
    1
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            dark_mode: false,
            next_id: default_next_id(),
            torrents: Vec::new(),
        }
    }
}
