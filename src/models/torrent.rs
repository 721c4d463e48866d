use serde::{Deserialize, Serialize};
use std::fmt;

/// One tracked download
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Torrent {
    /// Registry-assigned ID, never reused
    pub id: u64,
    /// Magnet link or path to a .torrent file
    pub source: String,
    /// Bytes downloaded so far, never above `total_bytes`
    pub downloaded_bytes: u64,
    /// Best known payload size
    pub total_bytes: u64,
}

/// Progress phase derived from the byte counters
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TorrentStatus {
    InProgress,
    Complete,
}

impl Torrent {
    pub fn new(id: u64, source: String, total_bytes: u64) -> Self {
        Self {
            id,
            source,
            downloaded_bytes: 0,
            total_bytes,
        }
    }

    pub fn status(&self) -> TorrentStatus {
        if self.downloaded_bytes < self.total_bytes {
            TorrentStatus::InProgress
        } else {
            TorrentStatus::Complete
        }
    }

    pub fn is_complete(&self) -> bool {
        self.status() == TorrentStatus::Complete
    }

    /// Whole percent downloaded, rounded down
    pub fn progress_percent(&self) -> u8 {
        if self.total_bytes == 0 {
            return 100;
        }
        let percent = (self.downloaded_bytes as u128 * 100) / self.total_bytes as u128;
        percent.min(100) as u8
    }

    /// Apply an absolute byte count, clamped to `[downloaded_bytes, total_bytes]`.
    /// Returns true if the counter moved.
    pub fn record_absolute(&mut self, bytes: u64) -> bool {
        let next = bytes.clamp(self.downloaded_bytes, self.total_bytes);
        let changed = next != self.downloaded_bytes;
        self.downloaded_bytes = next;
        changed
    }

    /// Add `step` bytes, saturating at `total_bytes`
    pub fn advance(&mut self, step: u64) -> bool {
        self.record_absolute(self.downloaded_bytes.saturating_add(step))
    }
}

/// Short human-readable state shown next to a torrent
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusDescriptor {
    Downloading,
    Complete,
}

impl From<TorrentStatus> for StatusDescriptor {
    fn from(status: TorrentStatus) -> Self {
        match status {
            TorrentStatus::InProgress => StatusDescriptor::Downloading,
            TorrentStatus::Complete => StatusDescriptor::Complete,
        }
    }
}

impl fmt::Display for StatusDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusDescriptor::Downloading => f.write_str("Downloading"),
            StatusDescriptor::Complete => f.write_str("Complete"),
        }
    }
}
