use crate::models::torrent::Torrent;
use crate::models::torrent::StatusDescriptor;
use crate::validation::source::classify;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct TorrentAddQuery {
    pub source: String,
}

#[derive(Debug, Deserialize)]
pub struct TorrentIdQuery {
    pub id: u64,
}

#[derive(Debug, Deserialize)]
pub struct ProgressQuery {
    pub id: u64,
    /// Absolute byte count reported by the download engine
    pub bytes: u64,
}

#[derive(Debug, Deserialize)]
pub struct SimulateQuery {
    pub id: u64,
    pub step: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct DarkModeQuery {
    pub enabled: bool,
}

/// Torrent as shown by the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorrentView {
    pub id: u64,
    pub source: String,
    pub downloaded_bytes: u64,
    pub total_bytes: u64,
    pub status: String,
    pub progress_percent: u8,
    pub kind: String,
    pub name: Option<String>,
    /// Hex info hash, for `urn:btih:` magnets
    pub info_hash: Option<String>,
    #[serde(default)]
    pub trackers: Vec<String>,
}

impl From<Torrent> for TorrentView {
    fn from(torrent: Torrent) -> Self {
        let parsed = classify(&torrent.source);
        let status = StatusDescriptor::from(torrent.status()).to_string();
        let progress_percent = torrent.progress_percent();

        Self {
            id: torrent.id,
            downloaded_bytes: torrent.downloaded_bytes,
            total_bytes: torrent.total_bytes,
            status,
            progress_percent,
            kind: parsed.kind().to_string(),
            name: parsed.name(),
            info_hash: parsed.info_hash().map(str::to_string),
            trackers: parsed.trackers().to_vec(),
            source: torrent.source,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AddResponse {
    pub success: bool,
    pub id: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TorrentResponse {
    pub success: bool,
    pub torrent: TorrentView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub id: u64,
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ListResponse {
    pub success: bool,
    pub torrents: Vec<TorrentView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ClearResponse {
    pub success: bool,
    pub removed: Vec<u64>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SettingsResponse {
    pub success: bool,
    pub dark_mode: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SuccessResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_of_magnet() {
        let torrent = Torrent {
            id: 3,
            source: "magnet:?xt=abc&dn=Debian".to_string(),
            downloaded_bytes: 25,
            total_bytes: 100,
        };

        let view = TorrentView::from(torrent);
        assert_eq!(view.id, 3);
        assert_eq!(view.status, "Downloading");
        assert_eq!(view.progress_percent, 25);
        assert_eq!(view.kind, "magnet");
        assert_eq!(view.name.as_deref(), Some("Debian"));
        assert_eq!(view.info_hash, None);
        assert!(view.trackers.is_empty());
    }

    #[test]
    fn test_view_exposes_hash_and_trackers() {
        let torrent = Torrent {
            id: 4,
            source: "magnet:?xt=urn:btih:C12FE1C06BBA254A9DC9F519B335AA7C1367A88A\
                     &tr=udp%3A%2F%2Fa.example%3A80&tr=http%3A%2F%2Fb.example%2Fannounce"
                .to_string(),
            downloaded_bytes: 0,
            total_bytes: 100,
        };

        let view = TorrentView::from(torrent);
        assert_eq!(
            view.info_hash.as_deref(),
            Some("c12fe1c06bba254a9dc9f519b335aa7c1367a88a")
        );
        assert_eq!(
            view.trackers,
            vec!["udp://a.example:80".to_string(), "http://b.example/announce".to_string()]
        );
    }

    #[test]
    fn test_view_of_finished_file() {
        let torrent = Torrent {
            id: 1,
            source: "/downloads/arch.torrent".to_string(),
            downloaded_bytes: 100,
            total_bytes: 100,
        };

        let view = TorrentView::from(torrent);
        assert_eq!(view.status, "Complete");
        assert_eq!(view.progress_percent, 100);
        assert_eq!(view.kind, "file");
        assert_eq!(view.name.as_deref(), Some("arch"));
        assert_eq!(view.info_hash, None);
    }
}
