use crate::core::error::ValidationError;
use crate::utils::hex::{normalize_btih, url_decode};
use std::path::{Path, PathBuf};

const MAGNET_SCHEME: &str = "magnet:";
const MAGNET_PREFIX: &str = "magnet:?";
const BTIH_PREFIX: &str = "urn:btih:";

/// Parameters pulled out of a magnet URI
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MagnetInfo {
    /// Normalized BitTorrent info hash, when `xt` is a `urn:btih:` topic
    pub info_hash: Option<String>,
    /// `dn` display name
    pub display_name: Option<String>,
    /// `xl` exact length in bytes
    pub exact_length: Option<u64>,
    /// `tr` tracker URLs
    pub trackers: Vec<String>,
}

/// A validated torrent source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TorrentSource {
    Magnet(MagnetInfo),
    File(PathBuf),
}

impl TorrentSource {
    pub fn kind(&self) -> &'static str {
        match self {
            TorrentSource::Magnet(_) => "magnet",
            TorrentSource::File(_) => "file",
        }
    }

    /// Normalized info hash of a `urn:btih:` magnet
    pub fn info_hash(&self) -> Option<&str> {
        match self {
            TorrentSource::Magnet(magnet) => magnet.info_hash.as_deref(),
            TorrentSource::File(_) => None,
        }
    }

    /// Tracker URLs announced by a magnet (`tr` parameters)
    pub fn trackers(&self) -> &[String] {
        match self {
            TorrentSource::Magnet(magnet) => &magnet.trackers,
            TorrentSource::File(_) => &[],
        }
    }

    /// Display name: magnet `dn`, or the file stem of a .torrent path
    pub fn name(&self) -> Option<String> {
        match self {
            TorrentSource::Magnet(magnet) => magnet.display_name.clone(),
            TorrentSource::File(path) => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned()),
        }
    }
}

/// Validate a raw source string.
///
/// Returns the trimmed source alongside its parsed form.
pub fn parse_source(raw: &str, max_len: usize) -> Result<(String, TorrentSource), ValidationError> {
    let source = raw.trim();

    if source.is_empty() {
        return Err(ValidationError::EmptySource);
    }

    if source.len() > max_len {
        return Err(ValidationError::TooLong {
            max: max_len,
            actual: source.len(),
        });
    }

    if source.chars().any(char::is_control) {
        return Err(ValidationError::ControlCharacter);
    }

    let parsed = if has_magnet_scheme(source) {
        TorrentSource::Magnet(parse_magnet(source)?)
    } else {
        TorrentSource::File(Path::new(source).to_path_buf())
    };

    Ok((source.to_string(), parsed))
}

/// Reclassify a source that was already accepted once (e.g. restored from disk)
pub fn classify(source: &str) -> TorrentSource {
    if has_magnet_scheme(source) {
        if let Ok(magnet) = parse_magnet(source) {
            return TorrentSource::Magnet(magnet);
        }
        return TorrentSource::Magnet(MagnetInfo::default());
    }
    TorrentSource::File(PathBuf::from(source))
}

fn has_magnet_scheme(source: &str) -> bool {
    source
        .get(..MAGNET_SCHEME.len())
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case(MAGNET_SCHEME))
}

fn parse_magnet(uri: &str) -> Result<MagnetInfo, ValidationError> {
    let query = match uri.get(..MAGNET_PREFIX.len()) {
        Some(prefix) if prefix.eq_ignore_ascii_case(MAGNET_PREFIX) => &uri[MAGNET_PREFIX.len()..],
        _ => {
            return Err(ValidationError::InvalidMagnet(
                "expected 'magnet:?' prefix".to_string(),
            ))
        }
    };

    let mut info = MagnetInfo::default();
    let mut topic = None;

    for pair in query.split('&') {
        if pair.is_empty() {
            continue;
        }

        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        if value.is_empty() {
            continue;
        }

        let value = url_decode(value)
            .map_err(|e| ValidationError::InvalidMagnet(format!("parameter '{}': {}", key, e)))?;

        match key {
            "xt" => {
                if topic.is_none() {
                    topic = Some(value);
                }
            }
            "dn" => info.display_name = Some(value),
            "xl" => {
                let length = value.parse::<u64>().map_err(|_| {
                    ValidationError::InvalidMagnet(format!("invalid exact length '{}'", value))
                })?;
                info.exact_length = Some(length);
            }
            "tr" => info.trackers.push(value),
            _ => {}
        }
    }

    let topic = topic.ok_or_else(|| {
        ValidationError::InvalidMagnet("missing 'xt' parameter".to_string())
    })?;

    if let Some(hash) = strip_prefix_ignore_case(&topic, BTIH_PREFIX) {
        let hash = normalize_btih(hash)
            .map_err(|e| ValidationError::InvalidMagnet(e.to_string()))?;
        info.info_hash = Some(hash);
    }

    Ok(info)
}

fn strip_prefix_ignore_case<'a>(value: &'a str, prefix: &str) -> Option<&'a str> {
    match value.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => Some(&value[prefix.len()..]),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX: usize = 8192;

    #[test]
    fn test_trims_whitespace() {
        let (source, parsed) = parse_source("  /tmp/ubuntu.torrent \n", MAX).unwrap();
        assert_eq!(source, "/tmp/ubuntu.torrent");
        assert_eq!(parsed, TorrentSource::File(PathBuf::from("/tmp/ubuntu.torrent")));
        assert_eq!(parsed.name().as_deref(), Some("ubuntu"));
        assert_eq!(parsed.kind(), "file");
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(parse_source("", MAX), Err(ValidationError::EmptySource)));
        assert!(matches!(parse_source("   \t", MAX), Err(ValidationError::EmptySource)));
    }

    #[test]
    fn test_rejects_too_long() {
        let long = "a".repeat(20);
        match parse_source(&long, 10) {
            Err(ValidationError::TooLong { max, actual }) => {
                assert_eq!(max, 10);
                assert_eq!(actual, 20);
            }
            other => panic!("Expected TooLong, got {:?}", other),
        }
    }

    #[test]
    fn test_rejects_control_characters() {
        assert!(matches!(
            parse_source("foo\u{0}bar.torrent", MAX),
            Err(ValidationError::ControlCharacter)
        ));
    }

    #[test]
    fn test_minimal_magnet_is_accepted() {
        let (source, parsed) = parse_source("magnet:?xt=abc", MAX).unwrap();
        assert_eq!(source, "magnet:?xt=abc");
        match parsed {
            TorrentSource::Magnet(info) => {
                assert_eq!(info.info_hash, None);
                assert_eq!(info.exact_length, None);
            }
            other => panic!("Expected magnet, got {:?}", other),
        }
    }

    #[test]
    fn test_full_magnet() {
        let uri = "magnet:?xt=urn:btih:C12FE1C06BBA254A9DC9F519B335AA7C1367A88A\
                   &dn=Big+Buck%20Bunny&xl=276445467\
                   &tr=udp%3A%2F%2Ftracker.example.org%3A1337";
        let (_, parsed) = parse_source(uri, MAX).unwrap();
        match &parsed {
            TorrentSource::Magnet(info) => {
                assert_eq!(
                    info.info_hash.as_deref(),
                    Some("c12fe1c06bba254a9dc9f519b335aa7c1367a88a")
                );
                assert_eq!(info.display_name.as_deref(), Some("Big Buck Bunny"));
                assert_eq!(info.exact_length, Some(276445467));
                assert_eq!(info.trackers, vec!["udp://tracker.example.org:1337".to_string()]);
            }
            other => panic!("Expected magnet, got {:?}", other),
        }
        assert_eq!(parsed.name().as_deref(), Some("Big Buck Bunny"));
        assert_eq!(parsed.kind(), "magnet");
    }

    #[test]
    fn test_magnet_without_topic_is_rejected() {
        assert!(matches!(
            parse_source("magnet:?dn=foo", MAX),
            Err(ValidationError::InvalidMagnet(_))
        ));
        assert!(matches!(
            parse_source("magnet:?xt=", MAX),
            Err(ValidationError::InvalidMagnet(_))
        ));
    }

    #[test]
    fn test_magnet_without_query_is_rejected() {
        assert!(matches!(
            parse_source("magnet:xt=abc", MAX),
            Err(ValidationError::InvalidMagnet(_))
        ));
    }

    #[test]
    fn test_magnet_with_bad_btih_is_rejected() {
        assert!(matches!(
            parse_source("magnet:?xt=urn:btih:nothex", MAX),
            Err(ValidationError::InvalidMagnet(_))
        ));
    }

    #[test]
    fn test_magnet_with_bad_length_is_rejected() {
        assert!(matches!(
            parse_source("magnet:?xt=abc&xl=-5", MAX),
            Err(ValidationError::InvalidMagnet(_))
        ));
    }

    #[test]
    fn test_classify_restored_sources() {
        assert_eq!(classify("magnet:?xt=abc").kind(), "magnet");
        assert_eq!(classify("magnet:broken").kind(), "magnet");
        assert_eq!(classify("C:\\downloads\\a.torrent").kind(), "file");
    }
}
