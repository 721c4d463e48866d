use crate::bencode::metainfo::read_declared_length;
use crate::core::config::SessionConfig;
use crate::core::error::{PersistError, RegistryError};
use crate::models::session::SessionState;
use crate::models::torrent::{StatusDescriptor, Torrent};
use crate::persist::snapshot::SessionStore;
use crate::validation::source::{parse_source, TorrentSource};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, info, warn};

/// Live session owned by the registry.
///
/// Ids only grow, so the id-ordered map is also the insertion order.
struct Session {
    torrents: BTreeMap<u64, Torrent>,
    next_id: u64,
    dark_mode: bool,
    /// Bumped on every committed mutation
    revision: u64,
}

impl Session {
    fn from_state(state: SessionState) -> Self {
        Self {
            torrents: state.torrents.into_iter().map(|t| (t.id, t)).collect(),
            next_id: state.next_id,
            dark_mode: state.dark_mode,
            revision: 0,
        }
    }

    fn to_state(&self) -> SessionState {
        SessionState {
            dark_mode: self.dark_mode,
            next_id: self.next_id,
            torrents: self.torrents.values().cloned().collect(),
        }
    }

    /// Record a committed mutation and capture what must be persisted
    fn commit(&mut self) -> (u64, SessionState) {
        self.revision += 1;
        (self.revision, self.to_state())
    }
}

/// Point-in-time torrent counts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionCounts {
    pub tracked: usize,
    pub completed: usize,
}

impl SessionCounts {
    pub fn in_progress(&self) -> usize {
        self.tracked - self.completed
    }
}

/// Authoritative set of tracked torrents.
///
/// Every command runs under a single lock, so commands on the same id are
/// mutually exclusive. Snapshots are written after the lock is released,
/// one at a time, and a snapshot older than the last written one is dropped.
pub struct Registry {
    session: Mutex<Session>,
    store: Arc<dyn SessionStore>,
    persisted_revision: Mutex<u64>,
    save_failures: AtomicU64,
    default_total_bytes: u64,
    max_source_len: usize,
}

impl Registry {
    /// Create an empty registry
    pub fn new(store: Arc<dyn SessionStore>, config: &SessionConfig) -> Self {
        Self::from_state(SessionState::default(), store, config)
    }

    /// Create a registry seeded with a previously loaded session.
    /// The state is expected to satisfy the session invariants.
    pub fn from_state(state: SessionState, store: Arc<dyn SessionStore>, config: &SessionConfig) -> Self {
        Self {
            session: Mutex::new(Session::from_state(state)),
            store,
            persisted_revision: Mutex::new(0),
            save_failures: AtomicU64::new(0),
            default_total_bytes: config.default_total_bytes,
            max_source_len: config.max_source_len,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Session> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start tracking a new torrent and return its id
    pub fn add_torrent(&self, raw_source: &str) -> Result<u64, RegistryError> {
        let (source, parsed) = parse_source(raw_source, self.max_source_len)?;
        let total_bytes = estimate_total_bytes(&parsed, self.default_total_bytes);

        let (id, revision, snapshot) = {
            let mut session = self.lock();
            let id = session.next_id;
            session.next_id = id.checked_add(1).ok_or(RegistryError::IdsExhausted)?;
            session
                .torrents
                .insert(id, Torrent::new(id, source.clone(), total_bytes));
            let (revision, snapshot) = session.commit();
            (id, revision, snapshot)
        };

        info!(
            torrent_id = id,
            source = %source,
            kind = parsed.kind(),
            total_bytes = total_bytes,
            "Torrent added"
        );

        self.persist(revision, snapshot);
        Ok(id)
    }

    /// Report an absolute byte count.
    ///
    /// The stored count is clamped to `[downloaded_bytes, total_bytes]`, so
    /// progress never goes backwards and never passes 100%.
    pub fn record_progress(&self, id: u64, bytes: u64) -> Result<Torrent, RegistryError> {
        self.update(id, |torrent| torrent.record_absolute(bytes))
    }

    /// Add `step` bytes to the downloaded count, saturating at the total
    pub fn advance(&self, id: u64, step: u64) -> Result<Torrent, RegistryError> {
        self.update(id, |torrent| torrent.advance(step))
    }

    fn update<F>(&self, id: u64, apply: F) -> Result<Torrent, RegistryError>
    where
        F: FnOnce(&mut Torrent) -> bool,
    {
        let (torrent, pending) = {
            let mut session = self.lock();
            let torrent = session
                .torrents
                .get_mut(&id)
                .ok_or(RegistryError::NotFound(id))?;

            let changed = apply(torrent);
            let torrent = torrent.clone();
            let pending = changed.then(|| session.commit());
            (torrent, pending)
        };

        match pending {
            Some((revision, snapshot)) => {
                debug!(
                    torrent_id = id,
                    downloaded_bytes = torrent.downloaded_bytes,
                    total_bytes = torrent.total_bytes,
                    "Progress recorded"
                );
                if torrent.is_complete() {
                    info!(torrent_id = id, total_bytes = torrent.total_bytes, "Torrent finished downloading");
                }
                self.persist(revision, snapshot);
            }
            None => {
                debug!(torrent_id = id, "Progress unchanged");
            }
        }

        Ok(torrent)
    }

    /// Acknowledge a torrent and drop it from the registry.
    ///
    /// Does not require the download to be finished.
    pub fn complete(&self, id: u64) -> Result<(), RegistryError> {
        let (removed, revision, snapshot) = {
            let mut session = self.lock();
            let removed = session
                .torrents
                .remove(&id)
                .ok_or(RegistryError::NotFound(id))?;
            let (revision, snapshot) = session.commit();
            (removed, revision, snapshot)
        };

        info!(
            torrent_id = id,
            source = %removed.source,
            downloaded_bytes = removed.downloaded_bytes,
            total_bytes = removed.total_bytes,
            "Torrent removed"
        );

        self.persist(revision, snapshot);
        Ok(())
    }

    /// Remove every finished torrent, returning the removed ids in order
    pub fn clear_completed(&self) -> Vec<u64> {
        let (removed, pending) = {
            let mut session = self.lock();
            let removed: Vec<u64> = session
                .torrents
                .values()
                .filter(|t| t.is_complete())
                .map(|t| t.id)
                .collect();

            for id in &removed {
                session.torrents.remove(id);
            }

            let pending = (!removed.is_empty()).then(|| session.commit());
            (removed, pending)
        };

        if let Some((revision, snapshot)) = pending {
            info!(removed = removed.len(), "Cleared finished torrents");
            self.persist(revision, snapshot);
        }

        removed
    }

    pub fn get(&self, id: u64) -> Result<Torrent, RegistryError> {
        self.lock()
            .torrents
            .get(&id)
            .cloned()
            .ok_or(RegistryError::NotFound(id))
    }

    pub fn get_status(&self, id: u64) -> Result<StatusDescriptor, RegistryError> {
        self.get(id).map(|t| t.status().into())
    }

    /// All tracked torrents in insertion order
    pub fn list(&self) -> Vec<Torrent> {
        self.lock().torrents.values().cloned().collect()
    }

    pub fn dark_mode(&self) -> bool {
        self.lock().dark_mode
    }

    pub fn set_dark_mode(&self, enabled: bool) -> bool {
        let pending = {
            let mut session = self.lock();
            if session.dark_mode == enabled {
                None
            } else {
                session.dark_mode = enabled;
                Some(session.commit())
            }
        };

        if let Some((revision, snapshot)) = pending {
            info!(dark_mode = enabled, "Display preference changed");
            self.persist(revision, snapshot);
        }

        enabled
    }

    /// Copy of the full session as it would be persisted
    pub fn snapshot(&self) -> SessionState {
        self.lock().to_state()
    }

    pub fn len(&self) -> usize {
        self.lock().torrents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().torrents.is_empty()
    }

    /// Tracked and finished torrent counts, taken under one lock
    pub fn counts(&self) -> SessionCounts {
        let session = self.lock();
        SessionCounts {
            tracked: session.torrents.len(),
            completed: session.torrents.values().filter(|t| t.is_complete()).count(),
        }
    }

    /// Number of snapshot writes that failed since startup
    pub fn save_failures(&self) -> u64 {
        self.save_failures.load(Ordering::Relaxed)
    }

    /// Write the current session unconditionally. Used at shutdown.
    pub fn flush(&self) -> Result<(), PersistError> {
        let (revision, snapshot) = {
            let session = self.lock();
            (session.revision, session.to_state())
        };

        let mut persisted = self.persisted_revision.lock().unwrap_or_else(PoisonError::into_inner);
        if revision < *persisted {
            return Ok(());
        }

        self.store.save(&snapshot)?;
        *persisted = revision;
        Ok(())
    }

    /// Best-effort save. Failures are logged and counted, never returned.
    fn persist(&self, revision: u64, snapshot: SessionState) {
        let mut persisted = self.persisted_revision.lock().unwrap_or_else(PoisonError::into_inner);

        if revision <= *persisted {
            debug!(revision, persisted = *persisted, "Skipping stale session snapshot");
            return;
        }

        match self.store.save(&snapshot) {
            Ok(()) => {
                *persisted = revision;
                debug!(revision, torrents = snapshot.torrents.len(), "Session saved");
            }
            Err(e) => {
                self.save_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    error = %e,
                    revision,
                    "Failed to save session, continuing with in-memory state"
                );
            }
        }
    }
}

/// Best known payload size for a new torrent
fn estimate_total_bytes(source: &TorrentSource, fallback: u64) -> u64 {
    match source {
        TorrentSource::Magnet(magnet) => magnet.exact_length.unwrap_or(fallback),
        TorrentSource::File(path) => match read_declared_length(path) {
            Ok(length) => length,
            Err(e) => {
                debug!(
                    path = %path.display(),
                    error = %e,
                    "Could not read size from metainfo, using placeholder"
                );
                fallback
            }
        },
    }
}
