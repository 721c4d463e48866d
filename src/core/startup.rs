use crate::core::error::PersistError;
use crate::models::session::SessionState;
use crate::persist::snapshot::SessionStore;
use std::collections::HashSet;
use tracing::{info, warn};

/// Load the saved session once at boot.
///
/// Any load failure starts an empty session instead of aborting startup.
pub fn restore_session(store: &dyn SessionStore) -> SessionState {
    match store.load() {
        Ok(state) => {
            let state = repair_session(state);
            info!(
                torrents = state.torrents.len(),
                next_id = state.next_id,
                dark_mode = state.dark_mode,
                "Session restored"
            );
            state
        }
        Err(PersistError::Missing(path)) => {
            info!(path = %path.display(), "No saved session, starting empty");
            SessionState::default()
        }
        Err(e) => {
            warn!(error = %e, "Failed to load saved session, starting empty");
            SessionState::default()
        }
    }
}

/// Bring a loaded snapshot back within the session invariants.
///
/// Duplicate ids keep their first entry, an id of `u64::MAX` is dropped,
/// progress is capped at the total, and `next_id` is raised past the
/// largest id.
pub fn repair_session(mut state: SessionState) -> SessionState {
    let mut seen = HashSet::new();

    state.torrents.retain(|torrent| {
        // No id can follow u64::MAX, so keeping it would leave next_id stuck
        if torrent.id == u64::MAX {
            warn!(torrent_id = torrent.id, "Dropping torrent with unassignable id from saved session");
            return false;
        }
        let first = seen.insert(torrent.id);
        if !first {
            warn!(torrent_id = torrent.id, "Dropping duplicate torrent from saved session");
        }
        first
    });

    state.torrents.sort_by_key(|torrent| torrent.id);

    for torrent in &mut state.torrents {
        if torrent.downloaded_bytes > torrent.total_bytes {
            warn!(
                torrent_id = torrent.id,
                downloaded_bytes = torrent.downloaded_bytes,
                total_bytes = torrent.total_bytes,
                "Capping saved progress at total size"
            );
            torrent.downloaded_bytes = torrent.total_bytes;
        }
    }

    let min_next_id = state
        .torrents
        .last()
        .map_or(1, |torrent| torrent.id + 1);

    if state.next_id < min_next_id {
        warn!(
            next_id = state.next_id,
            raised_to = min_next_id,
            "Saved next_id is not above existing ids"
        );
        state.next_id = min_next_id;
    }

    state
}
