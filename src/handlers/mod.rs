pub mod fallback;
pub mod health;
pub mod metrics;
pub mod settings;
pub mod torrent;
