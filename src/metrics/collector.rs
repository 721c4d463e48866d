use crate::stores::registry::Registry;
use crate::utils::time::{current_timestamp, elapsed_seconds};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

pub struct Metrics {
    pub total_commands: AtomicU64,
    pub failed_commands: AtomicU64,
    pub torrents_added: AtomicU64,
    pub progress_updates: AtomicU64,
    pub torrents_removed: AtomicU64,
    pub start_time: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_commands: u64,
    pub failed_commands: u64,
    pub torrents_added: u64,
    pub progress_updates: u64,
    pub torrents_removed: u64,
    pub tracked_torrents: usize,
    pub completed_torrents: usize,
    pub in_progress_torrents: usize,
    pub save_failures: u64,
    pub uptime_seconds: i64,
    pub commands_per_second: f64,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            total_commands: AtomicU64::new(0),
            failed_commands: AtomicU64::new(0),
            torrents_added: AtomicU64::new(0),
            progress_updates: AtomicU64::new(0),
            torrents_removed: AtomicU64::new(0),
            start_time: current_timestamp(),
        }
    }

    pub fn increment_commands(&self) {
        self.total_commands.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_failed(&self) {
        self.failed_commands.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_added(&self) {
        self.torrents_added.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_progress(&self) {
        self.progress_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_removed(&self, count: u64) {
        self.torrents_removed.fetch_add(count, Ordering::Relaxed);
    }

    /// Combine the counters with live registry gauges
    pub fn get_snapshot(&self, registry: &Registry) -> MetricsSnapshot {
        let total_commands = self.total_commands.load(Ordering::Relaxed);
        let uptime_seconds = elapsed_seconds(self.start_time, current_timestamp());

        let commands_per_second = if uptime_seconds > 0 {
            total_commands as f64 / uptime_seconds as f64
        } else {
            0.0
        };

        let counts = registry.counts();

        MetricsSnapshot {
            total_commands,
            failed_commands: self.failed_commands.load(Ordering::Relaxed),
            torrents_added: self.torrents_added.load(Ordering::Relaxed),
            progress_updates: self.progress_updates.load(Ordering::Relaxed),
            torrents_removed: self.torrents_removed.load(Ordering::Relaxed),
            tracked_torrents: counts.tracked,
            completed_torrents: counts.completed,
            in_progress_torrents: counts.in_progress(),
            save_failures: registry.save_failures(),
            uptime_seconds,
            commands_per_second,
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
