//! Counters of a match session's store traffic

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Point-in-time copy of the session counters
#[derive(Debug, Clone)]
pub struct SyncStats {
    /// Snapshot upserts that reached the store
    pub snapshots_written: u64,
    /// Attack records inserted
    pub attacks_sent: u64,
    /// Opponent snapshots handed to the consumer
    pub opponent_updates: u64,
    /// Attack records accepted by the inbox
    pub attacks_received: u64,
    /// Attack deliveries ignored because the record was already seen
    pub duplicate_attacks: u64,
    /// Failed store operations
    pub store_errors: u64,
    /// When the session started
    pub start_time: Instant,
}

impl SyncStats {
    /// Snapshot writes per second since the session started
    pub fn write_rate(&self) -> f64 {
        let elapsed_secs = self.start_time.elapsed().as_secs_f64();
        if elapsed_secs > 0.0 {
            self.snapshots_written as f64 / elapsed_secs
        } else {
            0.0
        }
    }
}

impl std::fmt::Display for SyncStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Written: {} ({:.2}/s), Attacks out/in: {}/{} ({} dup), Opponent updates: {}, Errors: {}",
            self.snapshots_written,
            self.write_rate(),
            self.attacks_sent,
            self.attacks_received,
            self.duplicate_attacks,
            self.opponent_updates,
            self.store_errors
        )
    }
}

/// Thread-safe counters shared by the session tasks
///
/// Uses atomic operations for lock-free concurrent updates
#[derive(Debug, Clone)]
pub struct StatsTracker {
    snapshots_written: Arc<AtomicU64>,
    attacks_sent: Arc<AtomicU64>,
    opponent_updates: Arc<AtomicU64>,
    attacks_received: Arc<AtomicU64>,
    duplicate_attacks: Arc<AtomicU64>,
    store_errors: Arc<AtomicU64>,
    start_time: Instant,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self {
            snapshots_written: Arc::new(AtomicU64::new(0)),
            attacks_sent: Arc::new(AtomicU64::new(0)),
            opponent_updates: Arc::new(AtomicU64::new(0)),
            attacks_received: Arc::new(AtomicU64::new(0)),
            duplicate_attacks: Arc::new(AtomicU64::new(0)),
            store_errors: Arc::new(AtomicU64::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn add_snapshot_written(&self) {
        self.snapshots_written.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_attack_sent(&self) {
        self.attacks_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_opponent_update(&self) {
        self.opponent_updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_attack_received(&self) {
        self.attacks_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_duplicate_attack(&self) {
        self.duplicate_attacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current statistics snapshot
    pub fn get_stats(&self) -> SyncStats {
        SyncStats {
            snapshots_written: self.snapshots_written.load(Ordering::Relaxed),
            attacks_sent: self.attacks_sent.load(Ordering::Relaxed),
            opponent_updates: self.opponent_updates.load(Ordering::Relaxed),
            attacks_received: self.attacks_received.load(Ordering::Relaxed),
            duplicate_attacks: self.duplicate_attacks.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            start_time: self.start_time,
        }
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_counts_are_shared_between_clones() {
        let tracker = StatsTracker::new();
        let clone = tracker.clone();
        tracker.add_snapshot_written();
        clone.add_snapshot_written();
        clone.add_duplicate_attack();
        let stats = tracker.get_stats();
        assert_eq!(stats.snapshots_written, 2);
        assert_eq!(stats.duplicate_attacks, 1);
        assert_eq!(stats.store_errors, 0);
    }

    #[test]
    fn test_stats_display() {
        let tracker = StatsTracker::new();
        tracker.add_attack_sent();
        tracker.add_store_error();
        let display = format!("{}", tracker.get_stats());
        assert!(display.contains("Attacks out/in: 1/0"));
        assert!(display.contains("Errors: 1"));
    }
}
