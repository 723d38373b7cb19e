//! In-process relational store
//!
//! Tables are plain vectors behind one mutex, which mirrors a relational
//! backend without unique constraints: inserting two snapshot rows for the
//! same (match, slot) succeeds and produces duplicates. Callers have to
//! read before they write.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Result, SyncError};
use crate::store::{MatchStore, next_match_record};
use crate::types::{
    AttackRecord, MatchId, MatchRecord, MatchStatus, PlayerRecord, PlayerSlot, RowId, ScoreRecord,
    SnapshotPayload, SnapshotRow,
};

struct Tables<S> {
    snapshots: Vec<SnapshotRow<S>>,
    attacks: Vec<AttackRecord>,
    players: Vec<PlayerRecord>,
    matches: Vec<MatchRecord>,
    scores: Vec<ScoreRecord>,
    snapshot_feeds: Vec<(MatchId, flume::Sender<SnapshotRow<S>>)>,
    attack_feeds: Vec<(MatchId, flume::Sender<AttackRecord>)>,
}

impl<S> Default for Tables<S> {
    fn default() -> Self {
        Self {
            snapshots: Vec::new(),
            attacks: Vec::new(),
            players: Vec::new(),
            matches: Vec::new(),
            scores: Vec::new(),
            snapshot_feeds: Vec::new(),
            attack_feeds: Vec::new(),
        }
    }
}

impl<S: Clone> Tables<S> {
    fn notify_snapshot(&mut self, row: &SnapshotRow<S>) {
        // Closed feeds belong to sessions that went away
        self.snapshot_feeds.retain(|(match_id, tx)| {
            match_id != &row.match_id || tx.send(row.clone()).is_ok()
        });
    }

    fn notify_attack(&mut self, record: &AttackRecord) {
        self.attack_feeds.retain(|(match_id, tx)| {
            match_id != &record.match_id || tx.send(record.clone()).is_ok()
        });
    }
}

/// Shared in-memory store; clones share the same tables
pub struct MemoryStore<S> {
    tables: Arc<Mutex<Tables<S>>>,
    push: bool,
    offline: Arc<AtomicBool>,
}

impl<S> Clone for MemoryStore<S> {
    fn clone(&self) -> Self {
        Self {
            tables: self.tables.clone(),
            push: self.push,
            offline: self.offline.clone(),
        }
    }
}

impl<S> Default for MemoryStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> MemoryStore<S> {
    pub fn new() -> Self {
        Self {
            tables: Arc::new(Mutex::new(Tables::default())),
            push: true,
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A handle on the same tables whose subscriptions never deliver anything
    ///
    /// Used to exercise the polling fallback.
    pub fn without_push(&self) -> Self {
        Self {
            tables: self.tables.clone(),
            push: false,
            offline: self.offline.clone(),
        }
    }

    /// Make every operation fail with `StoreUnavailable` until switched back
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables<S>>> {
        if self.offline.load(Ordering::Relaxed) {
            return Err(SyncError::StoreUnavailable("store is offline".to_string()));
        }
        self.tables
            .lock()
            .map_err(|_| SyncError::Internal("store lock poisoned".to_string()))
    }

    /// Number of snapshot rows stored for (match, slot)
    pub fn snapshot_row_count(&self, match_id: &MatchId, slot: PlayerSlot) -> usize {
        self.tables
            .lock()
            .map(|t| {
                t.snapshots
                    .iter()
                    .filter(|r| &r.match_id == match_id && r.slot == slot)
                    .count()
            })
            .unwrap_or(0)
    }

    /// All attack rows of the match, processed or not
    pub fn attacks(&self, match_id: &MatchId) -> Vec<AttackRecord> {
        self.tables
            .lock()
            .map(|t| {
                t.attacks
                    .iter()
                    .filter(|a| &a.match_id == match_id)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Saved single-player scores, best first
    pub fn scores(&self) -> Vec<ScoreRecord> {
        let mut scores = self
            .tables
            .lock()
            .map(|t| t.scores.clone())
            .unwrap_or_default();
        scores.sort_by(|a, b| b.score.cmp(&a.score));
        scores
    }
}

impl<S: SnapshotPayload> MatchStore<S> for MemoryStore<S> {
    async fn find_snapshot(&self, match_id: &MatchId, slot: PlayerSlot) -> Result<Option<RowId>> {
        let tables = self.tables()?;
        Ok(tables
            .snapshots
            .iter()
            .find(|r| &r.match_id == match_id && r.slot == slot)
            .map(|r| r.id.clone()))
    }

    async fn insert_snapshot(&self, row: SnapshotRow<S>) -> Result<RowId> {
        let mut tables = self.tables()?;
        let id = row.id.clone();
        if self.push {
            tables.notify_snapshot(&row);
        }
        tables.snapshots.push(row);
        Ok(id)
    }

    async fn update_snapshot(&self, id: &RowId, payload: S, updated_at: u64) -> Result<()> {
        let mut tables = self.tables()?;
        let row = tables
            .snapshots
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| SyncError::RowNotFound(format!("snapshot {}", id)))?;
        row.payload = payload;
        row.updated_at = updated_at;
        let row = row.clone();
        if self.push {
            tables.notify_snapshot(&row);
        }
        Ok(())
    }

    async fn latest_snapshot(
        &self,
        match_id: &MatchId,
        slot: PlayerSlot,
    ) -> Result<Option<SnapshotRow<S>>> {
        let tables = self.tables()?;
        Ok(tables
            .snapshots
            .iter()
            .filter(|r| &r.match_id == match_id && r.slot == slot)
            .max_by_key(|r| r.updated_at)
            .cloned())
    }

    async fn subscribe_snapshots(&self, match_id: &MatchId) -> Result<flume::Receiver<SnapshotRow<S>>> {
        let mut tables = self.tables()?;
        let (tx, rx) = flume::unbounded();
        if self.push {
            tables.snapshot_feeds.push((match_id.clone(), tx));
        }
        Ok(rx)
    }

    async fn insert_attack(&self, record: AttackRecord) -> Result<()> {
        let mut tables = self.tables()?;
        if self.push {
            tables.notify_attack(&record);
        }
        tables.attacks.push(record);
        Ok(())
    }

    async fn pending_attacks(&self, match_id: &MatchId, to: PlayerSlot) -> Result<Vec<AttackRecord>> {
        let tables = self.tables()?;
        Ok(tables
            .attacks
            .iter()
            .filter(|a| &a.match_id == match_id && a.to == to && !a.processed)
            .cloned()
            .collect())
    }

    async fn subscribe_attacks(&self, match_id: &MatchId) -> Result<flume::Receiver<AttackRecord>> {
        let mut tables = self.tables()?;
        let (tx, rx) = flume::unbounded();
        if self.push {
            tables.attack_feeds.push((match_id.clone(), tx));
        }
        Ok(rx)
    }

    async fn mark_attack_processed(&self, match_id: &MatchId, id: &RowId) -> Result<()> {
        let mut tables = self.tables()?;
        let record = tables
            .attacks
            .iter_mut()
            .find(|a| &a.match_id == match_id && &a.id == id)
            .ok_or_else(|| SyncError::RowNotFound(format!("attack {}", id)))?;
        record.processed = true;
        Ok(())
    }

    async fn upsert_player(&self, record: PlayerRecord) -> Result<()> {
        let mut tables = self.tables()?;
        match tables
            .players
            .iter_mut()
            .find(|p| p.match_id == record.match_id && p.slot == record.slot)
        {
            Some(existing) => *existing = record,
            None => tables.players.push(record),
        }
        Ok(())
    }

    async fn players(&self, match_id: &MatchId) -> Result<Vec<PlayerRecord>> {
        let tables = self.tables()?;
        Ok(tables
            .players
            .iter()
            .filter(|p| &p.match_id == match_id)
            .cloned()
            .collect())
    }

    async fn match_record(&self, match_id: &MatchId) -> Result<Option<MatchRecord>> {
        let tables = self.tables()?;
        Ok(tables.matches.iter().find(|m| &m.id == match_id).cloned())
    }

    async fn set_match_status(&self, match_id: &MatchId, status: MatchStatus, at: u64) -> Result<()> {
        let mut tables = self.tables()?;
        let position = tables.matches.iter().position(|m| &m.id == match_id);
        let current = position.map(|i| tables.matches[i].clone());
        let record = next_match_record(current, match_id, status, at);
        match position {
            Some(i) => tables.matches[i] = record,
            None => tables.matches.push(record),
        }
        Ok(())
    }

    async fn save_score(&self, record: ScoreRecord) -> Result<()> {
        let mut tables = self.tables()?;
        tables.scores.push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::now_ms;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        value: u32,
        over: bool,
    }

    impl SnapshotPayload for Counter {
        fn is_game_over(&self) -> bool {
            self.over
        }
    }

    fn row(match_id: &MatchId, slot: PlayerSlot, value: u32, at: u64) -> SnapshotRow<Counter> {
        SnapshotRow {
            id: RowId::generate(),
            match_id: match_id.clone(),
            slot,
            payload: Counter { value, over: false },
            updated_at: at,
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_insert_without_read_creates_duplicates() {
        let store = MemoryStore::<Counter>::new();
        let m = MatchId::from_name("m").unwrap();
        store.insert_snapshot(row(&m, PlayerSlot::One, 1, 1)).await.unwrap();
        store.insert_snapshot(row(&m, PlayerSlot::One, 2, 2)).await.unwrap();
        assert_eq!(store.snapshot_row_count(&m, PlayerSlot::One), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_latest_snapshot_orders_by_updated_at() {
        let store = MemoryStore::<Counter>::new();
        let m = MatchId::from_name("m").unwrap();
        store.insert_snapshot(row(&m, PlayerSlot::Two, 7, 20)).await.unwrap();
        store.insert_snapshot(row(&m, PlayerSlot::Two, 3, 10)).await.unwrap();
        let latest = store.latest_snapshot(&m, PlayerSlot::Two).await.unwrap().unwrap();
        assert_eq!(latest.payload.value, 7);
        assert!(store.latest_snapshot(&m, PlayerSlot::One).await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_push_feed_is_filtered_by_match() {
        let store = MemoryStore::<Counter>::new();
        let m = MatchId::from_name("m").unwrap();
        let other = MatchId::from_name("other").unwrap();
        let feed = store.subscribe_snapshots(&m).await.unwrap();
        store.insert_snapshot(row(&other, PlayerSlot::One, 1, 1)).await.unwrap();
        let id = store.insert_snapshot(row(&m, PlayerSlot::One, 2, 2)).await.unwrap();
        store
            .update_snapshot(&id, Counter { value: 3, over: true }, 3)
            .await
            .unwrap();
        let received: Vec<u32> = feed.try_iter().map(|r| r.payload.value).collect();
        assert_eq!(received, vec![2, 3]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_without_push_delivers_nothing() {
        let store = MemoryStore::<Counter>::new();
        let quiet = store.without_push();
        let m = MatchId::from_name("m").unwrap();
        let feed = quiet.subscribe_snapshots(&m).await.unwrap();
        quiet.insert_snapshot(row(&m, PlayerSlot::One, 1, 1)).await.unwrap();
        assert!(feed.try_recv().is_err());
        // the row is still visible to polling
        assert!(store.latest_snapshot(&m, PlayerSlot::One).await.unwrap().is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_pending_attacks_exclude_processed() {
        let store = MemoryStore::<Counter>::new();
        let m = MatchId::from_name("m").unwrap();
        let first = AttackRecord::new(m.clone(), PlayerSlot::One, 2);
        let second = AttackRecord::new(m.clone(), PlayerSlot::One, 1);
        store.insert_attack(first.clone()).await.unwrap();
        store.insert_attack(second).await.unwrap();
        store.mark_attack_processed(&m, &first.id).await.unwrap();
        let pending = store.pending_attacks(&m, PlayerSlot::Two).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].lines, 1);
        assert!(store.pending_attacks(&m, PlayerSlot::One).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_match_status_timestamps() {
        let store = MemoryStore::<Counter>::new();
        let m = MatchId::from_name("m").unwrap();
        store.set_match_status(&m, MatchStatus::InProgress, 100).await.unwrap();
        store.set_match_status(&m, MatchStatus::Finished, 200).await.unwrap();
        let record = store.match_record(&m).await.unwrap().unwrap();
        assert_eq!(record.status, MatchStatus::Finished);
        assert_eq!(record.started_at, Some(100));
        assert_eq!(record.finished_at, Some(200));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_offline_store_fails() {
        let store = MemoryStore::<Counter>::new();
        let m = MatchId::from_name("m").unwrap();
        store.set_offline(true);
        let result = store.players(&m).await;
        assert!(matches!(result, Err(SyncError::StoreUnavailable(_))));
        store.set_offline(false);
        assert!(store.players(&m).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_scores_sorted_best_first() {
        let store = MemoryStore::<Counter>::new();
        for score in [300, 1200, 50] {
            store
                .save_score(ScoreRecord {
                    id: RowId::generate(),
                    player_name: "p".to_string(),
                    score,
                    level: 1,
                    lines: 0,
                    created_at: now_ms(),
                })
                .await
                .unwrap();
        }
        let scores: Vec<u64> = store.scores().iter().map(|s| s.score).collect();
        assert_eq!(scores, vec![1200, 300, 50]);
    }
}
