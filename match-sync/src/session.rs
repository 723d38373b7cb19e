//! One player's side of a two-player match
//!
//! ## Task layout
//!
//! ```text
//!  publish / send_attack ──► writer task ──► store
//!                              ▲ republish interval
//!
//!  store push feeds ──► forwarder tasks ─┐
//!  store polling    ──► poller task ─────┴─► incoming channel ──► recv / try_recv
//! ```
//!
//! The writer coalesces bursts of snapshots and republishes the last one
//! on an interval. Producers of the incoming channel are interchangeable:
//! the session keeps working when the push feed is missing, and the
//! consumer side drops duplicates and stale rows whatever their source.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::attack_inbox::AttackInbox;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::opponent::OpponentView;
use crate::stats::{StatsTracker, SyncStats};
use crate::store::MatchStore;
use crate::types::{
    AttackRecord, MatchId, MatchStatus, Outcome, PlayerRecord, PlayerSlot, RowId, SnapshotPayload,
    SnapshotRow, now_ms,
};

/// Something that changed on the opponent's side
#[derive(Debug, Clone, PartialEq)]
pub enum SyncUpdate<S> {
    /// A newer opponent snapshot
    Opponent(S),
    /// Penalty lines to enqueue
    Attack(u32),
}

/// Work queued for the writer task
enum WriterCommand<S> {
    Snapshot(S),
    Attack(u32),
    MarkProcessed(RowId),
}

/// Rows handed over by the producers
enum Incoming<S> {
    Snapshot(SnapshotRow<S>),
    Attack(AttackRecord),
}

struct UpsertState {
    row: Option<RowId>,
    /// Set once the final snapshot is written; later regular writes are dropped
    sealed: bool,
}

/// Read-before-write upsert of this player's snapshot row
///
/// Every writer of the session goes through the same guard, so two first
/// publishes can't both miss the row and insert it twice.
struct SnapshotUpsert<S, St> {
    store: Arc<St>,
    match_id: MatchId,
    slot: PlayerSlot,
    state: tokio::sync::Mutex<UpsertState>,
    stats: StatsTracker,
    _phantom: std::marker::PhantomData<fn(S)>,
}

impl<S: SnapshotPayload, St: MatchStore<S>> SnapshotUpsert<S, St> {
    fn new(store: Arc<St>, match_id: MatchId, slot: PlayerSlot, stats: StatsTracker) -> Self {
        Self {
            store,
            match_id,
            slot,
            state: tokio::sync::Mutex::new(UpsertState {
                row: None,
                sealed: false,
            }),
            stats,
            _phantom: std::marker::PhantomData,
        }
    }

    async fn upsert(&self, payload: S, is_final: bool) -> Result<()> {
        let mut state = self.state.lock().await;
        if state.sealed {
            tracing::debug!("Snapshot of slot {} is final, skipping write", self.slot);
            return Ok(());
        }
        let updated_at = now_ms();
        let known = match state.row.clone() {
            Some(id) => Some(id),
            None => self.store.find_snapshot(&self.match_id, self.slot).await?,
        };
        let written = match known {
            Some(id) => match self.store.update_snapshot(&id, payload.clone(), updated_at).await {
                Ok(()) => Some(id),
                Err(SyncError::RowNotFound(_)) => None,
                Err(e) => return Err(e),
            },
            None => None,
        };
        let id = match written {
            Some(id) => id,
            None => {
                let row = SnapshotRow {
                    id: RowId::generate(),
                    match_id: self.match_id.clone(),
                    slot: self.slot,
                    payload,
                    updated_at,
                };
                let id = self.store.insert_snapshot(row).await?;
                tracing::debug!("Inserted snapshot row {} for slot {}", id, self.slot);
                id
            }
        };
        state.row = Some(id);
        state.sealed = is_final;
        self.stats.add_snapshot_written();
        Ok(())
    }
}

/// Handle on a running match for one player
///
/// Created with [`MatchSession::start`]; background tasks stop when the
/// session is closed or dropped.
pub struct MatchSession<S: SnapshotPayload, St: MatchStore<S>> {
    store: Arc<St>,
    match_id: MatchId,
    slot: PlayerSlot,
    config: SyncConfig,
    upsert: Arc<SnapshotUpsert<S, St>>,
    writer_tx: flume::Sender<WriterCommand<S>>,
    incoming_rx: flume::Receiver<Incoming<S>>,
    opponent: OpponentView<S>,
    inbox: AttackInbox,
    stats: StatsTracker,
    tasks: Vec<JoinHandle<()>>,
}

impl<S: SnapshotPayload, St: MatchStore<S>> MatchSession<S, St> {
    /// Start syncing `slot` of `match_id` through `store`
    ///
    /// Spawns the writer and the poller, and the push forwarders when
    /// enabled. A failing push subscription is logged and the session falls
    /// back to polling alone.
    pub async fn start(
        store: Arc<St>,
        match_id: MatchId,
        slot: PlayerSlot,
        config: SyncConfig,
    ) -> Result<Self> {
        let stats = StatsTracker::new();
        let upsert = Arc::new(SnapshotUpsert::new(
            store.clone(),
            match_id.clone(),
            slot,
            stats.clone(),
        ));
        let (writer_tx, writer_rx) = flume::unbounded();
        let (incoming_tx, incoming_rx) = flume::unbounded();

        let mut tasks = vec![
            tokio::spawn(run_writer(
                upsert.clone(),
                store.clone(),
                match_id.clone(),
                slot,
                config.publish_interval(),
                writer_rx,
                stats.clone(),
            )),
            tokio::spawn(run_poller(
                store.clone(),
                match_id.clone(),
                slot,
                config.poll_interval(),
                incoming_tx.clone(),
                stats.clone(),
            )),
        ];

        if config.push_enabled {
            match store.subscribe_snapshots(&match_id).await {
                Ok(feed) => {
                    let tx = incoming_tx.clone();
                    let opponent = slot.opponent();
                    tasks.push(tokio::spawn(async move {
                        while let Ok(row) = feed.recv_async().await {
                            if row.slot == opponent && tx.send(Incoming::Snapshot(row)).is_err() {
                                break;
                            }
                        }
                    }));
                }
                Err(e) => {
                    tracing::warn!("Match '{}' snapshot feed unavailable, polling only: {}", match_id, e);
                }
            }
            match store.subscribe_attacks(&match_id).await {
                Ok(feed) => {
                    let tx = incoming_tx.clone();
                    tasks.push(tokio::spawn(async move {
                        while let Ok(record) = feed.recv_async().await {
                            if record.to == slot && tx.send(Incoming::Attack(record)).is_err() {
                                break;
                            }
                        }
                    }));
                }
                Err(e) => {
                    tracing::warn!("Match '{}' attack feed unavailable, polling only: {}", match_id, e);
                }
            }
        }

        tracing::info!("Match '{}' session started for slot {}", match_id, slot);

        Ok(Self {
            store,
            opponent: OpponentView::new(match_id.clone(), slot),
            inbox: AttackInbox::new(slot),
            match_id,
            slot,
            config,
            upsert,
            writer_tx,
            incoming_rx,
            stats,
            tasks,
        })
    }

    pub fn match_id(&self) -> &MatchId {
        &self.match_id
    }

    pub fn slot(&self) -> PlayerSlot {
        self.slot
    }

    /// Queue a snapshot for writing; never waits on the store
    pub fn publish(&self, snapshot: S) {
        if self.writer_tx.send(WriterCommand::Snapshot(snapshot)).is_err() {
            tracing::debug!("Match '{}' writer stopped, snapshot dropped", self.match_id);
        }
    }

    /// Queue an attack on the opponent
    pub fn send_attack(&self, lines: u32) {
        if lines == 0 {
            return;
        }
        if self.writer_tx.send(WriterCommand::Attack(lines)).is_err() {
            tracing::debug!("Match '{}' writer stopped, attack dropped", self.match_id);
        }
    }

    /// Turn a row from a producer into an update, if it is news
    fn consume(&mut self, incoming: Incoming<S>) -> Option<SyncUpdate<S>> {
        match incoming {
            Incoming::Snapshot(row) => {
                if !self.opponent.apply(row) {
                    return None;
                }
                self.stats.add_opponent_update();
                self.opponent.snapshot().cloned().map(SyncUpdate::Opponent)
            }
            Incoming::Attack(record) => match self.inbox.accept(&record) {
                Some(lines) => {
                    tracing::debug!(
                        "Match '{}' slot {} received attack {} ({} lines)",
                        self.match_id,
                        self.slot,
                        record.id,
                        lines
                    );
                    self.stats.add_attack_received();
                    let _ = self.writer_tx.send(WriterCommand::MarkProcessed(record.id));
                    Some(SyncUpdate::Attack(lines))
                }
                None => {
                    if self.inbox.is_known(&record.id) {
                        self.stats.add_duplicate_attack();
                    }
                    None
                }
            },
        }
    }

    /// Wait for the next opponent update
    ///
    /// Cancel safe: nothing is lost if the returned future is dropped.
    pub async fn recv(&mut self) -> Result<SyncUpdate<S>> {
        loop {
            let incoming = self
                .incoming_rx
                .recv_async()
                .await
                .map_err(|_| SyncError::Internal("session closed".to_string()))?;
            if let Some(update) = self.consume(incoming) {
                return Ok(update);
            }
        }
    }

    /// Next pending opponent update, without waiting
    pub fn try_recv(&mut self) -> Option<SyncUpdate<S>> {
        while let Ok(incoming) = self.incoming_rx.try_recv() {
            if let Some(update) = self.consume(incoming) {
                return Some(update);
            }
        }
        None
    }

    /// Last-known opponent snapshot
    pub fn opponent(&self) -> Option<&S> {
        self.opponent.snapshot()
    }

    /// Build this player's status row
    pub fn player_record(&self, name: &str, score: u64, level: u32, lines: u32) -> PlayerRecord {
        PlayerRecord {
            match_id: self.match_id.clone(),
            slot: self.slot,
            name: name.to_string(),
            score,
            level,
            lines,
            is_game_over: false,
            updated_at: now_ms(),
        }
    }

    /// Register this player in the match
    ///
    /// Creates the match as waiting when it doesn't exist yet, and moves it
    /// to in progress once both slots have joined.
    pub async fn join(&self, name: &str) -> Result<()> {
        self.store
            .upsert_player(self.player_record(name, 0, 1, 0))
            .await?;
        if !self.start_if_full().await? {
            let status = self.store.match_record(&self.match_id).await?;
            if status.is_none() {
                self.store
                    .set_match_status(&self.match_id, MatchStatus::Waiting, now_ms())
                    .await?;
            }
        }
        tracing::info!("Player '{}' joined match '{}' as slot {}", name, self.match_id, self.slot);
        Ok(())
    }

    // Move a waiting (or not yet created) match to in progress once both
    // slots are taken; true if the match is past waiting afterwards
    async fn start_if_full(&self) -> Result<bool> {
        let status = self
            .store
            .match_record(&self.match_id)
            .await?
            .map(|record| record.status);
        if matches!(status, Some(MatchStatus::InProgress | MatchStatus::Finished)) {
            return Ok(true);
        }
        let players = self.store.players(&self.match_id).await?;
        let both = [PlayerSlot::One, PlayerSlot::Two]
            .iter()
            .all(|slot| players.iter().any(|p| p.slot == *slot));
        if both {
            self.store
                .set_match_status(&self.match_id, MatchStatus::InProgress, now_ms())
                .await?;
            tracing::info!("Match '{}' started", self.match_id);
        }
        Ok(both)
    }

    /// Wait until the match is in progress
    ///
    /// Each check also starts the match when both players are in, so a
    /// status overwritten by a late joiner can't stall both sides.
    pub async fn wait_for_start(&self) -> Result<()> {
        let wait = async {
            loop {
                match self.start_if_full().await {
                    Ok(true) => return,
                    Ok(false) => {}
                    Err(e) => {
                        self.stats.add_store_error();
                        tracing::warn!("Match '{}' status check failed: {}", self.match_id, e);
                    }
                }
                tokio::time::sleep(self.config.poll_interval()).await;
            }
        };
        match self.config.start_timeout_ms {
            Some(timeout_ms) => tokio::time::timeout(Duration::from_millis(timeout_ms), wait)
                .await
                .map_err(|_| {
                    SyncError::Timeout(format!(
                        "match '{}' did not start within {} ms",
                        self.match_id, timeout_ms
                    ))
                }),
            None => {
                wait.await;
                Ok(())
            }
        }
    }

    /// Game-over handshake
    ///
    /// The outcome is decided from the opponent state known right now,
    /// before anything is written: both players may end up seeing the same
    /// result if they top out close together. Store failures are logged and
    /// never change the returned outcome.
    pub async fn finish(&self, final_snapshot: S, record: PlayerRecord) -> Outcome {
        let outcome = if self.opponent.is_game_over() {
            Outcome::Win
        } else {
            Outcome::Lose
        };
        tracing::info!("Match '{}' slot {} finished: {}", self.match_id, self.slot, outcome);

        if let Err(e) = self.upsert.upsert(final_snapshot, true).await {
            self.stats.add_store_error();
            tracing::error!("Match '{}' failed to write final snapshot: {}", self.match_id, e);
        }

        let record = PlayerRecord {
            match_id: self.match_id.clone(),
            slot: self.slot,
            is_game_over: true,
            updated_at: now_ms(),
            ..record
        };
        if let Err(e) = self.store.upsert_player(record).await {
            self.stats.add_store_error();
            tracing::error!("Match '{}' failed to update player: {}", self.match_id, e);
        }

        match self.store.players(&self.match_id).await {
            Ok(players) if !players.is_empty() && players.iter().all(|p| p.is_game_over) => {
                match self
                    .store
                    .set_match_status(&self.match_id, MatchStatus::Finished, now_ms())
                    .await
                {
                    Ok(()) => tracing::info!("Match '{}' is over", self.match_id),
                    Err(e) => {
                        self.stats.add_store_error();
                        tracing::error!("Match '{}' failed to close: {}", self.match_id, e);
                    }
                }
            }
            Ok(_) => {}
            Err(e) => {
                self.stats.add_store_error();
                tracing::error!("Match '{}' failed to read players: {}", self.match_id, e);
            }
        }
        outcome
    }

    /// Get current sync statistics
    pub fn stats(&self) -> SyncStats {
        self.stats.get_stats()
    }

    /// Stop all background tasks
    pub fn close(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl<S: SnapshotPayload, St: MatchStore<S>> Drop for MatchSession<S, St> {
    fn drop(&mut self) {
        self.close();
    }
}

async fn run_writer<S: SnapshotPayload, St: MatchStore<S>>(
    upsert: Arc<SnapshotUpsert<S, St>>,
    store: Arc<St>,
    match_id: MatchId,
    slot: PlayerSlot,
    republish_every: Duration,
    rx: flume::Receiver<WriterCommand<S>>,
    stats: StatsTracker,
) {
    let mut last: Option<S> = None;
    let mut republish = tokio::time::interval(republish_every);
    republish.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        let batch = tokio::select! {
            command = rx.recv_async() => match command {
                Ok(command) => {
                    let mut batch = vec![command];
                    batch.extend(rx.try_iter());
                    batch
                }
                Err(_) => break,
            },
            _ = republish.tick() => Vec::new(),
        };

        let mut snapshot = None;
        for command in batch {
            match command {
                // only the newest snapshot of a burst is written
                WriterCommand::Snapshot(s) => snapshot = Some(s),
                WriterCommand::Attack(lines) => {
                    let record = AttackRecord::new(match_id.clone(), slot, lines);
                    match store.insert_attack(record).await {
                        Ok(()) => stats.add_attack_sent(),
                        Err(e) => {
                            stats.add_store_error();
                            tracing::warn!("Match '{}' failed to send attack: {}", match_id, e);
                        }
                    }
                }
                WriterCommand::MarkProcessed(id) => {
                    if let Err(e) = store.mark_attack_processed(&match_id, &id).await {
                        stats.add_store_error();
                        tracing::warn!("Match '{}' failed to mark attack {}: {}", match_id, id, e);
                    }
                }
            }
        }

        if snapshot.is_some() {
            last = snapshot;
        } else if last.is_none() {
            continue;
        }
        if let Some(payload) = last.clone() {
            if let Err(e) = upsert.upsert(payload, false).await {
                stats.add_store_error();
                tracing::warn!("Match '{}' failed to publish snapshot: {}", match_id, e);
            }
        }
    }
    tracing::debug!("Match '{}' writer stopped", match_id);
}

async fn run_poller<S: SnapshotPayload, St: MatchStore<S>>(
    store: Arc<St>,
    match_id: MatchId,
    slot: PlayerSlot,
    every: Duration,
    tx: flume::Sender<Incoming<S>>,
    stats: StatsTracker,
) {
    let mut interval = tokio::time::interval(every);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    loop {
        interval.tick().await;

        match store.latest_snapshot(&match_id, slot.opponent()).await {
            Ok(Some(row)) => {
                if tx.send(Incoming::Snapshot(row)).is_err() {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => {
                stats.add_store_error();
                tracing::warn!("Match '{}' opponent poll failed: {}", match_id, e);
            }
        }

        match store.pending_attacks(&match_id, slot).await {
            Ok(records) => {
                if records
                    .into_iter()
                    .any(|record| tx.send(Incoming::Attack(record)).is_err())
                {
                    break;
                }
            }
            Err(e) => {
                stats.add_store_error();
                tracing::warn!("Match '{}' attack poll failed: {}", match_id, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Snap {
        score: u64,
        over: bool,
    }

    impl SnapshotPayload for Snap {
        fn is_game_over(&self) -> bool {
            self.over
        }
    }

    fn snap(score: u64) -> Snap {
        Snap { score, over: false }
    }

    fn fast() -> SyncConfig {
        SyncConfig::new()
            .with_publish_interval_ms(20)
            .with_poll_interval_ms(20)
    }

    async fn session(
        store: &MemoryStore<Snap>,
        slot: PlayerSlot,
        config: SyncConfig,
    ) -> MatchSession<Snap, MemoryStore<Snap>> {
        MatchSession::start(
            Arc::new(store.clone()),
            MatchId::from_name("room").unwrap(),
            slot,
            config,
        )
        .await
        .unwrap()
    }

    async fn next_update(s: &mut MatchSession<Snap, MemoryStore<Snap>>) -> SyncUpdate<Snap> {
        tokio::time::timeout(Duration::from_secs(2), s.recv())
            .await
            .expect("no update in time")
            .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_opponent_sync_with_polling_only() {
        let store = MemoryStore::new().without_push();
        let a = session(&store, PlayerSlot::One, fast()).await;
        let mut b = session(&store, PlayerSlot::Two, fast()).await;
        a.publish(snap(120));
        match next_update(&mut b).await {
            SyncUpdate::Opponent(s) => assert_eq!(s.score, 120),
            other => panic!("unexpected update {:?}", other),
        }
        assert_eq!(b.opponent().unwrap().score, 120);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_concurrent_first_publishes_create_one_row() {
        let store = MemoryStore::<Snap>::new();
        let m = MatchId::from_name("room").unwrap();
        let upsert = Arc::new(SnapshotUpsert::new(
            Arc::new(store.clone()),
            m.clone(),
            PlayerSlot::One,
            StatsTracker::new(),
        ));
        let (first, second) = tokio::join!(
            upsert.upsert(snap(1), false),
            upsert.upsert(snap(2), false)
        );
        first.unwrap();
        second.unwrap();
        assert_eq!(store.snapshot_row_count(&m, PlayerSlot::One), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_publish_burst_and_final_write_share_the_row() {
        let store = MemoryStore::<Snap>::new();
        let a = session(&store, PlayerSlot::One, fast()).await;
        for score in 0..10 {
            a.publish(snap(score));
        }
        let record = a.player_record("ann", 900, 2, 12);
        a.finish(Snap { score: 900, over: true }, record).await;
        tokio::time::sleep(Duration::from_millis(100)).await;
        let m = MatchId::from_name("room").unwrap();
        assert_eq!(store.snapshot_row_count(&m, PlayerSlot::One), 1);
        let latest = store.latest_snapshot(&m, PlayerSlot::One).await.unwrap().unwrap();
        // republishing never overwrites the final snapshot
        assert!(latest.payload.over);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_attack_from_push_and_poll_is_delivered_once() {
        let store = MemoryStore::<Snap>::new();
        let a = session(&store, PlayerSlot::One, fast()).await;
        let mut b = session(&store, PlayerSlot::Two, fast()).await;
        a.send_attack(3);
        assert_eq!(next_update(&mut b).await, SyncUpdate::Attack(3));

        // let several polls run over the same record
        tokio::time::sleep(Duration::from_millis(150)).await;
        let mut extra = Vec::new();
        while let Some(update) = b.try_recv() {
            extra.push(update);
        }
        assert!(!extra.iter().any(|u| matches!(u, SyncUpdate::Attack(_))));

        let m = MatchId::from_name("room").unwrap();
        let attacks = store.attacks(&m);
        assert_eq!(attacks.len(), 1);
        assert!(attacks[0].processed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_zero_line_attack_is_not_sent() {
        let store = MemoryStore::<Snap>::new();
        let a = session(&store, PlayerSlot::One, fast()).await;
        a.send_attack(0);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(store.attacks(a.match_id()).is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_match_finished_only_when_both_players_are_over() {
        let store = MemoryStore::<Snap>::new();
        let a = session(&store, PlayerSlot::One, fast()).await;
        let mut b = session(&store, PlayerSlot::Two, fast()).await;
        a.join("ann").await.unwrap();
        b.join("bob").await.unwrap();
        let m = MatchId::from_name("room").unwrap();
        assert_eq!(
            store.match_record(&m).await.unwrap().unwrap().status,
            MatchStatus::InProgress
        );

        let outcome = a
            .finish(Snap { score: 10, over: true }, a.player_record("ann", 10, 1, 0))
            .await;
        assert_eq!(outcome, Outcome::Lose);
        assert_eq!(
            store.match_record(&m).await.unwrap().unwrap().status,
            MatchStatus::InProgress
        );

        // b learns about a's game over before finishing itself
        loop {
            if let SyncUpdate::Opponent(s) = next_update(&mut b).await {
                if s.over {
                    break;
                }
            }
        }
        let outcome = b
            .finish(Snap { score: 20, over: true }, b.player_record("bob", 20, 1, 0))
            .await;
        assert_eq!(outcome, Outcome::Win);
        let record = store.match_record(&m).await.unwrap().unwrap();
        assert_eq!(record.status, MatchStatus::Finished);
        assert!(record.finished_at.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_wait_for_start() {
        let store = MemoryStore::<Snap>::new();
        let a = session(&store, PlayerSlot::One, fast().with_start_timeout_ms(Some(100))).await;
        a.join("ann").await.unwrap();
        assert!(matches!(a.wait_for_start().await, Err(SyncError::Timeout(_))));

        let b = session(&store, PlayerSlot::Two, fast()).await;
        b.join("bob").await.unwrap();
        a.wait_for_start().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_lost_start_is_recovered() {
        let store = MemoryStore::<Snap>::new();
        let a = session(&store, PlayerSlot::One, fast().with_start_timeout_ms(Some(500))).await;
        let b = session(&store, PlayerSlot::Two, fast()).await;
        a.join("ann").await.unwrap();
        b.join("bob").await.unwrap();
        // a late "waiting" write from the first joiner
        let m = MatchId::from_name("room").unwrap();
        store
            .set_match_status(&m, MatchStatus::Waiting, now_ms())
            .await
            .unwrap();
        a.wait_for_start().await.unwrap();
        let record = store.match_record(&m).await.unwrap().unwrap();
        assert_eq!(record.status, MatchStatus::InProgress);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_store_outage_is_counted_not_fatal() {
        let store = MemoryStore::<Snap>::new();
        let a = session(&store, PlayerSlot::One, fast()).await;
        store.set_offline(true);
        a.publish(snap(5));
        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(a.stats().store_errors > 0);

        store.set_offline(false);
        a.publish(snap(6));
        tokio::time::sleep(Duration::from_millis(80)).await;
        let m = MatchId::from_name("room").unwrap();
        let latest = store.latest_snapshot(&m, PlayerSlot::One).await.unwrap().unwrap();
        assert_eq!(latest.payload.score, 6);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_closed_session_stops_writing() {
        let store = MemoryStore::<Snap>::new();
        let mut a = session(&store, PlayerSlot::One, fast()).await;
        a.close();
        a.publish(snap(1));
        tokio::time::sleep(Duration::from_millis(60)).await;
        let m = MatchId::from_name("room").unwrap();
        assert_eq!(store.snapshot_row_count(&m, PlayerSlot::One), 0);
    }
}
