//! Persistence port of the sync protocol
//!
//! The protocol never reaches the backing store through anything but this
//! trait. Adapters:
//! - [`MemoryStore`](crate::MemoryStore): relational tables in process memory
//! - [`ZenohStore`](crate::ZenohStore): rows announced with zenoh puts and served by a queryable

use std::future::Future;

use crate::error::Result;
use crate::types::{
    AttackRecord, MatchId, MatchRecord, MatchStatus, PlayerRecord, PlayerSlot, RowId, ScoreRecord,
    SnapshotPayload, SnapshotRow,
};

pub mod memory;

/// Store operations used by a match session
///
/// Snapshot writes are exposed as primitives (`find` / `insert` / `update`);
/// the upsert built on top of them lives in the session, which guards it
/// against duplicate first inserts.
pub trait MatchStore<S: SnapshotPayload>: Send + Sync + 'static {
    /// Id of the snapshot row for (match, slot), if it exists
    fn find_snapshot(
        &self,
        match_id: &MatchId,
        slot: PlayerSlot,
    ) -> impl Future<Output = Result<Option<RowId>>> + Send;

    /// Insert a new snapshot row
    fn insert_snapshot(&self, row: SnapshotRow<S>) -> impl Future<Output = Result<RowId>> + Send;

    /// Overwrite payload and timestamp of an existing snapshot row
    fn update_snapshot(
        &self,
        id: &RowId,
        payload: S,
        updated_at: u64,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Newest snapshot row for (match, slot)
    fn latest_snapshot(
        &self,
        match_id: &MatchId,
        slot: PlayerSlot,
    ) -> impl Future<Output = Result<Option<SnapshotRow<S>>>> + Send;

    /// Push feed of every snapshot insert/update in the match
    fn subscribe_snapshots(
        &self,
        match_id: &MatchId,
    ) -> impl Future<Output = Result<flume::Receiver<SnapshotRow<S>>>> + Send;

    /// Insert a new attack row
    fn insert_attack(&self, record: AttackRecord) -> impl Future<Output = Result<()>> + Send;

    /// Unprocessed attacks addressed to `to`
    fn pending_attacks(
        &self,
        match_id: &MatchId,
        to: PlayerSlot,
    ) -> impl Future<Output = Result<Vec<AttackRecord>>> + Send;

    /// Push feed of attack inserts in the match
    fn subscribe_attacks(
        &self,
        match_id: &MatchId,
    ) -> impl Future<Output = Result<flume::Receiver<AttackRecord>>> + Send;

    /// Set the processed flag of an attack
    fn mark_attack_processed(
        &self,
        match_id: &MatchId,
        id: &RowId,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Update-or-insert the status row of a player
    fn upsert_player(&self, record: PlayerRecord) -> impl Future<Output = Result<()>> + Send;

    /// All player rows of the match
    fn players(&self, match_id: &MatchId)
    -> impl Future<Output = Result<Vec<PlayerRecord>>> + Send;

    /// Status row of the match, if it exists
    fn match_record(
        &self,
        match_id: &MatchId,
    ) -> impl Future<Output = Result<Option<MatchRecord>>> + Send;

    /// Update-or-insert the status of the match
    fn set_match_status(
        &self,
        match_id: &MatchId,
        status: MatchStatus,
        at: u64,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Persist the final result of a single-player game
    fn save_score(&self, record: ScoreRecord) -> impl Future<Output = Result<()>> + Send;
}

/// Apply a status transition to an optional existing match row
pub(crate) fn next_match_record(
    current: Option<MatchRecord>,
    match_id: &MatchId,
    status: MatchStatus,
    at: u64,
) -> MatchRecord {
    let mut record = current.unwrap_or(MatchRecord {
        id: match_id.clone(),
        status: MatchStatus::Waiting,
        started_at: None,
        finished_at: None,
        updated_at: at,
    });
    record.status = status;
    record.updated_at = at;
    match status {
        MatchStatus::Waiting => {}
        MatchStatus::InProgress => {
            record.started_at.get_or_insert(at);
        }
        MatchStatus::Finished => {
            record.finished_at.get_or_insert(at);
        }
    }
    record
}
