//! Store adapter over zenoh pub/sub and queries
//!
//! ## Protocol Overview
//!
//! There is no central database. Every peer:
//!
//! 1. Keeps the rows it authored in a local table keyed by their keyexpr
//!    (see [`StoreKeyexpr`]).
//! 2. Announces each write with a `put` on that keyexpr, which feeds the
//!    push subscriptions of the other peers.
//! 3. Declares a single queryable on `<prefix>/**` that replies with every
//!    local row whose keyexpr intersects the incoming query.
//!
//! Reads are `get` queries; when several replies arrive for the same row the
//! newest `updated_at` wins. Payloads are JSON strings carried through
//! `zenoh_ext` serialization.
//!
//! The processed flag of an attack only matters to its receiver, so it is
//! kept in a local set of the receiving peer instead of being written back.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::task::JoinHandle;
use zenoh::key_expr::KeyExpr;
use zenoh::query::ConsolidationMode;

use crate::error::{Result, SyncError};
use crate::network::keyexpr::{StoreKey, StoreKeyexpr};
use crate::store::{MatchStore, next_match_record};
use crate::types::{
    AttackRecord, MatchId, MatchRecord, MatchStatus, PlayerRecord, PlayerSlot, RowId, ScoreRecord,
    SnapshotPayload, SnapshotRow,
};

/// A row authored by this peer
#[derive(Debug, Clone)]
struct LocalRow {
    keyexpr: KeyExpr<'static>,
    /// Id of the row, for tables whose rows carry one
    id: Option<RowId>,
    json: String,
}

type LocalRows = Arc<Mutex<HashMap<String, LocalRow>>>;

/// [`MatchStore`] backed by a zenoh session
pub struct ZenohStore<S> {
    session: zenoh::Session,
    prefix: KeyExpr<'static>,
    rows: LocalRows,
    processed: Mutex<HashSet<RowId>>,
    server: JoinHandle<()>,
    forwarders: Mutex<Vec<JoinHandle<()>>>,
    _phantom: std::marker::PhantomData<fn() -> S>,
}

impl<S> std::fmt::Debug for ZenohStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ZenohStore")
            .field("prefix", &self.prefix)
            .field("payload", &std::any::type_name::<S>())
            .finish()
    }
}

fn encode<T: Serialize>(value: &T) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn decode<T: DeserializeOwned>(payload: &zenoh::bytes::ZBytes) -> Result<T> {
    let json: String = zenoh_ext::z_deserialize(payload)
        .map_err(|e| SyncError::Serialization(format!("Failed to deserialize: {}", e)))?;
    Ok(serde_json::from_str(&json)?)
}

/// Keep only the newest of possibly several replies for the same row
fn newest<T>(rows: Vec<T>, updated_at: impl Fn(&T) -> u64) -> Option<T> {
    rows.into_iter().max_by_key(|row| updated_at(row))
}

impl<S: SnapshotPayload> ZenohStore<S> {
    /// Declare the queryable serving this peer's rows under `prefix`
    pub async fn new(session: zenoh::Session, prefix: impl Into<KeyExpr<'static>>) -> Result<Self> {
        let prefix = prefix.into();
        let server_keyexpr = KeyExpr::try_from(format!("{}/**", prefix))
            .map_err(|e| SyncError::InvalidKeyexpr(e.to_string()))?;
        let queryable = session.declare_queryable(&server_keyexpr).await?;
        let rows: LocalRows = Arc::new(Mutex::new(HashMap::new()));

        let served = rows.clone();
        let server = tokio::spawn(async move {
            while let Ok(query) = queryable.recv_async().await {
                // Collect before replying, the lock can't be held across await
                let matching: Vec<LocalRow> = match served.lock() {
                    Ok(rows) => rows
                        .values()
                        .filter(|row| query.key_expr().intersects(&row.keyexpr))
                        .cloned()
                        .collect(),
                    Err(_) => Vec::new(),
                };
                tracing::debug!(
                    "Query '{}' matched {} local row(s)",
                    query.key_expr(),
                    matching.len()
                );
                for row in matching {
                    if let Err(e) = query
                        .reply(&row.keyexpr, zenoh_ext::z_serialize(&row.json))
                        .await
                    {
                        tracing::debug!("Failed to reply to query: {}", e);
                    }
                }
            }
            tracing::debug!("Store queryable closed");
        });

        tracing::info!("Zenoh store serving rows under '{}'", prefix);

        Ok(Self {
            session,
            prefix,
            rows,
            processed: Mutex::new(HashSet::new()),
            server,
            forwarders: Mutex::new(Vec::new()),
            _phantom: std::marker::PhantomData,
        })
    }

    fn keyexpr(&self, key: StoreKey) -> Result<KeyExpr<'static>> {
        StoreKeyexpr::new(&self.prefix, key).to_keyexpr()
    }

    fn local_rows(&self) -> Result<MutexGuard<'_, HashMap<String, LocalRow>>> {
        self.rows
            .lock()
            .map_err(|_| SyncError::Internal("row table lock poisoned".to_string()))
    }

    /// Record a row locally and announce it
    async fn write<T: Serialize>(&self, key: StoreKey, id: Option<RowId>, value: &T) -> Result<()> {
        let keyexpr = self.keyexpr(key)?;
        let json = encode(value)?;
        self.local_rows()?.insert(
            keyexpr.to_string(),
            LocalRow {
                keyexpr: keyexpr.clone(),
                id,
                json: json.clone(),
            },
        );
        self.session
            .put(keyexpr, zenoh_ext::z_serialize(&json))
            .await?;
        Ok(())
    }

    /// Query every row matching `key`, from all peers including this one
    async fn fetch<T: DeserializeOwned>(&self, key: StoreKey) -> Result<Vec<T>> {
        let keyexpr = self.keyexpr(key)?;
        // Every peer replies on the same key for shared rows; keep all of
        // them so `newest` sees each version
        let replies = self
            .session
            .get(keyexpr)
            .consolidation(ConsolidationMode::None)
            .await?;
        let mut rows = Vec::new();
        while let Ok(reply) = replies.recv_async().await {
            match reply.result() {
                Ok(sample) => match decode::<T>(sample.payload()) {
                    Ok(row) => rows.push(row),
                    Err(e) => tracing::debug!("Dropping reply on '{}': {}", sample.key_expr(), e),
                },
                Err(e) => tracing::debug!("Query reply error: {:?}", e),
            }
        }
        Ok(rows)
    }

    /// Forward decoded samples on `key` into a flume channel until either side closes
    async fn subscribe<T: DeserializeOwned + Send + 'static>(
        &self,
        key: StoreKey,
        keep: impl Fn(&T) -> bool + Send + 'static,
    ) -> Result<flume::Receiver<T>> {
        let keyexpr = self.keyexpr(key)?;
        let subscriber = self.session.declare_subscriber(keyexpr).await?;
        let (tx, rx) = flume::unbounded();
        let handle = tokio::spawn(async move {
            while let Ok(sample) = subscriber.recv_async().await {
                let value = match decode::<T>(sample.payload()) {
                    Ok(value) => value,
                    Err(e) => {
                        tracing::debug!("Dropping sample on '{}': {}", sample.key_expr(), e);
                        continue;
                    }
                };
                if keep(&value) && tx.send_async(value).await.is_err() {
                    break;
                }
            }
        });
        self.forwarders
            .lock()
            .map_err(|_| SyncError::Internal("forwarder list lock poisoned".to_string()))?
            .push(handle);
        Ok(rx)
    }

    fn is_processed(&self, id: &RowId) -> bool {
        self.processed
            .lock()
            .map(|set| set.contains(id))
            .unwrap_or(false)
    }
}

impl<S> Drop for ZenohStore<S> {
    fn drop(&mut self) {
        self.server.abort();
        if let Ok(forwarders) = self.forwarders.lock() {
            for handle in forwarders.iter() {
                handle.abort();
            }
        }
    }
}

impl<S: SnapshotPayload> MatchStore<S> for ZenohStore<S> {
    async fn find_snapshot(&self, match_id: &MatchId, slot: PlayerSlot) -> Result<Option<RowId>> {
        let keyexpr = self.keyexpr(StoreKey::Snapshot {
            match_id: match_id.clone(),
            slot: Some(slot),
        })?;
        let authored = self
            .local_rows()?
            .get(keyexpr.as_str())
            .and_then(|row| row.id.clone());
        if authored.is_some() {
            return Ok(authored);
        }
        Ok(self.latest_snapshot(match_id, slot).await?.map(|row| row.id))
    }

    async fn insert_snapshot(&self, row: SnapshotRow<S>) -> Result<RowId> {
        let id = row.id.clone();
        let key = StoreKey::Snapshot {
            match_id: row.match_id.clone(),
            slot: Some(row.slot),
        };
        self.write(key, Some(id.clone()), &row).await?;
        Ok(id)
    }

    async fn update_snapshot(&self, id: &RowId, payload: S, updated_at: u64) -> Result<()> {
        let json = self
            .local_rows()?
            .values()
            .find(|row| row.id.as_ref() == Some(id))
            .map(|row| row.json.clone())
            .ok_or_else(|| SyncError::RowNotFound(format!("snapshot {}", id)))?;
        let mut row: SnapshotRow<S> = serde_json::from_str(&json)?;
        row.payload = payload;
        row.updated_at = updated_at;
        let key = StoreKey::Snapshot {
            match_id: row.match_id.clone(),
            slot: Some(row.slot),
        };
        self.write(key, Some(id.clone()), &row).await
    }

    async fn latest_snapshot(
        &self,
        match_id: &MatchId,
        slot: PlayerSlot,
    ) -> Result<Option<SnapshotRow<S>>> {
        let rows: Vec<SnapshotRow<S>> = self
            .fetch(StoreKey::Snapshot {
                match_id: match_id.clone(),
                slot: Some(slot),
            })
            .await?;
        Ok(newest(rows, |row| row.updated_at))
    }

    async fn subscribe_snapshots(&self, match_id: &MatchId) -> Result<flume::Receiver<SnapshotRow<S>>> {
        let expected = match_id.clone();
        self.subscribe(
            StoreKey::Snapshot {
                match_id: match_id.clone(),
                slot: None,
            },
            move |row: &SnapshotRow<S>| row.match_id == expected,
        )
        .await
    }

    async fn insert_attack(&self, record: AttackRecord) -> Result<()> {
        let key = StoreKey::Attack {
            match_id: record.match_id.clone(),
            to: Some(record.to),
            id: Some(record.id.clone()),
        };
        self.write(key, Some(record.id.clone()), &record).await
    }

    async fn pending_attacks(&self, match_id: &MatchId, to: PlayerSlot) -> Result<Vec<AttackRecord>> {
        let records: Vec<AttackRecord> = self
            .fetch(StoreKey::Attack {
                match_id: match_id.clone(),
                to: Some(to),
                id: None,
            })
            .await?;
        let mut seen = HashSet::new();
        Ok(records
            .into_iter()
            .filter(|a| !a.processed && !self.is_processed(&a.id))
            .filter(|a| seen.insert(a.id.clone()))
            .collect())
    }

    async fn subscribe_attacks(&self, match_id: &MatchId) -> Result<flume::Receiver<AttackRecord>> {
        let expected = match_id.clone();
        self.subscribe(
            StoreKey::Attack {
                match_id: match_id.clone(),
                to: None,
                id: None,
            },
            move |record: &AttackRecord| record.match_id == expected,
        )
        .await
    }

    async fn mark_attack_processed(&self, _match_id: &MatchId, id: &RowId) -> Result<()> {
        self.processed
            .lock()
            .map_err(|_| SyncError::Internal("processed set lock poisoned".to_string()))?
            .insert(id.clone());
        Ok(())
    }

    async fn upsert_player(&self, record: PlayerRecord) -> Result<()> {
        let key = StoreKey::Player {
            match_id: record.match_id.clone(),
            slot: Some(record.slot),
        };
        self.write(key, None, &record).await
    }

    async fn players(&self, match_id: &MatchId) -> Result<Vec<PlayerRecord>> {
        let records: Vec<PlayerRecord> = self
            .fetch(StoreKey::Player {
                match_id: match_id.clone(),
                slot: None,
            })
            .await?;
        let mut by_slot: HashMap<PlayerSlot, PlayerRecord> = HashMap::new();
        for record in records {
            match by_slot.get(&record.slot) {
                Some(existing) if existing.updated_at >= record.updated_at => {}
                _ => {
                    by_slot.insert(record.slot, record);
                }
            }
        }
        let mut players: Vec<PlayerRecord> = by_slot.into_values().collect();
        players.sort_by_key(|p| p.slot.number());
        Ok(players)
    }

    async fn match_record(&self, match_id: &MatchId) -> Result<Option<MatchRecord>> {
        let records: Vec<MatchRecord> = self
            .fetch(StoreKey::Room {
                match_id: match_id.clone(),
            })
            .await?;
        Ok(newest(records, |record| record.updated_at))
    }

    async fn set_match_status(&self, match_id: &MatchId, status: MatchStatus, at: u64) -> Result<()> {
        let current = self.match_record(match_id).await?;
        let record = next_match_record(current, match_id, status, at);
        let key = StoreKey::Room {
            match_id: match_id.clone(),
        };
        self.write(key, None, &record).await
    }

    async fn save_score(&self, record: ScoreRecord) -> Result<()> {
        let key = StoreKey::Score {
            id: Some(record.id.clone()),
        };
        self.write(key, Some(record.id.clone()), &record).await
    }
}
