//! # match-sync
//!
//! Keeps two independently running game simulations in sync through a
//! shared store.
//!
//! ## Overview
//!
//! Each player runs its own authoritative simulation and owns one
//! [`MatchSession`]. The session publishes the player's snapshots, sends
//! attack records to the opponent, and hands back opponent snapshots and
//! incoming attacks. It never talks to a database or a network directly:
//! everything goes through the [`MatchStore`] port, injected at start.
//!
//! ## Key Features
//!
//! - Coalesced, non-blocking snapshot publishing with periodic republish
//! - Upsert guard: one snapshot row per (match, slot), even under racing writes
//! - Opponent state fed by push notifications and polling into one consumer
//! - Exactly-once intake of attack records
//! - Game-over handshake that closes the match once both players are out
//! - Two store adapters: in-memory tables and zenoh
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use match_sync::{MatchId, MatchSession, MemoryStore, PlayerSlot, SnapshotPayload, SyncConfig};
//!
//! #[derive(Clone, serde::Serialize, serde::Deserialize)]
//! struct Score(u64);
//!
//! impl SnapshotPayload for Score {
//!     fn is_game_over(&self) -> bool {
//!         false
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::<Score>::new());
//!     let match_id = MatchId::from_name("lobby1")?;
//!     let session = MatchSession::start(store, match_id, PlayerSlot::One, SyncConfig::default()).await?;
//!     session.publish(Score(100));
//!     Ok(())
//! }
//! ```

pub mod attack_inbox;
pub mod config;
pub mod error;
pub mod names;
pub mod network;
pub mod opponent;
pub mod session;
pub mod stats;
pub mod store;
pub mod types;

pub use attack_inbox::AttackInbox;
pub use config::SyncConfig;
pub use error::{Result, SyncError};
pub use names::{generate_guest_name, generate_player_name};
pub use network::ZenohStore;
pub use opponent::OpponentView;
pub use session::{MatchSession, SyncUpdate};
pub use stats::SyncStats;
pub use store::MatchStore;
pub use store::memory::MemoryStore;
pub use types::{
    AttackRecord, MatchId, MatchRecord, MatchStatus, Outcome, PlayerRecord, PlayerSlot, RowId,
    ScoreRecord, SnapshotPayload, SnapshotRow, now_ms,
};
