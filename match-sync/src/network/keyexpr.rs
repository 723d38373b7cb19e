//! Key expression layout of the zenoh store
//!
//! Every row the store knows about lives under one key:
//!
//! | Table      | Pattern                                   |
//! |------------|-------------------------------------------|
//! | snapshots  | `<prefix>/<match_id>/snapshot/<slot>`     |
//! | attacks    | `<prefix>/<match_id>/attack/<to>/<id>`    |
//! | players    | `<prefix>/<match_id>/player/<slot>`       |
//! | rooms      | `<prefix>/<match_id>/room`                |
//! | scores     | `<prefix>/scores/<id>`                    |
//!
//! `None` in a field stands for the `*` wildcard chunk, which is how
//! lookups over a whole table are expressed.

use crate::error::SyncError;
use crate::types::{MatchId, PlayerSlot, RowId};
use zenoh::key_expr::KeyExpr;

/// Which table (and which rows of it) a key designates
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreKey {
    Snapshot {
        match_id: MatchId,
        slot: Option<PlayerSlot>,
    },
    Attack {
        match_id: MatchId,
        to: Option<PlayerSlot>,
        id: Option<RowId>,
    },
    Player {
        match_id: MatchId,
        slot: Option<PlayerSlot>,
    },
    Room {
        match_id: MatchId,
    },
    Score {
        id: Option<RowId>,
    },
}

/// A [`StoreKey`] under a prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreKeyexpr {
    prefix: String,
    key: StoreKey,
}

fn chunk<T: std::fmt::Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "*".to_string())
}

fn parse_slot(s: &str) -> Result<Option<PlayerSlot>, SyncError> {
    if s == "*" {
        return Ok(None);
    }
    let number: u8 = s
        .parse()
        .map_err(|_| SyncError::InvalidKeyexpr(format!("Invalid slot chunk: {}", s)))?;
    PlayerSlot::try_from(number).map(Some)
}

fn parse_id(s: &str) -> Result<Option<RowId>, SyncError> {
    if s == "*" {
        return Ok(None);
    }
    RowId::from_name(s).map(Some)
}

impl StoreKeyexpr {
    /// Create a new StoreKeyexpr
    pub fn new(prefix: &KeyExpr, key: StoreKey) -> Self {
        Self {
            prefix: prefix.to_string(),
            key,
        }
    }

    /// Get the prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Get the designated key
    pub fn key(&self) -> &StoreKey {
        &self.key
    }

    /// Build the zenoh key expression
    pub fn to_keyexpr(&self) -> Result<KeyExpr<'static>, SyncError> {
        let keyexpr_str = self.to_string();
        KeyExpr::try_from(keyexpr_str.clone())
            .map(|k| k.into_owned())
            .map_err(|e| SyncError::InvalidKeyexpr(format!("{}: {}", keyexpr_str, e)))
    }
}

impl std::fmt::Display for StoreKeyexpr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.key {
            StoreKey::Snapshot { match_id, slot } => {
                write!(f, "{}/{}/snapshot/{}", self.prefix, match_id, chunk(slot))
            }
            StoreKey::Attack { match_id, to, id } => write!(
                f,
                "{}/{}/attack/{}/{}",
                self.prefix,
                match_id,
                chunk(to),
                chunk(id)
            ),
            StoreKey::Player { match_id, slot } => {
                write!(f, "{}/{}/player/{}", self.prefix, match_id, chunk(slot))
            }
            StoreKey::Room { match_id } => write!(f, "{}/{}/room", self.prefix, match_id),
            StoreKey::Score { id } => write!(f, "{}/scores/{}", self.prefix, chunk(id)),
        }
    }
}

impl TryFrom<&KeyExpr<'_>> for StoreKeyexpr {
    type Error = SyncError;

    fn try_from(keyexpr: &KeyExpr<'_>) -> Result<Self, Self::Error> {
        let parts: Vec<&str> = keyexpr.as_str().split('/').collect();
        let invalid =
            || SyncError::InvalidKeyexpr(format!("Invalid StoreKeyexpr pattern: {}", keyexpr.as_str()));
        let n = parts.len();

        // [...prefix]/<match_id>/attack/<to>/<id>
        if n >= 5 && parts[n - 3] == "attack" {
            let key = StoreKey::Attack {
                match_id: MatchId::from_name(parts[n - 4])?,
                to: parse_slot(parts[n - 2])?,
                id: parse_id(parts[n - 1])?,
            };
            return Ok(Self {
                prefix: parts[..n - 4].join("/"),
                key,
            });
        }
        // [...prefix]/<match_id>/snapshot/<slot> and [...prefix]/<match_id>/player/<slot>
        if n >= 4 && (parts[n - 2] == "snapshot" || parts[n - 2] == "player") {
            let match_id = MatchId::from_name(parts[n - 3])?;
            let slot = parse_slot(parts[n - 1])?;
            let key = if parts[n - 2] == "snapshot" {
                StoreKey::Snapshot { match_id, slot }
            } else {
                StoreKey::Player { match_id, slot }
            };
            return Ok(Self {
                prefix: parts[..n - 3].join("/"),
                key,
            });
        }
        // [...prefix]/<match_id>/room
        if n >= 3 && parts[n - 1] == "room" {
            return Ok(Self {
                prefix: parts[..n - 2].join("/"),
                key: StoreKey::Room {
                    match_id: MatchId::from_name(parts[n - 2])?,
                },
            });
        }
        // [...prefix]/scores/<id>
        if n >= 3 && parts[n - 2] == "scores" {
            return Ok(Self {
                prefix: parts[..n - 2].join("/"),
                key: StoreKey::Score {
                    id: parse_id(parts[n - 1])?,
                },
            });
        }
        Err(invalid())
    }
}
