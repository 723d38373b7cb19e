/// Core types shared by the sync protocol and the store adapters
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Result, SyncError};

/// Identifier of a two-player match (a "room")
///
/// MatchId must be a valid single-chunk keyexpr:
/// - Non-empty UTF-8 string
/// - Cannot contain: / * $ ? # @
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MatchId(String);

impl MatchId {
    /// Create from a specific name, rejecting names that can't be a keyexpr chunk
    pub fn from_name(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        Self::validate(&name)?;
        Ok(MatchId(name))
    }

    /// Generate a fresh random match id
    pub fn generate() -> Self {
        MatchId(RowId::generate().0)
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn validate(s: &str) -> Result<()> {
        check_chunk(s).map_err(SyncError::InvalidMatchId)
    }
}

/// Check that a string can be used as a single keyexpr chunk
fn check_chunk(s: &str) -> std::result::Result<(), String> {
    if s.is_empty() {
        return Err("Identifier cannot be empty".to_string());
    }
    for ch in s.chars() {
        if matches!(ch, '/' | '*' | '$' | '?' | '#' | '@') {
            return Err(format!(
                "Identifier '{}' contains invalid character '{}'",
                s, ch
            ));
        }
    }
    Ok(())
}

impl TryFrom<String> for MatchId {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self> {
        MatchId::from_name(value)
    }
}

impl From<MatchId> for String {
    fn from(id: MatchId) -> Self {
        id.0
    }
}

impl std::fmt::Display for MatchId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One of the two player seats of a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum PlayerSlot {
    One,
    Two,
}

impl PlayerSlot {
    /// The other seat of the match
    pub fn opponent(self) -> PlayerSlot {
        match self {
            PlayerSlot::One => PlayerSlot::Two,
            PlayerSlot::Two => PlayerSlot::One,
        }
    }

    pub fn number(self) -> u8 {
        match self {
            PlayerSlot::One => 1,
            PlayerSlot::Two => 2,
        }
    }
}

impl TryFrom<u8> for PlayerSlot {
    type Error = SyncError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            1 => Ok(PlayerSlot::One),
            2 => Ok(PlayerSlot::Two),
            other => Err(SyncError::InvalidSlot(other)),
        }
    }
}

impl From<PlayerSlot> for u8 {
    fn from(slot: PlayerSlot) -> Self {
        slot.number()
    }
}

impl std::fmt::Display for PlayerSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Row identifier: a v4 uuid encoded in base58 so it stays a valid keyexpr chunk
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowId(String);

impl RowId {
    pub fn generate() -> Self {
        let uuid = uuid::Uuid::new_v4();
        RowId(bs58::encode(uuid.as_bytes()).into_string())
    }

    /// Parse an id read back from a key expression
    pub fn from_name(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        check_chunk(&name).map_err(SyncError::InvalidKeyexpr)?;
        Ok(RowId(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a match as seen by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Waiting,
    InProgress,
    Finished,
}

/// Payload published by a player as its snapshot
///
/// The protocol only needs to know whether the author has topped out;
/// everything else is opaque to it.
pub trait SnapshotPayload:
    Clone + Send + Sync + Serialize + DeserializeOwned + 'static
{
    fn is_game_over(&self) -> bool;
}

/// One row of the snapshot table, keyed by (match, slot)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRow<S> {
    pub id: RowId,
    pub match_id: MatchId,
    pub slot: PlayerSlot,
    pub payload: S,
    /// Wall-clock milliseconds since the unix epoch
    pub updated_at: u64,
}

/// Penalty lines sent from one player to the other
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackRecord {
    pub id: RowId,
    pub match_id: MatchId,
    pub from: PlayerSlot,
    pub to: PlayerSlot,
    pub lines: u32,
    pub processed: bool,
    pub created_at: u64,
}

impl AttackRecord {
    pub fn new(match_id: MatchId, from: PlayerSlot, lines: u32) -> Self {
        Self {
            id: RowId::generate(),
            match_id,
            from,
            to: from.opponent(),
            lines,
            processed: false,
            created_at: now_ms(),
        }
    }
}

/// Per-player status row of a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub match_id: MatchId,
    pub slot: PlayerSlot,
    pub name: String,
    pub score: u64,
    pub level: u32,
    pub lines: u32,
    pub is_game_over: bool,
    pub updated_at: u64,
}

/// Status row of a match
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub id: MatchId,
    pub status: MatchStatus,
    pub started_at: Option<u64>,
    pub finished_at: Option<u64>,
    pub updated_at: u64,
}

/// Final result of a single-player game
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    pub id: RowId,
    pub player_name: String,
    pub score: u64,
    pub level: u32,
    pub lines: u32,
    pub created_at: u64,
}

/// Local outcome of a match, decided at the moment of local termination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Lose,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Win => write!(f, "You Win!"),
            Outcome::Lose => write!(f, "Game Over"),
        }
    }
}

/// Wall-clock milliseconds since the unix epoch
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_id_from_name() {
        let id = MatchId::from_name("room42").unwrap();
        assert_eq!(id.as_str(), "room42");
    }

    #[test]
    fn test_match_id_invalid_characters() {
        assert!(MatchId::from_name("has/slash").is_err());
        assert!(MatchId::from_name("has*star").is_err());
        assert!(MatchId::from_name("has$dollar").is_err());
        assert!(MatchId::from_name("has?question").is_err());
        assert!(MatchId::from_name("has#hash").is_err());
        assert!(MatchId::from_name("has@at").is_err());
        assert!(MatchId::from_name("").is_err());
    }

    #[test]
    fn test_generated_ids_are_distinct_keyexpr_chunks() {
        let a = RowId::generate();
        let b = RowId::generate();
        assert_ne!(a, b);
        assert!(a.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(MatchId::from_name(MatchId::generate().as_str()).is_ok());
    }

    #[test]
    fn test_slot_opponent_and_numbers() {
        assert_eq!(PlayerSlot::One.opponent(), PlayerSlot::Two);
        assert_eq!(PlayerSlot::Two.opponent(), PlayerSlot::One);
        assert_eq!(PlayerSlot::try_from(2).unwrap(), PlayerSlot::Two);
        assert!(matches!(PlayerSlot::try_from(3), Err(SyncError::InvalidSlot(3))));
    }

    #[test]
    fn test_attack_record_targets_opponent() {
        let record = AttackRecord::new(MatchId::from_name("m").unwrap(), PlayerSlot::Two, 3);
        assert_eq!(record.to, PlayerSlot::One);
        assert!(!record.processed);
    }

    #[test]
    fn test_serde_uses_plain_values() {
        let json = serde_json::to_string(&PlayerSlot::Two).unwrap();
        assert_eq!(json, "2");
        let json = serde_json::to_string(&MatchStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        let bad: std::result::Result<MatchId, _> = serde_json::from_str("\"a/b\"");
        assert!(bad.is_err());
    }
}
