use match_sync::SnapshotPayload;
use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::piece::{FallingPiece, Tetromino};
use crate::scoring::Progression;

/// Everything the opponent needs to draw one player's side
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub board: Board,
    pub current: FallingPiece,
    pub next: Tetromino,
    pub hold: Option<Tetromino>,
    pub progression: Progression,
    pub game_over: bool,
}

impl SnapshotPayload for PlayerSnapshot {
    fn is_game_over(&self) -> bool {
        self.game_over
    }
}
