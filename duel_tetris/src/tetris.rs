use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::attack::attack_lines;
use crate::board::{BOARD_HEIGHT, BOARD_WIDTH, Board};
use crate::piece::{FallingPiece, Tetromino, TetrominoType};
use crate::scoring::Progression;
use crate::state::PlayerSnapshot;

// Horizontal offsets tried, in order, when a rotation collides in place
const ROTATION_KICKS: [i32; 4] = [-1, 1, -2, 2];

// Enum with all possible user actions
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum Action {
    MoveLeft,
    MoveRight,
    SoftDrop,
    Rotate,
    HardDrop,
    Hold,
}

/// What a lock did
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default)]
pub struct LockOutcome {
    pub cleared: usize,
    /// Lines to send to the opponent
    pub attack: u32,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum StepResult {
    // Action was performed (or rejected) without locking
    ActionPerformed(Action, bool),
    // The falling piece locked and the next one spawned
    Locked(LockOutcome),
    // Game over, nothing happens anymore
    GameOver,
}

/// One player's board, pieces and progression
pub struct Tetris {
    board: Board,
    current: FallingPiece,
    next: Tetromino,
    hold: Option<Tetromino>,
    // Set by a hold, cleared by the next spawn
    hold_used: bool,
    progression: Progression,
    game_over: bool,
    rng: StdRng,
}

impl Tetris {
    pub fn new(rng: StdRng) -> Self {
        Self::with_board(Board::new(BOARD_WIDTH, BOARD_HEIGHT), rng)
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Start on a prepared board; the first piece spawns right away
    pub fn with_board(board: Board, mut rng: StdRng) -> Self {
        let first = Tetromino::random(&mut rng);
        let next = Tetromino::random(&mut rng);
        let current = FallingPiece::spawn(first, board.width());
        let game_over = board.collides(&current, 0, 0);
        Tetris {
            board,
            current,
            next,
            hold: None,
            hold_used: false,
            progression: Progression::default(),
            game_over,
            rng,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn current(&self) -> &FallingPiece {
        &self.current
    }

    pub fn next(&self) -> &Tetromino {
        &self.next
    }

    pub fn hold_piece(&self) -> Option<&Tetromino> {
        self.hold.as_ref()
    }

    pub fn progression(&self) -> &Progression {
        &self.progression
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over
    }

    pub fn drop_interval_ms(&self) -> u64 {
        self.progression.drop_interval_ms()
    }

    /// Dispatch a user action
    pub fn apply(&mut self, action: Action) -> StepResult {
        if self.game_over {
            return StepResult::GameOver;
        }
        let result = match action {
            Action::MoveLeft => StepResult::ActionPerformed(action, self.move_piece(-1, 0)),
            Action::MoveRight => StepResult::ActionPerformed(action, self.move_piece(1, 0)),
            Action::Rotate => StepResult::ActionPerformed(action, self.rotate()),
            Action::Hold => StepResult::ActionPerformed(action, self.hold()),
            Action::SoftDrop => match self.soft_drop() {
                Some(outcome) => StepResult::Locked(outcome),
                None => StepResult::ActionPerformed(action, true),
            },
            Action::HardDrop => match self.hard_drop() {
                Some(outcome) => StepResult::Locked(outcome),
                None => StepResult::GameOver,
            },
        };
        if self.game_over {
            tracing::debug!("Topped out at {} points", self.progression.score);
        }
        result
    }

    // Next becomes falling, a fresh next is drawn. Collision at spawn ends the game
    pub fn spawn(&mut self) {
        let fresh = Tetromino::random(&mut self.rng);
        let tetromino = std::mem::replace(&mut self.next, fresh);
        self.current = FallingPiece::spawn(tetromino, self.board.width());
        self.hold_used = false;
        if self.board.collides(&self.current, 0, 0) {
            // the blocked piece stays where it spawned
            self.game_over = true;
        }
    }

    // Translate current piece if it doesn't collide
    pub fn move_piece(&mut self, dx: i32, dy: i32) -> bool {
        if self.game_over || self.board.collides(&self.current, dx, dy) {
            return false;
        }
        self.current.x += dx;
        self.current.y += dy;
        true
    }

    // Rotate clockwise, trying wall kicks before giving up
    pub fn rotate(&mut self) -> bool {
        if self.game_over || self.current.tetromino.kind() == TetrominoType::O {
            return false;
        }
        let old_shape = self.current.shape().clone();
        let old_x = self.current.x;
        self.current.set_shape(old_shape.rotated_clockwise());
        if !self.board.collides(&self.current, 0, 0) {
            return true;
        }
        for kick in ROTATION_KICKS {
            self.current.x = old_x + kick;
            if !self.board.collides(&self.current, 0, 0) {
                return true;
            }
        }
        self.current.set_shape(old_shape);
        self.current.x = old_x;
        false
    }

    /// One row down, or lock if blocked. Gravity uses this too
    pub fn soft_drop(&mut self) -> Option<LockOutcome> {
        if self.game_over {
            return None;
        }
        if self.move_piece(0, 1) {
            return None;
        }
        Some(self.lock())
    }

    /// Drop to the floor and lock at once
    pub fn hard_drop(&mut self) -> Option<LockOutcome> {
        if self.game_over {
            return None;
        }
        while self.move_piece(0, 1) {}
        Some(self.lock())
    }

    // Place, clear, score, compute attack, spawn
    fn lock(&mut self) -> LockOutcome {
        self.board.place(&self.current);
        let cleared = self.board.clear_full_lines();
        self.progression.record_lock(cleared);
        let attack = attack_lines(cleared, self.progression.combo);
        self.spawn();
        LockOutcome { cleared, attack }
    }

    /// Stash the falling piece, at most once per spawn
    pub fn hold(&mut self) -> bool {
        if self.hold_used || self.game_over {
            return false;
        }
        // keeps the rotation it had, loses the position
        let stashed = self.current.tetromino.clone();
        match self.hold.replace(stashed) {
            None => self.spawn(),
            Some(held) => {
                self.current = FallingPiece::spawn(held, self.board.width());
                if self.board.collides(&self.current, 0, 0) {
                    self.game_over = true;
                }
            }
        }
        self.hold_used = true;
        true
    }

    /// Where the falling piece would land
    pub fn ghost(&self) -> Option<FallingPiece> {
        if self.game_over {
            return None;
        }
        let mut ghost = self.current.clone();
        while !self.board.collides(&ghost, 0, 1) {
            ghost.y += 1;
        }
        Some(ghost)
    }

    /// Push incoming penalty rows in from the bottom
    pub fn inject_penalty(&mut self, count: usize) {
        if self.game_over {
            return;
        }
        self.board.inject_penalty_lines(count, &mut self.rng);
    }

    // get game state for publishing
    pub fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            board: self.board.clone(),
            current: self.current.clone(),
            next: self.next.clone(),
            hold: self.hold.clone(),
            progression: self.progression,
            game_over: self.game_over,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::{CellType, Shape};

    fn tetris_with(kind: TetrominoType) -> Tetris {
        let mut tetris = Tetris::with_seed(11);
        tetris.current = FallingPiece::spawn(Tetromino::new(kind), BOARD_WIDTH);
        tetris
    }

    #[test]
    fn test_spawn_then_move_left_to_wall() {
        let mut tetris = tetris_with(TetrominoType::T);
        assert_eq!(tetris.current().x, 3);
        for _ in 0..3 {
            assert!(tetris.move_piece(-1, 0));
        }
        assert_eq!(tetris.current().x, 0);
        assert!(!tetris.move_piece(-1, 0));
        assert_eq!(tetris.current().x, 0);
    }

    #[test]
    fn test_rotation_kick_left() {
        let mut tetris = tetris_with(TetrominoType::T);
        tetris.current.y = 5;
        tetris.current.x = 7;
        // rotated T is [[1,0],[1,1],[1,0]]; block the column it would take at x=7
        tetris.board.set_cell(7, 5, CellType::Red);
        let rotated = TetrominoType::T.base_shape().rotated_clockwise();
        // in place it hits (7,5); one to the left is free
        assert!(tetris.rotate());
        assert_eq!(tetris.current().x, 6);
        assert_eq!(tetris.current().shape(), &rotated);
    }

    #[test]
    fn test_rotation_reverts_when_all_kicks_fail() {
        let mut tetris = tetris_with(TetrominoType::I);
        tetris.current.y = 10;
        // a vertical I needs 4 free rows; fill every column below row 11
        for y in 11..BOARD_HEIGHT {
            for x in 0..BOARD_WIDTH {
                if y != 19 || x != 0 {
                    tetris.board.set_cell(x, y, CellType::Garbage);
                }
            }
        }
        let before = tetris.current().clone();
        assert!(!tetris.rotate());
        assert_eq!(tetris.current(), &before);
    }

    #[test]
    fn test_o_never_rotates() {
        let mut tetris = tetris_with(TetrominoType::O);
        assert!(!tetris.rotate());
        assert_eq!(tetris.current().shape(), &TetrominoType::O.base_shape());
    }

    #[test]
    fn test_second_hold_is_noop() {
        let mut tetris = tetris_with(TetrominoType::S);
        let next = tetris.next().clone();
        assert!(tetris.hold());
        assert_eq!(tetris.hold_piece().map(|t| t.kind()), Some(TetrominoType::S));
        assert_eq!(tetris.current().tetromino, next);
        let before = tetris.current().clone();
        assert!(!tetris.hold());
        assert_eq!(tetris.current(), &before);
        assert_eq!(tetris.hold_piece().map(|t| t.kind()), Some(TetrominoType::S));
    }

    #[test]
    fn test_hold_swap_recenters_and_keeps_rotation() {
        let mut tetris = tetris_with(TetrominoType::L);
        assert!(tetris.rotate());
        let rotated: Shape = tetris.current().shape().clone();
        tetris.hold();
        // lock something so hold becomes available again
        tetris.hard_drop();
        assert!(tetris.hold());
        assert_eq!(tetris.current().tetromino.kind(), TetrominoType::L);
        assert_eq!(tetris.current().shape(), &rotated);
        assert_eq!(tetris.current().x, ((BOARD_WIDTH - rotated.width()) / 2) as i32);
        assert_eq!(tetris.current().y, 0);
    }

    #[test]
    fn test_hard_drop_locks_at_floor() {
        let mut tetris = tetris_with(TetrominoType::I);
        let outcome = tetris.hard_drop().unwrap();
        assert_eq!(outcome, LockOutcome { cleared: 0, attack: 0 });
        for x in 3..7 {
            assert_eq!(tetris.board().cell(x, 19), CellType::Cyan);
        }
        assert_eq!(tetris.current().y, 0);
    }

    #[test]
    fn test_soft_drop_locks_when_blocked() {
        let mut tetris = tetris_with(TetrominoType::O);
        tetris.current.y = 18;
        assert_eq!(tetris.soft_drop().map(|o| o.cleared), Some(0));
        assert_eq!(tetris.board().cell(4, 19), CellType::Yellow);
    }

    #[test]
    fn test_clearing_two_lines_attacks_one() {
        let mut tetris = tetris_with(TetrominoType::O);
        for y in 18..20 {
            for x in 0..BOARD_WIDTH {
                if x != 4 && x != 5 {
                    tetris.board.set_cell(x, y, CellType::Blue);
                }
            }
        }
        let outcome = tetris.hard_drop().unwrap();
        assert_eq!(outcome, LockOutcome { cleared: 2, attack: 1 });
        assert_eq!(tetris.progression().score, 200);
        assert_eq!(tetris.progression().combo, 1);
    }

    #[test]
    fn test_spawn_collision_ends_game_and_blocks_actions() {
        let mut tetris = tetris_with(TetrominoType::T);
        for x in 0..BOARD_WIDTH {
            tetris.board.set_cell(x, 1, CellType::Garbage);
        }
        tetris.next = Tetromino::new(TetrominoType::T);
        tetris.spawn();
        assert!(tetris.is_game_over());
        assert_eq!(tetris.apply(Action::MoveLeft), StepResult::GameOver);
        assert!(!tetris.hold());
        assert!(tetris.hard_drop().is_none());
        assert!(tetris.snapshot().game_over);
        assert!(tetris.ghost().is_none());
    }

    #[test]
    fn test_ghost_lands_on_stack() {
        let mut tetris = tetris_with(TetrominoType::O);
        tetris.board.set_cell(4, 15, CellType::Red);
        let ghost = tetris.ghost().unwrap();
        assert_eq!(ghost.y, 13);
        assert_eq!(ghost.x, tetris.current().x);
    }
}
