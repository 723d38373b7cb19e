//! # duel_tetris
//!
//! Falling-block puzzle game, alone or against another player.
//!
//! The simulation ([`Tetris`], [`Game`]) is pure and deterministic for a
//! given seed. [`TetrisEngine`] runs it in an async loop and, in a match,
//! syncs it with the opponent through a [`match_sync::MatchSession`].
//! Drawing goes through [`render_frame`], which the terminal front-end in
//! [`term_render`] turns into lines.

pub mod attack;
pub mod board;
pub mod engine;
pub mod game;
pub mod input;
pub mod piece;
pub mod render;
pub mod scoring;
pub mod state;
pub mod term_render;
pub mod tetris;
pub mod visibility;

pub use board::{BOARD_HEIGHT, BOARD_WIDTH, Board};
pub use engine::{EngineConfig, EngineEvent, EngineResult, Mode, TetrisEngine};
pub use game::{Game, GameConfig, GameEvent};
pub use input::{Command, GestureTracker, action_for_key_code, command_for_key};
pub use piece::{CellType, FallingPiece, Shape, Tetromino, TetrominoType};
pub use render::{DrawCommand, FrameInput, PreviewSlot, Side, render_frame};
pub use scoring::Progression;
pub use state::PlayerSnapshot;
pub use term_render::{AnsiTermStyle, GameFieldPair, PlainTermStyle, TermRender, TermStyle};
pub use tetris::{Action, LockOutcome, StepResult, Tetris};
