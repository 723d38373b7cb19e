//! Game loop of one player
//!
//! [`Game`] owns the simulation and is driven from outside: the driver calls
//! [`Game::update`] every frame with the current time and forwards inputs to
//! [`Game::handle`]. Both return the [`GameEvent`]s the driver has to act on
//! (publish a snapshot, send an attack, finish the match).

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::attack::AttackQueue;
use crate::state::PlayerSnapshot;
use crate::tetris::{Action, LockOutcome, StepResult, Tetris};
use crate::visibility::CatchUp;

/// Most gravity ticks replayed in one update after the game was hidden
pub const DEFAULT_CATCH_UP_BATCH: u32 = 50;

#[derive(Debug, Clone)]
pub struct GameConfig {
    /// Seed of the piece and garbage generator; random when unset
    pub seed: Option<u64>,
    pub catch_up_batch: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: None,
            catch_up_batch: DEFAULT_CATCH_UP_BATCH,
        }
    }
}

impl GameConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_catch_up_batch(mut self, batch: u32) -> Self {
        self.catch_up_batch = batch.max(1);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameEvent {
    /// Board, pieces or progression changed; worth publishing
    StateChanged,
    /// Lines to send to the opponent
    AttackOut(u32),
    /// The game just ended; reported once
    GameOver,
}

pub struct Game {
    tetris: Tetris,
    attacks: AttackQueue,
    catch_up: CatchUp,
    last_drop: Option<u64>,
    config: GameConfig,
    over_reported: bool,
}

impl Game {
    pub fn new(config: GameConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self {
            tetris: Tetris::new(rng),
            attacks: AttackQueue::default(),
            catch_up: CatchUp::default(),
            last_drop: None,
            config,
            over_reported: false,
        }
    }

    pub fn tetris(&self) -> &Tetris {
        &self.tetris
    }

    pub fn is_game_over(&self) -> bool {
        self.tetris.is_game_over()
    }

    pub fn is_hidden(&self) -> bool {
        self.catch_up.is_hidden()
    }

    pub fn pending_attack(&self) -> u32 {
        self.attacks.pending()
    }

    pub fn pending_catch_up(&self) -> u32 {
        self.catch_up.pending()
    }

    pub fn snapshot(&self) -> PlayerSnapshot {
        self.tetris.snapshot()
    }

    /// Advance the simulation to `now_ms`
    ///
    /// Nothing happens while hidden. Owed catch-up ticks take precedence
    /// over regular gravity and incoming garbage for that frame.
    pub fn update(&mut self, now_ms: u64) -> Vec<GameEvent> {
        let mut events = Vec::new();
        if self.tetris.is_game_over() || self.catch_up.is_hidden() {
            return events;
        }
        let last_drop = *self.last_drop.get_or_insert(now_ms);

        if self.catch_up.pending() > 0 {
            let ticks = self.catch_up.take_batch(self.config.catch_up_batch);
            for _ in 0..ticks {
                if self.tetris.is_game_over() {
                    break;
                }
                self.gravity(&mut events);
            }
            self.last_drop = Some(now_ms);
            events.push(GameEvent::StateChanged);
            self.check_game_over(&mut events);
            return events;
        }

        if now_ms.saturating_sub(last_drop) > self.tetris.drop_interval_ms() {
            self.gravity(&mut events);
            self.last_drop = Some(now_ms);
        }

        if !self.tetris.is_game_over() && self.attacks.pop_unit() {
            self.tetris.inject_penalty(1);
            events.push(GameEvent::StateChanged);
        }
        self.check_game_over(&mut events);
        events
    }

    /// Apply a player input
    pub fn handle(&mut self, action: Action) -> Vec<GameEvent> {
        let mut events = Vec::new();
        match self.tetris.apply(action) {
            StepResult::ActionPerformed(_, true) => events.push(GameEvent::StateChanged),
            StepResult::ActionPerformed(_, false) | StepResult::GameOver => {}
            StepResult::Locked(outcome) => self.on_lock(outcome, &mut events),
        }
        self.check_game_over(&mut events);
        events
    }

    /// Queue penalty lines from the opponent
    pub fn receive_attack(&mut self, lines: u32) {
        if lines > 0 {
            tracing::debug!("Queued {} incoming lines", lines);
            self.attacks.push(lines);
        }
    }

    pub fn on_hidden(&mut self, now_ms: u64) {
        self.catch_up.on_hidden(now_ms);
    }

    pub fn on_visible(&mut self, now_ms: u64) {
        self.catch_up
            .on_visible(now_ms, self.tetris.drop_interval_ms());
    }

    // Gravity moves alone aren't reported; locks are
    fn gravity(&mut self, events: &mut Vec<GameEvent>) {
        if let Some(outcome) = self.tetris.soft_drop() {
            self.on_lock(outcome, events);
        }
    }

    fn on_lock(&mut self, outcome: LockOutcome, events: &mut Vec<GameEvent>) {
        events.push(GameEvent::StateChanged);
        if outcome.attack > 0 {
            events.push(GameEvent::AttackOut(outcome.attack));
        }
    }

    fn check_game_over(&mut self, events: &mut Vec<GameEvent>) {
        if self.tetris.is_game_over() && !self.over_reported {
            self.over_reported = true;
            let progression = self.tetris.progression();
            tracing::info!(
                "Game over: score {}, level {}, lines {}",
                progression.score,
                progression.level,
                progression.lines
            );
            events.push(GameEvent::GameOver);
        }
    }
}
