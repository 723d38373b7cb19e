use std::sync::Arc;
use std::time::Duration;

use match_sync::{
    MatchId, MatchSession, MatchStore, Outcome, PlayerSlot, Result, RowId, ScoreRecord,
    SyncConfig, SyncStats, SyncUpdate, now_ms,
};

use crate::game::{Game, GameConfig, GameEvent};
use crate::input::Command;
use crate::render::{DrawCommand, FrameInput, render_frame};
use crate::state::PlayerSnapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mode {
    Single,
    Versus { match_id: MatchId, slot: PlayerSlot },
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub player_name: String,
    pub mode: Mode,
    pub game: GameConfig,
    pub sync: SyncConfig,
    /// Period of the update/render loop (in milliseconds)
    pub frame_interval_ms: u64,
}

impl EngineConfig {
    pub fn new(player_name: impl Into<String>) -> Self {
        Self {
            player_name: player_name.into(),
            mode: Mode::Single,
            game: GameConfig::default(),
            sync: SyncConfig::default(),
            frame_interval_ms: 16,
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_game(mut self, game: GameConfig) -> Self {
        self.game = game;
        self
    }

    pub fn with_sync(mut self, sync: SyncConfig) -> Self {
        self.sync = sync;
        self
    }

    pub fn with_frame_interval_ms(mut self, interval_ms: u64) -> Self {
        self.frame_interval_ms = interval_ms.max(1);
        self
    }
}

/// What the front-end gets from a running engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Frame(Vec<DrawCommand>),
    /// Drawing is paused until visibility is toggled back
    Hidden,
    Status(String),
}

#[derive(Debug, Clone)]
pub enum EngineResult {
    /// Single-player game ended; the score was saved
    Single(ScoreRecord),
    /// Own side of a match ended
    Versus { outcome: Outcome, stats: SyncStats },
    /// The player quit before the game was over
    Quit,
}

/// Drives one player's game against a store
pub struct TetrisEngine<St: MatchStore<PlayerSnapshot>> {
    store: Arc<St>,
    config: EngineConfig,
}

impl<St: MatchStore<PlayerSnapshot>> TetrisEngine<St> {
    pub fn new(store: Arc<St>, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// Run until game over or quit
    ///
    /// In a match, the player joins, waits for the opponent and then plays
    /// while snapshots and attacks flow through the session.
    pub async fn run(
        self,
        commands: flume::Receiver<Command>,
        events: flume::Sender<EngineEvent>,
    ) -> Result<EngineResult> {
        let mut session = match &self.config.mode {
            Mode::Single => None,
            Mode::Versus { match_id, slot } => {
                let mut session = MatchSession::start(
                    self.store.clone(),
                    match_id.clone(),
                    *slot,
                    self.config.sync.clone(),
                )
                .await?;
                session.join(&self.config.player_name).await?;
                let _ = events.send(EngineEvent::Status(format!(
                    "Waiting for opponent in match '{}'...",
                    match_id
                )));
                let started = tokio::select! {
                    started = session.wait_for_start() => Some(started),
                    _ = until_quit(&commands) => None,
                };
                match started {
                    Some(started) => started?,
                    None => {
                        tracing::info!(
                            "Player '{}' left match '{}' before it started",
                            self.config.player_name,
                            match_id
                        );
                        session.close();
                        return Ok(EngineResult::Quit);
                    }
                }
                Some(session)
            }
        };
        let opponent_name = match &session {
            Some(session) => self.opponent_name(session).await,
            None => None,
        };

        let mut game = Game::new(self.config.game.clone());
        if let Some(session) = &session {
            session.publish(game.snapshot());
        }

        let mut frame = tokio::time::interval(Duration::from_millis(self.config.frame_interval_ms));
        frame.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let outcome = loop {
            let game_events = tokio::select! {
                _ = frame.tick() => {
                    let game_events = game.update(now_ms());
                    if !game.is_hidden() {
                        let commands = self.frame(&game, session.as_ref(), opponent_name.as_deref(), None);
                        let _ = events.send(EngineEvent::Frame(commands));
                    }
                    game_events
                }
                command = commands.recv_async() => match command {
                    Ok(Command::Game(action)) => game.handle(action),
                    Ok(Command::ToggleVisibility) => {
                        if game.is_hidden() {
                            game.on_visible(now_ms());
                            tracing::debug!("Visible again, {} drops owed", game.pending_catch_up());
                        } else {
                            game.on_hidden(now_ms());
                            let _ = events.send(EngineEvent::Hidden);
                        }
                        Vec::new()
                    }
                    Ok(Command::Quit) | Err(_) => break None,
                },
                update = recv_update(&mut session) => {
                    match update {
                        Ok(SyncUpdate::Attack(lines)) => game.receive_attack(lines),
                        // kept by the session, read back when drawing
                        Ok(SyncUpdate::Opponent(_)) => {}
                        Err(e) => {
                            tracing::error!("Sync stopped: {}", e);
                            break None;
                        }
                    }
                    Vec::new()
                }
            };

            let mut over = false;
            for event in game_events {
                match event {
                    GameEvent::StateChanged => {
                        if let Some(session) = &session {
                            session.publish(game.snapshot());
                        }
                    }
                    GameEvent::AttackOut(lines) => {
                        if let Some(session) = &session {
                            tracing::debug!("Sending {} lines", lines);
                            session.send_attack(lines);
                        }
                    }
                    GameEvent::GameOver => over = true,
                }
            }
            if over {
                break Some(self.finish(&game, session.as_ref()).await);
            }
        };

        let result = match outcome {
            None => {
                tracing::info!("Player '{}' quit", self.config.player_name);
                EngineResult::Quit
            }
            Some(result) => {
                let outcome = match &result {
                    EngineResult::Versus { outcome, .. } => Some(*outcome),
                    _ => None,
                };
                let commands =
                    self.frame(&game, session.as_ref(), opponent_name.as_deref(), outcome);
                let _ = events.send(EngineEvent::Frame(commands));
                result
            }
        };
        if let Some(mut session) = session.take() {
            tracing::info!("Match '{}' stats: {}", session.match_id(), session.stats());
            session.close();
        }
        Ok(result)
    }

    async fn opponent_name(&self, session: &MatchSession<PlayerSnapshot, St>) -> Option<String> {
        match self.store.players(session.match_id()).await {
            Ok(players) => players
                .into_iter()
                .find(|p| p.slot == session.slot().opponent())
                .map(|p| p.name),
            Err(e) => {
                tracing::warn!("Failed to read players of '{}': {}", session.match_id(), e);
                None
            }
        }
    }

    async fn finish(
        &self,
        game: &Game,
        session: Option<&MatchSession<PlayerSnapshot, St>>,
    ) -> EngineResult {
        let snapshot = game.snapshot();
        let p = snapshot.progression;
        match session {
            Some(session) => {
                let record =
                    session.player_record(&self.config.player_name, p.score, p.level, p.lines);
                let outcome = session.finish(snapshot, record).await;
                EngineResult::Versus {
                    outcome,
                    stats: session.stats(),
                }
            }
            None => {
                let record = ScoreRecord {
                    id: RowId::generate(),
                    player_name: self.config.player_name.clone(),
                    score: p.score,
                    level: p.level,
                    lines: p.lines,
                    created_at: now_ms(),
                };
                match self.store.save_score(record.clone()).await {
                    Ok(()) => tracing::info!(
                        "Saved score {} of '{}'",
                        record.score,
                        record.player_name
                    ),
                    Err(e) => tracing::error!("Failed to save score: {}", e),
                }
                EngineResult::Single(record)
            }
        }
    }

    fn frame(
        &self,
        game: &Game,
        session: Option<&MatchSession<PlayerSnapshot, St>>,
        opponent_name: Option<&str>,
        outcome: Option<Outcome>,
    ) -> Vec<DrawCommand> {
        let own = game.snapshot();
        let ghost = game.tetris().ghost();
        render_frame(&FrameInput {
            own: &own,
            own_name: &self.config.player_name,
            ghost: ghost.as_ref(),
            versus: session.is_some(),
            opponent: session.and_then(|s| s.opponent()),
            opponent_name,
            outcome,
        })
    }
}

// Game input before the match starts is dropped
async fn until_quit(commands: &flume::Receiver<Command>) {
    while let Ok(command) = commands.recv_async().await {
        if command == Command::Quit {
            return;
        }
    }
}

// Never resolves without a session
async fn recv_update<St: MatchStore<PlayerSnapshot>>(
    session: &mut Option<MatchSession<PlayerSnapshot, St>>,
) -> Result<SyncUpdate<PlayerSnapshot>> {
    match session {
        Some(session) => session.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::Side;
    use crate::tetris::Action;
    use match_sync::{MatchStatus, MemoryStore};

    fn fast_sync() -> SyncConfig {
        SyncConfig::new()
            .with_poll_interval_ms(20)
            .with_publish_interval_ms(50)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_single_game_saves_score() {
        let store = Arc::new(MemoryStore::<PlayerSnapshot>::new());
        let config = EngineConfig::new("solo")
            .with_game(GameConfig::new().with_seed(Some(8)))
            .with_frame_interval_ms(5);
        let (command_tx, command_rx) = flume::unbounded();
        let (event_tx, event_rx) = flume::unbounded();
        for _ in 0..300 {
            command_tx.send(Command::Game(Action::HardDrop)).unwrap();
        }

        let result = TetrisEngine::new(store.clone(), config)
            .run(command_rx, event_tx)
            .await
            .unwrap();
        let EngineResult::Single(record) = result else {
            panic!("expected a single-player result, got {:?}", result);
        };
        assert_eq!(record.player_name, "solo");
        let scores = store.scores();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].id, record.id);
        assert!(event_rx.try_iter().any(|e| matches!(e, EngineEvent::Frame(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_quit_before_game_over() {
        let store = Arc::new(MemoryStore::<PlayerSnapshot>::new());
        let (command_tx, command_rx) = flume::unbounded();
        let (event_tx, _event_rx) = flume::unbounded();
        command_tx.send(Command::Game(Action::MoveLeft)).unwrap();
        command_tx.send(Command::Quit).unwrap();
        let result = TetrisEngine::new(store.clone(), EngineConfig::new("solo"))
            .run(command_rx, event_tx)
            .await
            .unwrap();
        assert!(matches!(result, EngineResult::Quit));
        assert!(store.scores().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_quit_while_waiting_for_opponent() {
        let store = Arc::new(MemoryStore::<PlayerSnapshot>::new());
        let match_id = MatchId::from_name("lonely").unwrap();
        let config = EngineConfig::new("alice")
            .with_mode(Mode::Versus {
                match_id: match_id.clone(),
                slot: PlayerSlot::One,
            })
            .with_sync(fast_sync());
        let (command_tx, command_rx) = flume::unbounded();
        let (event_tx, event_rx) = flume::unbounded();
        command_tx.send(Command::Game(Action::HardDrop)).unwrap();
        command_tx.send(Command::Quit).unwrap();

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            TetrisEngine::new(store.clone(), config).run(command_rx, event_tx),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(matches!(result, EngineResult::Quit));
        // the engine released its event sender
        assert!(event_rx.try_iter().all(|e| matches!(e, EngineEvent::Status(_))));
        assert!(event_rx.is_disconnected());

        let players = store.players(&match_id).await.unwrap();
        assert_eq!(players.len(), 1);
        let record = store.match_record(&match_id).await.unwrap().unwrap();
        assert_eq!(record.status, MatchStatus::Waiting);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_closed_input_while_waiting_for_opponent() {
        let store = Arc::new(MemoryStore::<PlayerSnapshot>::new());
        let config = EngineConfig::new("bob")
            .with_mode(Mode::Versus {
                match_id: MatchId::from_name("lonely").unwrap(),
                slot: PlayerSlot::Two,
            })
            .with_sync(fast_sync());
        let (command_tx, command_rx) = flume::unbounded::<Command>();
        let (event_tx, _event_rx) = flume::unbounded();
        drop(command_tx);

        let result = tokio::time::timeout(
            Duration::from_secs(2),
            TetrisEngine::new(store, config).run(command_rx, event_tx),
        )
        .await
        .unwrap()
        .unwrap();
        assert!(matches!(result, EngineResult::Quit));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 1)]
    async fn test_match_between_two_engines() {
        let store = Arc::new(MemoryStore::<PlayerSnapshot>::new());
        let match_id = MatchId::from_name("duel1").unwrap();
        let engine = |name: &str, slot: PlayerSlot, seed: u64| {
            TetrisEngine::new(
                store.clone(),
                EngineConfig::new(name)
                    .with_mode(Mode::Versus {
                        match_id: match_id.clone(),
                        slot,
                    })
                    .with_game(GameConfig::new().with_seed(Some(seed)))
                    .with_sync(fast_sync())
                    .with_frame_interval_ms(10),
            )
        };

        let (loser_tx, loser_rx) = flume::unbounded();
        let (loser_events_tx, _loser_events_rx) = flume::unbounded();
        let loser = tokio::spawn(engine("alice", PlayerSlot::One, 1).run(loser_rx, loser_events_tx));

        let (winner_tx, winner_rx) = flume::unbounded();
        let (winner_events_tx, winner_events_rx) = flume::unbounded();
        let winner = tokio::spawn(engine("bob", PlayerSlot::Two, 2).run(winner_rx, winner_events_tx));

        for _ in 0..300 {
            loser_tx.send(Command::Game(Action::HardDrop)).unwrap();
        }
        let result = tokio::time::timeout(Duration::from_secs(10), loser)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let EngineResult::Versus { outcome, .. } = result else {
            panic!("expected a match result, got {:?}", result);
        };
        assert_eq!(outcome, Outcome::Lose);

        // bob sees alice topped out
        let seen = tokio::time::timeout(Duration::from_secs(5), async {
            while let Ok(event) = winner_events_rx.recv_async().await {
                if let EngineEvent::Frame(commands) = event
                    && commands.contains(&DrawCommand::Banner {
                        side: Side::Opponent,
                        text: "Game Over".to_string(),
                    })
                {
                    return commands.contains(&DrawCommand::Label {
                        side: Side::Opponent,
                        text: "alice".to_string(),
                    });
                }
            }
            false
        })
        .await
        .unwrap();
        assert!(seen);

        winner_tx.send(Command::Quit).unwrap();
        let result = winner.await.unwrap().unwrap();
        assert!(matches!(result, EngineResult::Quit));

        let players = store.players(&match_id).await.unwrap();
        let alice = players.iter().find(|p| p.slot == PlayerSlot::One).unwrap();
        assert!(alice.is_game_over);
        assert_eq!(alice.name, "alice");
    }
}
