//! Frame description
//!
//! [`render_frame`] turns what is currently known about both players into a
//! flat list of [`DrawCommand`]s. It keeps no state; the front-end calls it
//! again for every frame and draws the list however it likes.

use match_sync::Outcome;

use crate::piece::{CellType, FallingPiece, Tetromino};
use crate::state::PlayerSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Player,
    Opponent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreviewSlot {
    Next,
    Hold,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    /// Empty well of the given size; always precedes the cells of that side
    Well {
        side: Side,
        width: usize,
        height: usize,
    },
    Cell {
        side: Side,
        x: usize,
        y: usize,
        cell: CellType,
    },
    Ghost {
        side: Side,
        x: usize,
        y: usize,
    },
    Preview {
        side: Side,
        slot: PreviewSlot,
        x: usize,
        y: usize,
        cell: CellType,
    },
    Stats {
        side: Side,
        score: u64,
        level: u32,
        lines: u32,
        combo: u32,
    },
    Label {
        side: Side,
        text: String,
    },
    /// Text over the middle of a well
    Banner {
        side: Side,
        text: String,
    },
    /// Match-wide text
    Message(String),
}

/// Everything one frame is drawn from
pub struct FrameInput<'a> {
    pub own: &'a PlayerSnapshot,
    pub own_name: &'a str,
    pub ghost: Option<&'a FallingPiece>,
    /// Two-player frame; the opponent side is drawn even before its first snapshot
    pub versus: bool,
    pub opponent: Option<&'a PlayerSnapshot>,
    pub opponent_name: Option<&'a str>,
    pub outcome: Option<Outcome>,
}

pub fn render_frame(input: &FrameInput<'_>) -> Vec<DrawCommand> {
    let mut commands = Vec::new();
    draw_side(
        &mut commands,
        Side::Player,
        input.own,
        input.ghost,
        input.own_name,
    );
    if input.own.game_over && input.outcome.is_none() {
        commands.push(DrawCommand::Banner {
            side: Side::Player,
            text: "Game Over".to_string(),
        });
    }

    if input.versus {
        let name = input.opponent_name.unwrap_or("Opponent");
        match input.opponent {
            Some(snapshot) => {
                draw_side(&mut commands, Side::Opponent, snapshot, None, name);
                if snapshot.game_over {
                    commands.push(DrawCommand::Banner {
                        side: Side::Opponent,
                        text: "Game Over".to_string(),
                    });
                }
            }
            None => {
                let board = &input.own.board;
                commands.push(DrawCommand::Well {
                    side: Side::Opponent,
                    width: board.width(),
                    height: board.height(),
                });
                commands.push(DrawCommand::Label {
                    side: Side::Opponent,
                    text: name.to_string(),
                });
                commands.push(DrawCommand::Banner {
                    side: Side::Opponent,
                    text: "Waiting...".to_string(),
                });
            }
        }
    }

    if let Some(outcome) = input.outcome {
        commands.push(DrawCommand::Message(outcome.to_string()));
    }
    commands
}

fn draw_side(
    commands: &mut Vec<DrawCommand>,
    side: Side,
    snapshot: &PlayerSnapshot,
    ghost: Option<&FallingPiece>,
    name: &str,
) {
    let board = &snapshot.board;
    commands.push(DrawCommand::Well {
        side,
        width: board.width(),
        height: board.height(),
    });
    for (y, row) in board.rows().iter().enumerate() {
        for (x, cell) in row.iter().enumerate() {
            if !cell.is_empty() {
                commands.push(DrawCommand::Cell {
                    side,
                    x,
                    y,
                    cell: *cell,
                });
            }
        }
    }

    let current = &snapshot.current;
    // a ghost at the piece's own height would only hide it
    if let Some(ghost) = ghost.filter(|g| g.y > current.y) {
        for (x, y) in visible_cells(ghost, board.width(), board.height()) {
            commands.push(DrawCommand::Ghost { side, x, y });
        }
    }
    let color = current.color();
    for (x, y) in visible_cells(current, board.width(), board.height()) {
        commands.push(DrawCommand::Cell {
            side,
            x,
            y,
            cell: color,
        });
    }

    draw_preview(commands, side, PreviewSlot::Next, Some(&snapshot.next));
    draw_preview(commands, side, PreviewSlot::Hold, snapshot.hold.as_ref());

    let p = snapshot.progression;
    commands.push(DrawCommand::Stats {
        side,
        score: p.score,
        level: p.level,
        lines: p.lines,
        combo: p.combo,
    });
    commands.push(DrawCommand::Label {
        side,
        text: name.to_string(),
    });
}

fn draw_preview(
    commands: &mut Vec<DrawCommand>,
    side: Side,
    slot: PreviewSlot,
    tetromino: Option<&Tetromino>,
) {
    let Some(tetromino) = tetromino else {
        return;
    };
    let cell = tetromino.color();
    for (x, y) in tetromino.shape().filled_cells() {
        commands.push(DrawCommand::Preview {
            side,
            slot,
            x,
            y,
            cell,
        });
    }
}

fn visible_cells(
    piece: &FallingPiece,
    width: usize,
    height: usize,
) -> impl Iterator<Item = (usize, usize)> + '_ {
    piece
        .cells(0, 0)
        .filter(move |&(x, y)| x >= 0 && y >= 0 && (x as usize) < width && (y as usize) < height)
        .map(|(x, y)| (x as usize, y as usize))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::piece::TetrominoType;
    use crate::tetris::Tetris;

    fn ghosts(commands: &[DrawCommand]) -> usize {
        commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Ghost { .. }))
            .count()
    }

    fn frame<'a>(own: &'a PlayerSnapshot, ghost: Option<&'a FallingPiece>) -> FrameInput<'a> {
        FrameInput {
            own,
            own_name: "me",
            ghost,
            versus: false,
            opponent: None,
            opponent_name: None,
            outcome: None,
        }
    }

    #[test]
    fn test_ghost_drawn_below_piece() {
        let tetris = Tetris::with_seed(9);
        let snapshot = tetris.snapshot();
        let ghost = tetris.ghost();
        let commands = render_frame(&frame(&snapshot, ghost.as_ref()));
        assert_eq!(ghosts(&commands), 4);
        assert!(commands.contains(&DrawCommand::Stats {
            side: Side::Player,
            score: 0,
            level: 1,
            lines: 0,
            combo: 0
        }));
    }

    #[test]
    fn test_ghost_hidden_when_piece_is_landed() {
        let tetris = Tetris::with_seed(9);
        let mut snapshot = tetris.snapshot();
        let ghost = tetris.ghost().unwrap();
        snapshot.current = ghost.clone();
        let commands = render_frame(&frame(&snapshot, Some(&ghost)));
        assert_eq!(ghosts(&commands), 0);
    }

    #[test]
    fn test_piece_cells_and_previews() {
        let tetris = Tetris::with_seed(1);
        let snapshot = tetris.snapshot();
        let commands = render_frame(&frame(&snapshot, None));
        let color = snapshot.current.color();
        let piece_cells = commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Cell { side: Side::Player, cell, .. } if *cell == color))
            .count();
        assert_eq!(piece_cells, 4);
        let next = commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Preview { slot: PreviewSlot::Next, .. }))
            .count();
        assert_eq!(next, 4);
        assert!(!commands
            .iter()
            .any(|c| matches!(c, DrawCommand::Preview { slot: PreviewSlot::Hold, .. })));
        assert!(!commands.iter().any(|c| matches!(c, DrawCommand::Well { side: Side::Opponent, .. })));
    }

    #[test]
    fn test_versus_frame_waiting_then_outcome() {
        let own = Tetris::with_seed(3).snapshot();
        let mut input = frame(&own, None);
        input.versus = true;
        let commands = render_frame(&input);
        assert!(commands.contains(&DrawCommand::Banner {
            side: Side::Opponent,
            text: "Waiting...".to_string()
        }));

        let mut opponent = Tetris::with_seed(4).snapshot();
        opponent.game_over = true;
        opponent.current = FallingPiece::spawn(Tetromino::new(TetrominoType::O), 10);
        input.opponent = Some(&opponent);
        input.outcome = Some(Outcome::Win);
        let commands = render_frame(&input);
        assert!(commands.contains(&DrawCommand::Banner {
            side: Side::Opponent,
            text: "Game Over".to_string()
        }));
        assert_eq!(commands.last(), Some(&DrawCommand::Message("You Win!".to_string())));
        assert_eq!(ghosts(&commands), 0);
    }
}
