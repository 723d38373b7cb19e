use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CellType {
    #[default]
    Empty,
    Cyan,
    Yellow,
    Purple,
    Green,
    Red,
    Orange,
    Blue,
    // Penalty rows sent by the opponent
    Garbage,
}

impl CellType {
    pub fn is_empty(&self) -> bool {
        *self == CellType::Empty
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TetrominoType {
    I,
    O,
    T,
    S,
    Z,
    L,
    J,
}

impl TetrominoType {
    pub const ALL: [TetrominoType; 7] = [
        TetrominoType::I,
        TetrominoType::O,
        TetrominoType::T,
        TetrominoType::S,
        TetrominoType::Z,
        TetrominoType::L,
        TetrominoType::J,
    ];

    // Uniform pick over the seven kinds, no bag
    pub fn random(rng: &mut impl Rng) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    // Get cell type (color) corresponding to tetromino type
    pub fn cell_type(&self) -> CellType {
        match self {
            TetrominoType::I => CellType::Cyan,
            TetrominoType::O => CellType::Yellow,
            TetrominoType::T => CellType::Purple,
            TetrominoType::S => CellType::Green,
            TetrominoType::Z => CellType::Red,
            TetrominoType::L => CellType::Orange,
            TetrominoType::J => CellType::Blue,
        }
    }

    // Spawn orientation, top row first
    pub fn base_shape(&self) -> Shape {
        let rows: &[&[u8]] = match self {
            TetrominoType::I => &[&[1, 1, 1, 1]],
            TetrominoType::O => &[&[1, 1], &[1, 1]],
            TetrominoType::T => &[&[0, 1, 0], &[1, 1, 1]],
            TetrominoType::S => &[&[0, 1, 1], &[1, 1, 0]],
            TetrominoType::Z => &[&[1, 1, 0], &[0, 1, 1]],
            TetrominoType::L => &[&[1, 0, 0], &[1, 1, 1]],
            TetrominoType::J => &[&[0, 0, 1], &[1, 1, 1]],
        };
        Shape::from_rows(rows)
    }
}

/// Occupancy matrix of a tetromino, row-major, top row first
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    rows: Vec<Vec<bool>>,
}

impl Shape {
    pub fn from_rows(rows: &[&[u8]]) -> Self {
        Shape {
            rows: rows
                .iter()
                .map(|row| row.iter().map(|&c| c != 0).collect())
                .collect(),
        }
    }

    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, |row| row.len())
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn is_filled(&self, x: usize, y: usize) -> bool {
        self.rows
            .get(y)
            .and_then(|row| row.get(x))
            .copied()
            .unwrap_or(false)
    }

    /// Clockwise quarter turn: transpose, then reverse every row
    pub fn rotated_clockwise(&self) -> Shape {
        let height = self.height();
        let rows = (0..self.width())
            .map(|x| (0..height).rev().map(|y| self.rows[y][x]).collect())
            .collect();
        Shape { rows }
    }

    /// Offsets of the filled cells
    pub fn filled_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.rows.iter().enumerate().flat_map(|(y, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, filled)| **filled)
                .map(move |(x, _)| (x, y))
        })
    }
}

/// A tetromino without position: what the next and hold slots contain
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tetromino {
    kind: TetrominoType,
    shape: Shape,
}

impl Tetromino {
    pub fn new(kind: TetrominoType) -> Self {
        Tetromino {
            kind,
            shape: kind.base_shape(),
        }
    }

    pub fn random(rng: &mut impl Rng) -> Self {
        Self::new(TetrominoType::random(rng))
    }

    pub fn kind(&self) -> TetrominoType {
        self.kind
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn color(&self) -> CellType {
        self.kind.cell_type()
    }
}

/// The tetromino under player control, with its board origin
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FallingPiece {
    pub tetromino: Tetromino,
    pub x: i32,
    pub y: i32,
}

impl FallingPiece {
    // Horizontally centered on the top row
    pub fn spawn(tetromino: Tetromino, board_width: usize) -> Self {
        let x = (board_width.saturating_sub(tetromino.shape.width()) / 2) as i32;
        FallingPiece { tetromino, x, y: 0 }
    }

    pub fn shape(&self) -> &Shape {
        &self.tetromino.shape
    }

    pub fn color(&self) -> CellType {
        self.tetromino.color()
    }

    pub fn set_shape(&mut self, shape: Shape) {
        self.tetromino.shape = shape;
    }

    /// Board coordinates of the filled cells, offset by (dx, dy)
    pub fn cells(&self, dx: i32, dy: i32) -> impl Iterator<Item = (i32, i32)> + '_ {
        self.tetromino
            .shape
            .filled_cells()
            .map(move |(x, y)| (self.x + x as i32 + dx, self.y + y as i32 + dy))
    }
}
