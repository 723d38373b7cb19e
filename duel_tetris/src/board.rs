use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::piece::{CellType, FallingPiece};

pub const BOARD_WIDTH: usize = 10;
pub const BOARD_HEIGHT: usize = 20;

/// The well: `height` rows of `width` cells, row 0 at the top
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Board {
    width: usize,
    height: usize,
    cells: Vec<Vec<CellType>>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new(BOARD_WIDTH, BOARD_HEIGHT)
    }
}

impl Board {
    pub fn new(width: usize, height: usize) -> Self {
        Board {
            width,
            height,
            cells: vec![vec![CellType::Empty; width]; height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    // Out of range reads are empty
    pub fn cell(&self, x: usize, y: usize) -> CellType {
        self.cells
            .get(y)
            .and_then(|row| row.get(x))
            .copied()
            .unwrap_or(CellType::Empty)
    }

    pub fn set_cell(&mut self, x: usize, y: usize, cell: CellType) {
        if x < self.width && y < self.height {
            self.cells[y][x] = cell;
        }
    }

    pub fn rows(&self) -> &[Vec<CellType>] {
        &self.cells
    }

    pub fn is_row_full(&self, y: usize) -> bool {
        self.cells
            .get(y)
            .is_some_and(|row| row.iter().all(|c| !c.is_empty()))
    }

    /// Would `piece` translated by (dx, dy) overlap a wall, the floor or a filled cell?
    ///
    /// Cells above the top edge only collide with the side walls.
    pub fn collides(&self, piece: &FallingPiece, dx: i32, dy: i32) -> bool {
        piece.cells(dx, dy).any(|(x, y)| {
            if x < 0 || x >= self.width as i32 || y >= self.height as i32 {
                return true;
            }
            y >= 0 && !self.cells[y as usize][x as usize].is_empty()
        })
    }

    /// Write the piece into the grid; cells above the top edge are dropped
    pub fn place(&mut self, piece: &FallingPiece) {
        let color = piece.color();
        for (x, y) in piece.cells(0, 0) {
            if x >= 0 && y >= 0 {
                self.set_cell(x as usize, y as usize, color);
            }
        }
    }

    /// Remove full rows, shifting everything above down; returns how many were removed
    pub fn clear_full_lines(&mut self) -> usize {
        let mut cleared = 0;
        let mut y = self.height;
        // Scan bottom to top, re-testing the same index after a removal
        while y > 0 {
            if self.is_row_full(y - 1) {
                self.cells.remove(y - 1);
                self.cells.insert(0, vec![CellType::Empty; self.width]);
                cleared += 1;
            } else {
                y -= 1;
            }
        }
        cleared
    }

    /// Push `count` garbage rows in from the bottom
    ///
    /// The top `count` rows are discarded. Each garbage row has a single
    /// hole at an independently chosen random column.
    pub fn inject_penalty_lines(&mut self, count: usize, rng: &mut impl Rng) {
        let count = count.min(self.height);
        if count == 0 {
            return;
        }
        self.cells.drain(..count);
        for _ in 0..count {
            let mut row = vec![CellType::Garbage; self.width];
            row[rng.random_range(0..self.width)] = CellType::Empty;
            self.cells.push(row);
        }
    }
}
