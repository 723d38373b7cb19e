use crate::piece::CellType;
use crate::render::{DrawCommand, PreviewSlot, Side};

const PREVIEW_COLS: usize = 4;
const PREVIEW_ROWS: usize = 2;

#[derive(Clone, PartialEq, Debug)]
pub enum TermCell {
    FieldCell(CellType),
    Ghost,
    BorderVertical,
    BorderHorizontal,
    BorderTopLeft,
    BorderTopRight,
    BorderBottomLeft,
    BorderBottomRight,
    Space,
    Message(String),
}

pub trait TermStyle {
    fn display<'a>(&self, cell: &'a TermCell) -> &'a str;
    fn width(&self, cell: &TermCell) -> usize {
        match cell {
            TermCell::FieldCell(_) | TermCell::Ghost => 2,
            TermCell::BorderHorizontal => 2,
            TermCell::BorderVertical
            | TermCell::BorderTopLeft
            | TermCell::BorderTopRight
            | TermCell::BorderBottomLeft
            | TermCell::BorderBottomRight => 1,
            TermCell::Space => 1,
            TermCell::Message(s) => s.chars().count(),
        }
    }
}

pub trait TermRender {
    fn output(&self, style: &impl TermStyle) -> Vec<Vec<TermCell>>;
    fn render(&self, style: &impl TermStyle) -> Vec<String> {
        let mut lines = Vec::new();
        for row in self.output(style) {
            let mut line = String::new();
            for cell in &row {
                line.push_str(style.display(cell));
            }
            lines.push(line);
        }
        lines
    }
}

fn block_width(row: &[TermCell], style: &impl TermStyle) -> usize {
    row.iter().map(|c| style.width(c)).sum()
}

// Make all lines in block the same width by padding with TermCell::Space
pub fn pad_block_right(block: &mut [Vec<TermCell>], style: &impl TermStyle) {
    let width = block
        .iter()
        .map(|row| block_width(row, style))
        .max()
        .unwrap_or(0);
    pad_block_to(block, width, style);
}

fn pad_block_to(block: &mut [Vec<TermCell>], width: usize, style: &impl TermStyle) {
    for row in block.iter_mut() {
        let line_width = block_width(row, style);
        for _ in line_width..width {
            row.push(TermCell::Space);
        }
    }
}

pub struct PlainTermStyle;

impl TermStyle for PlainTermStyle {
    fn display<'a>(&self, cell: &'a TermCell) -> &'a str {
        match cell {
            TermCell::FieldCell(CellType::Empty) => "  ",
            TermCell::FieldCell(CellType::Garbage) => "##",
            TermCell::FieldCell(_) => "[]",
            TermCell::Ghost => "::",
            TermCell::BorderVertical => "|",
            TermCell::BorderTopLeft => "+",
            TermCell::BorderTopRight => "+",
            TermCell::BorderBottomLeft => "+",
            TermCell::BorderHorizontal => "--",
            TermCell::BorderBottomRight => "+",
            TermCell::Space => " ",
            TermCell::Message(s) => s.as_str(),
        }
    }
}

pub struct AnsiTermStyle;

impl TermStyle for AnsiTermStyle {
    fn display<'a>(&self, cell: &'a TermCell) -> &'a str {
        match cell {
            TermCell::FieldCell(CellType::Empty) => "\x1b[0m  ",
            TermCell::FieldCell(CellType::Cyan) => "\x1b[0;96m[]",
            TermCell::FieldCell(CellType::Yellow) => "\x1b[0;93m[]",
            TermCell::FieldCell(CellType::Purple) => "\x1b[0;35m[]",
            TermCell::FieldCell(CellType::Green) => "\x1b[0;92m[]",
            TermCell::FieldCell(CellType::Red) => "\x1b[0;91m[]",
            TermCell::FieldCell(CellType::Orange) => "\x1b[0;33m[]",
            TermCell::FieldCell(CellType::Blue) => "\x1b[0;94m[]",
            TermCell::FieldCell(CellType::Garbage) => "\x1b[0;90m##",
            TermCell::Ghost => "\x1b[0;90m::",
            TermCell::BorderVertical => "\x1b[0m│",
            TermCell::BorderTopLeft => "\x1b[0m┌",
            TermCell::BorderTopRight => "\x1b[0m┐",
            TermCell::BorderBottomLeft => "\x1b[0m└",
            TermCell::BorderHorizontal => "\x1b[0m──",
            TermCell::BorderBottomRight => "\x1b[0m┘",
            TermCell::Space => "\x1b[0m ",
            TermCell::Message(s) => s.as_str(),
        }
    }
}

/// Rectangle of field cells
#[derive(Clone, Debug, PartialEq)]
pub struct Field {
    cols: usize,
    cells: Vec<Vec<TermCell>>,
}

impl Field {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            cells: vec![vec![TermCell::FieldCell(CellType::Empty); cols]; rows],
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn set(&mut self, x: usize, y: usize, cell: TermCell) {
        if let Some(slot) = self.cells.get_mut(y).and_then(|row| row.get_mut(x)) {
            *slot = cell;
        }
    }

    pub fn get(&self, x: usize, y: usize) -> Option<&TermCell> {
        self.cells.get(y).and_then(|row| row.get(x))
    }
}

impl TermRender for Field {
    fn output(&self, _style: &impl TermStyle) -> Vec<Vec<TermCell>> {
        self.cells.clone()
    }
}

pub struct WellField {
    field: Field,
    banner: Option<String>,
}

impl TermRender for WellField {
    fn output(&self, style: &impl TermStyle) -> Vec<Vec<TermCell>> {
        let mut lines = self.field.output(style);
        if let Some(banner) = &self.banner
            && !lines.is_empty()
        {
            let middle = lines.len() / 2;
            let inner = self.field.cols() * 2;
            let text_width = banner.chars().count();
            let left = inner.saturating_sub(text_width) / 2;
            let mut line = vec![TermCell::Space; left];
            line.push(TermCell::Message(banner.clone()));
            lines[middle] = line;
            pad_block_to(&mut lines, inner, style);
        }

        for line in &mut lines {
            line.insert(0, TermCell::BorderVertical);
            line.push(TermCell::BorderVertical);
        }
        let mut line = vec![TermCell::BorderBottomLeft];
        line.extend(std::iter::repeat_n(TermCell::BorderHorizontal, self.field.cols()));
        line.push(TermCell::BorderBottomRight);
        lines.push(line);
        lines
    }
}

pub struct PreviewField(Field);

impl TermRender for PreviewField {
    fn output(&self, style: &impl TermStyle) -> Vec<Vec<TermCell>> {
        let mut lines = self.0.output(style);
        for line in &mut lines {
            line.insert(0, TermCell::BorderVertical);
            line.push(TermCell::BorderVertical);
        }

        let mut line = vec![TermCell::BorderTopLeft];
        line.extend(std::iter::repeat_n(TermCell::BorderHorizontal, self.0.cols()));
        line.push(TermCell::BorderTopRight);
        lines.insert(0, line);

        let mut line = vec![TermCell::BorderBottomLeft];
        line.extend(std::iter::repeat_n(TermCell::BorderHorizontal, self.0.cols()));
        line.push(TermCell::BorderBottomRight);
        lines.push(line);

        lines
    }
}

/// Well, previews and text of one player
pub struct SideView {
    well: WellField,
    next: PreviewField,
    hold: PreviewField,
    label: String,
    stats: Vec<String>,
}

impl SideView {
    fn new(width: usize, height: usize) -> Self {
        Self {
            well: WellField {
                field: Field::new(width, height),
                banner: None,
            },
            next: PreviewField(Field::new(PREVIEW_COLS, PREVIEW_ROWS)),
            hold: PreviewField(Field::new(PREVIEW_COLS, PREVIEW_ROWS)),
            label: String::new(),
            stats: Vec::new(),
        }
    }

    pub fn well(&self) -> &Field {
        &self.well.field
    }

    pub fn banner(&self) -> Option<&str> {
        self.well.banner.as_deref()
    }

    // Column next to the well: name, stats, next and hold
    fn panel(&self, style: &impl TermStyle) -> Vec<Vec<TermCell>> {
        let mut lines = vec![vec![TermCell::Message(self.label.clone())], Vec::new()];
        for stat in &self.stats {
            lines.push(vec![TermCell::Message(stat.clone())]);
        }
        lines.push(Vec::new());
        lines.push(vec![TermCell::Message("NEXT".to_string())]);
        lines.extend(self.next.output(style));
        lines.push(vec![TermCell::Message("HOLD".to_string())]);
        lines.extend(self.hold.output(style));
        pad_block_right(&mut lines, style);
        lines
    }
}

/// Whole screen: own side, and the opponent's in a match
pub struct GameFieldPair {
    player: Option<SideView>,
    opponent: Option<SideView>,
    message: Vec<String>,
}

impl GameFieldPair {
    /// Build the screen from a frame's command list, with extra lines below
    pub fn from_commands(commands: &[DrawCommand], mut message: Vec<String>) -> Self {
        let mut player = None;
        let mut opponent = None;
        let mut outcome = Vec::new();
        for command in commands {
            let (side, view) = match command {
                DrawCommand::Message(text) => {
                    outcome.push(text.clone());
                    continue;
                }
                DrawCommand::Well {
                    side,
                    width,
                    height,
                } => {
                    let slot = match side {
                        Side::Player => &mut player,
                        Side::Opponent => &mut opponent,
                    };
                    *slot = Some(SideView::new(*width, *height));
                    continue;
                }
                DrawCommand::Cell { side, .. }
                | DrawCommand::Ghost { side, .. }
                | DrawCommand::Preview { side, .. }
                | DrawCommand::Stats { side, .. }
                | DrawCommand::Label { side, .. }
                | DrawCommand::Banner { side, .. } => {
                    let slot = match side {
                        Side::Player => &mut player,
                        Side::Opponent => &mut opponent,
                    };
                    (*side, slot)
                }
            };
            let Some(view) = view.as_mut() else {
                tracing::debug!("Draw command for {:?} before its well, skipped", side);
                continue;
            };
            match command {
                DrawCommand::Cell { x, y, cell, .. } => {
                    view.well.field.set(*x, *y, TermCell::FieldCell(*cell))
                }
                DrawCommand::Ghost { x, y, .. } => view.well.field.set(*x, *y, TermCell::Ghost),
                DrawCommand::Preview {
                    slot, x, y, cell, ..
                } => {
                    let preview = match slot {
                        PreviewSlot::Next => &mut view.next,
                        PreviewSlot::Hold => &mut view.hold,
                    };
                    preview.0.set(*x, *y, TermCell::FieldCell(*cell));
                }
                DrawCommand::Stats {
                    score,
                    level,
                    lines,
                    combo,
                    ..
                } => {
                    view.stats = vec![
                        format!("SCORE {}", score),
                        format!("LEVEL {}", level),
                        format!("LINES {}", lines),
                        format!("COMBO {}", combo),
                    ];
                }
                DrawCommand::Label { text, .. } => view.label = text.clone(),
                DrawCommand::Banner { text, .. } => view.well.banner = Some(text.clone()),
                DrawCommand::Well { .. } | DrawCommand::Message(_) => {}
            }
        }
        outcome.append(&mut message);
        Self {
            player,
            opponent,
            message: outcome,
        }
    }

    pub fn player(&self) -> Option<&SideView> {
        self.player.as_ref()
    }

    pub fn opponent(&self) -> Option<&SideView> {
        self.opponent.as_ref()
    }
}

impl TermRender for GameFieldPair {
    fn output(&self, style: &impl TermStyle) -> Vec<Vec<TermCell>> {
        // Columns left to right: own well, own panel, opponent panel, opponent well
        let mut columns: Vec<Vec<Vec<TermCell>>> = Vec::new();
        if let Some(player) = &self.player {
            columns.push(player.well.output(style));
            columns.push(player.panel(style));
        }
        if let Some(opponent) = &self.opponent {
            columns.push(opponent.panel(style));
            columns.push(opponent.well.output(style));
        }
        for column in &mut columns {
            pad_block_right(column, style);
        }

        let height = columns.iter().map(|c| c.len()).max().unwrap_or(0);
        let mut lines = Vec::new();
        for i in 0..height {
            let mut line = Vec::new();
            for (n, column) in columns.iter().enumerate() {
                if n > 0 {
                    line.push(TermCell::Space);
                    line.push(TermCell::Space);
                }
                match column.get(i) {
                    Some(row) => line.extend(row.iter().cloned()),
                    None => {
                        let width = column.first().map_or(0, |row| block_width(row, style));
                        line.extend(std::iter::repeat_n(TermCell::Space, width));
                    }
                }
            }
            lines.push(line);
        }

        lines.push(Vec::new());
        for message in &self.message {
            lines.push(vec![TermCell::Message(message.clone())]);
        }
        lines
    }
}
