//! Keyboard and touch input mapping

use console::Key;

use crate::tetris::Action;

const TAP_MAX_MS: u64 = 200;
const TAP_MAX_TRAVEL: f32 = 30.0;
const TAP_RIGHT_ZONE: f32 = 300.0;
const SWIPE_MIN_TRAVEL: f32 = 50.0;
const FAST_SWIPE_MS: u64 = 150;

/// What a key press asks the driver to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Game(Action),
    /// Pause drawing as if the window were hidden, or resume
    ToggleVisibility,
    Quit,
}

/// Map a DOM-style key code (`KeyA`, `ArrowLeft`, `Space`...) to an action
pub fn action_for_key_code(code: &str) -> Option<Action> {
    match code {
        "KeyA" | "ArrowLeft" => Some(Action::MoveLeft),
        "KeyD" | "ArrowRight" => Some(Action::MoveRight),
        "KeyS" | "ArrowDown" => Some(Action::SoftDrop),
        "KeyW" | "ArrowUp" => Some(Action::Rotate),
        "Space" => Some(Action::HardDrop),
        "ShiftLeft" | "ShiftRight" => Some(Action::Hold),
        _ => None,
    }
}

/// Map a terminal key
pub fn command_for_key(key: &Key) -> Option<Command> {
    let action = match key {
        Key::ArrowLeft => Action::MoveLeft,
        Key::ArrowRight => Action::MoveRight,
        Key::ArrowDown => Action::SoftDrop,
        Key::ArrowUp => Action::Rotate,
        Key::Char(c) => match c.to_ascii_lowercase() {
            'a' => Action::MoveLeft,
            'd' => Action::MoveRight,
            's' => Action::SoftDrop,
            'w' => Action::Rotate,
            ' ' => Action::HardDrop,
            'c' => Action::Hold,
            'p' => return Some(Command::ToggleVisibility),
            'q' => return Some(Command::Quit),
            _ => return None,
        },
        Key::Escape => return Some(Command::Quit),
        _ => return None,
    };
    Some(Command::Game(action))
}

/// Turns pointer down/up pairs into taps and swipes
#[derive(Debug, Clone, Default)]
pub struct GestureTracker {
    start: Option<(f32, f32, u64)>,
}

impl GestureTracker {
    pub fn pointer_down(&mut self, x: f32, y: f32, now_ms: u64, game_over: bool) {
        if game_over {
            self.start = None;
            return;
        }
        self.start = Some((x, y, now_ms));
    }

    pub fn pointer_up(&mut self, x: f32, y: f32, now_ms: u64, game_over: bool) -> Option<Action> {
        let (start_x, start_y, start_ms) = self.start.take()?;
        if game_over {
            return None;
        }
        let duration = now_ms.saturating_sub(start_ms);
        let dx = x - start_x;
        let dy = y - start_y;

        if duration < TAP_MAX_MS && dx.abs() < TAP_MAX_TRAVEL && dy.abs() < TAP_MAX_TRAVEL {
            // left and center zones both rotate
            return if start_x > TAP_RIGHT_ZONE {
                Some(Action::Hold)
            } else {
                Some(Action::Rotate)
            };
        }

        if dx.abs() <= SWIPE_MIN_TRAVEL && dy.abs() <= SWIPE_MIN_TRAVEL {
            return None;
        }
        if dx.abs() > dy.abs() {
            if dx > 0.0 {
                Some(Action::MoveRight)
            } else {
                Some(Action::MoveLeft)
            }
        } else if dy > 0.0 {
            if duration < FAST_SWIPE_MS {
                Some(Action::HardDrop)
            } else {
                Some(Action::SoftDrop)
            }
        } else {
            Some(Action::Rotate)
        }
    }
}
