use serde::{Deserialize, Serialize};

/// Score, level, lines and combo of one player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progression {
    pub score: u64,
    pub level: u32,
    pub lines: u32,
    /// Consecutive locks that cleared at least one row
    pub combo: u32,
}

impl Default for Progression {
    fn default() -> Self {
        Progression {
            score: 0,
            level: 1,
            lines: 0,
            combo: 0,
        }
    }
}

impl Progression {
    /// Account for a lock that cleared `cleared` rows
    ///
    /// Points use the level from before the lock.
    pub fn record_lock(&mut self, cleared: usize) {
        if cleared == 0 {
            self.combo = 0;
            return;
        }
        let cleared = cleared as u32;
        let level = self.level as u64;
        self.lines += cleared;
        self.score += cleared as u64 * 100 * level;
        self.combo += 1;
        if self.combo > 1 {
            self.score += (self.combo as u64 - 1) * 50 * level;
        }
        self.level = self.lines / 10 + 1;
    }

    /// Gravity period at the current level
    pub fn drop_interval_ms(&self) -> u64 {
        1000u64
            .saturating_sub((self.level as u64 - 1) * 100)
            .max(100)
    }
}
