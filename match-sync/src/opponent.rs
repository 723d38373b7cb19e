//! Last-known state of the other player

use crate::types::{MatchId, PlayerSlot, SnapshotPayload, SnapshotRow};

/// Read-only view of the opponent's newest snapshot
///
/// Fed by every producer of the session (push feed and poller alike);
/// it doesn't care where a row came from.
#[derive(Debug, Clone)]
pub struct OpponentView<S> {
    match_id: MatchId,
    own_slot: PlayerSlot,
    current: Option<SnapshotRow<S>>,
}

impl<S: SnapshotPayload> OpponentView<S> {
    pub fn new(match_id: MatchId, own_slot: PlayerSlot) -> Self {
        Self {
            match_id,
            own_slot,
            current: None,
        }
    }

    /// Offer a row; returns true when it replaced the current snapshot
    ///
    /// Rows of our own slot, of another match, or older than the current
    /// one are ignored.
    pub fn apply(&mut self, row: SnapshotRow<S>) -> bool {
        if row.slot == self.own_slot || row.match_id != self.match_id {
            return false;
        }
        if let Some(current) = &self.current {
            if row.updated_at < current.updated_at {
                tracing::debug!(
                    "Ignoring stale opponent snapshot ({} < {})",
                    row.updated_at,
                    current.updated_at
                );
                return false;
            }
        }
        self.current = Some(row);
        true
    }

    pub fn snapshot(&self) -> Option<&S> {
        self.current.as_ref().map(|row| &row.payload)
    }

    pub fn updated_at(&self) -> Option<u64> {
        self.current.as_ref().map(|row| row.updated_at)
    }

    /// Whether the last-known opponent state has topped out
    pub fn is_game_over(&self) -> bool {
        self.snapshot().is_some_and(|s| s.is_game_over())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowId;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Board {
        height: u32,
        over: bool,
    }

    impl SnapshotPayload for Board {
        fn is_game_over(&self) -> bool {
            self.over
        }
    }

    fn row(slot: PlayerSlot, height: u32, at: u64) -> SnapshotRow<Board> {
        SnapshotRow {
            id: RowId::generate(),
            match_id: MatchId::from_name("m").unwrap(),
            slot,
            payload: Board { height, over: false },
            updated_at: at,
        }
    }

    #[test]
    fn test_older_rows_never_overwrite_newer() {
        let mut view = OpponentView::new(MatchId::from_name("m").unwrap(), PlayerSlot::One);
        assert!(view.apply(row(PlayerSlot::Two, 5, 200)));
        assert!(!view.apply(row(PlayerSlot::Two, 3, 100)));
        assert_eq!(view.snapshot().unwrap().height, 5);
        assert!(view.apply(row(PlayerSlot::Two, 8, 300)));
        assert_eq!(view.updated_at(), Some(300));
    }

    #[test]
    fn test_own_rows_are_ignored() {
        let mut view = OpponentView::new(MatchId::from_name("m").unwrap(), PlayerSlot::One);
        assert!(!view.apply(row(PlayerSlot::One, 5, 200)));
        assert!(view.snapshot().is_none());
        assert!(!view.is_game_over());
    }

    #[test]
    fn test_game_over_follows_current_snapshot() {
        let mut view = OpponentView::new(MatchId::from_name("m").unwrap(), PlayerSlot::Two);
        let mut over = row(PlayerSlot::One, 20, 50);
        over.payload.over = true;
        view.apply(over);
        assert!(view.is_game_over());
    }
}
