//! Idempotent intake of incoming attack records

use std::collections::HashSet;

use crate::types::{AttackRecord, PlayerSlot, RowId};

/// Accepts each attack record addressed to us exactly once
///
/// The same record may arrive from the push feed and from several polls
/// before the store sees it as processed.
#[derive(Debug, Clone)]
pub struct AttackInbox {
    own_slot: PlayerSlot,
    seen: HashSet<RowId>,
}

impl AttackInbox {
    pub fn new(own_slot: PlayerSlot) -> Self {
        Self {
            own_slot,
            seen: HashSet::new(),
        }
    }

    /// Returns the number of lines to enqueue, or None if the record was
    /// already accepted, is not addressed to us, or is already processed
    pub fn accept(&mut self, record: &AttackRecord) -> Option<u32> {
        if record.to != self.own_slot || record.processed {
            return None;
        }
        if !self.seen.insert(record.id.clone()) {
            return None;
        }
        Some(record.lines)
    }

    pub fn is_known(&self, id: &RowId) -> bool {
        self.seen.contains(id)
    }
}
