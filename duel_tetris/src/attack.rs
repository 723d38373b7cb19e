/// Lines sent to the opponent for a lock clearing `cleared` rows at `combo`
///
/// `combo` is the value after the lock was counted.
pub fn attack_lines(cleared: usize, combo: u32) -> u32 {
    if cleared == 0 {
        return 0;
    }
    let base = match cleared {
        1 => 0,
        2 => 1,
        3 => 2,
        _ => 4,
    };
    base + combo / 2
}

/// Incoming penalty lines waiting to be injected, one unit at a time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttackQueue {
    pending: u32,
}

impl AttackQueue {
    pub fn push(&mut self, lines: u32) {
        self.pending = self.pending.saturating_add(lines);
    }

    /// Take one line off the queue, if any
    pub fn pop_unit(&mut self) -> bool {
        if self.pending == 0 {
            return false;
        }
        self.pending -= 1;
        true
    }

    pub fn pending(&self) -> u32 {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attack_table_without_combo() {
        assert_eq!(attack_lines(0, 0), 0);
        assert_eq!(attack_lines(1, 1), 0);
        assert_eq!(attack_lines(2, 1), 1);
        assert_eq!(attack_lines(3, 1), 2);
        assert_eq!(attack_lines(4, 1), 4);
    }

    #[test]
    fn test_attack_combo_bonus() {
        assert_eq!(attack_lines(1, 2), 1);
        assert_eq!(attack_lines(2, 3), 2);
        assert_eq!(attack_lines(4, 5), 6);
    }

    #[test]
    fn test_queue_drains_one_unit_at_a_time() {
        let mut queue = AttackQueue::default();
        queue.push(2);
        assert!(queue.pop_unit());
        assert_eq!(queue.pending(), 1);
        assert!(queue.pop_unit());
        assert!(!queue.pop_unit());
    }
}
