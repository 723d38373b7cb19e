/// Gravity ticks owed for time spent hidden
///
/// While the game isn't drawn, nothing calls `update`; on return the missed
/// drops are replayed in capped batches so the game advances fairly.
#[derive(Debug, Clone, Default)]
pub struct CatchUp {
    hidden_since: Option<u64>,
    pending: u32,
}

impl CatchUp {
    pub fn on_hidden(&mut self, now_ms: u64) {
        self.hidden_since = Some(now_ms);
    }

    pub fn on_visible(&mut self, now_ms: u64, drop_interval_ms: u64) {
        if let Some(since) = self.hidden_since.take() {
            let missed = now_ms.saturating_sub(since) / drop_interval_ms.max(1);
            self.pending = self.pending.saturating_add(missed as u32);
            if missed > 0 {
                tracing::debug!("Replaying {} missed drops", missed);
            }
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden_since.is_some()
    }

    pub fn pending(&self) -> u32 {
        self.pending
    }

    /// Take up to `cap` owed ticks
    pub fn take_batch(&mut self, cap: u32) -> u32 {
        let batch = self.pending.min(cap);
        self.pending -= batch;
        batch
    }
}
