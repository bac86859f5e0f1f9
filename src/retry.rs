use {
    super::TargetKey,
    std::{collections::VecDeque, time::Instant},
};

/// Targets waiting to be polled again after a failed request.
///
/// Ordered by wake time, entries with equal wake times keep insertion order.
#[derive(Debug, Default)]
pub struct RetryQueue {
    entries: VecDeque<(Instant, TargetKey)>,
}

impl RetryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `target` to be retried at `wake_at`.
    pub fn schedule(&mut self, wake_at: Instant, target: TargetKey) {
        // With a fixed delay and a monotonic clock this is always the back.
        let pos = self.entries.partition_point(|(at, _)| *at <= wake_at);
        self.entries.insert(pos, (wake_at, target));
    }

    /// Pops the earliest entry if its wake time has been reached.
    pub fn pop_due(&mut self, now: Instant) -> Option<(Instant, TargetKey)> {
        match self.entries.front() {
            Some((at, _)) if *at <= now => self.entries.pop_front(),
            _ => None,
        }
    }

    /// Wake time of the earliest entry.
    pub fn next_wake(&self) -> Option<Instant> {
        self.entries.front().map(|(at, _)| *at)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Instant, TargetKey)> {
        self.entries.iter()
    }
}
