use chrono::{DateTime, Utc};
use oxwatch_common::traits::{Scheduler, TimerEvent};
use std::collections::BTreeMap;

/// In-memory one-shot timer queue.
///
/// Events due at the same instant fire in the order they were requested.
#[derive(Debug, Default)]
pub struct TimerQueue {
    queue: BTreeMap<(DateTime<Utc>, u64), TimerEvent>,
    seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns the earliest event due at or before `now`.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, TimerEvent)> {
        let (&key, _) = self.queue.first_key_value()?;
        if key.0 > now {
            return None;
        }
        self.queue.remove(&key).map(|event| (key.0, event))
    }

    pub fn next_due(&self) -> Option<DateTime<Utc>> {
        self.queue.keys().next().map(|(at, _)| *at)
    }

    pub fn iter(&self) -> impl Iterator<Item = (DateTime<Utc>, &TimerEvent)> {
        self.queue.iter().map(|((at, _), event)| (*at, event))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

impl Scheduler for TimerQueue {
    fn schedule_at(&mut self, at: DateTime<Utc>, event: TimerEvent) {
        self.seq += 1;
        tracing::debug!(at = %at, kind = ?event.kind(), "Timer scheduled");
        self.queue.insert((at, self.seq), event);
    }
}
