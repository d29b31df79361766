use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

/// Handle to a single armed timer. Never reused within one wheel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// Single-shot timers ordered by deadline, then by arm order.
#[derive(Debug, Default)]
pub struct TimerWheel {
    next_id: u64,
    queue: BTreeMap<(DateTime<Utc>, TimerId), String>,
    deadlines: HashMap<TimerId, DateTime<Utc>>,
}

impl TimerWheel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, deadline: DateTime<Utc>, key: impl Into<String>) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.queue.insert((deadline, id), key.into());
        self.deadlines.insert(id, deadline);
        id
    }

    /// Returns false when the timer already fired or was disarmed.
    pub fn disarm(&mut self, id: TimerId) -> bool {
        let Some(deadline) = self.deadlines.remove(&id) else {
            return false;
        };
        self.queue.remove(&(deadline, id)).is_some()
    }

    pub fn next_deadline(&self) -> Option<DateTime<Utc>> {
        self.queue.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Removes and returns the earliest timer whose deadline is at or before `now`.
    pub fn pop_due(&mut self, now: DateTime<Utc>) -> Option<(TimerId, String)> {
        let (&(deadline, id), _) = self.queue.iter().next()?;
        if deadline > now {
            return None;
        }
        self.deadlines.remove(&id);
        self.queue.remove(&(deadline, id)).map(|key| (id, key))
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
