use crate::foundation::core::HandleId;
use smallvec::SmallVec;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

/// Cooperative deadline wheel keyed by handle id.
///
/// Nothing here fires on its own: the owner pumps [`TimerWheel::expired`] with the current clock
/// reading once per event-loop turn. Deadlines of different handles never interact.
#[derive(Debug, Default)]
pub(crate) struct TimerWheel {
    by_deadline: BTreeSet<(Duration, HandleId)>,
    by_id: HashMap<HandleId, Duration>,
}

impl TimerWheel {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Arm (or re-arm) the deadline for `id`.
    pub(crate) fn schedule(&mut self, id: HandleId, deadline: Duration) {
        if let Some(prev) = self.by_id.insert(id, deadline) {
            self.by_deadline.remove(&(prev, id));
        }
        self.by_deadline.insert((deadline, id));
    }

    /// Disarm `id`. Returns `false` when nothing was armed.
    pub(crate) fn defuse(&mut self, id: HandleId) -> bool {
        match self.by_id.remove(&id) {
            Some(deadline) => {
                self.by_deadline.remove(&(deadline, id));
                true
            }
            None => false,
        }
    }

    /// Remove and return every handle whose deadline is `<= now`, earliest first.
    pub(crate) fn expired(&mut self, now: Duration) -> SmallVec<[HandleId; 4]> {
        let mut out = SmallVec::new();
        while let Some(&(deadline, id)) = self.by_deadline.first() {
            if deadline > now {
                break;
            }
            self.by_deadline.pop_first();
            self.by_id.remove(&id);
            out.push(id);
        }
        out
    }

    pub(crate) fn next_deadline(&self) -> Option<Duration> {
        self.by_deadline.first().map(|&(d, _)| d)
    }

    pub(crate) fn deadline_of(&self, id: HandleId) -> Option<Duration> {
        self.by_id.get(&id).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }

    pub(crate) fn clear(&mut self) {
        self.by_deadline.clear();
        self.by_id.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/readiness/timer.rs"]
mod tests;
