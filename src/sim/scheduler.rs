//! Discrete-event scheduler
//!
//! Every delayed or repeating trigger of a run is an entry in one priority
//! queue ordered by `(fire_at, insertion order)`. The run steps the queue
//! explicitly, so ordering is total and pausing is simply not stepping.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

use super::state::{EntityId, PowerUpKind};

/// Handle to a scheduled trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

/// What a trigger does when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Fire,
    Spawn,
    Difficulty,
    HudRefresh,
    ProjectileExpire(EntityId),
    PickupExpire(EntityId),
    PowerUpExpire(PowerUpKind),
    GodModeExpire,
}

/// A trigger that came due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredTimer {
    pub id: TimerId,
    pub kind: TimerKind,
    /// Logical instant the trigger was due
    pub at_ms: u64,
}

#[derive(Debug, Clone)]
struct Entry {
    at_ms: u64,
    seq: u64,
    id: TimerId,
    kind: TimerKind,
    period: Option<u64>,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.at_ms == other.at_ms && self.seq == other.seq
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    // Reversed: BinaryHeap is a max-heap, we want the earliest entry on top
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at_ms
            .cmp(&self.at_ms)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Priority queue of one-shot and periodic triggers
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    heap: BinaryHeap<Entry>,
    live: HashSet<TimerId>,
    next_id: u64,
    next_seq: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, id: TimerId, at_ms: u64, kind: TimerKind, period: Option<u64>) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Entry {
            at_ms,
            seq,
            id,
            kind,
            period,
        });
    }

    fn allocate(&mut self) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.live.insert(id);
        id
    }

    /// Fire once, `delay_ms` after `now_ms`
    pub fn after(&mut self, now_ms: u64, delay_ms: u64, kind: TimerKind) -> TimerId {
        let id = self.allocate();
        self.push(id, now_ms + delay_ms, kind, None);
        id
    }

    /// Fire every `period_ms`, first at `now_ms + period_ms`
    pub fn every(&mut self, now_ms: u64, period_ms: u64, kind: TimerKind) -> TimerId {
        let period_ms = period_ms.max(1);
        let id = self.allocate();
        self.push(id, now_ms + period_ms, kind, Some(period_ms));
        id
    }

    /// Cancel a trigger. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.live.remove(&id)
    }

    /// Drop every pending trigger
    pub fn cancel_all(&mut self) {
        self.heap.clear();
        self.live.clear();
    }

    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.live.contains(&id)
    }

    /// Number of live triggers
    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Pop the earliest live trigger due at or before `now_ms`.
    /// Periodic triggers are re-armed one period after their due time.
    pub fn pop_due(&mut self, now_ms: u64) -> Option<FiredTimer> {
        loop {
            if self.heap.peek()?.at_ms > now_ms {
                return None;
            }
            let entry = self.heap.pop()?;
            if !self.live.contains(&entry.id) {
                continue;
            }
            match entry.period {
                Some(period) => self.push(entry.id, entry.at_ms + period, entry.kind, Some(period)),
                None => {
                    self.live.remove(&entry.id);
                }
            }
            return Some(FiredTimer {
                id: entry.id,
                kind: entry.kind,
                at_ms: entry.at_ms,
            });
        }
    }
}
