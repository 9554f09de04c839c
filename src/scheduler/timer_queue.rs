//! Ordered timer storage shared by both schedulers

use std::cell::RefCell;
use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::rc::Rc;
use std::time::Duration;

use super::ScheduledTask;
use crate::sink::Time;

pub(crate) struct TimerEntry {
    pub(crate) due: Time,
    seq: u64,
    period: Option<Duration>,
    task: Rc<ScheduledTask>,
}

impl PartialEq for TimerEntry {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for TimerEntry {}

impl PartialOrd for TimerEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.due
            .cmp(&other.due)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

/// Heap size below which cancelled entries are only dropped from the top.
const COMPACT_THRESHOLD: usize = 64;

/// Min-heap of timers ordered by `(due, submission sequence)`.
///
/// Cancelled entries stay in the heap until they surface, or until the heap
/// outgrows `compact_at` and a purge rebuilds it from live entries only.
#[derive(Default)]
pub(crate) struct TimerQueue {
    seq: u64,
    heap: BinaryHeap<Reverse<TimerEntry>>,
    compact_at: usize,
}

impl TimerQueue {
    pub(crate) fn push(&mut self, due: Time, period: Option<Duration>, task: Rc<ScheduledTask>) {
        let seq = self.seq;
        self.seq += 1;
        self.heap.push(Reverse(TimerEntry {
            due,
            seq,
            period,
            task,
        }));
        if self.heap.len() > self.compact_at.max(COMPACT_THRESHOLD) {
            self.compact();
        }
    }

    fn compact(&mut self) {
        let before = self.heap.len();
        self.heap.retain(|Reverse(entry)| entry.task.is_live());
        self.compact_at = self.heap.len() * 2;
        log::trace!(
            "Timer queue purged {} cancelled entries, {} remain",
            before - self.heap.len(),
            self.heap.len()
        );
    }

    /// Put back an entry that was popped but not fired.
    pub(crate) fn restore(&mut self, entry: TimerEntry) {
        self.heap.push(Reverse(entry));
    }

    /// Due time of the earliest live timer; cancelled entries are discarded.
    pub(crate) fn next_due(&mut self) -> Option<Time> {
        while let Some(Reverse(entry)) = self.heap.peek() {
            if entry.task.is_live() {
                return Some(entry.due);
            }
            self.heap.pop();
        }
        None
    }

    /// Pop the earliest live timer if it is due at or before `now`.
    pub(crate) fn pop_due(&mut self, now: Time) -> Option<TimerEntry> {
        match self.next_due() {
            Some(due) if due <= now => self.heap.pop().map(|Reverse(entry)| entry),
            _ => None,
        }
    }

    /// Pop the earliest live timer regardless of its due time.
    pub(crate) fn pop_next(&mut self) -> Option<TimerEntry> {
        self.next_due()?;
        self.heap.pop().map(|Reverse(entry)| entry)
    }

    pub(crate) fn live_count(&self) -> usize {
        self.heap
            .iter()
            .filter(|Reverse(entry)| entry.task.is_live())
            .count()
    }
}

/// Run `entry` at `now` and re-queue it if it is periodic and still live.
///
/// The queue must not be borrowed by the caller: the task may schedule more
/// work on the same scheduler.
pub(crate) fn fire(entry: TimerEntry, now: Time, queue: &RefCell<TimerQueue>) {
    let again = entry.task.run(now);
    if again {
        if let Some(period) = entry.period {
            queue
                .borrow_mut()
                .push(entry.due + period, Some(period), entry.task);
        }
    }
}
