//! Deterministic virtual-time scheduler
//!
//! Time only moves when the owner calls [`VirtualScheduler::advance_by`],
//! [`VirtualScheduler::advance_to`] or [`VirtualScheduler::run_until_idle`].
//! Useful in tests and simulations where timing must be exact.

use std::cell::{Cell, RefCell};
use std::time::Duration;

use super::timer_queue::{fire, TimerQueue};
use super::{PeriodicTask, ScheduledTask, Scheduler, Task, TaskHandle};
use crate::error::{StreamError, StreamResult};
use crate::sink::Time;
use crate::stream_configuration::VirtualSchedulerConfig;

pub struct VirtualScheduler {
    now: Cell<Time>,
    timers: RefCell<TimerQueue>,
    config: VirtualSchedulerConfig,
}

impl Default for VirtualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualScheduler {
    /// Create a scheduler with the clock at zero
    pub fn new() -> Self {
        Self::with_config(VirtualSchedulerConfig::default())
    }

    pub fn with_config(config: VirtualSchedulerConfig) -> Self {
        Self {
            now: Cell::new(config.start),
            timers: RefCell::new(TimerQueue::default()),
            config,
        }
    }

    /// Number of tasks that are scheduled and can still fire.
    pub fn pending_tasks(&self) -> usize {
        self.timers.borrow().live_count()
    }

    /// Due time of the earliest task that can still fire.
    pub fn next_due(&self) -> Option<Time> {
        self.timers.borrow_mut().next_due()
    }

    /// Move the clock forward by `delta`, firing everything due on the way.
    /// Returns the number of tasks fired.
    pub fn advance_by(&self, delta: Duration) -> StreamResult<usize> {
        self.advance_to(self.now.get() + delta)
    }

    /// Move the clock to `target`, firing everything due on the way in
    /// `(due, submission)` order. The clock never moves backwards.
    pub fn advance_to(&self, target: Time) -> StreamResult<usize> {
        let mut fired = 0;
        loop {
            // Bind first so the queue borrow ends before the task runs.
            let next = self.timers.borrow_mut().pop_due(target);
            let Some(entry) = next else { break };
            if let Err(err) = self.step(&mut fired) {
                self.timers.borrow_mut().restore(entry);
                return Err(err);
            }
            let due = entry.due.max(self.now.get());
            self.now.set(due);
            fire(entry, due, &self.timers);
        }
        if target > self.now.get() {
            self.now.set(target);
        }
        Ok(fired)
    }

    /// Fire tasks until none are left, moving the clock to each due time.
    pub fn run_until_idle(&self) -> StreamResult<usize> {
        let mut fired = 0;
        loop {
            let next = self.timers.borrow_mut().pop_next();
            let Some(entry) = next else { break };
            if let Err(err) = self.step(&mut fired) {
                self.timers.borrow_mut().restore(entry);
                return Err(err);
            }
            let due = entry.due.max(self.now.get());
            self.now.set(due);
            fire(entry, due, &self.timers);
        }
        Ok(fired)
    }

    fn step(&self, fired: &mut usize) -> StreamResult<()> {
        if *fired >= self.config.max_steps {
            log::warn!(
                "Virtual scheduler stopped after {} tasks at {:?}",
                self.config.max_steps,
                self.now.get()
            );
            return Err(StreamError::StepLimitExceeded(self.config.max_steps));
        }
        *fired += 1;
        Ok(())
    }
}

impl Scheduler for VirtualScheduler {
    fn now(&self) -> Time {
        self.now.get()
    }

    fn schedule_after(&self, delay: Duration, task: Task) -> TaskHandle {
        let task = ScheduledTask::once(task);
        self.timers
            .borrow_mut()
            .push(self.now.get() + delay, None, task.clone());
        TaskHandle::new(task)
    }

    fn schedule_periodic(&self, period: Duration, task: PeriodicTask) -> TaskHandle {
        let task = ScheduledTask::periodic(task);
        self.timers
            .borrow_mut()
            .push(self.now.get(), Some(period), task.clone());
        TaskHandle::new(task)
    }
}
