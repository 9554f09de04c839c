//! Wall-clock scheduler driven by a tokio local task
//!
//! Must be started from inside a `tokio::task::LocalSet`: tasks and sinks are
//! `!Send`, so the driver runs with `spawn_local` on the current thread.

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use super::timer_queue::{fire, TimerQueue};
use super::{PeriodicTask, ScheduledTask, Scheduler, Task, TaskHandle};
use crate::sink::Time;
use crate::stream_configuration::SchedulerConfig;

pub struct TokioScheduler {
    origin: Instant,
    timers: RefCell<TimerQueue>,
    wake: Rc<Notify>,
    config: SchedulerConfig,
}

impl TokioScheduler {
    /// Start a scheduler with default configuration.
    ///
    /// # Panics
    /// Panics when called outside a `LocalSet`.
    pub fn start() -> Rc<Self> {
        Self::start_with_config(SchedulerConfig::default())
    }

    pub fn start_with_config(config: SchedulerConfig) -> Rc<Self> {
        let scheduler = Rc::new(Self {
            origin: Instant::now(),
            timers: RefCell::new(TimerQueue::default()),
            wake: Rc::new(Notify::new()),
            config,
        });
        tokio::task::spawn_local(drive(Rc::downgrade(&scheduler)));
        log::debug!("Tokio scheduler started");
        scheduler
    }

    /// Number of tasks that are scheduled and can still fire.
    pub fn pending_tasks(&self) -> usize {
        self.timers.borrow().live_count()
    }

    fn push(&self, due: Time, period: Option<Duration>, task: Rc<ScheduledTask>) {
        self.timers.borrow_mut().push(due, period, task);
        self.wake.notify_one();
    }

    /// Fire due tasks, up to the per-tick bound. Returns the next due instant.
    fn fire_due(&self) -> Option<Instant> {
        let mut fired = 0;
        while fired < self.config.max_tasks_per_tick {
            let now = self.now();
            let next = self.timers.borrow_mut().pop_due(now);
            let Some(entry) = next else { break };
            fire(entry, now, &self.timers);
            fired += 1;
        }
        let next_due = self.timers.borrow_mut().next_due();
        next_due.map(|due| self.origin + due)
    }
}

impl Scheduler for TokioScheduler {
    fn now(&self) -> Time {
        self.origin.elapsed()
    }

    fn schedule_after(&self, delay: Duration, task: Task) -> TaskHandle {
        let task = ScheduledTask::once(task);
        self.push(self.now() + delay, None, task.clone());
        TaskHandle::new(task)
    }

    fn schedule_periodic(&self, period: Duration, task: PeriodicTask) -> TaskHandle {
        let task = ScheduledTask::periodic(task);
        self.push(self.now(), Some(period), task.clone());
        TaskHandle::new(task)
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        // Let the driver observe that the scheduler is gone.
        self.wake.notify_one();
    }
}

async fn drive(scheduler: Weak<TokioScheduler>) {
    loop {
        let (next_due, wake) = match scheduler.upgrade() {
            Some(scheduler) => (scheduler.fire_due(), Rc::clone(&scheduler.wake)),
            None => break,
        };
        match next_due {
            Some(at) => {
                tokio::select! {
                    _ = tokio::time::sleep_until(at) => {}
                    _ = wake.notified() => {}
                }
            }
            None => wake.notified().await,
        }
        tokio::task::yield_now().await;
    }
    log::debug!("Tokio scheduler driver stopped");
}
