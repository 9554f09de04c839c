//! Time authority shared by every subscription spawned during one run
//!
//! A [`Scheduler`] is passed explicitly to `Stream::run` and threaded through
//! every nested subscription, so all of them observe one clock. Two
//! implementations are provided: [`VirtualScheduler`] for deterministic,
//! manually-advanced time, and [`TokioScheduler`] for wall-clock time on a
//! tokio `LocalSet`.

mod timer_queue;
pub mod tokio_scheduler;
pub mod virtual_time;

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::disposable::Disposable;
use crate::error::StreamResult;
use crate::sink::Time;

pub use tokio_scheduler::TokioScheduler;
pub use virtual_time::VirtualScheduler;

/// One-shot task body; receives the time it fired at.
pub type Task = Box<dyn FnOnce(Time)>;

/// Repeating task body; receives the time of each firing.
pub type PeriodicTask = Box<dyn FnMut(Time)>;

/// Shared scheduler handle
pub type SchedulerRef = Rc<dyn Scheduler>;

pub trait Scheduler {
    /// Current time on this scheduler's clock.
    fn now(&self) -> Time;

    /// Run `task` once, no earlier than `delay` from now. Tasks due at the
    /// same time run in submission order. Never runs `task` synchronously.
    fn schedule_after(&self, delay: Duration, task: Task) -> TaskHandle;

    /// Run `task` as soon as possible, then every `period` after each due time.
    fn schedule_periodic(&self, period: Duration, task: PeriodicTask) -> TaskHandle;
}

pub(crate) enum TaskBody {
    Once(Task),
    Periodic(PeriodicTask),
}

/// Shared between a [`TaskHandle`] and the scheduler's timer queue.
pub(crate) struct ScheduledTask {
    body: RefCell<Option<TaskBody>>,
    cancelled: Cell<bool>,
}

impl ScheduledTask {
    pub(crate) fn once(task: Task) -> Rc<Self> {
        Rc::new(Self {
            body: RefCell::new(Some(TaskBody::Once(task))),
            cancelled: Cell::new(false),
        })
    }

    pub(crate) fn periodic(task: PeriodicTask) -> Rc<Self> {
        Rc::new(Self {
            body: RefCell::new(Some(TaskBody::Periodic(task))),
            cancelled: Cell::new(false),
        })
    }

    /// Scheduled, not cancelled and not yet fired (or periodic).
    pub(crate) fn is_live(&self) -> bool {
        !self.cancelled.get() && self.body.borrow().is_some()
    }

    /// Fire the task. Returns `true` when a periodic task should run again.
    pub(crate) fn run(&self, now: Time) -> bool {
        if self.cancelled.get() {
            return false;
        }
        // Released before calling out: the body may cancel its own handle.
        let body = self.body.borrow_mut().take();
        match body {
            Some(TaskBody::Once(task)) => {
                task(now);
                false
            }
            Some(TaskBody::Periodic(mut task)) => {
                task(now);
                if self.cancelled.get() {
                    false
                } else {
                    *self.body.borrow_mut() = Some(TaskBody::Periodic(task));
                    true
                }
            }
            None => false,
        }
    }

    fn cancel(&self) {
        self.cancelled.set(true);
        let body = self.body.borrow_mut().take();
        drop(body);
    }
}

/// Cancellable handle to a scheduled task.
///
/// Disposing before the task fires guarantees it never runs and drops its
/// closure right away; disposing afterwards does nothing. Dropping the
/// handle does *not* cancel the task.
#[derive(Clone)]
pub struct TaskHandle {
    task: Rc<ScheduledTask>,
}

impl TaskHandle {
    pub(crate) fn new(task: Rc<ScheduledTask>) -> Self {
        Self { task }
    }

    /// Whether the task can still fire.
    pub fn is_pending(&self) -> bool {
        self.task.is_live()
    }
}

impl Disposable for TaskHandle {
    fn dispose(&self) -> StreamResult<()> {
        self.task.cancel();
        Ok(())
    }
}
