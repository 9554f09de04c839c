#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use rs2_push::{Notification, Scheduler, SchedulerRef, Sink, StreamError, Time, VirtualScheduler};

pub fn ms(millis: u64) -> Duration {
    Duration::from_millis(millis)
}

/// A virtual scheduler plus the shared handle the streams run against.
pub fn virtual_scheduler() -> (Rc<VirtualScheduler>, SchedulerRef) {
    let scheduler = Rc::new(VirtualScheduler::new());
    let shared: SchedulerRef = scheduler.clone();
    (scheduler, shared)
}

/// Sink that records every call and panics on a call after a terminal one.
pub struct Recorder<T> {
    notifications: RefCell<Vec<Notification<T>>>,
}

impl<T> Recorder<T> {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            notifications: RefCell::new(Vec::new()),
        })
    }

    fn record(&self, notification: Notification<T>) {
        let mut notifications = self.notifications.borrow_mut();
        if let Some(last) = notifications.last() {
            assert!(
                !last.is_terminal(),
                "sink called at {:?} after a terminal call at {:?}",
                notification.time(),
                last.time()
            );
        }
        notifications.push(notification);
    }

    pub fn len(&self) -> usize {
        self.notifications.borrow().len()
    }

    pub fn is_terminated(&self) -> bool {
        self.notifications
            .borrow()
            .last()
            .map_or(false, Notification::is_terminal)
    }

    pub fn is_ended(&self) -> bool {
        matches!(self.notifications.borrow().last(), Some(Notification::End(_)))
    }

    /// Time of the final `end`, if the stream ended.
    pub fn end_time(&self) -> Option<Time> {
        match self.notifications.borrow().last() {
            Some(Notification::End(time)) => Some(*time),
            _ => None,
        }
    }

    /// The stream's error, if it failed.
    pub fn error(&self) -> Option<StreamError> {
        match self.notifications.borrow().last() {
            Some(Notification::Error(_, err)) => Some(err.clone()),
            _ => None,
        }
    }
}

impl<T: Clone> Recorder<T> {
    pub fn values(&self) -> Vec<T> {
        self.notifications
            .borrow()
            .iter()
            .filter_map(|notification| match notification {
                Notification::Event(_, value) => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// Event values with the time they were delivered at.
    pub fn timed_values(&self) -> Vec<(Time, T)> {
        self.notifications
            .borrow()
            .iter()
            .filter_map(|notification| match notification {
                Notification::Event(time, value) => Some((*time, value.clone())),
                _ => None,
            })
            .collect()
    }
}

impl<T> Sink<T> for Recorder<T> {
    fn event(&self, time: Time, value: T) {
        self.record(Notification::Event(time, value));
    }

    fn end(&self, time: Time) {
        self.record(Notification::End(time));
    }

    fn error(&self, time: Time, err: StreamError) {
        self.record(Notification::Error(time, err));
    }
}

/// Current time of a virtual scheduler, through the trait.
pub fn now(scheduler: &VirtualScheduler) -> Time {
    Scheduler::now(scheduler)
}
