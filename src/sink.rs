//! The consumer side of the push protocol
//!
//! A producer drives a [`Sink`] with any number of `event` calls followed by
//! at most one terminal call (`end` or `error`). The [`Lifecycle`] state
//! machine is how every wrapper sink in this crate enforces that.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use futures::channel::mpsc::UnboundedSender;

use crate::disposable::{dispose_quietly, DisposableSlot};
use crate::error::StreamError;

/// Logical timestamp: an offset on the running scheduler's clock.
pub type Time = Duration;

/// Consumer capability a producer pushes into.
///
/// After `end` or `error` has been delivered, no further call is made.
pub trait Sink<T> {
    fn event(&self, time: Time, value: T);
    fn end(&self, time: Time);
    fn error(&self, time: Time, err: StreamError);
}

/// Shared, type-erased sink
pub type SinkRef<T> = Rc<dyn Sink<T>>;

/// State of one subscription as seen by a sink wrapper
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkState {
    Active,
    Ended,
    Errored,
    Disposed,
}

/// `Active -> Ended | Errored | Disposed`, with no way back.
///
/// Each transition method returns `true` only for the call that actually
/// left `Active`, so exactly one caller gets to deliver a terminal.
#[derive(Debug)]
pub struct Lifecycle {
    state: Cell<SinkState>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: Cell::new(SinkState::Active),
        }
    }

    pub fn state(&self) -> SinkState {
        self.state.get()
    }

    pub fn is_active(&self) -> bool {
        self.state.get() == SinkState::Active
    }

    pub fn end(&self) -> bool {
        self.transition(SinkState::Ended)
    }

    pub fn fail(&self) -> bool {
        self.transition(SinkState::Errored)
    }

    pub fn dispose(&self) -> bool {
        self.transition(SinkState::Disposed)
    }

    fn transition(&self, next: SinkState) -> bool {
        if self.state.get() == SinkState::Active {
            self.state.set(next);
            true
        } else {
            false
        }
    }
}

/// One call received by a sink, in owned form.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification<T> {
    Event(Time, T),
    End(Time),
    Error(Time, StreamError),
}

impl<T> Notification<T> {
    pub fn time(&self) -> Time {
        match self {
            Notification::Event(time, _) | Notification::End(time) | Notification::Error(time, _) => {
                *time
            }
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Notification::Event(..))
    }
}

/// Boundary sink that rejects anything after the first terminal call.
///
/// Out-of-protocol calls are dropped and logged rather than forwarded. When an
/// upstream slot is attached, it is released as soon as the terminal call
/// has been delivered.
pub struct SafeSink<T> {
    downstream: SinkRef<T>,
    lifecycle: Lifecycle,
    upstream: Option<Rc<DisposableSlot>>,
}

impl<T> SafeSink<T> {
    pub fn new(downstream: SinkRef<T>) -> Self {
        Self {
            downstream,
            lifecycle: Lifecycle::new(),
            upstream: None,
        }
    }

    pub fn with_upstream(downstream: SinkRef<T>, upstream: Rc<DisposableSlot>) -> Self {
        Self {
            downstream,
            lifecycle: Lifecycle::new(),
            upstream: Some(upstream),
        }
    }

    pub fn state(&self) -> SinkState {
        self.lifecycle.state()
    }

    /// Stop forwarding without delivering a terminal call.
    pub fn close(&self) -> bool {
        self.lifecycle.dispose()
    }

    fn release_upstream(&self) {
        if let Some(upstream) = &self.upstream {
            dispose_quietly(upstream.as_ref(), "completed subscription");
        }
    }
}

impl<T> Sink<T> for SafeSink<T> {
    fn event(&self, time: Time, value: T) {
        if self.lifecycle.is_active() {
            self.downstream.event(time, value);
        } else if self.lifecycle.state() != SinkState::Disposed {
            log::warn!("Dropping event at {:?} delivered after stream termination", time);
        }
    }

    fn end(&self, time: Time) {
        if self.lifecycle.end() {
            self.downstream.end(time);
            self.release_upstream();
        } else if self.lifecycle.state() != SinkState::Disposed {
            log::warn!("Ignoring repeated end at {:?}", time);
        }
    }

    fn error(&self, time: Time, err: StreamError) {
        if self.lifecycle.fail() {
            self.downstream.error(time, err);
            self.release_upstream();
        } else if self.lifecycle.state() != SinkState::Disposed {
            log::warn!("Ignoring error at {:?} after stream termination: {}", time, err);
        }
    }
}

/// Forwards every call as a [`Notification`] into an unbounded channel.
pub struct ChannelSink<T> {
    sender: UnboundedSender<Notification<T>>,
}

impl<T> ChannelSink<T> {
    pub fn new(sender: UnboundedSender<Notification<T>>) -> Self {
        Self { sender }
    }

    fn send(&self, notification: Notification<T>) {
        if self.sender.unbounded_send(notification).is_err() {
            log::trace!("Channel receiver dropped, discarding notification");
        }
    }
}

impl<T> Sink<T> for ChannelSink<T> {
    fn event(&self, time: Time, value: T) {
        self.send(Notification::Event(time, value));
    }

    fn end(&self, time: Time) {
        self.send(Notification::End(time));
        self.sender.close_channel();
    }

    fn error(&self, time: Time, err: StreamError) {
        self.send(Notification::Error(time, err));
        self.sender.close_channel();
    }
}
