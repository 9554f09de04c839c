//! Running streams to completion and bridging them into `futures`

use std::rc::Rc;

use futures::channel::mpsc;
use futures_util::stream::{LocalBoxStream, StreamExt};
use uuid::Uuid;

use crate::disposable::{dispose_quietly, Disposable, DisposableSlot, DisposeGuard};
use crate::error::{StreamError, StreamResult};
use crate::scheduler::SchedulerRef;
use crate::sink::{ChannelSink, Notification, SafeSink, Sink, SinkRef, SinkState, Time};
use crate::stream::Stream;

/// A live run of a stream, owned by the caller of [`Stream::subscribe`].
///
/// The run ends at the first of: a terminal call delivered to the sink (the
/// upstream is then released automatically), or [`Disposable::dispose`].
pub struct Subscription {
    id: Uuid,
    guard: Rc<dyn SafeSinkHandle>,
    upstream: Rc<DisposableSlot>,
}

/// Type-erased view of the boundary sink's state.
trait SafeSinkHandle {
    fn state(&self) -> SinkState;
    fn close(&self) -> bool;
}

impl<T> SafeSinkHandle for SafeSink<T> {
    fn state(&self) -> SinkState {
        SafeSink::state(self)
    }

    fn close(&self) -> bool {
        SafeSink::close(self)
    }
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// State of the subscription as seen by its sink.
    pub fn state(&self) -> SinkState {
        self.guard.state()
    }

    /// Whether the stream terminated or the subscription was disposed.
    pub fn is_closed(&self) -> bool {
        self.state() != SinkState::Active
    }
}

impl Disposable for Subscription {
    fn dispose(&self) -> StreamResult<()> {
        if self.guard.close() {
            log::debug!("Subscription {} disposed", self.id);
        }
        self.upstream.dispose()
    }
}

impl<T: 'static> Stream<T> {
    /// Run the stream into `sink` behind a [`SafeSink`] boundary.
    pub fn subscribe(&self, sink: SinkRef<T>, scheduler: &SchedulerRef) -> Subscription {
        let id = Uuid::new_v4();
        let upstream = Rc::new(DisposableSlot::new());
        let guard = Rc::new(SafeSink::with_upstream(
            Rc::new(LoggingSink { id, downstream: sink }),
            Rc::clone(&upstream),
        ));
        log::debug!("Subscription {} started at {:?}", id, scheduler.now());
        upstream.set(self.run(guard.clone(), scheduler));
        Subscription {
            id,
            guard,
            upstream,
        }
    }
}

/// Logs terminal calls with the subscription id.
struct LoggingSink<T> {
    id: Uuid,
    downstream: SinkRef<T>,
}

impl<T> Sink<T> for LoggingSink<T> {
    fn event(&self, time: Time, value: T) {
        self.downstream.event(time, value);
    }

    fn end(&self, time: Time) {
        log::debug!("Subscription {} ended at {:?}", self.id, time);
        self.downstream.end(time);
    }

    fn error(&self, time: Time, err: StreamError) {
        log::debug!("Subscription {} failed at {:?}: {}", self.id, time, err);
        self.downstream.error(time, err);
    }
}

/// Run `stream` and gather its values until it ends.
///
/// Resolves to the stream's error if it fails, and to
/// [`StreamError::Cancelled`] if the subscription goes away without a
/// terminal call. The scheduler must be driven while the future is pending.
pub async fn collect<T: 'static>(stream: &Stream<T>, scheduler: &SchedulerRef) -> StreamResult<Vec<T>> {
    let (sender, mut receiver) = mpsc::unbounded();
    let subscription = stream.subscribe(Rc::new(ChannelSink::new(sender)), scheduler);
    let mut values = Vec::new();
    let outcome = loop {
        match receiver.next().await {
            Some(Notification::Event(_, value)) => values.push(value),
            Some(Notification::End(_)) => break Ok(values),
            Some(Notification::Error(_, err)) => break Err(err),
            None => break Err(StreamError::Cancelled),
        }
    };
    dispose_quietly(&subscription, "collected subscription");
    outcome
}

/// Expose a push stream as a pull-based `futures` stream.
///
/// Yields `Ok(value)` per event, a single `Err` if the stream fails, and
/// finishes after `end`. Dropping the returned stream disposes the
/// subscription.
pub fn into_async_stream<T: 'static>(
    stream: Stream<T>,
    scheduler: SchedulerRef,
) -> LocalBoxStream<'static, StreamResult<T>> {
    async_stream::stream! {
        let (sender, mut receiver) = mpsc::unbounded();
        let subscription = stream.subscribe(Rc::new(ChannelSink::new(sender)), &scheduler);
        let _guard = DisposeGuard::new(Box::new(subscription));
        while let Some(notification) = receiver.next().await {
            match notification {
                Notification::Event(_, value) => yield Ok(value),
                Notification::End(_) => break,
                Notification::Error(_, err) => {
                    yield Err(err);
                    break;
                }
            }
        }
    }
    .boxed_local()
}
