//! Lazy, push-based event streams driven by an explicit scheduler.
//!
//! A [`Stream`] is a recipe: running it against a [`Sink`] and a
//! [`Scheduler`] starts a subscription that pushes `event`s followed by at
//! most one `end` or `error`, and hands back a [`Disposable`] that stops it.
//! Time is virtual or real depending on the scheduler:
//! [`VirtualScheduler`] for deterministic tests, [`TokioScheduler`] on a
//! tokio `LocalSet`.

pub mod disposable;
pub mod error;
pub mod pipe;
pub mod scheduler;
pub mod sink;
pub mod stream;
pub mod stream_configuration;
pub mod subscribe;

pub use disposable::{
    BoxDisposable, CompositeDisposable, Disposable, DisposableKey, DisposableSlot, DisposeGuard,
};
pub use error::{StreamError, StreamResult};
pub use pipe::{Pipe, PipeExt};
pub use scheduler::{
    PeriodicTask, Scheduler, SchedulerRef, Task, TaskHandle, TokioScheduler, VirtualScheduler,
};
pub use sink::{ChannelSink, Lifecycle, Notification, SafeSink, Sink, SinkRef, SinkState, Time};
pub use stream::{Source, Stream};
pub use stream_configuration::{SchedulerConfig, VirtualSchedulerConfig};
pub use subscribe::{collect, into_async_stream, Subscription};

// Re-export constructors and combinators at the crate root
pub use stream::{
    ap, at, cycle, delay, emit, empty, fail, flat_map, from_future, from_iter, join, map, merge,
    merge_array, never, periodic, throttle, tick, timeline, try_flat_map, try_map, zip, zip_array,
    zip_with,
};
