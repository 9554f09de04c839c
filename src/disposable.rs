//! Idempotent resource release handles
//!
//! Every running subscription, scheduled task and combinator state is
//! released through a [`Disposable`]. Disposal is synchronous, idempotent and
//! best-effort: aggregates keep releasing the remaining children when one of
//! them fails, and report the first failure.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use crate::error::{StreamError, StreamResult};

/// A handle that releases a resource or cancels pending work.
///
/// Calling `dispose` more than once, or after the underlying work already
/// finished, is a no-op that returns `Ok(())`.
pub trait Disposable {
    fn dispose(&self) -> StreamResult<()>;
}

/// Owned, type-erased disposable
pub type BoxDisposable = Box<dyn Disposable>;

impl<D: Disposable + ?Sized> Disposable for Rc<D> {
    fn dispose(&self) -> StreamResult<()> {
        (**self).dispose()
    }
}

impl<D: Disposable + ?Sized> Disposable for Box<D> {
    fn dispose(&self) -> StreamResult<()> {
        (**self).dispose()
    }
}

/// Dispose `target`, logging instead of propagating a failure.
pub fn dispose_quietly(target: &dyn Disposable, context: &str) {
    if let Err(err) = target.dispose() {
        log::warn!("Disposal of {} failed: {}", context, err);
    }
}

/// Dispose every item, continuing past failures. Returns the first failure.
pub fn dispose_all<I>(items: I) -> StreamResult<()>
where
    I: IntoIterator<Item = BoxDisposable>,
{
    let mut first_error = None;
    for item in items {
        if let Err(err) = item.dispose() {
            log::warn!("Disposal failed, continuing with remaining resources: {}", err);
            first_error.get_or_insert(err);
        }
    }
    match first_error {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// A disposable that owns nothing.
pub fn empty() -> BoxDisposable {
    Box::new(NoopDisposable)
}

struct NoopDisposable;

impl Disposable for NoopDisposable {
    fn dispose(&self) -> StreamResult<()> {
        Ok(())
    }
}

/// A disposable that runs `release` the first time it is disposed.
pub fn from_fn<F>(release: F) -> BoxDisposable
where
    F: FnOnce() -> StreamResult<()> + 'static,
{
    Box::new(FnDisposable {
        release: RefCell::new(Some(Box::new(release))),
    })
}

struct FnDisposable {
    release: RefCell<Option<Box<dyn FnOnce() -> StreamResult<()>>>>,
}

impl Disposable for FnDisposable {
    fn dispose(&self) -> StreamResult<()> {
        let release = self.release.borrow_mut().take();
        match release {
            Some(release) => release(),
            None => Ok(()),
        }
    }
}

/// Key of a child inside a [`CompositeDisposable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DisposableKey(usize);

/// A mutable set of child disposables released together.
///
/// Children are disposed in insertion order. Once the composite is disposed
/// it stays disposed: any child added afterwards is disposed on arrival.
pub struct CompositeDisposable {
    children: RefCell<Option<BTreeMap<DisposableKey, BoxDisposable>>>,
    next_key: Cell<usize>,
}

impl Default for CompositeDisposable {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeDisposable {
    pub fn new() -> Self {
        Self {
            children: RefCell::new(Some(BTreeMap::new())),
            next_key: Cell::new(0),
        }
    }

    /// Add a child. Returns `None`, after disposing the child, if the
    /// composite was already disposed.
    pub fn add(&self, child: BoxDisposable) -> Option<DisposableKey> {
        let mut children = self.children.borrow_mut();
        match children.as_mut() {
            Some(map) => {
                let key = DisposableKey(self.next_key.get());
                self.next_key.set(key.0 + 1);
                map.insert(key, child);
                Some(key)
            }
            None => {
                drop(children);
                dispose_quietly(child.as_ref(), "child added to a disposed composite");
                None
            }
        }
    }

    /// Register an empty [`DisposableSlot`] to be filled once the child's
    /// subscription exists. Lets a child terminate (and be removed) while
    /// its own `run` is still executing.
    pub fn add_slot(&self) -> Option<(DisposableKey, Rc<DisposableSlot>)> {
        let slot = Rc::new(DisposableSlot::new());
        let key = self.add(Box::new(Rc::clone(&slot)))?;
        Some((key, slot))
    }

    /// Take a child out without disposing it.
    pub fn remove(&self, key: DisposableKey) -> Option<BoxDisposable> {
        self.children
            .borrow_mut()
            .as_mut()
            .and_then(|map| map.remove(&key))
    }

    /// Remove a child and dispose it.
    pub fn release(&self, key: DisposableKey) -> StreamResult<()> {
        match self.remove(key) {
            Some(child) => child.dispose(),
            None => Ok(()),
        }
    }

    pub fn len(&self) -> usize {
        self.children.borrow().as_ref().map_or(0, |map| map.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_disposed(&self) -> bool {
        self.children.borrow().is_none()
    }
}

impl Disposable for CompositeDisposable {
    fn dispose(&self) -> StreamResult<()> {
        // Take the children out first: a child's disposal may call back into
        // this composite.
        let children = self.children.borrow_mut().take();
        match children {
            Some(map) => dispose_all(map.into_values()),
            None => Ok(()),
        }
    }
}

enum SlotState {
    Empty,
    Holding(BoxDisposable),
    Disposed,
}

/// Holds at most one disposable that becomes available after the slot is
/// created.
///
/// If the slot is disposed before it is filled, the value is disposed the
/// moment it arrives. Setting a new value disposes the previous one.
pub struct DisposableSlot {
    state: RefCell<SlotState>,
}

impl Default for DisposableSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl DisposableSlot {
    pub fn new() -> Self {
        Self {
            state: RefCell::new(SlotState::Empty),
        }
    }

    pub fn set(&self, next: BoxDisposable) {
        let mut state = self.state.borrow_mut();
        if matches!(*state, SlotState::Disposed) {
            drop(state);
            dispose_quietly(next.as_ref(), "late subscription");
            return;
        }
        let previous = std::mem::replace(&mut *state, SlotState::Holding(next));
        drop(state);
        if let SlotState::Holding(previous) = previous {
            dispose_quietly(previous.as_ref(), "replaced subscription");
        }
    }

    pub fn is_disposed(&self) -> bool {
        matches!(*self.state.borrow(), SlotState::Disposed)
    }
}

impl Disposable for DisposableSlot {
    fn dispose(&self) -> StreamResult<()> {
        let previous = std::mem::replace(&mut *self.state.borrow_mut(), SlotState::Disposed);
        match previous {
            SlotState::Holding(inner) => inner.dispose(),
            SlotState::Empty | SlotState::Disposed => Ok(()),
        }
    }
}

/// Disposes the wrapped handle when dropped.
pub struct DisposeGuard {
    inner: Option<BoxDisposable>,
}

impl DisposeGuard {
    pub fn new(inner: BoxDisposable) -> Self {
        Self { inner: Some(inner) }
    }

    /// Give up ownership without disposing.
    pub fn into_inner(mut self) -> BoxDisposable {
        self.inner.take().unwrap_or_else(empty)
    }
}

impl Drop for DisposeGuard {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            dispose_quietly(inner.as_ref(), "guarded subscription");
        }
    }
}

/// Convert a failed release into [`StreamError::Dispose`].
pub fn dispose_error(msg: impl Into<String>) -> StreamError {
    StreamError::Dispose(msg.into())
}
