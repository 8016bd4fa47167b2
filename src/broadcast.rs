//! Listener registration and fail-safe delivery.
//!
//! A broadcaster never hands its backing collection to a listener. Delivery
//! always runs over a snapshot, so a listener may register, unregister, or
//! mutate whatever raised the event while it is being called. A listener that
//! reports a failure is evicted and the remaining listeners still run; the
//! failure never reaches the code that raised the event.

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use smallvec::SmallVec;
use thiserror::Error;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a registration. Unique across every broadcaster, and
/// independent of where the listener lives in memory.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    fn fresh() -> ListenerId {
        return ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed));
    }
}

impl fmt::Debug for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "ListenerId({})", self.0);
    }
}

/// Returned by a listener that could not handle an event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("listener failed: {reason}")]
pub struct ListenerError {
    reason: String,
}

impl ListenerError {
    pub fn new(reason: impl Into<String>) -> ListenerError {
        return ListenerError { reason: reason.into() };
    }

    pub fn reason(&self) -> &str {
        return &self.reason;
    }
}

/// An observer of events of type `E`.
pub trait Listener<E> {
    /// Handle one event. Returning an error unsubscribes this listener.
    fn on_event(&self, event: &E) -> Result<(), ListenerError>;
}

impl<E, F> Listener<E> for F
where
    F: Fn(&E) -> Result<(), ListenerError>,
{
    fn on_event(&self, event: &E) -> Result<(), ListenerError> {
        return self(event);
    }
}

/// A copy of a listener set taken just before delivery.
pub type Snapshot<E> = SmallVec<[(ListenerId, Rc<dyn Listener<E>>); 4]>;

/// An ordered set of listeners, each held by a counted reference.
pub struct Broadcaster<E> {
    entries: SmallVec<[(ListenerId, Rc<dyn Listener<E>>); 2]>,
}

impl<E> Broadcaster<E> {
    pub fn new() -> Broadcaster<E> {
        return Broadcaster { entries: SmallVec::new() };
    }

    /// Add a listener at the end of the set.
    pub fn register(&mut self, listener: Rc<dyn Listener<E>>) -> ListenerId {
        let id = ListenerId::fresh();
        self.entries.push((id, listener));
        return id;
    }

    /// Remove a listener by identity, handing back its reference so the
    /// caller controls where it is dropped.
    pub fn unregister(&mut self, id: ListenerId) -> Option<Rc<dyn Listener<E>>> {
        let index = self.entries.iter().position(|(entry, _)| *entry == id)?;
        let (_, listener) = self.entries.remove(index);
        return Some(listener);
    }

    pub fn contains(&self, id: ListenerId) -> bool {
        return self.entries.iter().any(|(entry, _)| *entry == id);
    }

    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    pub fn snapshot(&self) -> Snapshot<E> {
        return self.entries.iter().cloned().collect();
    }

    /// Deliver `event` to every listener, evicting the ones that fail.
    ///
    /// For sets that live behind a `RefCell`, take a [`Broadcaster::snapshot`]
    /// and use [`deliver`] instead so no borrow is held during delivery.
    pub fn broadcast(&mut self, event: &E) {
        let snapshot = self.snapshot();
        let mut evicted = Vec::new();
        deliver(&snapshot, event, |id| evicted.push(id));
        for id in evicted {
            self.unregister(id);
        }
    }
}

impl<E> Default for Broadcaster<E> {
    fn default() -> Broadcaster<E> {
        return Broadcaster::new();
    }
}

/// Call every listener in `snapshot` in order. `evict` is invoked with the
/// identity of each listener that failed, after its call has returned.
pub fn deliver<E>(snapshot: &Snapshot<E>, event: &E, mut evict: impl FnMut(ListenerId)) {
    for (id, listener) in snapshot.iter() {
        if let Err(error) = listener.on_event(event) {
            tracing::warn!(listener = ?id, %error, "evicting listener after failed delivery");
            evict(*id);
        }
    }
}
