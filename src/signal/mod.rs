//! Multi-handler signals
//!
//! Two flavours share one handler store:
//!
//! - [`Signal`] invokes handlers on the emitting thread and folds their
//!   results through a [`Collector`]
//! - [`AsyncSignal`] starts handlers that return futures, one at a time,
//!   driven step by step through an [`Emission`]
//!
//! ## Handler storage
//!
//! Handlers live in a copy-on-write list keyed by [`HandlerId`]. Connecting
//! or disconnecting publishes a new list; an emission takes one snapshot of
//! the current list and works on it until it finishes. A handler removed
//! while an emission is running therefore still runs in that emission and
//! is freed once the last snapshot holding it is gone.

mod collector;
mod future;
mod sync;

pub use collector::{
    Collector, CollectorDefault, CollectorLast, CollectorSum, CollectorUntil0, CollectorVector,
    CollectorWhile0, Truthy,
};
pub use future::{AsyncSignal, Emission, FutureHandler};
pub use sync::{Handler, Signal};

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

/// Identifies one connected handler within its signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

impl HandlerId {
    /// The permanent default handler installed at construction.
    pub const DEFAULT: HandlerId = HandlerId(0);

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One entry of a handler snapshot.
pub struct Slot<H: ?Sized> {
    id: HandlerId,
    handler: Arc<H>,
}

impl<H: ?Sized> Slot<H> {
    pub fn id(&self) -> HandlerId {
        self.id
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }
}

impl<H: ?Sized> Clone for Slot<H> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            handler: Arc::clone(&self.handler),
        }
    }
}

/// An immutable, ordered view of the connected handlers.
pub type Snapshot<H> = Arc<Vec<Slot<H>>>;

/// Ordered handler store with lock-free snapshots.
pub struct HandlerList<H: ?Sized> {
    slots: ArcSwap<Vec<Slot<H>>>,
    /// Next id to hand out; the lock also serializes writers.
    next_id: Mutex<u64>,
}

impl<H: ?Sized> HandlerList<H> {
    pub fn new() -> Self {
        Self {
            slots: ArcSwap::from_pointee(Vec::new()),
            next_id: Mutex::new(1),
        }
    }

    /// A list whose first slot permanently holds `handler`.
    pub fn with_default(handler: Arc<H>) -> Self {
        Self {
            slots: ArcSwap::from_pointee(vec![Slot {
                id: HandlerId::DEFAULT,
                handler,
            }]),
            next_id: Mutex::new(1),
        }
    }

    pub fn connect(&self, handler: Arc<H>) -> HandlerId {
        let mut next_id = self.next_id.lock();
        let id = HandlerId(*next_id);
        *next_id += 1;
        let mut slots = Vec::clone(&self.slots.load());
        slots.push(Slot { id, handler });
        self.slots.store(Arc::new(slots));
        id
    }

    /// Remove a handler; false when `id` is unknown, already removed, or
    /// the default handler.
    pub fn disconnect(&self, id: HandlerId) -> bool {
        if id == HandlerId::DEFAULT {
            return false;
        }
        let _writer = self.next_id.lock();
        let current = self.slots.load_full();
        if !current.iter().any(|slot| slot.id == id) {
            return false;
        }
        let slots = current
            .iter()
            .filter(|slot| slot.id != id)
            .cloned()
            .collect();
        self.slots.store(Arc::new(slots));
        true
    }

    /// Remove every handler except the default one.
    pub fn clear(&self) {
        let _writer = self.next_id.lock();
        let slots = self
            .slots
            .load()
            .iter()
            .filter(|slot| slot.id == HandlerId::DEFAULT)
            .cloned()
            .collect();
        self.slots.store(Arc::new(slots));
    }

    pub fn snapshot(&self) -> Snapshot<H> {
        self.slots.load_full()
    }

    pub fn contains(&self, id: HandlerId) -> bool {
        self.slots.load().iter().any(|slot| slot.id == id)
    }

    /// Number of handlers, the default one included.
    pub fn len(&self) -> usize {
        self.slots.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.load().is_empty()
    }
}

impl<H: ?Sized> Default for HandlerList<H> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handler management shared by both signal flavours.
pub trait Connectable {
    type Handler: ?Sized;

    fn handlers(&self) -> &HandlerList<Self::Handler>;

    /// Returns true exactly once per successful connect.
    fn disconnect(&self, id: HandlerId) -> bool {
        self.handlers().disconnect(id)
    }

    fn is_connected(&self, id: HandlerId) -> bool {
        self.handlers().contains(id)
    }

    fn handler_count(&self) -> usize {
        self.handlers().len()
    }

    fn disconnect_all(&self) {
        self.handlers().clear()
    }
}
