//! Future-based signals.
//!
//! An [`AsyncSignal`] emission does not run anything by itself. The caller
//! gets an [`Emission`] and drives it: [`Emission::dispatch`] starts the
//! next handler, [`Emission::has_value`] checks whether its future has
//! resolved and [`Emission::get_value`] takes the result, blocking if it
//! has to. Handlers run strictly one after another. An `Emission` is also a
//! [`Stream`] of handler results, so async code can simply `.next().await`
//! through it.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::{self, BoxFuture, FutureExt};
use futures::stream::{Stream, StreamExt};

use super::{Collector, Connectable, HandlerId, HandlerList, Snapshot};

/// A handler producing a future; the arguments are only borrowed while the
/// future is created.
pub type FutureHandler<A, R> = dyn Fn(&A) -> BoxFuture<'static, R> + Send + Sync;

fn boxed_handler<A, R, F, Fut>(handler: F) -> Arc<FutureHandler<A, R>>
where
    F: Fn(&A) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
{
    Arc::new(move |args: &A| handler(args).boxed())
}

pub struct AsyncSignal<A, R = ()> {
    handlers: HandlerList<FutureHandler<A, R>>,
}

impl<A, R: Send + 'static> AsyncSignal<A, R> {
    pub fn new() -> Self {
        Self {
            handlers: HandlerList::new(),
        }
    }

    /// A signal with a permanent default handler that is always dispatched
    /// first.
    pub fn with_default<F, Fut>(handler: F) -> Self
    where
        F: Fn(&A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        Self {
            handlers: HandlerList::with_default(boxed_handler(handler)),
        }
    }

    pub fn connect_future<F, Fut>(&self, handler: F) -> HandlerId
    where
        F: Fn(&A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
    {
        self.handlers.connect(boxed_handler(handler))
    }

    /// Connect a plain handler; its result is delivered as an already
    /// resolved future.
    pub fn connect<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
    {
        self.connect_future(move |args: &A| future::ready(handler(args)))
    }

    /// Begin an emission over the handlers connected right now.
    pub fn emission(&self, args: A) -> Emission<A, R> {
        let snapshot = self.handlers.snapshot();
        log::trace!("new emission over {} handlers", snapshot.len());
        Emission {
            snapshot,
            args,
            next: 0,
            active: None,
            ready: None,
        }
    }

    /// Run a whole emission, folding the results through `C`.
    pub async fn emit<C: Collector<R>>(&self, args: A) -> C::Output {
        let mut emission = self.emission(args);
        let mut collector = C::default();
        while let Some(result) = emission.next().await {
            if !collector.collect(result) {
                break;
            }
        }
        collector.finish()
    }
}

impl<A, R> Connectable for AsyncSignal<A, R> {
    type Handler = FutureHandler<A, R>;

    fn handlers(&self) -> &HandlerList<FutureHandler<A, R>> {
        &self.handlers
    }
}

impl<A, R: Send + 'static> Default for AsyncSignal<A, R> {
    fn default() -> Self {
        Self::new()
    }
}

/// One in-flight asynchronous emission.
///
/// Owns its arguments and a snapshot of the handler list, so it stays valid
/// after the signal is dropped or its handlers are disconnected. Dropping
/// it drops the active future without cancelling work that future already
/// handed elsewhere.
pub struct Emission<A, R> {
    snapshot: Snapshot<FutureHandler<A, R>>,
    args: A,
    next: usize,
    active: Option<BoxFuture<'static, R>>,
    ready: Option<R>,
}

// No field is ever pinned in place: the active future is boxed.
impl<A, R> Unpin for Emission<A, R> {}

impl<A, R> Emission<A, R> {
    /// Start the next handler unless one is still outstanding or its value
    /// has not been taken yet. Does nothing once every handler ran.
    pub fn dispatch(&mut self) {
        if self.active.is_some() || self.ready.is_some() {
            return;
        }
        if self.start_next() {
            self.poll_active(&mut Context::from_waker(futures::task::noop_waker_ref()));
        }
    }

    /// True once the dispatched handler's future has resolved and its value
    /// has not been taken.
    pub fn has_value(&mut self) -> bool {
        if self.ready.is_none() {
            self.poll_active(&mut Context::from_waker(futures::task::noop_waker_ref()));
        }
        self.ready.is_some()
    }

    /// Take the dispatched handler's result, blocking the calling thread
    /// until its future resolves. `None` when nothing was dispatched.
    pub fn get_value(&mut self) -> Option<R> {
        if let Some(value) = self.ready.take() {
            return Some(value);
        }
        self.active.take().map(futures::executor::block_on)
    }

    /// True while a result is waiting, a handler is running, or handlers
    /// remain to be dispatched.
    pub fn pending(&self) -> bool {
        self.ready.is_some() || self.active.is_some() || self.next < self.snapshot.len()
    }

    pub fn done(&self) -> bool {
        !self.pending()
    }

    /// Handlers not dispatched yet.
    pub fn remaining(&self) -> usize {
        self.snapshot.len() - self.next
    }

    pub fn args(&self) -> &A {
        &self.args
    }

    fn start_next(&mut self) -> bool {
        let Some(slot) = self.snapshot.get(self.next) else {
            return false;
        };
        log::trace!("dispatching handler {}", slot.id());
        self.active = Some((slot.handler())(&self.args));
        self.next += 1;
        true
    }

    fn poll_active(&mut self, cx: &mut Context<'_>) {
        if let Some(active) = self.active.as_mut() {
            if let Poll::Ready(value) = active.as_mut().poll(cx) {
                self.active = None;
                self.ready = Some(value);
            }
        }
    }
}

impl<A, R> Stream for Emission<A, R> {
    type Item = R;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<R>> {
        let this = self.get_mut();
        loop {
            if let Some(value) = this.ready.take() {
                return Poll::Ready(Some(value));
            }
            if this.active.is_some() {
                this.poll_active(cx);
                return match this.ready.take() {
                    Some(value) => Poll::Ready(Some(value)),
                    None => Poll::Pending,
                };
            }
            if !this.start_next() {
                return Poll::Ready(None);
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let outstanding = usize::from(self.ready.is_some() || self.active.is_some());
        let n = self.remaining() + outstanding;
        (n, Some(n))
    }
}

impl<A, R> fmt::Debug for Emission<A, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emission")
            .field("handlers", &self.snapshot.len())
            .field("next", &self.next)
            .field("active", &self.active.is_some())
            .field("ready", &self.ready.is_some())
            .finish()
    }
}
