//! Synchronous signals.

use std::marker::PhantomData;
use std::sync::Arc;

use super::{Collector, CollectorDefault, Connectable, HandlerId, HandlerList};

/// A synchronous handler: borrows the emitted arguments, returns a result.
pub type Handler<A, R> = dyn Fn(&A) -> R + Send + Sync;

/// A signal whose handlers run on the emitting thread.
///
/// `A` is the argument type (use a tuple for several arguments), `R` the
/// handler result and `C` the collector folding results into what
/// [`Signal::emit`] returns.
pub struct Signal<A, R = (), C = CollectorDefault<R>> {
    handlers: HandlerList<Handler<A, R>>,
    _collector: PhantomData<fn() -> C>,
}

impl<A, R, C: Collector<R>> Signal<A, R, C> {
    pub fn new() -> Self {
        Self {
            handlers: HandlerList::new(),
            _collector: PhantomData,
        }
    }

    /// A signal with a permanent default handler that always runs first.
    pub fn with_default<F>(handler: F) -> Self
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
    {
        Self {
            handlers: HandlerList::with_default(Arc::new(handler)),
            _collector: PhantomData,
        }
    }

    pub fn connect<F>(&self, handler: F) -> HandlerId
    where
        F: Fn(&A) -> R + Send + Sync + 'static,
    {
        self.handlers.connect(Arc::new(handler))
    }

    /// Invoke the handlers connected right now, in connection order.
    ///
    /// Handlers connected or disconnected while this runs (including by the
    /// handlers themselves) only affect later emissions. No lock is held
    /// while a handler runs, so handlers may emit this signal again.
    pub fn emit(&self, args: &A) -> C::Output {
        let snapshot = self.handlers.snapshot();
        let mut collector = C::default();
        for (index, slot) in snapshot.iter().enumerate() {
            let result = (slot.handler)(args);
            if !collector.collect(result) {
                log::trace!(
                    "emission stopped by collector after {} of {} handlers",
                    index + 1,
                    snapshot.len()
                );
                break;
            }
        }
        collector.finish()
    }
}

impl<A, R, C> Connectable for Signal<A, R, C> {
    type Handler = Handler<A, R>;

    fn handlers(&self) -> &HandlerList<Handler<A, R>> {
        &self.handlers
    }
}

impl<A, R, C: Collector<R>> Default for Signal<A, R, C> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::{CollectorSum, CollectorVector};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn empty_signal_returns_neutral_result() {
        let last: Signal<i32, i32> = Signal::new();
        assert_eq!(last.emit(&1), 0);
        let sum: Signal<i32, i32, CollectorSum<i32>> = Signal::new();
        assert_eq!(sum.emit(&1), 0);
        let all: Signal<i32, i32, CollectorVector<i32>> = Signal::new();
        assert!(all.emit(&1).is_empty());
    }

    #[test]
    fn default_handler_runs_first() {
        let signal: Signal<i32, i32, CollectorVector<i32>> = Signal::with_default(|v| *v);
        signal.connect(|v| v * 10);
        assert_eq!(signal.emit(&2), vec![2, 20]);
        assert_eq!(signal.handler_count(), 2);
    }

    #[test]
    fn unit_signals_just_notify() {
        let hits = Arc::new(AtomicUsize::new(0));
        let signal: Signal<(&'static str, u32)> = Signal::new();
        let counter = Arc::clone(&hits);
        signal.connect(move |(_, n)| {
            counter.fetch_add(*n as usize, Ordering::SeqCst);
        });
        signal.emit(&("changed", 3));
        signal.emit(&("changed", 4));
        assert_eq!(hits.load(Ordering::SeqCst), 7);
    }
}
