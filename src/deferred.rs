//! The deferred/promise state machine: pending-listener storage,
//! exactly-once settlement, and forwarding to an assimilated outcome.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use crate::thenable::{OnReason, OnValue, Resolution, Settled, Thenable};
use crate::Error;

/// The write half of an eventual value. Whoever holds it decides the
/// outcome; every settlement call after the first is a silent no-op.
pub struct Deferred<T, E> {
    core: Rc<Core<T, E>>,
}

/// The read half. Cheap to clone and freely shareable; exposes listener
/// registration and nothing that could settle the value.
pub struct Promise<T, E> {
    inner: Rc<dyn Thenable<T, E>>,
}

struct Core<T, E> {
    state: RefCell<State<T, E>>,
}

enum State<T, E> {
    Pending(Vec<Listener<T, E>>),
    /// The stored outcome is itself a thenable: either a settled wrapper or
    /// another promise still being assimilated. New registrations forward
    /// to it instead of queueing.
    Settled(Rc<dyn Thenable<T, E>>),
}

/// One `then` registration: the callback pair driving a downstream
/// deferred.
struct Listener<T, E> {
    on_value: OnValue<T>,
    on_reason: OnReason<E>,
}

impl<T: Clone + 'static, E: Clone + 'static> Thenable<T, E> for Core<T, E> {
    fn subscribe(&self, on_value: OnValue<T>, on_reason: OnReason<E>) {
        let outcome = match &mut *self.state.borrow_mut() {
            State::Pending(listeners) => {
                listeners.push(Listener { on_value, on_reason });
                return;
            }
            State::Settled(outcome) => Rc::clone(outcome),
        };
        // Borrow released above: the outcome may invoke the callback
        // synchronously, and the callback may subscribe again.
        outcome.subscribe(on_value, on_reason);
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Deferred<T, E> {
    /// Creates a pending pair: the single write capability and the
    /// shareable promise it will settle.
    pub fn new() -> (Deferred<T, E>, Promise<T, E>) {
        let core = Rc::new(Core {
            state: RefCell::new(State::Pending(Vec::new())),
        });
        (
            Deferred {
                core: Rc::clone(&core),
            },
            Promise { inner: core },
        )
    }

    /// Settles the promise with a plain value, unless already settled.
    pub fn resolve(&self, value: T) {
        self.settle(Rc::new(Settled::Value(value)))
    }

    /// Settles the promise with a failure, unless already settled. The
    /// reason is taken as an opaque payload and never assimilated, even
    /// when its type is itself a promise.
    pub fn reject(&self, reason: E) {
        self.settle(Rc::new(Settled::Failure(reason)))
    }

    /// Settles with an arbitrary [`Resolution`]: a `Chain` forwards this
    /// promise to the chained promise's eventual outcome.
    pub fn resolve_with(&self, resolution: impl Into<Resolution<T, E>>) {
        self.settle(resolution.into().into_outcome())
    }

    /// The one settlement path. Stores the outcome and drains the pending
    /// queue in registration order; drain-then-clear, so a listener that
    /// reentrantly registers or settles observes the settled state rather
    /// than a queue mid-mutation.
    fn settle(&self, outcome: Rc<dyn Thenable<T, E>>) {
        let drained = {
            let mut state = self.core.state.borrow_mut();
            match &mut *state {
                State::Pending(listeners) => {
                    let drained = std::mem::take(listeners);
                    *state = State::Settled(Rc::clone(&outcome));
                    drained
                }
                State::Settled(_) => return,
            }
        };
        for Listener {
            on_value,
            on_reason,
        } in drained
        {
            outcome.subscribe(on_value, on_reason);
        }
    }
}

/// Wraps a handler so its returned resolution settles `downstream`. A
/// `Failure` return becomes that promise's rejection instead of escaping
/// into the notification pass, so one failing handler cannot starve the
/// other listeners.
fn relay<X, U, E>(
    downstream: Deferred<U, E>,
    handler: impl FnOnce(X) -> Resolution<U, E> + 'static,
) -> Box<dyn FnOnce(X)>
where
    X: 'static,
    U: Clone + 'static,
    E: Clone + 'static,
{
    Box::new(move |input| downstream.resolve_with(handler(input)))
}

impl<T: Clone + 'static, E: Clone + 'static> Promise<T, E> {
    /// An already-resolved promise carrying `value`.
    pub fn value(value: T) -> Self {
        Promise {
            inner: Rc::new(Settled::Value(value)),
        }
    }

    /// An already-rejected promise carrying `reason`.
    pub fn failure(reason: E) -> Self {
        Promise {
            inner: Rc::new(Settled::Failure(reason)),
        }
    }

    /// Treats any [`Thenable`] as a promise. This is the interop entry for
    /// eventual values produced outside this crate.
    pub fn from_thenable(inner: Rc<dyn Thenable<T, E>>) -> Self {
        Promise { inner }
    }

    pub(crate) fn into_thenable(self) -> Rc<dyn Thenable<T, E>> {
        self.inner
    }

    /// Registers a handler pair and returns the promise of the matching
    /// handler's result.
    ///
    /// Never blocks. While the receiver is pending the pair is queued; once
    /// settled it runs synchronously. The handler's [`Resolution`] settles
    /// the returned promise, with `Chain` assimilated as usual. The
    /// pass-through defaults of the missing-handler form are the variant
    /// constructors themselves; see [`map`](Self::map) and
    /// [`recover`](Self::recover).
    pub fn then<U: Clone + 'static>(
        &self,
        on_value: impl FnOnce(T) -> Resolution<U, E> + 'static,
        on_reason: impl FnOnce(E) -> Resolution<U, E> + 'static,
    ) -> Promise<U, E> {
        let (deferred, promise) = Deferred::new();
        let twin = Deferred {
            core: Rc::clone(&deferred.core),
        };
        self.inner
            .subscribe(relay(deferred, on_value), relay(twin, on_reason));
        promise
    }

    /// `then` with the failure channel passed through unchanged.
    pub fn map<U: Clone + 'static>(
        &self,
        on_value: impl FnOnce(T) -> Resolution<U, E> + 'static,
    ) -> Promise<U, E> {
        self.then(on_value, Resolution::Failure)
    }

    /// `then` with the success channel passed through unchanged.
    pub fn recover(
        &self,
        on_reason: impl FnOnce(E) -> Resolution<T, E> + 'static,
    ) -> Promise<T, E> {
        self.then(Resolution::Value, on_reason)
    }

    /// Non-blocking probe of the current outcome, expressed purely through
    /// the listener contract: [`Error::StillPending`] until this promise
    /// and everything it assimilates have settled.
    ///
    /// Each call on a pending promise parks one listener, so prefer `then`
    /// for ordinary chaining.
    pub fn settled(&self) -> Result<Result<T, E>, Error> {
        let slot: Rc<RefCell<Option<Result<T, E>>>> = Rc::new(RefCell::new(None));
        self.inner.subscribe(
            Box::new({
                let slot = Rc::clone(&slot);
                move |value: T| *slot.borrow_mut() = Some(Ok(value))
            }),
            Box::new({
                let slot = Rc::clone(&slot);
                move |reason: E| *slot.borrow_mut() = Some(Err(reason))
            }),
        );
        let outcome = slot.borrow_mut().take();
        outcome.ok_or(Error::StillPending)
    }
}

impl<T: Clone + 'static, E: Clone + 'static> Thenable<T, E> for Promise<T, E> {
    fn subscribe(&self, on_value: OnValue<T>, on_reason: OnReason<E>) {
        self.inner.subscribe(on_value, on_reason)
    }
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Promise {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + 'static, E: Clone + 'static> From<Resolution<T, E>> for Promise<T, E> {
    fn from(resolution: Resolution<T, E>) -> Self {
        Promise {
            inner: resolution.into_outcome(),
        }
    }
}

impl<T: Clone + 'static, E: Clone + 'static> From<Result<T, E>> for Promise<T, E> {
    fn from(result: Result<T, E>) -> Self {
        Promise::from(Resolution::from(result))
    }
}

impl<T, E> fmt::Debug for Deferred<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.core.state.borrow() {
            State::Pending(listeners) => f
                .debug_struct("Deferred")
                .field("pending_listeners", &listeners.len())
                .finish(),
            State::Settled(_) => f.write_str("Deferred(settled)"),
        }
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Promise")
    }
}
