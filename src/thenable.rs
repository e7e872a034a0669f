//! The minimal eventual-value contract, plus the settled wrappers that
//! normalize plain values and failures into it.

use std::rc::Rc;

use crate::Promise;

/// One-shot success callback handed to [`Thenable::subscribe`].
pub type OnValue<T> = Box<dyn FnOnce(T)>;
/// One-shot failure callback handed to [`Thenable::subscribe`].
pub type OnReason<E> = Box<dyn FnOnce(E)>;

/// An eventual value: anything able to report its settlement to a pair of
/// one-shot callbacks.
///
/// This is the whole interoperability surface. [`Promise`] implements it,
/// the internal settled wrappers implement it, and any external
/// implementation is assimilated by the engine rather than carried as a
/// plain payload (enter through [`Promise::from_thenable`]).
///
/// Contract: exactly one of the two callbacks runs, exactly once, at or
/// after settlement. Subscribing an already-settled thenable invokes the
/// matching callback synchronously; the other callback is dropped unused.
pub trait Thenable<T, E> {
    fn subscribe(&self, on_value: OnValue<T>, on_reason: OnReason<E>);
}

/// An already-settled outcome. Terminal at construction; delivery clones
/// the payload per subscriber.
pub(crate) enum Settled<T, E> {
    Value(T),
    Failure(E),
}

impl<T: Clone, E: Clone> Thenable<T, E> for Settled<T, E> {
    fn subscribe(&self, on_value: OnValue<T>, on_reason: OnReason<E>) {
        match self {
            Settled::Value(value) => on_value(value.clone()),
            Settled::Failure(reason) => on_reason(reason.clone()),
        }
    }
}

/// What a handler settles its downstream promise with.
///
/// `Value` and `Failure` are terminal; `Chain` forwards to another
/// promise's eventual outcome instead (assimilation). The variant
/// constructors double as the identity pass-through handlers of
/// [`Promise::then`], so a missing handler is spelled `Resolution::Value`
/// or `Resolution::Failure`.
pub enum Resolution<T, E> {
    Value(T),
    Failure(E),
    Chain(Promise<T, E>),
}

impl<T: Clone + 'static, E: Clone + 'static> Resolution<T, E> {
    /// Normalizes into a thenable outcome the engine can store and forward
    /// listeners to.
    pub(crate) fn into_outcome(self) -> Rc<dyn Thenable<T, E>> {
        match self {
            Resolution::Value(value) => Rc::new(Settled::Value(value)),
            Resolution::Failure(reason) => Rc::new(Settled::Failure(reason)),
            Resolution::Chain(promise) => promise.into_thenable(),
        }
    }
}

impl<T, E> From<Promise<T, E>> for Resolution<T, E> {
    fn from(promise: Promise<T, E>) -> Self {
        Resolution::Chain(promise)
    }
}

impl<T, E> From<Result<T, E>> for Resolution<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Resolution::Value(value),
            Err(reason) => Resolution::Failure(reason),
        }
    }
}
