//! Combinators over the promise core: the ordered join, and the eager/lazy
//! invocation builders. All of them are call-throughs over `then` and the
//! settlement constructors; none touch engine internals.

use std::cell::RefCell;
use std::rc::Rc;

use crate::thenable::{OnReason, OnValue, Resolution, Thenable};
use crate::{Deferred, Promise};

/// Folds an ordered sequence of resolutions into one promise of the ordered
/// resolved values.
///
/// Folding is strictly left to right: element `i` settles before element
/// `i + 1` contributes, so the result order matches the input order no
/// matter which inputs settle first, and the first rejection observed while
/// folding short-circuits the rest.
pub fn join<T, E>(items: impl IntoIterator<Item = Resolution<T, E>>) -> Promise<Vec<T>, E>
where
    T: Clone + 'static,
    E: Clone + 'static,
{
    items
        .into_iter()
        .fold(Promise::value(Vec::new()), |acc, item| {
            acc.map(move |mut values| {
                Promise::from(item)
                    .map(move |value| {
                        values.push(value);
                        Resolution::Value(values)
                    })
                    .into()
            })
        })
}

/// Eager invocation: resolves `input`, applies `f` to it, and returns the
/// promise of the result.
///
/// `f` runs exactly once, as soon as the input is available — immediately
/// for an immediate input. A `Failure` return rejects the result, as does a
/// rejected input (in which case `f` never runs).
pub fn future<T, U, E, F>(f: F, input: impl Into<Resolution<T, E>>) -> Promise<U, E>
where
    F: FnOnce(T) -> Resolution<U, E> + 'static,
    T: Clone + 'static,
    U: Clone + 'static,
    E: Clone + 'static,
{
    Promise::from(input.into()).map(f)
}

/// Lazy invocation: like [`future`], but `f` runs only when the returned
/// promise is first subscribed, and the forced result is memoized for every
/// later subscription.
pub fn lazy<T, U, E, F>(f: F, input: impl Into<Resolution<T, E>>) -> Promise<U, E>
where
    F: FnOnce(T) -> Resolution<U, E> + 'static,
    T: Clone + 'static,
    U: Clone + 'static,
    E: Clone + 'static,
{
    Promise::from_thenable(Rc::new(Lazy {
        state: RefCell::new(Force::Thunk(f, input.into())),
    }))
}

/// Wraps `f` into a function from an argument list of resolutions to the
/// promise of applying `f` over the joined list. Eager per call, like
/// [`future`].
pub fn promised<T, U, E, F>(f: F) -> impl Fn(Vec<Resolution<T, E>>) -> Promise<U, E>
where
    F: Fn(Vec<T>) -> Resolution<U, E> + 'static,
    T: Clone + 'static,
    U: Clone + 'static,
    E: Clone + 'static,
{
    let f = Rc::new(f);
    move |args| {
        let f = Rc::clone(&f);
        future(move |values| f(values), join(args))
    }
}

/// Like [`promised`], deferring the application until the returned promise
/// is first subscribed. Each call builds an independent [`lazy`]
/// computation: memoization is per call, never across calls.
pub fn lazed<T, U, E, F>(f: F) -> impl Fn(Vec<Resolution<T, E>>) -> Promise<U, E>
where
    F: Fn(Vec<T>) -> Resolution<U, E> + 'static,
    T: Clone + 'static,
    U: Clone + 'static,
    E: Clone + 'static,
{
    let f = Rc::new(f);
    move |args| {
        let f = Rc::clone(&f);
        lazy(move |values| f(values), join(args))
    }
}

/// A thenable holding an unforced computation. First subscription swaps the
/// thunk for the forced promise; later subscriptions reuse it.
struct Lazy<T, U, E, F> {
    state: RefCell<Force<T, U, E, F>>,
}

enum Force<T, U, E, F> {
    Thunk(F, Resolution<T, E>),
    Forced(Promise<U, E>),
}

impl<T, U, E, F> Lazy<T, U, E, F>
where
    F: FnOnce(T) -> Resolution<U, E> + 'static,
    T: Clone + 'static,
    U: Clone + 'static,
    E: Clone + 'static,
{
    fn force(&self) -> Promise<U, E> {
        let mut state = self.state.borrow_mut();
        if let Force::Forced(promise) = &*state {
            return promise.clone();
        }
        let (deferred, promise) = Deferred::new();
        let previous = std::mem::replace(&mut *state, Force::Forced(promise.clone()));
        // Swap before running the thunk, releasing the borrow: the thunk
        // may subscribe to this same promise reentrantly.
        drop(state);
        if let Force::Thunk(f, input) = previous {
            deferred.resolve_with(future(f, input));
        }
        promise
    }
}

impl<T, U, E, F> Thenable<U, E> for Lazy<T, U, E, F>
where
    F: FnOnce(T) -> Resolution<U, E> + 'static,
    T: Clone + 'static,
    U: Clone + 'static,
    E: Clone + 'static,
{
    fn subscribe(&self, on_value: OnValue<U>, on_reason: OnReason<E>) {
        self.force().subscribe(on_value, on_reason)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::{future, join, lazed, lazy, promised};
    use crate::{Deferred, Error, Promise, Resolution};

    #[test]
    fn join_preserves_input_order() {
        let (deferred, pending) = Deferred::<i32, ()>::new();
        let joined = join(vec![
            Resolution::Value(1),
            Resolution::Chain(pending),
            Resolution::Value(3),
        ]);

        assert_eq!(joined.settled(), Err(Error::StillPending));
        deferred.resolve(2);
        assert_eq!(joined.settled(), Ok(Ok(vec![1, 2, 3])));
    }

    #[test]
    fn join_of_nothing_is_an_empty_list() {
        let joined = join(Vec::<Resolution<i32, ()>>::new());
        assert_eq!(joined.settled(), Ok(Ok(Vec::new())));
    }

    #[test]
    fn join_rejects_with_the_first_failure() {
        let joined = join(vec![
            Resolution::Value(1),
            Resolution::Failure("bad"),
            Resolution::Value(3),
        ]);
        assert_eq!(joined.settled(), Ok(Err("bad")));
    }

    #[test]
    fn futures_are_greedy() {
        let runs = Rc::new(Cell::new(0));
        let sum: Promise<i32, ()> = future(
            {
                let runs = Rc::clone(&runs);
                move |x: i32| {
                    runs.set(runs.get() + 1);
                    Resolution::Value(7 + x)
                }
            },
            Resolution::Value(8),
        );

        assert_eq!(runs.get(), 1);
        assert_eq!(sum.settled(), Ok(Ok(15)));
    }

    #[test]
    fn future_waits_for_a_promise_input() {
        let (deferred, input) = Deferred::<i32, ()>::new();
        let sum = future(|x: i32| Resolution::Value(11 + x), input);

        assert_eq!(sum.settled(), Err(Error::StillPending));
        deferred.resolve(24);
        assert_eq!(sum.settled(), Ok(Ok(35)));
    }

    #[test]
    fn future_rejects_on_handler_failure() {
        let failed: Promise<i32, &'static str> =
            future(|_: i32| Resolution::Failure("boom"), Resolution::Value(1));
        assert_eq!(failed.settled(), Ok(Err("boom")));
    }

    #[test]
    fn future_assimilates_a_returned_promise() {
        let chained: Promise<i32, ()> = future(
            |_: i32| Resolution::Chain(Promise::value(17)),
            Resolution::Value(0),
        );
        assert_eq!(chained.settled(), Ok(Ok(17)));
    }

    #[test]
    fn lazy_runs_on_demand_exactly_once() {
        let runs = Rc::new(Cell::new(0));
        let promise: Promise<i32, ()> = lazy(
            {
                let runs = Rc::clone(&runs);
                move |x: i32| {
                    runs.set(runs.get() + 1);
                    Resolution::Value(x)
                }
            },
            Resolution::Value(1),
        );

        assert_eq!(runs.get(), 0);
        assert_eq!(promise.settled(), Ok(Ok(1)));
        assert_eq!(runs.get(), 1);
        assert_eq!(promise.settled(), Ok(Ok(1)));
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn promised_applies_over_joined_args() {
        let sum = promised(|xs: Vec<i32>| Resolution::Value(xs.iter().sum::<i32>()));
        let total: Promise<i32, ()> = sum(vec![Resolution::Value(7), Resolution::Value(8)]);
        assert_eq!(total.settled(), Ok(Ok(15)));
    }

    #[test]
    fn promised_waits_for_promise_args() {
        let sum = promised(|xs: Vec<i32>| Resolution::Value(xs.iter().sum::<i32>()));
        let (deferred, pending) = Deferred::<i32, ()>::new();
        let total = sum(vec![Resolution::Value(11), Resolution::Chain(pending)]);

        assert_eq!(total.settled(), Err(Error::StillPending));
        deferred.resolve(24);
        assert_eq!(total.settled(), Ok(Ok(35)));
    }

    #[test]
    fn promised_is_greedy_per_call() {
        let runs = Rc::new(Cell::new(0));
        let f = {
            let runs = Rc::clone(&runs);
            promised(move |_: Vec<i32>| {
                runs.set(runs.get() + 1);
                Resolution::<i32, ()>::Value(0)
            })
        };

        let _unobserved = f(vec![]);
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn lazed_builds_a_fresh_lazy_computation_per_call() {
        let runs = Rc::new(Cell::new(0));
        let f = {
            let runs = Rc::clone(&runs);
            lazed(move |xs: Vec<i32>| {
                runs.set(runs.get() + 1);
                Resolution::<i32, ()>::Value(xs.len() as i32)
            })
        };

        let first = f(vec![Resolution::Value(1)]);
        let second = f(vec![]);
        assert_eq!(runs.get(), 0);

        assert_eq!(first.settled(), Ok(Ok(1)));
        assert_eq!(runs.get(), 1);
        assert_eq!(first.settled(), Ok(Ok(1)));
        assert_eq!(runs.get(), 1);

        assert_eq!(second.settled(), Ok(Ok(0)));
        assert_eq!(runs.get(), 2);
    }
}
