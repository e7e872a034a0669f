//! `.await` support layered on the listener contract, for single-threaded
//! executors. The promise types are deliberately not `Send`; drive them
//! with `futures::executor::block_on` or a `LocalPool`.

use std::cell::RefCell;
use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll, Waker};

use crate::thenable::Thenable;
use crate::Promise;

/// Future adapter returned by `Promise::into_future`.
///
/// The first poll subscribes once; settlement stores the outcome and wakes
/// the most recent waker.
pub struct Waiting<T, E> {
    promise: Promise<T, E>,
    shared: Rc<RefCell<Shared<T, E>>>,
    subscribed: bool,
}

struct Shared<T, E> {
    outcome: Option<Result<T, E>>,
    waker: Option<Waker>,
}

impl<T: Clone + 'static, E: Clone + 'static> Future for Waiting<T, E> {
    type Output = Result<T, E>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if !this.subscribed {
            this.subscribed = true;
            this.promise.subscribe(
                Box::new({
                    let shared = Rc::clone(&this.shared);
                    move |value: T| settle(&shared, Ok(value))
                }),
                Box::new({
                    let shared = Rc::clone(&this.shared);
                    move |reason: E| settle(&shared, Err(reason))
                }),
            );
        }
        let mut shared = this.shared.borrow_mut();
        match shared.outcome.take() {
            Some(outcome) => Poll::Ready(outcome),
            None => {
                shared.waker = Some(cx.waker().clone());
                Poll::Pending
            }
        }
    }
}

fn settle<T, E>(shared: &Rc<RefCell<Shared<T, E>>>, outcome: Result<T, E>) {
    let waker = {
        let mut shared = shared.borrow_mut();
        shared.outcome = Some(outcome);
        shared.waker.take()
    };
    if let Some(waker) = waker {
        waker.wake()
    }
}

impl<T: Clone + 'static, E: Clone + 'static> IntoFuture for Promise<T, E> {
    type Output = Result<T, E>;
    type IntoFuture = Waiting<T, E>;

    fn into_future(self) -> Waiting<T, E> {
        Waiting {
            promise: self,
            shared: Rc::new(RefCell::new(Shared {
                outcome: None,
                waker: None,
            })),
            subscribed: false,
        }
    }
}
