//! Eventual values for single-threaded cooperative code.
//!
//! A [`Deferred`] is the write half of a value that is not yet known; the
//! [`Promise`] it hands out is the freely shareable read half. Settlement
//! happens exactly once, listeners registered while pending are notified in
//! registration order, and resolving with another promise forwards to that
//! promise's eventual outcome instead of treating it as a payload
//! (assimilation). Anything implementing [`Thenable`] interoperates.
//!
//! There is no scheduler here: `then` never blocks, and callbacks run
//! synchronously once the value they observe has settled. Whoever holds the
//! `Deferred` decides when that is.
//!
//! # Examples
//!
//! ```
//! use eventual_core::{Deferred, Resolution};
//!
//! let (deferred, promise) = Deferred::<i32, String>::new();
//! let doubled = promise.map(|n| Resolution::Value(n * 2));
//! deferred.resolve(21);
//! assert_eq!(doubled.settled(), Ok(Ok(42)));
//! ```

use thiserror::Error as ThisError;

mod bridge;
mod combine;
mod deferred;
mod thenable;

pub use bridge::Waiting;
pub use combine::{future, join, lazed, lazy, promised};
pub use deferred::{Deferred, Promise};
pub use thenable::{OnReason, OnValue, Resolution, Thenable};

/// Errors reported by the inspection surface. Failure *outcomes* of a
/// promise are the opaque generic reason type, never this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
pub enum Error {
    /// The promise, or the thenable it is assimilating, has not settled.
    #[error("promise has not settled yet")]
    StillPending,
}
