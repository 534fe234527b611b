//! # Dispatch - one synchronous pass over a listener snapshot.
//!
//! ```text
//! dispatch(snapshot, args):
//!   for entry in snapshot (fixed before the first call):
//!     ├─ Ok(Done)          → nothing to do
//!     ├─ Ok(Deferred(fut)) → collected for the caller to schedule
//!     ├─ Err(payload)      → collected as a synchronous failure
//!     └─ panic             → caught, collected as a synchronous failure
//! ```
//!
//! Failures never stop the walk: every entry of the snapshot is invoked.

use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::events::Payload;
use crate::listeners::{DeferredFuture, Outcome, RawListener};

/// What one dispatch pass produced.
#[derive(Default)]
pub(crate) struct Dispatched {
    pub(crate) invoked: usize,
    pub(crate) failures: Vec<Payload>,
    pub(crate) deferred: Vec<DeferredFuture>,
}

pub(crate) fn dispatch(snapshot: &[RawListener], args: &[Payload]) -> Dispatched {
    let mut out = Dispatched::default();
    for entry in snapshot {
        out.invoked += 1;
        match catch_unwind(AssertUnwindSafe(|| entry.call(args))) {
            Ok(Ok(Outcome::Done)) => {}
            Ok(Ok(Outcome::Deferred(fut))) => out.deferred.push(fut),
            Ok(Err(failure)) => out.failures.push(failure),
            Err(panic) => {
                let failure = panic_payload(panic);
                tracing::debug!(failure = ?failure, "listener panicked during dispatch");
                out.failures.push(failure);
            }
        }
    }
    out
}

/// Converts a caught panic into a failure value (message if it has one).
pub(crate) fn panic_payload(panic: Box<dyn std::any::Any + Send>) -> Payload {
    match panic.downcast::<&'static str>() {
        Ok(msg) => Payload::from(*msg),
        Err(panic) => match panic.downcast::<String>() {
            Ok(msg) => Payload::from(*msg),
            Err(_) => Payload::from("listener panicked"),
        },
    }
}
