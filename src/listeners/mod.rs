//! # Listener abstractions.
//!
//! This module provides the listener-related types:
//! - [`Listener`] - shared callback with a uniform `(&[Payload]) -> ListenerResult` contract
//! - [`Outcome`] - synchronous completion or deferred result
//! - [`RawListener`] - stored registry entry (plain or once-wrapper)

mod entry;
mod listener;

pub use entry::{OnceWrapper, RawListener};
pub use listener::{DeferredFuture, Listener, ListenerResult, Outcome};
